//! Request bodies for creating and upserting rows.
//!
//! A row is written either from raw JSON supplied by the user or from a list
//! of typed cell values keyed by field id. Both paths validate their input
//! locally and raise [`ApiError::MalformedInput`] before any request is sent.

use crate::error::ApiError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::{Map, Number, Value};

/// Typed value for one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Free text
    RichText(String),
    /// Number
    Number(f64),
    /// Option name
    SingleSelect(String),
    /// Option names
    MultiSelect(Vec<String>),
    /// Date or date range
    DateTime(DateInput),
    /// Link
    Url(String),
    /// Boolean
    Checkbox(bool),
}

/// Date input of a `DateTime` cell.
///
/// Dates are ISO 8601 strings. Values without an offset are read as wall
/// time in `timezone`, or in the caller's default timezone when none is
/// set, with daylight saving applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateInput {
    /// Single date, used when `range` is false
    pub date: Option<String>,
    /// Range start
    pub start: Option<String>,
    /// Range end
    pub end: Option<String>,
    /// Whether the cell holds a range
    pub range: bool,
    /// Whether the time of day is shown
    pub include_time: bool,
    /// IANA timezone for dates written without an offset
    pub timezone: Option<Tz>,
}

impl DateInput {
    /// Set the timezone from an IANA name such as `Europe/Berlin`. An empty
    /// name keeps the caller's default.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MalformedInput`] for an unknown name.
    pub fn with_timezone_name(mut self, name: &str) -> Result<Self, ApiError> {
        self.timezone = parse_timezone(name)?;
        Ok(self)
    }
}

/// Parse an IANA timezone name; empty means none.
///
/// # Errors
///
/// Returns [`ApiError::MalformedInput`] for an unknown name.
pub fn parse_timezone(name: &str) -> Result<Option<Tz>, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(None);
    }
    name.parse::<Tz>()
        .map(Some)
        .map_err(|_| ApiError::MalformedInput(format!("unknown timezone '{name}'")))
}

/// One cell to write.
#[derive(Debug, Clone, PartialEq)]
pub struct CellInput {
    /// Field id; an `id|FieldType` option value is accepted as well
    pub key: String,
    /// Cell content
    pub value: CellValue,
}

impl CellInput {
    /// Create a cell input.
    #[must_use]
    pub fn new(key: impl Into<String>, value: CellValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Field id with any `|FieldType` suffix removed.
    #[must_use]
    pub fn field_id(&self) -> &str {
        self.key.split('|').next().unwrap_or_default()
    }
}

/// Source of a row's cells.
#[derive(Debug, Clone, PartialEq)]
pub enum RowData {
    /// Raw JSON object text, sent as the request body
    Json(String),
    /// Cells mapped field by field
    Cells(Vec<CellInput>),
}

/// A row to create or upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct RowWrite {
    /// Cell data
    pub data: RowData,
    /// Document body (Markdown) attached to the row
    pub document: Option<String>,
}

impl RowWrite {
    /// Row from mapped cells.
    #[must_use]
    pub fn cells(cells: Vec<CellInput>) -> Self {
        Self {
            data: RowData::Cells(cells),
            document: None,
        }
    }

    /// Row from raw JSON text.
    #[must_use]
    pub fn json(text: impl Into<String>) -> Self {
        Self {
            data: RowData::Json(text.into()),
            document: None,
        }
    }

    /// Attach a document body.
    #[must_use]
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Build the request body, adding `pre_hash` for upserts. Dates without
    /// their own timezone are read in `default_timezone`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MalformedInput`] for invalid JSON, a JSON value
    /// that is not an object, an empty cell list, or unusable dates.
    pub fn to_body(
        &self,
        pre_hash: Option<&str>,
        default_timezone: Tz,
    ) -> Result<Value, ApiError> {
        let mut body = match &self.data {
            RowData::Json(text) => parse_object(text)?,
            RowData::Cells(cells) => {
                let cells = build_cells(cells, default_timezone)?;
                let mut body = Map::new();
                body.insert("cells".to_string(), Value::Object(cells));
                body
            }
        };

        if let Some(document) = &self.document {
            body.insert("document".to_string(), Value::String(document.clone()));
        }
        if let Some(pre_hash) = pre_hash {
            body.insert("pre_hash".to_string(), Value::String(pre_hash.to_string()));
        }

        Ok(Value::Object(body))
    }
}

fn parse_object(text: &str) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_str(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::MalformedInput(
            "row JSON must be an object".to_string(),
        )),
        Err(e) => Err(ApiError::MalformedInput(format!("invalid row JSON: {e}"))),
    }
}

/// Map typed cells to the `cells` object of the row endpoint.
///
/// Dates without their own timezone are read in `default_timezone`.
///
/// # Errors
///
/// Returns [`ApiError::MalformedInput`] if `cells` is empty or a value cannot
/// be represented.
pub fn build_cells(
    cells: &[CellInput],
    default_timezone: Tz,
) -> Result<Map<String, Value>, ApiError> {
    if cells.is_empty() {
        return Err(ApiError::MalformedInput(
            "No field values provided".to_string(),
        ));
    }

    cells
        .iter()
        .map(|cell| {
            let value = cell_value(&cell.value, default_timezone)?;
            Ok((cell.field_id().to_string(), value))
        })
        .collect()
}

fn cell_value(value: &CellValue, default_timezone: Tz) -> Result<Value, ApiError> {
    Ok(match value {
        CellValue::RichText(text) | CellValue::SingleSelect(text) | CellValue::Url(text) => {
            Value::String(text.clone())
        }
        CellValue::Number(number) => Number::from_f64(*number)
            .map(Value::Number)
            .ok_or_else(|| ApiError::MalformedInput(format!("invalid number {number}")))?,
        CellValue::MultiSelect(options) => {
            Value::Array(options.iter().cloned().map(Value::String).collect())
        }
        CellValue::Checkbox(checked) => Value::Bool(*checked),
        CellValue::DateTime(input) => date_cell(input, default_timezone)?,
    })
}

fn date_cell(input: &DateInput, default_timezone: Tz) -> Result<Value, ApiError> {
    let timezone = input.timezone.unwrap_or(default_timezone);
    let mut cell = Map::new();

    if input.range {
        let (Some(start), Some(end)) = (&input.start, &input.end) else {
            return Err(ApiError::MalformedInput("Missing date values".to_string()));
        };
        cell.insert("timestamp".to_string(), epoch_seconds(start, timezone)?);
        cell.insert("end_timestamp".to_string(), epoch_seconds(end, timezone)?);
        cell.insert("is_range".to_string(), Value::Bool(true));
    } else {
        let Some(date) = &input.date else {
            return Err(ApiError::MalformedInput("Missing date value".to_string()));
        };
        cell.insert("timestamp".to_string(), epoch_seconds(date, timezone)?);
    }

    if input.include_time {
        cell.insert("include_time".to_string(), Value::Bool(true));
    }

    Ok(Value::Object(cell))
}

/// Parse an ISO 8601 date and render it as UTC epoch seconds.
fn epoch_seconds(text: &str, timezone: Tz) -> Result<Value, ApiError> {
    let parsed = parse_date(text.trim(), timezone)
        .ok_or_else(|| ApiError::MalformedInput(format!("invalid date '{text}'")))?;
    Ok(Value::String(parsed.timestamp().to_string()))
}

/// Wall times repeated by a daylight-saving fallback resolve to the earlier
/// instant; wall times skipped by a spring-forward gap are invalid.
fn parse_date(text: &str, timezone: Tz) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    let naive = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ]
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    .or_else(|| {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })?;

    timezone
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
