//! Typed views of AppFlowy Cloud resources.
//!
//! Only the attributes the connector reads are typed. Everything else the
//! server sends is preserved in `extra` so that rows and resources can be
//! handed back to the host unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The `{ "data": ... }` wrapper around every AppFlowy API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Response payload
    pub data: T,
}

/// A workspace (top-level tenant holding databases).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    /// Workspace identifier
    pub workspace_id: String,
    /// Human-readable workspace name
    #[serde(default)]
    pub workspace_name: String,
    /// Remaining attributes (owner, icon, member count, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A database within a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    /// Database identifier
    pub id: String,
    /// Views over the database; the first one carries the display name
    #[serde(default)]
    pub views: Vec<DatabaseView>,
    /// Remaining attributes
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Database {
    /// Name shown to users, taken from the first view.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.views.first().map(|view| view.name.as_str())
    }
}

/// A view over a database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseView {
    /// View name
    #[serde(default)]
    pub name: String,
    /// Remaining attributes
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Column type of a database field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Free text
    RichText,
    /// Numeric value
    Number,
    /// Date, optionally with time and range
    DateTime,
    /// One option out of a fixed list
    SingleSelect,
    /// Any number of options out of a fixed list
    MultiSelect,
    /// Boolean
    Checkbox,
    /// Link
    Url,
    /// Checklist
    Checklist,
    /// Server-maintained last edit time
    LastEditedTime,
    /// Server-maintained creation time
    CreatedTime,
    /// Link to rows of another database
    Relation,
    /// AI summary
    Summary,
    /// AI translation
    Translate,
    /// Attached files
    Media,
    /// Any type this connector does not know about
    Other(String),
}

impl FieldType {
    /// Whether rows can be written through the row endpoint for this type.
    ///
    /// Time stamps and AI columns are maintained by the server, relations are
    /// rejected by the row endpoint, and media/checklist payloads are not
    /// supported yet.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        !matches!(
            self,
            Self::LastEditedTime
                | Self::CreatedTime
                | Self::Summary
                | Self::Translate
                | Self::Relation
                | Self::Media
                | Self::Checklist
        )
    }

    /// Wire name of the type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::RichText => "RichText",
            Self::Number => "Number",
            Self::DateTime => "DateTime",
            Self::SingleSelect => "SingleSelect",
            Self::MultiSelect => "MultiSelect",
            Self::Checkbox => "Checkbox",
            Self::Url => "URL",
            Self::Checklist => "Checklist",
            Self::LastEditedTime => "LastEditedTime",
            Self::CreatedTime => "CreatedTime",
            Self::Relation => "Relation",
            Self::Summary => "Summary",
            Self::Translate => "Translate",
            Self::Media => "Media",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for FieldType {
    fn from(value: &str) -> Self {
        match value {
            "RichText" => Self::RichText,
            "Number" => Self::Number,
            "DateTime" => Self::DateTime,
            "SingleSelect" => Self::SingleSelect,
            "MultiSelect" => Self::MultiSelect,
            "Checkbox" => Self::Checkbox,
            "URL" => Self::Url,
            "Checklist" => Self::Checklist,
            "LastEditedTime" => Self::LastEditedTime,
            "CreatedTime" => Self::CreatedTime,
            "Relation" => Self::Relation,
            "Summary" => Self::Summary,
            "Translate" => Self::Translate,
            "Media" => Self::Media,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// A typed column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field identifier (cell key)
    pub id: String,
    /// Column name
    #[serde(default)]
    pub name: String,
    /// Column type
    pub field_type: FieldType,
    /// Type-specific settings, e.g. the options of a select field
    #[serde(default)]
    pub type_option: Value,
    /// Remaining attributes
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Field {
    /// Options declared for a single/multi select field.
    ///
    /// Returns an empty list for any other field type.
    #[must_use]
    pub fn select_options(&self) -> Vec<SelectOption> {
        self.type_option
            .pointer("/content/options")
            .and_then(|options| serde_json::from_value(options.clone()).ok())
            .unwrap_or_default()
    }
}

/// One option of a select field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Option identifier
    pub id: String,
    /// Option label, which is also what row writes reference
    pub name: String,
}

/// Row reference returned by the row listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRef {
    /// Row identifier
    pub id: String,
}

/// Entry of the "rows updated after" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowUpdate {
    /// Row identifier
    pub row_id: String,
    /// Last modification as reported by the API
    pub updated_at: DateTime<Utc>,
}

/// A row with its cells and optional document body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowDetail {
    /// Row identifier
    pub id: String,
    /// Cell values keyed by field name
    #[serde(default)]
    pub cells: Map<String, Value>,
    /// Document body, present when requested with `with_doc`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
    /// Remaining attributes
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tokens obtained from the password grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Bearer token for authenticated calls
    #[serde(default)]
    pub access_token: Option<String>,
    /// Refresh token returned alongside the access token
    #[serde(default)]
    pub refresh_token: Option<String>,
}
