//! Shaping of API results for the host.

use appflowy_connector_core::{Database, Field, RowDetail, Workspace};
use chrono_tz::TZ_VARIANTS;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How row details are handed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowOutput {
    /// Fetch and return the document body of each row
    pub include_document: bool,
    /// Flatten rows into `{id, ...cells}`
    pub simplify: bool,
}

impl Default for RowOutput {
    fn default() -> Self {
        Self {
            include_document: false,
            simplify: true,
        }
    }
}

/// Shape fetched rows according to `output`.
///
/// Simplified rows carry `id` plus one key per cell, and `doc` (null when
/// the row has none) if documents were requested. Raw rows drop `doc`
/// unless documents were requested.
#[must_use]
pub fn shape_rows(rows: Vec<RowDetail>, output: RowOutput) -> Vec<Value> {
    rows.into_iter().map(|row| shape_row(row, output)).collect()
}

fn shape_row(mut row: RowDetail, output: RowOutput) -> Value {
    if output.simplify {
        let mut flat = Map::new();
        flat.insert("id".to_string(), Value::String(row.id));
        flat.extend(row.cells);
        if output.include_document {
            flat.insert("doc".to_string(), row.doc.unwrap_or(Value::Null));
        }
        return Value::Object(flat);
    }

    if !output.include_document {
        row.doc = None;
    }
    let mut raw = Map::new();
    raw.insert("id".to_string(), Value::String(row.id));
    raw.insert("cells".to_string(), Value::Object(row.cells));
    if let Some(doc) = row.doc {
        raw.insert("doc".to_string(), doc);
    }
    raw.extend(row.extra);
    Value::Object(raw)
}

/// Name/value pair offered to the user when picking a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOption {
    /// Label
    pub name: String,
    /// Identifier passed back to the connector
    pub value: String,
}

impl ResourceOption {
    fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Workspaces by name.
#[must_use]
pub fn workspace_options(workspaces: &[Workspace]) -> Vec<ResourceOption> {
    workspaces
        .iter()
        .map(|workspace| ResourceOption::new(&workspace.workspace_name, &workspace.workspace_id))
        .collect()
}

/// Databases by the name of their first view.
#[must_use]
pub fn database_options(databases: &[Database]) -> Vec<ResourceOption> {
    databases
        .iter()
        .map(|database| {
            let name = database.display_name().unwrap_or(database.id.as_str());
            ResourceOption::new(name, &database.id)
        })
        .collect()
}

/// Writable fields, valued `id|FieldType` so that the type travels with
/// the selection.
#[must_use]
pub fn field_options(fields: &[Field]) -> Vec<ResourceOption> {
    fields
        .iter()
        .filter(|field| field.field_type.is_writable())
        .map(|field| {
            ResourceOption::new(&field.name, format!("{}|{}", field.id, field.field_type))
        })
        .collect()
}

/// Options of the select field identified by `field_key` (`id` or
/// `id|FieldType`). Rows reference options by name, so name is also the value.
#[must_use]
pub fn select_value_options(fields: &[Field], field_key: &str) -> Vec<ResourceOption> {
    let field_id = field_key.split('|').next().unwrap_or_default();
    fields
        .iter()
        .filter(|field| field.id == field_id)
        .flat_map(Field::select_options)
        .map(|option| ResourceOption::new(&option.name, &option.name))
        .collect()
}

/// IANA timezones, led by an empty-valued `Default` entry that stands for
/// the host's own timezone.
#[must_use]
pub fn timezone_options() -> Vec<ResourceOption> {
    std::iter::once(ResourceOption::new("Default", ""))
        .chain(
            TZ_VARIANTS
                .iter()
                .map(|timezone| ResourceOption::new(timezone.name(), timezone.name())),
        )
        .collect()
}
