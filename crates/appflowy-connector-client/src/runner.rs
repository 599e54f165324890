//! Per-item execution of connector operations.
//!
//! The host hands over one [`Operation`] per input item. Whether a failing
//! item aborts the run or is recorded and skipped is the caller's choice;
//! nothing here swallows an error on its own.

use crate::cells::RowWrite;
use crate::error::ApiError;
use crate::output::RowOutput;
use crate::paths;
use crate::resources::{AppflowyClient, RowListQuery};
use serde_json::{json, Value};

/// One connector action with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// List workspaces of the account
    ListWorkspaces,
    /// List databases of a workspace
    ListDatabases {
        /// Workspace id
        workspace_id: String,
    },
    /// List field definitions of a database
    ListFields {
        /// Workspace id
        workspace_id: String,
        /// Database id
        database_id: String,
    },
    /// Fetch rows by id
    GetRows {
        /// Workspace id
        workspace_id: String,
        /// Database id
        database_id: String,
        /// Comma-separated row ids
        row_ids: String,
        /// Output shaping
        output: RowOutput,
    },
    /// List rows, optionally filtered and limited
    GetAllRows {
        /// Workspace id
        workspace_id: String,
        /// Database id
        database_id: String,
        /// Filter, limit, and output shaping
        query: RowListQuery,
    },
    /// Create a row
    CreateRow {
        /// Workspace id
        workspace_id: String,
        /// Database id
        database_id: String,
        /// Row content
        row: RowWrite,
    },
    /// Create or update the row identified by `pre_hash`
    UpsertRow {
        /// Workspace id
        workspace_id: String,
        /// Database id
        database_id: String,
        /// Row content
        row: RowWrite,
        /// Caller-chosen row key
        pre_hash: String,
    },
}

impl Operation {
    /// Short name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListWorkspaces => "listWorkspaces",
            Self::ListDatabases { .. } => "listDatabases",
            Self::ListFields { .. } => "listFields",
            Self::GetRows { .. } => "getRows",
            Self::GetAllRows { .. } => "getAllRows",
            Self::CreateRow { .. } => "createRow",
            Self::UpsertRow { .. } => "upsertRow",
        }
    }
}

/// Failure of one item, tagged with its position in the input.
#[derive(Debug, thiserror::Error)]
#[error("item {index} failed: {error}")]
pub struct ItemError {
    /// Zero-based item index
    pub index: usize,
    /// Underlying error
    #[source]
    pub error: ApiError,
}

/// Execute one operation and return its output items.
///
/// # Errors
///
/// Returns the error of the underlying API call.
pub async fn execute(
    client: &AppflowyClient,
    operation: &Operation,
) -> Result<Vec<Value>, ApiError> {
    match operation {
        Operation::ListWorkspaces => to_items(client.list_workspaces().await?),
        Operation::ListDatabases { workspace_id } => {
            to_items(client.list_databases(workspace_id).await?)
        }
        Operation::ListFields {
            workspace_id,
            database_id,
        } => to_items(client.list_fields(workspace_id, database_id).await?),
        Operation::GetRows {
            workspace_id,
            database_id,
            row_ids,
            output,
        } => {
            client
                .get_rows(workspace_id, database_id, &paths::split_ids(row_ids), *output)
                .await
        }
        Operation::GetAllRows {
            workspace_id,
            database_id,
            query,
        } => client.get_all_rows(workspace_id, database_id, query).await,
        Operation::CreateRow {
            workspace_id,
            database_id,
            row,
        } => Ok(vec![client.create_row(workspace_id, database_id, row).await?]),
        Operation::UpsertRow {
            workspace_id,
            database_id,
            row,
            pre_hash,
        } => Ok(vec![
            client
                .upsert_row(workspace_id, database_id, row, pre_hash)
                .await?,
        ]),
    }
}

/// Execute `items` in order, one at a time.
///
/// With `continue_on_fail` a failing item contributes `{"error": message}`
/// to the output and the run moves on; otherwise the first failure aborts
/// the run.
///
/// # Errors
///
/// Returns [`ItemError`] for the first failing item unless
/// `continue_on_fail` is set.
pub async fn run_items(
    client: &AppflowyClient,
    items: &[Operation],
    continue_on_fail: bool,
) -> Result<Vec<Value>, ItemError> {
    let mut output = Vec::new();

    for (index, operation) in items.iter().enumerate() {
        match execute(client, operation).await {
            Ok(values) => output.extend(values),
            Err(error) if continue_on_fail => {
                tracing::warn!(
                    index,
                    operation = operation.name(),
                    error = %error,
                    "Item failed, continuing"
                );
                output.push(json!({ "error": error.to_string() }));
            }
            Err(error) => return Err(ItemError { index, error }),
        }
    }

    Ok(output)
}

fn to_items<T: serde::Serialize>(values: Vec<T>) -> Result<Vec<Value>, ApiError> {
    values
        .into_iter()
        .map(|value| {
            serde_json::to_value(value)
                .map_err(|e| ApiError::MalformedInput(format!("unserializable result: {e}")))
        })
        .collect()
}
