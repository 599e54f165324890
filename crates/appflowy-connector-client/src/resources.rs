//! Workspace, database, field, and row operations.

use crate::cells::RowWrite;
use crate::client::ApiClient;
use crate::credentials::Credentials;
use crate::error::{ApiError, TransportError};
use crate::output::{
    database_options, field_options, select_value_options, shape_rows, workspace_options,
    ResourceOption, RowOutput,
};
use crate::paths;
use crate::transport::{ClientConfig, ReqwestTransport, Transport};
use appflowy_connector_core::{
    Database, Envelope, Field, RowDetail, RowRef, RowUpdate, StateStore, Workspace,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Which rows a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowFilter {
    /// Every row of the database
    #[default]
    All,
    /// Rows updated after the given time
    UpdatedAfter(DateTime<Utc>),
}

/// Parameters of [`AppflowyClient::get_all_rows`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowListQuery {
    /// Row selection
    pub filter: RowFilter,
    /// Maximum number of rows; `None` returns all
    pub limit: Option<usize>,
    /// Output shaping
    pub output: RowOutput,
}

/// Row listings and detail lookups used by the change poller.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Every row of a database.
    ///
    /// # Errors
    ///
    /// Returns error if the listing fails.
    async fn list_rows(&self, workspace_id: &str, database_id: &str)
        -> Result<Vec<RowRef>, ApiError>;

    /// Rows updated after `after`, with their update times.
    ///
    /// # Errors
    ///
    /// Returns error if the listing fails.
    async fn list_rows_updated_after(
        &self,
        workspace_id: &str,
        database_id: &str,
        after: DateTime<Utc>,
    ) -> Result<Vec<RowUpdate>, ApiError>;

    /// Details of a batch of rows in one request.
    ///
    /// # Errors
    ///
    /// Returns error if the lookup fails.
    async fn row_details(
        &self,
        workspace_id: &str,
        database_id: &str,
        row_ids: &[String],
        with_doc: bool,
    ) -> Result<Vec<RowDetail>, ApiError>;
}

/// Typed AppFlowy operations.
pub struct AppflowyClient {
    api: ApiClient,
    timezone: Tz,
}

impl AppflowyClient {
    /// Create a client using the reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(
        credentials: Credentials,
        config: &ClientConfig,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config)
            .map_err(|cause| ApiError::request("client init", cause))?;
        Ok(Self::with_transport(credentials, Arc::new(transport), store))
    }

    /// Create a client on top of any transport.
    #[must_use]
    pub fn with_transport(
        credentials: Credentials,
        transport: Arc<dyn Transport>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            api: ApiClient::new(credentials, transport, store),
            timezone: Tz::UTC,
        }
    }

    /// Read row dates that carry no timezone of their own in `timezone`
    /// (UTC unless set).
    #[must_use]
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// GET `path` and unwrap the `data` envelope.
    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T, ApiError> {
        let body = self.api.get(path, query).await?;
        decode_data(&format!("GET {path}"), body)
    }

    /// All workspaces of the account.
    ///
    /// # Errors
    ///
    /// Returns error on network or API errors.
    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>, ApiError> {
        tracing::debug!("GET workspaces");
        self.get_data(paths::WORKSPACES, Vec::new()).await
    }

    /// Databases of a workspace.
    ///
    /// # Errors
    ///
    /// Returns error on network or API errors.
    pub async fn list_databases(&self, workspace_id: &str) -> Result<Vec<Database>, ApiError> {
        tracing::debug!(workspace_id, "GET databases");
        self.get_data(&paths::databases(workspace_id), Vec::new())
            .await
    }

    /// Field definitions of a database.
    ///
    /// # Errors
    ///
    /// Returns error on network or API errors.
    pub async fn list_fields(
        &self,
        workspace_id: &str,
        database_id: &str,
    ) -> Result<Vec<Field>, ApiError> {
        tracing::debug!(workspace_id, database_id, "GET fields");
        self.get_data(&paths::fields(workspace_id, database_id), Vec::new())
            .await
    }

    /// Every row of a database.
    ///
    /// # Errors
    ///
    /// Returns error on network or API errors.
    pub async fn list_rows(
        &self,
        workspace_id: &str,
        database_id: &str,
    ) -> Result<Vec<RowRef>, ApiError> {
        tracing::debug!(workspace_id, database_id, "GET rows");
        self.get_data(&paths::rows(workspace_id, database_id), Vec::new())
            .await
    }

    /// Rows updated after `after`.
    ///
    /// # Errors
    ///
    /// Returns error on network or API errors.
    pub async fn list_rows_updated_after(
        &self,
        workspace_id: &str,
        database_id: &str,
        after: DateTime<Utc>,
    ) -> Result<Vec<RowUpdate>, ApiError> {
        let after = paths::format_after(after);
        tracing::debug!(workspace_id, database_id, after, "GET updated rows");
        self.get_data(
            &paths::rows_updated(workspace_id, database_id),
            vec![("after".to_string(), after)],
        )
        .await
    }

    /// Details of `row_ids`, fetched in a single request.
    ///
    /// An empty id list returns an empty result without a request.
    ///
    /// # Errors
    ///
    /// Returns error on network or API errors.
    pub async fn row_details(
        &self,
        workspace_id: &str,
        database_id: &str,
        row_ids: &[String],
        with_doc: bool,
    ) -> Result<Vec<RowDetail>, ApiError> {
        if row_ids.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(workspace_id, database_id, count = row_ids.len(), "GET row details");
        let mut query = vec![("ids".to_string(), paths::join_ids(row_ids))];
        if with_doc {
            query.push(("with_doc".to_string(), "true".to_string()));
        }
        self.get_data(&paths::row_detail(workspace_id, database_id), query)
            .await
    }

    /// Rows by id, shaped for output.
    ///
    /// # Errors
    ///
    /// Returns error on network or API errors.
    pub async fn get_rows(
        &self,
        workspace_id: &str,
        database_id: &str,
        row_ids: &[String],
        output: RowOutput,
    ) -> Result<Vec<Value>, ApiError> {
        let rows = self
            .row_details(workspace_id, database_id, row_ids, output.include_document)
            .await?;
        Ok(shape_rows(rows, output))
    }

    /// Rows of a database, optionally filtered and limited, shaped for
    /// output.
    ///
    /// Returns an empty list without a detail request when no rows match.
    ///
    /// # Errors
    ///
    /// Returns error on network or API errors.
    pub async fn get_all_rows(
        &self,
        workspace_id: &str,
        database_id: &str,
        query: &RowListQuery,
    ) -> Result<Vec<Value>, ApiError> {
        let mut row_ids: Vec<String> = match query.filter {
            RowFilter::All => self
                .list_rows(workspace_id, database_id)
                .await?
                .into_iter()
                .map(|row| row.id)
                .collect(),
            RowFilter::UpdatedAfter(after) => self
                .list_rows_updated_after(workspace_id, database_id, after)
                .await?
                .into_iter()
                .map(|row| row.row_id)
                .collect(),
        };

        if row_ids.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(limit) = query.limit {
            row_ids.truncate(limit);
        }

        self.get_rows(workspace_id, database_id, &row_ids, query.output)
            .await
    }

    /// Create a row.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MalformedInput`] before sending anything if the
    /// row data is invalid, otherwise network or API errors.
    pub async fn create_row(
        &self,
        workspace_id: &str,
        database_id: &str,
        row: &RowWrite,
    ) -> Result<Value, ApiError> {
        let body = row.to_body(None, self.timezone)?;
        tracing::debug!(workspace_id, database_id, "POST row");
        self.api
            .call(
                Method::POST,
                &paths::rows(workspace_id, database_id),
                Some(body),
                Vec::new(),
            )
            .await
    }

    /// Create or update the row identified by `pre_hash`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MalformedInput`] before sending anything if the
    /// row data is invalid, otherwise network or API errors.
    pub async fn upsert_row(
        &self,
        workspace_id: &str,
        database_id: &str,
        row: &RowWrite,
        pre_hash: &str,
    ) -> Result<Value, ApiError> {
        let body = row.to_body(Some(pre_hash), self.timezone)?;
        tracing::debug!(workspace_id, database_id, pre_hash, "PUT row");
        self.api
            .call(
                Method::PUT,
                &paths::rows(workspace_id, database_id),
                Some(body),
                Vec::new(),
            )
            .await
    }

    /// Workspaces for a selection list.
    ///
    /// # Errors
    ///
    /// Returns error on network or API errors.
    pub async fn workspace_options(&self) -> Result<Vec<ResourceOption>, ApiError> {
        Ok(workspace_options(&self.list_workspaces().await?))
    }

    /// Databases of a workspace for a selection list.
    ///
    /// # Errors
    ///
    /// Returns error on network or API errors.
    pub async fn database_options(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<ResourceOption>, ApiError> {
        Ok(database_options(&self.list_databases(workspace_id).await?))
    }

    /// Writable fields of a database for a selection list.
    ///
    /// # Errors
    ///
    /// Returns error on network or API errors.
    pub async fn field_options(
        &self,
        workspace_id: &str,
        database_id: &str,
    ) -> Result<Vec<ResourceOption>, ApiError> {
        Ok(field_options(
            &self.list_fields(workspace_id, database_id).await?,
        ))
    }

    /// Options of a select field for a selection list.
    ///
    /// # Errors
    ///
    /// Returns error on network or API errors.
    pub async fn select_value_options(
        &self,
        workspace_id: &str,
        database_id: &str,
        field_key: &str,
    ) -> Result<Vec<ResourceOption>, ApiError> {
        Ok(select_value_options(
            &self.list_fields(workspace_id, database_id).await?,
            field_key,
        ))
    }
}

#[async_trait]
impl RowSource for AppflowyClient {
    async fn list_rows(
        &self,
        workspace_id: &str,
        database_id: &str,
    ) -> Result<Vec<RowRef>, ApiError> {
        AppflowyClient::list_rows(self, workspace_id, database_id).await
    }

    async fn list_rows_updated_after(
        &self,
        workspace_id: &str,
        database_id: &str,
        after: DateTime<Utc>,
    ) -> Result<Vec<RowUpdate>, ApiError> {
        AppflowyClient::list_rows_updated_after(self, workspace_id, database_id, after).await
    }

    async fn row_details(
        &self,
        workspace_id: &str,
        database_id: &str,
        row_ids: &[String],
        with_doc: bool,
    ) -> Result<Vec<RowDetail>, ApiError> {
        AppflowyClient::row_details(self, workspace_id, database_id, row_ids, with_doc).await
    }
}

/// Unwrap the `data` envelope of a response.
fn decode_data<T: DeserializeOwned>(operation: &str, body: Value) -> Result<T, ApiError> {
    serde_json::from_value::<Envelope<T>>(body)
        .map(|envelope| envelope.data)
        .map_err(|e| ApiError::request(operation, TransportError::Decode(e.to_string())))
}
