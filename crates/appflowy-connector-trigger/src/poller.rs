//! AppFlowy polling-based change detection.

use appflowy_connector_client::{shape_rows, ApiError, RowOutput, RowSource};
use appflowy_connector_core::{
    keys, RowIdSnapshot, StateStore, StateStoreExt, StoreError, UpdatedRowSnapshot,
};
use chrono::{DateTime, Duration as TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Seconds subtracted from the cursor before asking for updated rows.
///
/// Update times reported by the API trail the actual write by up to a
/// minute.
pub const UPDATE_LOOKBACK_SECS: i64 = 60;

/// Seconds added to the time since the previous cycle before a remembered
/// update is forgotten.
pub const PRUNE_GRACE_SECS: i64 = 120;

/// Row change the trigger reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerEvent {
    /// A row was created
    #[default]
    #[serde(rename = "rowAddedToDatabase")]
    RowAdded,
    /// A row was modified
    #[serde(rename = "rowUpdatedInDatabase")]
    RowUpdated,
}

impl TriggerEvent {
    /// Event name as configured on the node.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RowAdded => "rowAddedToDatabase",
            Self::RowUpdated => "rowUpdatedInDatabase",
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerEvent {
    type Err = PollerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rowAddedToDatabase" => Ok(Self::RowAdded),
            "rowUpdatedInDatabase" => Ok(Self::RowUpdated),
            other => Err(PollerError::UnknownEvent(other.to_string())),
        }
    }
}

/// How a cycle was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Started by the user for testing
    Manual,
    /// Started by the poll timer
    Automatic,
}

/// Configuration for the change poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfig {
    /// Workspace holding the database
    pub workspace_id: String,
    /// Database to watch
    pub database_id: String,
    /// Event to detect
    pub event: TriggerEvent,
    /// Fetch the document body of emitted rows
    pub include_document_data: bool,
    /// Flatten emitted rows into `{id, ...cells}`
    pub simplify: bool,
    /// Pause between the end of one cycle and the start of the next
    pub poll_interval: Duration,
}

impl TriggerConfig {
    /// Configuration with defaults for everything but the database.
    #[must_use]
    pub fn new(workspace_id: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            database_id: database_id.into(),
            event: TriggerEvent::default(),
            include_document_data: false,
            simplify: true,
            poll_interval: Duration::from_secs(60),
        }
    }

    fn output(&self) -> RowOutput {
        RowOutput {
            include_document: self.include_document_data,
            simplify: self.simplify,
        }
    }
}

/// Polling-based change detector for one AppFlowy database.
pub struct ChangePoller {
    source: Arc<dyn RowSource>,
    store: Arc<dyn StateStore>,
    config: TriggerConfig,
}

impl ChangePoller {
    /// Create a poller that keeps its snapshots in `store`.
    #[must_use]
    pub fn new(
        source: Arc<dyn RowSource>,
        store: Arc<dyn StateStore>,
        config: TriggerConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// Start polling and return a channel of emitted rows.
    ///
    /// Cycles never overlap: the next one starts `poll_interval` after the
    /// previous one finished. A failed cycle is logged and polling goes on.
    #[must_use]
    pub fn start(self) -> mpsc::Receiver<Vec<Value>> {
        let (tx, rx) = mpsc::channel(100);
        let poll_interval = self.config.poll_interval;

        tokio::spawn(async move {
            loop {
                match self.poll_cycle(TriggerMode::Automatic, Utc::now()).await {
                    Ok(Some(rows)) => {
                        if tx.send(rows).await.is_err() {
                            tracing::warn!("Row receiver dropped, stopping poller");
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(
                            database_id = %self.config.database_id,
                            event = %self.config.event,
                            error = %e,
                            "Poll error"
                        );
                    }
                }

                tokio::time::sleep(poll_interval).await;
            }
        });

        rx
    }

    /// Run one cycle at `now`.
    ///
    /// Returns `None` when there is nothing to emit. Snapshots and the cursor
    /// are committed before row details are fetched, so a failed detail fetch
    /// drops that cycle's rows instead of emitting them twice later.
    ///
    /// # Errors
    ///
    /// Returns error if a listing, the detail fetch, or the state store
    /// fails.
    pub async fn poll_cycle(
        &self,
        mode: TriggerMode,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<Value>>, PollerError> {
        let row_ids = match self.config.event {
            TriggerEvent::RowAdded => self.added_rows(mode).await?,
            TriggerEvent::RowUpdated => self.updated_rows(now).await?,
        };

        if row_ids.is_empty() {
            return Ok(None);
        }

        tracing::info!(
            database_id = %self.config.database_id,
            event = %self.config.event,
            count = row_ids.len(),
            "Detected changed rows"
        );

        let output = self.config.output();
        let details = self
            .source
            .row_details(
                &self.config.workspace_id,
                &self.config.database_id,
                &row_ids,
                output.include_document,
            )
            .await?;

        let rows = shape_rows(details, output);
        Ok(if rows.is_empty() { None } else { Some(rows) })
    }

    /// Ids listed now but not in the previous cycle.
    async fn added_rows(&self, mode: TriggerMode) -> Result<Vec<String>, PollerError> {
        if mode == TriggerMode::Manual {
            tracing::debug!("Manual run cannot attribute new rows, skipping");
            return Ok(Vec::new());
        }

        let current: Vec<String> = self
            .source
            .list_rows(&self.config.workspace_id, &self.config.database_id)
            .await?
            .into_iter()
            .map(|row| row.id)
            .collect();

        let previous: Option<RowIdSnapshot> = self.store.load(keys::ROW_IDS)?;
        let added = match &previous {
            Some(previous) => previous.added_in(&current),
            None => {
                tracing::info!(rows = current.len(), "Recording baseline of row ids");
                Vec::new()
            }
        };

        self.store
            .save(keys::ROW_IDS, &RowIdSnapshot::new(current))?;

        Ok(added)
    }

    /// Ids updated since the previous cycle and not emitted for the same
    /// update time yet.
    async fn updated_rows(&self, now: DateTime<Utc>) -> Result<Vec<String>, PollerError> {
        let last_checked: DateTime<Utc> = self
            .store
            .load(keys::LAST_TIME_CHECKED)?
            .unwrap_or(now);
        self.store.save(keys::LAST_TIME_CHECKED, &now)?;

        let after = last_checked - TimeDelta::seconds(UPDATE_LOOKBACK_SECS);
        let updates = self
            .source
            .list_rows_updated_after(&self.config.workspace_id, &self.config.database_id, after)
            .await?;

        let mut snapshot: UpdatedRowSnapshot = self.store.load(keys::ROWS)?.unwrap_or_default();
        let changed = snapshot.changed(&updates);
        snapshot.upsert(&updates);

        let horizon =
            now.signed_duration_since(last_checked) + TimeDelta::seconds(PRUNE_GRACE_SECS);
        let pruned = snapshot.prune(now, horizon);
        if pruned > 0 {
            tracing::debug!(pruned, remaining = snapshot.len(), "Pruned remembered updates");
        }

        self.store.save(keys::ROWS, &snapshot)?;

        Ok(changed)
    }
}

/// Errors that can occur while polling.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PollerError {
    /// A request to AppFlowy failed
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Trigger state could not be read or written
    #[error("trigger state error: {0}")]
    State(#[from] StoreError),
    /// The configured event name is not known
    #[error("unknown trigger event '{0}'")]
    UnknownEvent(String),
}
