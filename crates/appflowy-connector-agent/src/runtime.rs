//! Agent runtime orchestration.

use crate::config::AgentConfig;
use crate::persistence::SqliteStateStore;
use anyhow::{Context, Result};
use appflowy_connector_client::AppflowyClient;
use appflowy_connector_trigger::ChangePoller;
use serde_json::Value;
use std::io::Write;
use std::sync::Arc;
use uuid::Uuid;

/// The main agent runtime.
pub struct Agent {
    config: AgentConfig,
    store: Arc<SqliteStateStore>,
}

impl Agent {
    /// Create a new agent whose state is scoped to `trigger_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the state database cannot be opened.
    pub fn new(config: AgentConfig, trigger_id: Uuid) -> Result<Self> {
        let store = SqliteStateStore::open(&config.db_path, trigger_id.to_string())
            .with_context(|| {
                format!("Failed to open state database {}", config.db_path.display())
            })?;

        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    /// Run the poller until Ctrl+C or until it stops.
    ///
    /// # Errors
    ///
    /// Returns error if the client cannot be created or output cannot be
    /// written.
    pub async fn run(self) -> Result<()> {
        tracing::info!(scope = self.store.scope(), "Starting agent runtime");

        let client = AppflowyClient::new(
            self.config.credentials.clone(),
            &self.config.client,
            self.store.clone(),
        )
        .context("Failed to create AppFlowy client")?;

        let poller = ChangePoller::new(Arc::new(client), self.store.clone(), self.config.trigger);
        let mut rows = poller.start();

        tracing::info!("Agent running, press Ctrl+C to stop");

        loop {
            tokio::select! {
                emitted = rows.recv() => {
                    let Some(emitted) = emitted else {
                        tracing::warn!("Poller stopped");
                        break;
                    };
                    tracing::info!(count = emitted.len(), "Emitting rows");
                    write_rows(&emitted).context("Failed to write rows")?;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Write rows to stdout, one JSON document per line.
fn write_rows(rows: &[Value]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    for row in rows {
        serde_json::to_writer(&mut stdout, row)?;
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
