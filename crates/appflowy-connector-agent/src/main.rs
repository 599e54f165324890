//! # AppFlowy Connector Agent
//!
//! Runs the AppFlowy row trigger as a standalone process.
//!
//! ## Architecture
//!
//! The agent wires three pieces together:
//! 1. **Client**: session-managed AppFlowy API access
//! 2. **Poller**: added/updated row detection on a fixed interval
//! 3. **Persistence**: `SQLite` node state scoped by trigger id, so session
//!    tokens and snapshots survive restarts
//!
//! Emitted rows are written to stdout as JSON lines; logs go to stderr.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;
mod persistence;
mod runtime;

pub use config::AgentConfig;
pub use runtime::Agent;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting AppFlowy connector agent"
    );

    let config = AgentConfig::from_env()?;

    let trigger_id = config.trigger_id.unwrap_or_else(|| {
        let id = Uuid::new_v4();
        tracing::warn!(
            %id,
            "APPFLOWY_TRIGGER_ID not set, state will not carry over to the next run"
        );
        id
    });

    tracing::info!(
        %trigger_id,
        database_id = %config.trigger.database_id,
        event = %config.trigger.event,
        "Trigger initialized"
    );

    let agent = Agent::new(config, trigger_id)?;
    agent.run().await?;

    Ok(())
}
