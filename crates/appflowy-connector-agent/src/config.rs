//! Agent configuration.

use anyhow::{bail, Context, Result};
use appflowy_connector_client::{ClientConfig, Credentials, DEFAULT_HOST};
use appflowy_connector_trigger::TriggerConfig;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Trigger instance identifier, scoping persisted state
    pub trigger_id: Option<Uuid>,

    /// AppFlowy host and login
    pub credentials: Credentials,

    /// HTTP client settings
    pub client: ClientConfig,

    /// What to watch and how often
    pub trigger: TriggerConfig,

    /// `SQLite` database path
    pub db_path: PathBuf,
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `APPFLOWY_HOST`: AppFlowy Cloud URL (default `https://beta.appflowy.cloud`)
    /// - `APPFLOWY_USERNAME`, `APPFLOWY_PASSWORD`: login (required)
    /// - `APPFLOWY_WORKSPACE_ID`, `APPFLOWY_DATABASE_ID`: database to watch (required)
    /// - `APPFLOWY_EVENT`: `rowAddedToDatabase` or `rowUpdatedInDatabase`
    /// - `APPFLOWY_INCLUDE_DOC`: fetch row documents (default false)
    /// - `APPFLOWY_SIMPLIFY`: flatten rows (default true)
    /// - `APPFLOWY_POLL_INTERVAL_SECS`: seconds between cycles (default 60)
    /// - `APPFLOWY_STATE_DB`: `SQLite` path (default `./appflowy-connector.db`)
    /// - `APPFLOWY_TRIGGER_ID`: trigger UUID
    /// - `APPFLOWY_CA_CERT`: PEM CA bundle for self-hosted servers
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or a value is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable source.
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or a value is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .with_context(|| format!("{name} must be set"))
        };

        let host = lookup("APPFLOWY_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let credentials = Credentials::new(
            &host,
            required("APPFLOWY_USERNAME")?,
            required("APPFLOWY_PASSWORD")?,
        )
        .context("Invalid APPFLOWY_HOST")?;

        let client = ClientConfig {
            ca_cert_path: lookup("APPFLOWY_CA_CERT").map(PathBuf::from),
            ..ClientConfig::default()
        };

        let mut trigger = TriggerConfig::new(
            required("APPFLOWY_WORKSPACE_ID")?,
            required("APPFLOWY_DATABASE_ID")?,
        );

        if let Some(event) = lookup("APPFLOWY_EVENT") {
            trigger.event = event.parse().context("Invalid APPFLOWY_EVENT")?;
        }

        if let Some(value) = lookup("APPFLOWY_INCLUDE_DOC") {
            trigger.include_document_data =
                parse_bool(&value).context("Invalid APPFLOWY_INCLUDE_DOC")?;
        }

        if let Some(value) = lookup("APPFLOWY_SIMPLIFY") {
            trigger.simplify = parse_bool(&value).context("Invalid APPFLOWY_SIMPLIFY")?;
        }

        if let Some(value) = lookup("APPFLOWY_POLL_INTERVAL_SECS") {
            let secs: u64 = value
                .parse()
                .context("Invalid APPFLOWY_POLL_INTERVAL_SECS")?;
            if secs == 0 {
                bail!("APPFLOWY_POLL_INTERVAL_SECS must be positive");
            }
            trigger.poll_interval = Duration::from_secs(secs);
        }

        let trigger_id = lookup("APPFLOWY_TRIGGER_ID")
            .map(|id| Uuid::parse_str(&id).context("Invalid APPFLOWY_TRIGGER_ID"))
            .transpose()?;

        let db_path = lookup("APPFLOWY_STATE_DB")
            .map_or_else(|| PathBuf::from("./appflowy-connector.db"), PathBuf::from);

        Ok(Self {
            trigger_id,
            credentials,
            client,
            trigger,
            db_path,
        })
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => bail!("expected a boolean, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appflowy_connector_trigger::TriggerEvent;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const MINIMAL: [(&str, &str); 4] = [
        ("APPFLOWY_USERNAME", "user@example.com"),
        ("APPFLOWY_PASSWORD", "secret"),
        ("APPFLOWY_WORKSPACE_ID", "ws"),
        ("APPFLOWY_DATABASE_ID", "db"),
    ];

    #[test]
    fn defaults_apply() {
        let config = AgentConfig::from_lookup(lookup(&MINIMAL)).unwrap();

        assert_eq!(config.credentials.host(), DEFAULT_HOST);
        assert_eq!(config.trigger.event, TriggerEvent::RowAdded);
        assert!(!config.trigger.include_document_data);
        assert!(config.trigger.simplify);
        assert_eq!(config.trigger.poll_interval, Duration::from_secs(60));
        assert_eq!(config.db_path, PathBuf::from("./appflowy-connector.db"));
        assert!(config.trigger_id.is_none());
        assert!(config.client.ca_cert_path.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = MINIMAL.to_vec();
        vars.extend([
            ("APPFLOWY_HOST", "https://appflowy.internal/"),
            ("APPFLOWY_EVENT", "rowUpdatedInDatabase"),
            ("APPFLOWY_INCLUDE_DOC", "true"),
            ("APPFLOWY_SIMPLIFY", "0"),
            ("APPFLOWY_POLL_INTERVAL_SECS", "15"),
            ("APPFLOWY_STATE_DB", "/var/lib/appflowy/state.db"),
            ("APPFLOWY_TRIGGER_ID", "4b7d4f0e-9f5c-4d0b-8a53-3f1b2c7e9a10"),
            ("APPFLOWY_CA_CERT", "/etc/ssl/appflowy.pem"),
        ]);

        let config = AgentConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.credentials.host(), "https://appflowy.internal");
        assert_eq!(config.trigger.event, TriggerEvent::RowUpdated);
        assert!(config.trigger.include_document_data);
        assert!(!config.trigger.simplify);
        assert_eq!(config.trigger.poll_interval, Duration::from_secs(15));
        assert_eq!(config.db_path, PathBuf::from("/var/lib/appflowy/state.db"));
        assert!(config.trigger_id.is_some());
        assert_eq!(
            config.client.ca_cert_path,
            Some(PathBuf::from("/etc/ssl/appflowy.pem"))
        );
    }

    #[test]
    fn missing_password_is_reported() {
        let vars: Vec<_> = MINIMAL
            .iter()
            .copied()
            .filter(|(name, _)| *name != "APPFLOWY_PASSWORD")
            .collect();

        let err = AgentConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("APPFLOWY_PASSWORD"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (name, value) in [
            ("APPFLOWY_EVENT", "rowDeleted"),
            ("APPFLOWY_SIMPLIFY", "maybe"),
            ("APPFLOWY_POLL_INTERVAL_SECS", "0"),
            ("APPFLOWY_TRIGGER_ID", "not-a-uuid"),
            ("APPFLOWY_HOST", "ftp://appflowy.test"),
        ] {
            let mut vars = MINIMAL.to_vec();
            vars.push((name, value));
            assert!(
                AgentConfig::from_lookup(lookup(&vars)).is_err(),
                "{name}={value} should be rejected"
            );
        }
    }
}
