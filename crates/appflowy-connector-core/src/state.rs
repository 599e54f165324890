//! Persistent key-value state scoped to a single node instance.
//!
//! The host keeps one store per configured node or trigger. Session tokens
//! and poll snapshots live here between invocations; a store is only ever
//! mutated by the cycles of its own instance, which never overlap.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Well-known keys written by the connector.
pub mod keys {
    /// Access and refresh token of the current session
    pub const SESSION: &str = "session";
    /// Row identifiers seen by the last "row added" poll
    pub const ROW_IDS: &str = "rowIds";
    /// Row id to last known update time, for "row updated" polls
    pub const ROWS: &str = "rows";
    /// UTC time of the last "row updated" poll
    pub const LAST_TIME_CHECKED: &str = "lastTimeChecked";
}

/// Key-value store holding arbitrary structured values.
pub trait StateStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be written.
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Typed access on top of [`StateStore`].
pub trait StateStoreExt: StateStore {
    /// Read and deserialize the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns error on backend failure or if the stored value has a
    /// different shape than `T`.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.get(key)?
            .map(|value| {
                serde_json::from_value(value)
                    .map_err(|e| StoreError::Serialization(format!("{key}: {e}")))
            })
            .transpose()
    }

    /// Serialize `value` and store it under `key`.
    ///
    /// # Errors
    ///
    /// Returns error on backend failure or if `value` cannot be serialized.
    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)
            .map_err(|e| StoreError::Serialization(format!("{key}: {e}")))?;
        self.set(key, value)
    }
}

impl<S: StateStore + ?Sized> StateStoreExt for S {}

/// In-process store, used for tests and for runs that need no persistence.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let values = self
            .values
            .lock()
            .map_err(|_| StoreError::Backend("state lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StoreError::Backend("state lock poisoned".to_string()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Errors that can occur with state stores.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The storage backend failed
    #[error("state backend error: {0}")]
    Backend(String),
    /// A stored value could not be (de)serialized
    #[error("state serialization error: {0}")]
    Serialization(String),
}
