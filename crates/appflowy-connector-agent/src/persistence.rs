//! `SQLite` persistence layer.

use appflowy_connector_core::{StateStore, StoreError};
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// `SQLite`-backed node state, scoped to one trigger instance.
///
/// Several triggers may share a database file; each only sees the keys of
/// its own scope.
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
    scope: String,
}

impl SqliteStateStore {
    /// Open or create a `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns error if database cannot be opened or initialized.
    pub fn open(path: &Path, scope: impl Into<String>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(backend)?;
        Self::with_connection(conn, scope.into())
    }

    /// Create an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if database cannot be created.
    pub fn in_memory(scope: impl Into<String>) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Self::with_connection(conn, scope.into())
    }

    fn with_connection(conn: Connection, scope: String) -> Result<Self, StoreError> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS node_state (
                scope TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (scope, key)
            );
            ",
        )
        .map_err(backend)?;

        Ok(Self {
            conn: Mutex::new(conn),
            scope,
        })
    }

    /// Scope of this store.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("state connection lock poisoned".to_string()))
    }
}

impl StateStore for SqliteStateStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let text: Option<String> = self
            .conn()?
            .query_row(
                "SELECT value FROM node_state WHERE scope = ?1 AND key = ?2",
                (&self.scope, key),
                |row| row.get(0),
            )
            .optional()
            .map_err(backend)?;

        text.map(|text| {
            serde_json::from_str(&text).map_err(|e| StoreError::Serialization(e.to_string()))
        })
        .transpose()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let text =
            serde_json::to_string(&value).map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.conn()?
            .execute(
                r"
                INSERT OR REPLACE INTO node_state (scope, key, value, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ",
                (&self.scope, key, text, chrono::Utc::now().timestamp()),
            )
            .map_err(backend)?;

        tracing::trace!(scope = %self.scope, key, "Stored node state");
        Ok(())
    }
}

#[allow(clippy::needless_pass_by_value)]
fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use appflowy_connector_core::{keys, RowIdSnapshot, StateStoreExt};
    use serde_json::json;
    use tokio_test::assert_ok;

    #[test]
    fn sqlite_store_basic_operations() {
        let store = SqliteStateStore::in_memory("trigger-1").unwrap();

        assert!(store.get(keys::ROW_IDS).unwrap().is_none());

        assert_ok!(store.set(keys::ROW_IDS, json!(["a", "b"])));
        assert_eq!(store.get(keys::ROW_IDS).unwrap(), Some(json!(["a", "b"])));

        assert_ok!(store.set(keys::ROW_IDS, json!(["c"])));
        assert_eq!(store.get(keys::ROW_IDS).unwrap(), Some(json!(["c"])));
    }

    #[test]
    fn scopes_do_not_see_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        let first = SqliteStateStore::open(&path, "first").unwrap();
        let second = SqliteStateStore::open(&path, "second").unwrap();

        first.set(keys::LAST_TIME_CHECKED, json!("2024-05-01T10:00:00Z")).unwrap();

        assert!(second.get(keys::LAST_TIME_CHECKED).unwrap().is_none());
        assert_eq!(second.scope(), "second");
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");

        {
            let store = SqliteStateStore::open(&path, "trigger-1").unwrap();
            store
                .save(keys::ROW_IDS, &RowIdSnapshot::new(vec!["r1".to_string()]))
                .unwrap();
        }

        let store = SqliteStateStore::open(&path, "trigger-1").unwrap();
        let snapshot: RowIdSnapshot = store.load(keys::ROW_IDS).unwrap().unwrap();
        assert_eq!(snapshot.ids(), ["r1".to_string()].as_slice());
    }

    #[test]
    fn corrupt_value_is_serialization_error() {
        let store = SqliteStateStore::in_memory("trigger-1").unwrap();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO node_state (scope, key, value, updated_at) \
                 VALUES ('trigger-1', 'rows', '{oops', 0)",
                (),
            )
            .unwrap();

        assert!(matches!(
            store.get(keys::ROWS),
            Err(StoreError::Serialization(_))
        ));
    }
}
