//! Row snapshots persisted between poll cycles.
//!
//! Two shapes exist because the API offers two different listings:
//!
//! - [`RowIdSnapshot`]: every row id of a database. There is no "created
//!   after" query, so new rows are found by diffing full id sets.
//! - [`UpdatedRowSnapshot`]: row id to last seen update time, limited to rows
//!   that changed recently. Entries are pruned once they are too old to show
//!   up in the next lookback window again.

use crate::model::RowUpdate;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Full set of row ids seen by the last poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowIdSnapshot {
    ids: Vec<String>,
}

impl RowIdSnapshot {
    /// Create a snapshot from the current listing.
    #[must_use]
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }

    /// Row ids in listing order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Ids in `current` that this snapshot does not contain.
    ///
    /// Keeps the order of `current` and reports each id once.
    #[must_use]
    pub fn added_in(&self, current: &[String]) -> Vec<String> {
        let known: HashSet<&str> = self.ids.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        current
            .iter()
            .filter(|id| !known.contains(id.as_str()) && seen.insert(id.as_str()))
            .cloned()
            .collect()
    }
}

/// Last known update time per recently changed row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdatedRowSnapshot {
    rows: BTreeMap<String, DateTime<Utc>>,
}

impl UpdatedRowSnapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stored update time of a row.
    #[must_use]
    pub fn get(&self, row_id: &str) -> Option<DateTime<Utc>> {
        self.rows.get(row_id).copied()
    }

    /// Ids of rows that are unknown or whose update time differs.
    ///
    /// Keeps the order of `updates` and reports each id once.
    #[must_use]
    pub fn changed(&self, updates: &[RowUpdate]) -> Vec<String> {
        let mut seen = HashSet::new();
        updates
            .iter()
            .filter(|update| self.get(&update.row_id) != Some(update.updated_at))
            .filter(|update| seen.insert(update.row_id.as_str()))
            .map(|update| update.row_id.clone())
            .collect()
    }

    /// Record the reported update time of every row in `updates`.
    pub fn upsert(&mut self, updates: &[RowUpdate]) {
        for update in updates {
            self.rows.insert(update.row_id.clone(), update.updated_at);
        }
    }

    /// Drop rows whose update time lies more than `horizon` before `now`.
    ///
    /// Returns the number of removed entries.
    pub fn prune(&mut self, now: DateTime<Utc>, horizon: Duration) -> usize {
        let before = self.rows.len();
        self.rows
            .retain(|_, updated_at| now.signed_duration_since(*updated_at) <= horizon);
        before - self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_557_600 + secs, 0).unwrap()
    }

    fn update(id: &str, secs: i64) -> RowUpdate {
        RowUpdate {
            row_id: id.to_string(),
            updated_at: at(secs),
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn added_ids_are_set_difference() {
        let snapshot = RowIdSnapshot::new(ids(&["a", "b"]));
        assert_eq!(snapshot.added_in(&ids(&["a", "b", "c"])), ids(&["c"]));
        assert!(snapshot.added_in(&ids(&["b"])).is_empty());
    }

    #[test]
    fn added_ids_keep_listing_order_without_duplicates() {
        let snapshot = RowIdSnapshot::new(ids(&["a"]));
        assert_eq!(
            snapshot.added_in(&ids(&["d", "a", "c", "d"])),
            ids(&["d", "c"])
        );
    }

    #[test]
    fn row_id_snapshot_serializes_as_plain_list() {
        let snapshot = RowIdSnapshot::new(ids(&["a", "b"]));
        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            serde_json::json!(["a", "b"])
        );
    }

    #[test]
    fn changed_detects_new_and_retimed_rows() {
        let mut snapshot = UpdatedRowSnapshot::new();
        snapshot.upsert(&[update("r1", 0), update("r3", 5)]);

        let changed = snapshot.changed(&[update("r1", 10), update("r2", 20), update("r3", 5)]);
        assert_eq!(changed, ids(&["r1", "r2"]));
    }

    #[test]
    fn upsert_overwrites_timestamps() {
        let mut snapshot = UpdatedRowSnapshot::new();
        snapshot.upsert(&[update("r1", 0)]);
        snapshot.upsert(&[update("r1", 30), update("r2", 40)]);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("r1"), Some(at(30)));
    }

    #[test]
    fn prune_removes_entries_older_than_horizon() {
        let mut snapshot = UpdatedRowSnapshot::new();
        snapshot.upsert(&[update("old", 0), update("edge", 60), update("fresh", 150)]);

        let removed = snapshot.prune(at(180), Duration::seconds(120));

        assert_eq!(removed, 1);
        assert!(snapshot.get("old").is_none());
        assert!(snapshot.get("edge").is_some());
        assert!(snapshot.get("fresh").is_some());
    }
}
