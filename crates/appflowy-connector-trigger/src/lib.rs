//! # AppFlowy Connector Trigger
//!
//! Polling-based change detection for AppFlowy databases.
//!
//! ## Events
//!
//! - `rowAddedToDatabase`: AppFlowy has no "created after" query, so every
//!   cycle lists all row ids and diffs them against the ids of the previous
//!   cycle. The first automatic cycle only records a baseline.
//! - `rowUpdatedInDatabase`: every cycle asks for rows updated since the
//!   previous cycle, shifted back by a lookback window, and remembers recent
//!   update times to avoid emitting the same change twice.
//!
//! Snapshots and the cursor live in the trigger's
//! [`StateStore`](appflowy_connector_core::StateStore), so a restarted
//! trigger resumes from its last committed cycle.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod poller;

pub use poller::{
    ChangePoller, PollerError, TriggerConfig, TriggerEvent, TriggerMode, PRUNE_GRACE_SECS,
    UPDATE_LOOKBACK_SECS,
};
