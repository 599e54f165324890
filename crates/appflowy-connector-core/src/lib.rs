//! # AppFlowy Connector Core
//!
//! Shared building blocks for the AppFlowy connector.
//!
//! This crate provides:
//! - Typed views of the AppFlowy Cloud resources (workspaces, databases,
//!   fields, rows)
//! - The `StateStore` capability that holds per-node session tokens and
//!   poll snapshots between invocations
//! - Row snapshot shapes with the diffing and pruning rules used by the
//!   change poller

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod model;
pub mod snapshot;
pub mod state;

pub use model::{
    Database, DatabaseView, Envelope, Field, FieldType, RowDetail, RowRef, RowUpdate,
    SelectOption, SessionState, Workspace,
};
pub use snapshot::{RowIdSnapshot, UpdatedRowSnapshot};
pub use state::{keys, MemoryStateStore, StateStore, StateStoreExt, StoreError};
