//! # AppFlowy Connector Client
//!
//! HTTP access to the AppFlowy Cloud API for workflow-automation hosts.
//!
//! ## Layers
//!
//! - [`Transport`]: one HTTP exchange, JSON in and out. [`ReqwestTransport`]
//!   is the production implementation.
//! - [`SessionManager`]: password-grant login with the tokens cached in the
//!   node's [`StateStore`](appflowy_connector_core::StateStore).
//! - [`ApiClient`]: authenticated calls with a single transparent
//!   re-authentication when the server answers 401.
//! - [`AppflowyClient`]: typed workspace, database, field, and row
//!   operations built on top of [`ApiClient`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cells;
pub mod client;
pub mod credentials;
pub mod error;
pub mod output;
pub mod paths;
pub mod resources;
pub mod runner;
pub mod session;
pub mod transport;

#[cfg(test)]
mod mock;

pub use cells::{parse_timezone, CellInput, CellValue, DateInput, RowData, RowWrite};
pub use client::ApiClient;
pub use credentials::{Credentials, DEFAULT_HOST};
pub use error::{ApiError, TransportError};
pub use output::{shape_rows, timezone_options, ResourceOption, RowOutput};
pub use resources::{AppflowyClient, RowFilter, RowListQuery, RowSource};
pub use runner::{execute, run_items, ItemError, Operation};
pub use session::SessionManager;
pub use transport::{ClientConfig, HttpRequest, ReqwestTransport, Transport};

pub use chrono_tz::Tz;
