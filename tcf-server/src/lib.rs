//! tcf-server: HTTP API for the Top Care Fashion marketplace
//!
//! Postgres is the single source of truth. Order status changes, listing
//! flags and the order conversation move together in one transaction, and
//! the [`maintenance`] jobs repair rows that drifted outside the API.

pub mod auth;
pub mod config;
pub mod db;
pub mod http;
pub mod maintenance;

pub use config::{AppConfig, ConfigError};
pub use db::{create_pool, DbError};
pub use http::{build_router, run_server, ApiError, AppState, ServerError};
pub use maintenance::MaintenanceReport;
