//! HTTP layer
//!
//! Axum server with:
//! - Bearer/cookie authentication extractors
//! - CORS (localhost only by default)
//! - Request tracing and timeouts
//! - JSON error responses

pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, run_server, AppState, ServerError};
