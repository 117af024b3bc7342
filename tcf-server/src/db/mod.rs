//! Database layer - connection pool, schema and repositories
//!
//! - Connection pool, no `Arc<Mutex<Connection>>`
//! - Invariants the marketplace depends on are table constraints, so a bug
//!   in a handler fails loudly instead of writing bad rows
//! - Multi-row changes happen in one transaction

pub mod migrations;
pub mod pool;
pub mod repos;

pub use pool::create_pool;
pub use sqlx::PgPool;
pub use repos::*;
