//! Command implementations for the tcf CLI

pub mod maintain;
pub mod migrate;
pub mod serve;

use anyhow::{Context, Result};
use tcf_server::db::PgPool;
use tcf_server::{create_pool, AppConfig};

pub use maintain::run_maintain;
pub use migrate::run_migrate;
pub use serve::run_serve;

/// Open the pool described by the loaded configuration.
pub(crate) async fn connect(config: &AppConfig) -> Result<PgPool> {
    let url = config
        .require_database_url()
        .context("Set DATABASE_URL in the environment, ~/.tcf/.env or the config file")?;
    create_pool(url, config.max_connections)
        .await
        .context("Failed to create database pool")
}
