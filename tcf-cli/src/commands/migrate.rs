//! Schema command

use anyhow::{Context, Result};

use tcf_server::db::migrations;
use tcf_server::AppConfig;

/// Apply the schema. Safe to run repeatedly.
pub async fn run_migrate(config: AppConfig) -> Result<()> {
    let pool = super::connect(&config).await?;
    migrations::run(&pool)
        .await
        .context("Failed to apply schema")?;

    println!("Schema is up to date");
    Ok(())
}
