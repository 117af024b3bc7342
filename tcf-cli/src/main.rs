//! tcf CLI - Top Care Fashion marketplace server and maintenance tooling
//!
//! - `serve`: run the HTTP API
//! - `migrate`: apply the database schema
//! - `maintain`: reconcile listing flags, conversation timestamps and
//!   promotions with the orders and messages they derive from

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tcf_server::AppConfig;

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "tcf",
    author,
    version,
    about = "Top Care Fashion marketplace server",
    long_about = "Serve the secondhand fashion marketplace API and keep its data consistent. \
                  Configuration comes from ~/.tcf/config.toml, a .env file and the environment."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (default: ~/.tcf/config.toml)
    #[arg(long, global = true, env = "TCF_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Apply the database schema (idempotent)
    Migrate,
    /// Data consistency jobs (reconcile, verify-messages, expire-promotions)
    Maintain(commands::maintain::MaintainArgs),
}

/// Load `.env` from the working directory, then `~/.tcf/.env`.
/// Variables already in the environment win.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        if let Some(home) = dirs::home_dir() {
            let _ = dotenvy::from_path(home.join(".tcf").join(".env"));
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args, config).await?,
        Commands::Migrate => commands::run_migrate(config).await?,
        Commands::Maintain(args) => commands::run_maintain(args, config).await?,
    }
    Ok(())
}
