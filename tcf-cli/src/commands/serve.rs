//! HTTP server command

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;

use tcf_server::db::migrations;
use tcf_server::{run_server, AppConfig};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides config; default 127.0.0.1:3030)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Skip applying the schema before serving
    #[arg(long)]
    pub no_migrate: bool,
}

/// Run the HTTP server until Ctrl+C or SIGTERM.
pub async fn run_serve(args: ServeArgs, mut config: AppConfig) -> Result<()> {
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    config.cors_permissive |= args.cors_permissive;
    config
        .require_jwt_secret()
        .context("Set TCF_JWT_SECRET to the auth provider's signing secret")?;

    let pool = super::connect(&config).await?;
    if !args.no_migrate {
        migrations::run(&pool)
            .await
            .context("Failed to apply schema")?;
    }

    tracing::info!(bind = %config.bind, "starting tcf server");
    run_server(pool, config).await.context("Server error")?;
    Ok(())
}
