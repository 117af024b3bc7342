//! Tracing setup for the tcf CLI
//!
//! Usage:
//!   tcf --debug ...              # Debug logging to console
//!   RUST_LOG=tcf_server=debug tcf # Fine-grained log control

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Debug level unless RUST_LOG is set
    pub debug: bool,
}

/// Filter used when RUST_LOG is absent.
fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info,sqlx=warn"
    }
}

pub fn init(config: &TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config.debug)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_sqlx_by_default() {
        assert_eq!(default_directive(false), "info,sqlx=warn");
        assert_eq!(default_directive(true), "debug");
    }
}
