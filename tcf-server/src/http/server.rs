//! Axum server setup
//!
//! - Localhost-only CORS by default
//! - Request tracing and timeout
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use tcf_core::FreePromotionQuota;

use super::routes;
use crate::auth::TokenVerifier;
use crate::config::{AppConfig, ConfigError};

const LOCAL_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:8081",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:8081",
];

/// Shared application state
pub struct AppState {
    pub pool: PgPool,
    pub verifier: TokenVerifier,
    pub config: AppConfig,
    pub quota: FreePromotionQuota,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig) -> Result<Self, ConfigError> {
        let verifier = TokenVerifier::new(config.require_jwt_secret()?);
        Ok(Self {
            pool,
            verifier,
            config,
            quota: FreePromotionQuota::default(),
        })
    }
}

fn cors_layer(permissive: bool) -> CorsLayer {
    if permissive {
        tracing::warn!("CORS: permissive mode enabled - all origins allowed");
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(LOCAL_ORIGINS.map(HeaderValue::from_static))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the full API router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_permissive);
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .merge(routes::health::router())
        .merge(routes::auth::router())
        .merge(routes::listings::router())
        .merge(routes::likes::router())
        .merge(routes::users::router())
        .merge(routes::orders::router())
        .merge(routes::reviews::router())
        .merge(routes::reports::router())
        .merge(routes::conversations::router())
        .merge(routes::benefits::router())
        .merge(routes::pricing_plans::router())
        .merge(routes::admin::router())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Run the HTTP server until a shutdown signal arrives.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool(&database_url, 5).await?;
/// run_server(pool, AppConfig::load(None)?).await?;
/// ```
pub async fn run_server(pool: PgPool, config: AppConfig) -> Result<(), ServerError> {
    let bind = config.bind;
    let app = build_router(AppState::new(pool, config)?);

    let listener = TcpListener::bind(bind).await?;
    tracing::info!("Server listening on {}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn state_requires_jwt_secret() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/tcf_test")
            .unwrap();
        let err = AppState::new(pool, AppConfig::default()).err();
        assert!(matches!(err, Some(ConfigError::Missing("TCF_JWT_SECRET"))));
    }
}
