//! HTTP hosting layer.
//!
//! Thin transport over `PredictionService`:
//! - `POST /predict`: validate + score one applicant
//! - `GET /health`: liveness and loaded-model info
//! - `GET /`: welcome message and endpoint listing
//!
//! The service is loaded before the listener binds, so a bad artifact never
//! serves traffic.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::app::PredictionService;
use crate::error::AppError;

/// Shared state accessible by all handlers.
pub type ApiState = Arc<PredictionService>;

/// Build the router with all routes.
pub fn build_router(state: ApiState, cors_origins: &[String]) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins = parse_origins(cors_origins);
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    handlers::routes()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Origins usable as header values; the rest are logged and skipped.
fn parse_origins(cors_origins: &[String]) -> Vec<HeaderValue> {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %o.escape_debug(), error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        warn!("no valid CORS origins configured; cross-origin requests will be refused");
    }
    origins
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: ApiState, addr: SocketAddr, cors_origins: &[String]) -> Result<(), AppError> {
    handlers::mark_started();
    let variant = state.variant();
    let app = build_router(state, cors_origins);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::new(4, format!("Failed to bind {addr}: {e}")))?;
    info!(%addr, variant = variant.as_str(), "serving predictions");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::new(4, format!("Server error: {e}")))?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
