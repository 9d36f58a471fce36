//! HTTP server setup and routing
//!
//! Axum server exposing the session control surface, the per-chunk
//! processing endpoints and the WebSocket stream.

use crate::api::stream::ConnectionRegistry;
use crate::config::Config;
use crate::engine::FeedbackEngine;
use axum::{
    routing::{get, post},
    Router,
};
use podium_common::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub engine: Arc<FeedbackEngine>,
    pub registry: Arc<ConnectionRegistry>,
    pub feedback_interval_ms: i64,
}

impl AppContext {
    pub fn new(engine: Arc<FeedbackEngine>, config: &Config) -> Self {
        Self {
            engine,
            registry: Arc::new(ConnectionRegistry::new()),
            feedback_interval_ms: config.feedback_interval_ms,
        }
    }
}

/// Build application router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Session control surface
        .route(
            "/api/v1/feedback/sessions/start",
            post(super::handlers::start_session),
        )
        .route(
            "/api/v1/feedback/sessions/:session_id/stop",
            post(super::handlers::stop_session),
        )
        // Non-streaming processing variants
        .route(
            "/api/v1/feedback/process-frame",
            post(super::handlers::process_frame),
        )
        .route(
            "/api/v1/feedback/process-audio",
            post(super::handlers::process_audio),
        )
        .route(
            "/api/v1/feedback/generate-feedback",
            post(super::handlers::generate_feedback),
        )
        // Bidirectional stream
        .route(
            "/api/v1/feedback/stream/:session_id",
            get(super::stream::ws_handler),
        )
        .with_state(ctx)
        // Enable CORS for browser clients
        .layer(CorsLayer::permissive())
}

/// Run the HTTP API server until the process exits
pub async fn run(config: &Config, ctx: AppContext) -> Result<()> {
    let app = build_router(ctx);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| Error::Config(format!("invalid bind address: {}", e)))?;
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Transport(format!("failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Transport(format!("server error: {}", e)))?;

    Ok(())
}
