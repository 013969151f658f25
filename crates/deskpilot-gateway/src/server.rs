// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, CORS, and shared state. Webhook routes verify
//! signatures in their handlers (the signature covers the raw body);
//! health, status, and metrics are public.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use deskpilot_core::DeskpilotError;
use deskpilot_engine::{Orchestrator, RelayHub};
use deskpilot_storage::SessionStore;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::handlers;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub orchestrator: Arc<Orchestrator>,
    pub relay: Arc<RelayHub>,
    pub store: SessionStore,
    /// Shared secret for `POST /user/events`. `None` skips verification.
    pub user_secret: Option<String>,
    /// Shared secret for the workspace webhooks. `None` skips verification.
    pub workspace_secret: Option<String>,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
    /// Optional metrics render hook (e.g. a Prometheus registry).
    pub metrics_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the gateway router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/user/events", post(handlers::post_user_events))
        .route("/workspace/events", post(handlers::post_workspace_events))
        .route("/workspace/actions", post(handlers::post_workspace_actions))
        .route("/health", get(handlers::get_health))
        .route("/status", get(handlers::get_status))
        .route("/metrics", get(handlers::get_metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds and serves the gateway until the process exits.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
) -> Result<(), DeskpilotError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DeskpilotError::Surface {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| DeskpilotError::Surface {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
