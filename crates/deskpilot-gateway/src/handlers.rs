// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook handlers.
//!
//! Each inbound route verifies the HMAC signature over the raw body
//! before anything is parsed, normalises the payload into the canonical
//! event types, and dispatches to the orchestrator or the relay.
//! Signature failures return 401 and never touch state.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use deskpilot_core::types::{Surface, TicketAction, UserEvent, UserKey};
use deskpilot_core::{WorkspaceActionEvent, WorkspaceReplyEvent};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::server::GatewayState;

pub const SIGNATURE_HEADER: &str = "x-deskpilot-signature";
pub const TIMESTAMP_HEADER: &str = "x-deskpilot-timestamp";

/// Body of `POST /user/events`.
#[derive(Debug, Deserialize)]
pub struct UserEventBody {
    pub surface: Surface,
    pub external_user_id: String,
    pub channel_key: String,
    pub text: String,
    /// RFC 3339; defaults to receipt time when omitted.
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

/// Body of `POST /workspace/actions`.
#[derive(Debug, Deserialize)]
pub struct WorkspaceActionBody {
    pub workspace_thread_key: String,
    pub agent_id: String,
    pub action: TicketAction,
    pub event_id: String,
}

/// Body of `POST /workspace/events`.
#[derive(Debug, Deserialize)]
pub struct WorkspaceReplyBody {
    pub workspace_thread_key: String,
    pub agent_id: String,
    #[serde(default)]
    pub agent_name: Option<String>,
    pub text: String,
    pub event_id: String,
}

#[derive(Debug, Serialize)]
struct AcceptedResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Normalises a surface payload into the canonical event. No business
/// logic lives here.
pub fn normalize_user_event(body: UserEventBody, received_at: DateTime<Utc>) -> UserEvent {
    UserEvent {
        user_key: UserKey::new(body.surface, body.external_user_id),
        channel_key: body.channel_key,
        text: body.text,
        at: body.at.unwrap_or(received_at),
    }
}

/// Checks the signature headers against a configured secret. With no
/// secret configured, verification is skipped (local development).
fn verify_signature(secret: Option<&str>, headers: &HeaderMap, body: &str) -> bool {
    let Some(secret) = secret else {
        return true;
    };
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let (Some(timestamp), Some(signature)) =
        (header(TIMESTAMP_HEADER), header(SIGNATURE_HEADER))
    else {
        return false;
    };
    deskpilot_workspace::signature::verify(
        secret,
        timestamp,
        body,
        signature,
        Utc::now().timestamp(),
    )
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "invalid signature".to_string(),
        }),
    )
        .into_response()
}

fn bad_request(detail: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: detail })).into_response()
}

fn accepted() -> Response {
    (StatusCode::OK, Json(AcceptedResponse { status: "accepted" })).into_response()
}

fn failed() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "processing failed".to_string(),
        }),
    )
        .into_response()
}

/// `POST /user/events` -- user-surface messages.
pub async fn post_user_events(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !verify_signature(state.user_secret.as_deref(), &headers, &body) {
        warn!("rejected user event with bad signature");
        return unauthorized();
    }
    let parsed: UserEventBody = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(e) => return bad_request(format!("malformed user event: {e}")),
    };
    let event = normalize_user_event(parsed, Utc::now());

    match state.orchestrator.handle_user_event(event).await {
        Ok(()) => accepted(),
        Err(e) => {
            warn!(error = %e, "user event processing failed");
            failed()
        }
    }
}

/// `POST /workspace/actions` -- ticket button callbacks.
pub async fn post_workspace_actions(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !verify_signature(state.workspace_secret.as_deref(), &headers, &body) {
        warn!("rejected workspace action with bad signature");
        return unauthorized();
    }
    let parsed: WorkspaceActionBody = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(e) => return bad_request(format!("malformed workspace action: {e}")),
    };
    let event = WorkspaceActionEvent {
        workspace_thread_key: parsed.workspace_thread_key,
        agent_id: parsed.agent_id,
        action: parsed.action,
        event_id: parsed.event_id,
    };

    match state.relay.handle_action(event).await {
        Ok(()) => accepted(),
        Err(e) => {
            warn!(error = %e, "workspace action processing failed");
            failed()
        }
    }
}

/// `POST /workspace/events` -- ticket thread replies.
pub async fn post_workspace_events(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if !verify_signature(state.workspace_secret.as_deref(), &headers, &body) {
        warn!("rejected workspace reply with bad signature");
        return unauthorized();
    }
    let parsed: WorkspaceReplyBody = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(e) => return bad_request(format!("malformed workspace reply: {e}")),
    };
    let agent_name = parsed.agent_name.unwrap_or_else(|| parsed.agent_id.clone());
    let event = WorkspaceReplyEvent {
        workspace_thread_key: parsed.workspace_thread_key,
        agent_id: parsed.agent_id,
        agent_name,
        text: parsed.text,
        event_id: parsed.event_id,
    };

    match state.relay.handle_reply(event).await {
        Ok(()) => accepted(),
        Err(e) => {
            warn!(error = %e, "workspace reply processing failed");
            failed()
        }
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// `GET /health` -- unauthenticated liveness.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// `GET /status` -- session counts from the store.
pub async fn get_status(State(state): State<GatewayState>) -> Response {
    match state.store.stats().await {
        Ok(counts) => (StatusCode::OK, Json(counts)).into_response(),
        Err(e) => {
            warn!(error = %e, "stats query failed");
            failed()
        }
    }
}

/// `GET /metrics` -- renders via the pluggable hook, or an empty body.
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    let body = state
        .metrics_render
        .as_ref()
        .map(|render| render())
        .unwrap_or_default();
    info!(bytes = body.len(), "metrics scraped");
    (StatusCode::OK, body).into_response()
}
