// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `deskpilot serve`: wires the concrete collaborators into the engine
//! and runs the webhook gateway until interrupted.

use std::sync::Arc;
use std::time::Instant;

use deskpilot_answerer::{HttpEmbedder, HttpVectorIndex, RetrievalAnswerer};
use deskpilot_anthropic::AnthropicClient;
use deskpilot_classifier::IntentClassifier;
use deskpilot_config::DeskpilotConfig;
use deskpilot_core::{
    CalendarProvider, DeskpilotError, Embedder, LlmProvider, UserSurface, VectorIndex,
    WorkspaceTransport,
};
use deskpilot_engine::{Orchestrator, OrchestratorConfig, RelayHub};
use deskpilot_gateway::{start_server, GatewayState, HttpUserSurface, ServerConfig};
use deskpilot_scheduling::{BookingExecutor, HttpCalendar, SlotProvider};
use deskpilot_storage::SessionStore;
use deskpilot_workspace::{EscalationBuilder, HttpWorkspaceTransport};
use tracing::info;

fn require(value: Option<String>, key: &str) -> Result<String, DeskpilotError> {
    value.ok_or_else(|| DeskpilotError::Config(format!("{key} is required for serve")))
}

/// Builds the full dispatcher and serves webhooks until ctrl-c.
pub async fn run(config: DeskpilotConfig) -> Result<(), DeskpilotError> {
    let store = SessionStore::open(&config.storage.database_path).await?;

    let api_key = require(config.anthropic.api_key.clone(), "anthropic.api_key")?;
    let provider: Arc<dyn LlmProvider> = Arc::new(AnthropicClient::new(
        &api_key,
        &config.anthropic.api_version,
        &config.anthropic.model,
    )?);

    let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(require(
        config.retrieval.embedder_url.clone(),
        "retrieval.embedder_url",
    )?));
    let index: Arc<dyn VectorIndex> = Arc::new(HttpVectorIndex::new(require(
        config.retrieval.index_url.clone(),
        "retrieval.index_url",
    )?));

    let calendar: Arc<dyn CalendarProvider> = Arc::new(HttpCalendar::new(
        require(config.calendar.base_url.clone(), "calendar.base_url")?,
        config.calendar.api_token.as_deref(),
    )?);

    let workspace: Arc<dyn WorkspaceTransport> = Arc::new(HttpWorkspaceTransport::new(
        require(config.workspace.base_url.clone(), "workspace.base_url")?,
        config.workspace.channel.clone(),
        config.workspace.api_token.as_deref(),
    )?);

    let surface: Arc<dyn UserSurface> = Arc::new(HttpUserSurface::new(
        require(config.surface.callback_url.clone(), "surface.callback_url")?,
        config.surface.api_token.as_deref(),
    )?);

    let classifier = IntentClassifier::new(config.lexicons.clone(), provider.clone());
    let answerer = RetrievalAnswerer::new(
        embedder,
        index,
        provider,
        config.retrieval.clone(),
        config.confidence.low_confidence_ceil,
    );
    let slots = SlotProvider::new(calendar.clone(), config.scheduling.clone());
    let booking = BookingExecutor::new(calendar, config.scheduling.clone());

    let relay = Arc::new(RelayHub::new(
        store.clone(),
        workspace.clone(),
        surface.clone(),
        EscalationBuilder::new(config.escalation.summary_exchanges),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        classifier,
        answerer,
        slots,
        booking,
        relay.clone(),
        workspace,
        surface,
        EscalationBuilder::new(config.escalation.summary_exchanges),
        OrchestratorConfig::from_config(&config),
    ));

    let state = GatewayState {
        orchestrator,
        relay,
        store: store.clone(),
        user_secret: config.gateway.user_webhook_secret.clone(),
        workspace_secret: config.workspace.webhook_secret.clone(),
        start_time: Instant::now(),
        metrics_render: None,
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };

    tokio::select! {
        result = start_server(&server_config, state) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down");
            store.close().await
        }
    }
}
