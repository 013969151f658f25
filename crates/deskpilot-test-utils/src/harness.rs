// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Full-world test harness.
//!
//! Wires the orchestrator and relay over a temp-file session store and
//! the recording/scripted mocks, so end-to-end scenarios run without any
//! network. The classifier runs pattern-only so the scripted provider
//! queue feeds answer generation exclusively.

use std::sync::Arc;

use chrono::Utc;
use deskpilot_answerer::RetrievalAnswerer;
use deskpilot_classifier::IntentClassifier;
use deskpilot_config::DeskpilotConfig;
use deskpilot_core::types::{Surface, UserEvent, UserKey};
use deskpilot_core::DeskpilotError;
use deskpilot_engine::{Orchestrator, OrchestratorConfig, RelayHub};
use deskpilot_scheduling::{BookingExecutor, SlotProvider};
use deskpilot_storage::SessionStore;
use deskpilot_workspace::EscalationBuilder;
use tempfile::TempDir;

use crate::mock_calendar::MockCalendar;
use crate::mock_provider::ScriptedProvider;
use crate::mock_retrieval::{CannedEmbedder, CannedIndex};
use crate::mock_surface::RecordingSurface;
use crate::mock_workspace::RecordingWorkspace;

/// Everything a scenario needs, with handles into each mock.
pub struct TestHarness {
    pub orchestrator: Orchestrator,
    pub relay: Arc<RelayHub>,
    pub store: SessionStore,
    pub surface: Arc<RecordingSurface>,
    pub workspace: Arc<RecordingWorkspace>,
    pub calendar: Arc<MockCalendar>,
    pub provider: Arc<ScriptedProvider>,
    pub index: Arc<CannedIndex>,
    pub config: DeskpilotConfig,
    _dir: TempDir,
}

impl TestHarness {
    /// Builds a harness with default configuration, an empty index, a
    /// free calendar, and an unscripted provider.
    pub async fn new() -> Self {
        let config = DeskpilotConfig::default();
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("harness.db");
        let store = SessionStore::open(db_path.to_str().expect("utf8 path"))
            .await
            .expect("open store");

        let surface = Arc::new(RecordingSurface::new());
        let workspace = Arc::new(RecordingWorkspace::new());
        let calendar = Arc::new(MockCalendar::new());
        let provider = Arc::new(ScriptedProvider::new());
        let index = Arc::new(CannedIndex::empty());

        let classifier = IntentClassifier::pattern_only(config.lexicons.clone());
        let answerer = RetrievalAnswerer::new(
            Arc::new(CannedEmbedder::default()),
            index.clone(),
            provider.clone(),
            config.retrieval.clone(),
            config.confidence.low_confidence_ceil,
        );
        let slots = SlotProvider::new(calendar.clone(), config.scheduling.clone());
        let booking = BookingExecutor::new(calendar.clone(), config.scheduling.clone());
        let tickets = EscalationBuilder::new(config.escalation.summary_exchanges);
        let relay = Arc::new(RelayHub::new(
            store.clone(),
            workspace.clone(),
            surface.clone(),
            EscalationBuilder::new(config.escalation.summary_exchanges),
        ));

        let orchestrator = Orchestrator::new(
            store.clone(),
            classifier,
            answerer,
            slots,
            booking,
            relay.clone(),
            workspace.clone(),
            surface.clone(),
            tickets,
            OrchestratorConfig::from_config(&config),
        );

        Self {
            orchestrator,
            relay,
            store,
            surface,
            workspace,
            calendar,
            provider,
            index,
            config,
            _dir: dir,
        }
    }

    /// The default test user.
    pub fn user_key() -> UserKey {
        UserKey::new(Surface::WebChat, "U-test")
    }

    /// The default user channel.
    pub fn channel() -> &'static str {
        "chan-test"
    }

    /// Builds a canonical event from the default user.
    pub fn user_event(text: &str) -> UserEvent {
        UserEvent {
            user_key: Self::user_key(),
            channel_key: Self::channel().to_string(),
            text: text.to_string(),
            at: Utc::now(),
        }
    }

    /// Sends one user message through the orchestrator.
    pub async fn send(&self, text: &str) -> Result<(), DeskpilotError> {
        self.orchestrator
            .handle_user_event(Self::user_event(text))
            .await
    }
}
