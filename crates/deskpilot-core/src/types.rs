// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Deskpilot workspace.
//!
//! Sessions, history messages, slot offers, intents, and the canonical
//! inbound events from the user surfaces and the agent workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::DeskpilotError;

/// End-user transport a conversation originates from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    /// Interactive web chat widget.
    WebChat,
    /// Public HTTP endpoint.
    PublicApi,
}

/// Identifies one end user across surfaces.
///
/// Two users with the same external id on different surfaces are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserKey {
    pub surface: Surface,
    pub external_user_id: String,
}

impl UserKey {
    pub fn new(surface: Surface, external_user_id: impl Into<String>) -> Self {
        Self {
            surface,
            external_user_id: external_user_id.into(),
        }
    }

    /// Canonical `surface:external_user_id` encoding used as the storage key
    /// and secondary index value.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.surface, self.external_user_id)
    }

    /// Parses the canonical encoding produced by [`storage_key`](Self::storage_key).
    pub fn from_storage_key(key: &str) -> Result<Self, DeskpilotError> {
        let (surface, user) = key.split_once(':').ok_or_else(|| {
            DeskpilotError::Internal(format!("malformed user key: {key}"))
        })?;
        let surface = surface.parse::<Surface>().map_err(|_| {
            DeskpilotError::Internal(format!("unknown surface in user key: {surface}"))
        })?;
        Ok(Self::new(surface, user))
    }
}

/// Lifecycle state of a session.
///
/// Transitions form a DAG: `ActiveAi -> EscalatedUnclaimed ->
/// EscalatedClaimed -> Closed`, plus the terminal shortcut
/// `ActiveAi -> Closed`. Nothing else is legal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    ActiveAi,
    EscalatedUnclaimed,
    EscalatedClaimed,
    Closed,
}

impl SessionState {
    /// States that count against the one-active-session-per-user invariant.
    pub fn is_active(self) -> bool {
        !matches!(self, SessionState::Closed)
    }

    /// True when the AI may not produce a reply in this state.
    ///
    /// Stored redundantly on the session row for fast gating; this is the
    /// derivation.
    pub fn ai_disabled(self) -> bool {
        matches!(self, SessionState::EscalatedClaimed | SessionState::Closed)
    }

    /// Whether `self -> to` is a legal transition.
    pub fn can_transition_to(self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (ActiveAi, EscalatedUnclaimed)
                | (EscalatedUnclaimed, EscalatedClaimed)
                | (EscalatedClaimed, Closed)
                | (ActiveAi, Closed)
        )
    }
}

/// Author of one history entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Ai,
    Agent,
    System,
}

/// Transport a history entry arrived through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    WebChat,
    PublicApi,
    /// Agent workspace thread.
    Workspace,
    /// Generated inside the dispatcher (AI replies, system lines).
    Dispatcher,
}

impl From<Surface> for Origin {
    fn from(surface: Surface) -> Self {
        match surface {
            Surface::WebChat => Origin::WebChat,
            Surface::PublicApi => Origin::PublicApi,
        }
    }
}

/// User intent reported by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    Information,
    Scheduling,
    TechnicalSupport,
    /// User picked one of the offered slots by its 1-based index.
    SlotSelection { index: u32 },
    Abusive,
    Unknown,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::Information => write!(f, "information"),
            Intent::Scheduling => write!(f, "scheduling"),
            Intent::TechnicalSupport => write!(f, "technical_support"),
            Intent::SlotSelection { index } => write!(f, "slot_selection({index})"),
            Intent::Abusive => write!(f, "abusive"),
            Intent::Unknown => write!(f, "unknown"),
        }
    }
}

/// A retrieval citation attached to an AI answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Knowledge-base section the evidence came from.
    pub section: String,
    /// Short preview of the cited chunk.
    pub preview: String,
}

/// One atomic turn recorded in a session's history.
///
/// History is append-only: corrections are new messages, never edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier_intent: Option<Intent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

impl SessionMessage {
    pub fn user(content: impl Into<String>, surface: Surface, at: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            at,
            origin: surface.into(),
            agent_display_name: None,
            confidence: None,
            classifier_intent: None,
            citations: Vec::new(),
        }
    }

    pub fn ai(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
            at,
            origin: Origin::Dispatcher,
            agent_display_name: None,
            confidence: None,
            classifier_intent: None,
            citations: Vec::new(),
        }
    }

    pub fn agent(
        content: impl Into<String>,
        agent_display_name: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
            at,
            origin: Origin::Workspace,
            agent_display_name: Some(agent_display_name.into()),
            confidence: None,
            classifier_intent: None,
            citations: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            at,
            origin: Origin::Dispatcher,
            agent_display_name: None,
            confidence: None,
            classifier_intent: None,
            citations: Vec::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.classifier_intent = Some(intent);
        self
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }
}

/// One presented scheduling option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotOffer {
    /// 1-based position in the prompt the user saw.
    pub offer_index: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Label of the timezone the slot was presented in (e.g. "EST").
    pub display_timezone: String,
}

/// One live (or archived) conversation between one user and the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_key: UserKey,
    /// User-side conversation identifier (thread / DM / web session).
    pub channel_key: String,
    /// Mirrored ticket thread once escalated.
    pub workspace_thread_key: Option<String>,
    pub state: SessionState,
    /// Non-null iff `state == EscalatedClaimed`.
    pub assigned_agent: Option<String>,
    /// Redundant with `state.ai_disabled()`; stored for fast gating.
    pub ai_disabled: bool,
    pub escalated_at: Option<DateTime<Utc>>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub escalation_reason: Option<String>,
    pub history: Vec<SessionMessage>,
    /// Offers attached to the last scheduling prompt; consumed on booking.
    pub pending_slots: Vec<SlotOffer>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// The last `n` history entries, oldest first.
    pub fn recent_history(&self, n: usize) -> &[SessionMessage] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Text of the most recent `k` AI turns, newest last.
    pub fn recent_ai_texts(&self, k: usize) -> Vec<&str> {
        let mut texts: Vec<&str> = self
            .history
            .iter()
            .rev()
            .filter(|m| m.role == Role::Ai)
            .take(k)
            .map(|m| m.content.as_str())
            .collect();
        texts.reverse();
        texts
    }

    /// How many of the last `window` user messages were classified abusive.
    pub fn abusive_count_in_window(&self, window: usize) -> usize {
        self.history
            .iter()
            .rev()
            .filter(|m| m.role == Role::User)
            .take(window)
            .filter(|m| matches!(m.classifier_intent, Some(Intent::Abusive)))
            .count()
    }

    /// Looks up a pending offer by its 1-based index.
    pub fn pending_slot(&self, index: u32) -> Option<&SlotOffer> {
        self.pending_slots.iter().find(|s| s.offer_index == index)
    }
}

/// Per-state session counts for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounts {
    pub active_ai: u64,
    pub escalated_unclaimed: u64,
    pub escalated_claimed: u64,
    pub closed: u64,
    pub total_messages: u64,
}

/// Canonical inbound event produced by the user-surface adapter.
///
/// Every surface normalises to this shape; nothing downstream knows
/// surface-specific payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEvent {
    pub user_key: UserKey,
    pub channel_key: String,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Ticket card buttons an agent can press.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketAction {
    Accept,
    Close,
}

/// Button callback from the agent workspace. Idempotent on `event_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceActionEvent {
    pub workspace_thread_key: String,
    pub agent_id: String,
    pub action: TicketAction,
    pub event_id: String,
}

/// Thread reply from the agent workspace. Idempotent on `event_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceReplyEvent {
    pub workspace_thread_key: String,
    pub agent_id: String,
    pub agent_name: String,
    pub text: String,
    pub event_id: String,
}

/// An action button rendered on a user surface or a ticket card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub label: String,
    pub payload: String,
}

/// The materialised view of a session posted to the agent workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketCard {
    /// One-line headline shown in the workspace channel.
    pub title: String,
    /// Rendered card body (reason + recent transcript).
    pub body: String,
    pub actions: Vec<ActionButton>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_key_storage_roundtrip() {
        let key = UserKey::new(Surface::WebChat, "U123");
        assert_eq!(key.storage_key(), "web_chat:U123");
        let parsed = UserKey::from_storage_key("web_chat:U123").unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn user_key_rejects_garbage() {
        assert!(UserKey::from_storage_key("no-separator").is_err());
        assert!(UserKey::from_storage_key("carrier_pigeon:U1").is_err());
    }

    #[test]
    fn state_transition_dag() {
        use SessionState::*;
        assert!(ActiveAi.can_transition_to(EscalatedUnclaimed));
        assert!(EscalatedUnclaimed.can_transition_to(EscalatedClaimed));
        assert!(EscalatedClaimed.can_transition_to(Closed));
        assert!(ActiveAi.can_transition_to(Closed));

        assert!(!Closed.can_transition_to(ActiveAi));
        assert!(!EscalatedClaimed.can_transition_to(EscalatedUnclaimed));
        assert!(!EscalatedUnclaimed.can_transition_to(ActiveAi));
        assert!(!ActiveAi.can_transition_to(EscalatedClaimed));
    }

    #[test]
    fn ai_disabled_derivation() {
        assert!(!SessionState::ActiveAi.ai_disabled());
        assert!(!SessionState::EscalatedUnclaimed.ai_disabled());
        assert!(SessionState::EscalatedClaimed.ai_disabled());
        assert!(SessionState::Closed.ai_disabled());
    }

    #[test]
    fn session_state_string_codes() {
        assert_eq!(SessionState::ActiveAi.to_string(), "active_ai");
        assert_eq!(
            "escalated_unclaimed".parse::<SessionState>().unwrap(),
            SessionState::EscalatedUnclaimed
        );
    }

    #[test]
    fn intent_serde_tagged() {
        let json = serde_json::to_string(&Intent::SlotSelection { index: 3 }).unwrap();
        assert!(json.contains("slot_selection"));
        let back: Intent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Intent::SlotSelection { index: 3 });
    }

    #[test]
    fn recent_ai_texts_ordering() {
        let now = Utc::now();
        let mut session = test_session(now);
        session.history = vec![
            SessionMessage::ai("first", now),
            SessionMessage::user("q", Surface::WebChat, now),
            SessionMessage::ai("second", now),
            SessionMessage::ai("third", now),
        ];
        assert_eq!(session.recent_ai_texts(2), vec!["second", "third"]);
    }

    #[test]
    fn abusive_count_only_counts_user_window() {
        let now = Utc::now();
        let mut session = test_session(now);
        session.history = vec![
            SessionMessage::user("rude", Surface::WebChat, now).with_intent(Intent::Abusive),
            SessionMessage::ai("please be kind", now),
            SessionMessage::user("fine", Surface::WebChat, now)
                .with_intent(Intent::Information),
            SessionMessage::user("rude again", Surface::WebChat, now)
                .with_intent(Intent::Abusive),
        ];
        assert_eq!(session.abusive_count_in_window(5), 2);
        assert_eq!(session.abusive_count_in_window(1), 1);
    }

    fn test_session(now: DateTime<Utc>) -> Session {
        Session {
            session_id: "s-1".into(),
            user_key: UserKey::new(Surface::WebChat, "U1"),
            channel_key: "chan-1".into(),
            workspace_thread_key: None,
            state: SessionState::ActiveAi,
            assigned_agent: None,
            ai_disabled: false,
            escalated_at: None,
            claimed_at: None,
            closed_at: None,
            escalation_reason: None,
            history: Vec::new(),
            pending_slots: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
