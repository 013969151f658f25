// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket card construction.
//!
//! Renders a session into the card agents see in the workspace: a one-line
//! title, the escalation reason, a bulleted transcript of the recent
//! exchanges, and the action set for the current lifecycle stage.
//! Formatting is deterministic for snapshot testing: no locale formatting,
//! no randomness.

use deskpilot_core::types::{ActionButton, Role, Session, SessionMessage, TicketAction};
use deskpilot_core::TicketCard;

const TITLE_SNIPPET_CHARS: usize = 60;
const TRANSCRIPT_MESSAGE_CHARS: usize = 200;

/// Builds ticket cards from sessions.
pub struct EscalationBuilder {
    /// How many recent history entries the card transcript shows.
    summary_exchanges: usize,
}

impl EscalationBuilder {
    pub fn new(summary_exchanges: usize) -> Self {
        Self { summary_exchanges }
    }

    /// The card for a fresh, unclaimed escalation: `[Accept] [Close]`.
    pub fn open_card(&self, session: &Session, reason: &str) -> TicketCard {
        TicketCard {
            title: self.title(session),
            body: self.body(session, reason, None),
            actions: vec![accept_button(), close_button()],
        }
    }

    /// The card after a successful claim: claimant shown, `[Close]` only.
    pub fn claimed_card(&self, session: &Session, agent_label: &str) -> TicketCard {
        let reason = session.escalation_reason.as_deref().unwrap_or("escalated");
        TicketCard {
            title: self.title(session),
            body: self.body(session, reason, Some(&format!("Claimed by {agent_label}"))),
            actions: vec![close_button()],
        }
    }

    /// The card after close: no actions remain.
    pub fn closed_card(&self, session: &Session) -> TicketCard {
        let reason = session.escalation_reason.as_deref().unwrap_or("escalated");
        TicketCard {
            title: self.title(session),
            body: self.body(session, reason, Some("Ticket closed")),
            actions: Vec::new(),
        }
    }

    fn title(&self, session: &Session) -> String {
        let trigger = session
            .history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| truncate(&m.content, TITLE_SNIPPET_CHARS))
            .unwrap_or_else(|| "(no message)".to_string());
        format!(
            "Support request from {}: {}",
            session.user_key.external_user_id, trigger
        )
    }

    fn body(&self, session: &Session, reason: &str, status_line: Option<&str>) -> String {
        let mut body = String::new();
        if let Some(status) = status_line {
            body.push_str(&format!("*{status}*\n\n"));
        }
        body.push_str(&format!("Reason: {reason}\n"));
        body.push_str(&format!("Session: {}\n\n", session.session_id));
        body.push_str("Recent conversation:\n");

        let recent = session.recent_history(self.summary_exchanges);
        if recent.is_empty() {
            body.push_str("- (no messages)\n");
        }
        for message in recent {
            body.push_str(&format!(
                "- {}: {}\n",
                role_label(message),
                truncate(&message.content, TRANSCRIPT_MESSAGE_CHARS)
            ));
        }
        body
    }
}

fn role_label(message: &SessionMessage) -> String {
    match message.role {
        Role::User => "Customer".to_string(),
        Role::Ai => "AI".to_string(),
        Role::Agent => match &message.agent_display_name {
            Some(name) => format!("Agent ({name})"),
            None => "Agent".to_string(),
        },
        Role::System => "System".to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

fn accept_button() -> ActionButton {
    ActionButton {
        label: "Accept".to_string(),
        payload: TicketAction::Accept.to_string(),
    }
}

fn close_button() -> ActionButton {
    ActionButton {
        label: "Close".to_string(),
        payload: TicketAction::Close.to_string(),
    }
}
