// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bidirectional relay between user surfaces and the agent workspace.
//!
//! The relay holds no state of its own: authority is consulted from the
//! session store on every event, and the CAS transition decides claim and
//! close races. Inbound workspace events are idempotent via the store's
//! event ledger.

use std::sync::Arc;

use chrono::Utc;
use deskpilot_core::types::{
    Session, SessionMessage, SessionState, TicketAction, WorkspaceActionEvent,
    WorkspaceReplyEvent,
};
use deskpilot_core::{DeskpilotError, UserSurface, WorkspaceTransport};
use deskpilot_storage::{SessionStore, TransitionFields};
use deskpilot_workspace::EscalationBuilder;
use tracing::{debug, info, warn};

pub const SPECIALIST_JOINED: &str = "A specialist has joined the conversation.";
pub const TICKET_CLOSED: &str =
    "This ticket has been closed. Send a new message any time to start over.";

/// Bridges user-surface and workspace traffic for escalated sessions.
pub struct RelayHub {
    store: SessionStore,
    workspace: Arc<dyn WorkspaceTransport>,
    surface: Arc<dyn UserSurface>,
    tickets: EscalationBuilder,
}

impl RelayHub {
    pub fn new(
        store: SessionStore,
        workspace: Arc<dyn WorkspaceTransport>,
        surface: Arc<dyn UserSurface>,
        tickets: EscalationBuilder,
    ) -> Self {
        Self {
            store,
            workspace,
            surface,
            tickets,
        }
    }

    /// Mirrors a user message into the session's workspace thread.
    ///
    /// Used for escalated sessions (claimed or not): the AI stays silent
    /// and agents see the message in the ticket thread.
    pub async fn mirror_user_message(
        &self,
        session: &Session,
        text: &str,
    ) -> Result<(), DeskpilotError> {
        let Some(thread_key) = session.workspace_thread_key.as_deref() else {
            warn!(
                session_id = %session.session_id,
                "escalated session has no workspace thread; message not mirrored"
            );
            return Ok(());
        };
        self.workspace
            .post_thread_message(thread_key, text, "User")
            .await
    }

    /// Handles a ticket button callback.
    pub async fn handle_action(&self, event: WorkspaceActionEvent) -> Result<(), DeskpilotError> {
        if !self
            .store
            .record_workspace_event(&event.workspace_thread_key, &event.event_id)
            .await?
        {
            debug!(
                thread_key = %event.workspace_thread_key,
                event_id = %event.event_id,
                "duplicate workspace action ignored"
            );
            return Ok(());
        }

        let Some(session) = self
            .store
            .get_by_workspace_thread(&event.workspace_thread_key)
            .await?
        else {
            warn!(
                thread_key = %event.workspace_thread_key,
                "action for unknown workspace thread dropped"
            );
            return Ok(());
        };

        match event.action {
            TicketAction::Accept => self.handle_accept(session, &event).await,
            TicketAction::Close => self.handle_close(session, &event).await,
        }
    }

    async fn handle_accept(
        &self,
        session: Session,
        event: &WorkspaceActionEvent,
    ) -> Result<(), DeskpilotError> {
        let transitioned = self
            .store
            .transition(
                &session.session_id,
                SessionState::EscalatedUnclaimed,
                SessionState::EscalatedClaimed,
                TransitionFields {
                    assigned_agent: Some(event.agent_id.clone()),
                    ..Default::default()
                },
            )
            .await;

        match transitioned {
            Ok(claimed) => {
                info!(
                    session_id = %claimed.session_id,
                    agent_id = %event.agent_id,
                    "ticket claimed"
                );
                let card = self.tickets.claimed_card(&claimed, &event.agent_id);
                self.workspace
                    .edit_ticket(&event.workspace_thread_key, &card)
                    .await?;
                self.system_line(&claimed, SPECIALIST_JOINED).await
            }
            Err(DeskpilotError::Stale { actual, .. }) => {
                // Losing claims get an ephemeral notice; the user sees
                // nothing.
                let notice = match actual {
                    SessionState::EscalatedClaimed => {
                        let claimant = self
                            .store
                            .get(&session.session_id)
                            .await?
                            .and_then(|s| s.assigned_agent)
                            .unwrap_or_else(|| "another agent".to_string());
                        format!("Already claimed by {claimant}.")
                    }
                    SessionState::Closed => "This ticket is already closed.".to_string(),
                    other => format!("Ticket is in state {other}."),
                };
                info!(
                    session_id = %session.session_id,
                    agent_id = %event.agent_id,
                    actual = %actual,
                    "stale claim"
                );
                self.workspace
                    .post_ephemeral(&event.workspace_thread_key, &event.agent_id, &notice)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    async fn handle_close(
        &self,
        session: Session,
        event: &WorkspaceActionEvent,
    ) -> Result<(), DeskpilotError> {
        match session.state {
            SessionState::EscalatedClaimed => {
                if session.assigned_agent.as_deref() != Some(event.agent_id.as_str()) {
                    return self
                        .workspace
                        .post_ephemeral(
                            &event.workspace_thread_key,
                            &event.agent_id,
                            "Only the assigned agent can close this ticket.",
                        )
                        .await;
                }
                let closed = self
                    .store
                    .transition(
                        &session.session_id,
                        SessionState::EscalatedClaimed,
                        SessionState::Closed,
                        TransitionFields::default(),
                    )
                    .await;
                match closed {
                    Ok(closed) => {
                        info!(session_id = %closed.session_id, "ticket closed");
                        let card = self.tickets.closed_card(&closed);
                        self.workspace
                            .edit_ticket(&event.workspace_thread_key, &card)
                            .await?;
                        self.system_line(&closed, TICKET_CLOSED).await
                    }
                    Err(DeskpilotError::Stale { actual, .. }) => {
                        info!(
                            session_id = %session.session_id,
                            actual = %actual,
                            "close raced, ignoring"
                        );
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            SessionState::EscalatedUnclaimed => {
                self.workspace
                    .post_ephemeral(
                        &event.workspace_thread_key,
                        &event.agent_id,
                        "Accept the ticket before closing it.",
                    )
                    .await
            }
            state => {
                info!(
                    session_id = %session.session_id,
                    state = %state,
                    "close on inactive ticket dropped"
                );
                Ok(())
            }
        }
    }

    /// Handles an agent's thread reply.
    pub async fn handle_reply(&self, event: WorkspaceReplyEvent) -> Result<(), DeskpilotError> {
        if !self
            .store
            .record_workspace_event(&event.workspace_thread_key, &event.event_id)
            .await?
        {
            debug!(
                thread_key = %event.workspace_thread_key,
                event_id = %event.event_id,
                "duplicate workspace reply ignored"
            );
            return Ok(());
        }

        let Some(session) = self
            .store
            .get_by_workspace_thread(&event.workspace_thread_key)
            .await?
        else {
            warn!(
                thread_key = %event.workspace_thread_key,
                "reply for unknown workspace thread dropped"
            );
            return Ok(());
        };

        match session.state {
            SessionState::EscalatedClaimed => {
                if session.assigned_agent.as_deref() != Some(event.agent_id.as_str()) {
                    // Side conversation from other agents stays internal.
                    info!(
                        session_id = %session.session_id,
                        author = %event.agent_id,
                        "thread reply from non-assignee kept internal"
                    );
                    return Ok(());
                }
                let message = SessionMessage::agent(
                    event.text.as_str(),
                    event.agent_name.as_str(),
                    Utc::now(),
                );
                self.store
                    .append_message(&session.session_id, message)
                    .await?;
                self.surface
                    .send_text(
                        &session.channel_key,
                        &format!("Agent ({}): {}", event.agent_name, event.text),
                    )
                    .await
            }
            SessionState::Closed => {
                info!(
                    session_id = %session.session_id,
                    author = %event.agent_id,
                    "reply into closed session dropped"
                );
                Ok(())
            }
            state => {
                // Thread chatter before a claim is not forwarded.
                info!(
                    session_id = %session.session_id,
                    state = %state,
                    "thread reply before claim kept internal"
                );
                Ok(())
            }
        }
    }

    /// Appends a system line to history and delivers it to the user.
    pub async fn system_line(
        &self,
        session: &Session,
        text: &str,
    ) -> Result<(), DeskpilotError> {
        self.store
            .append_message(&session.session_id, SessionMessage::system(text, Utc::now()))
            .await?;
        self.surface.send_text(&session.channel_key, text).await
    }
}
