// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording workspace transport.
//!
//! Records every outbound call so tests can assert on tickets, card
//! edits, thread messages, and ephemeral notices. Thread keys are
//! assigned sequentially ("thr-1", "thr-2", ...).

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use deskpilot_core::{DeskpilotError, TicketCard, WorkspaceTransport};

/// One recorded thread message.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedThreadMessage {
    pub thread_key: String,
    pub text: String,
    pub role_label: String,
}

/// One recorded ephemeral notice.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEphemeral {
    pub thread_key: String,
    pub agent_id: String,
    pub text: String,
}

/// Workspace transport double that records instead of sending.
#[derive(Default)]
pub struct RecordingWorkspace {
    tickets: Mutex<Vec<TicketCard>>,
    edits: Mutex<Vec<(String, TicketCard)>>,
    thread_messages: Mutex<Vec<RecordedThreadMessage>>,
    ephemerals: Mutex<Vec<RecordedEphemeral>>,
    next_thread: AtomicU32,
    failing: AtomicBool,
}

impl RecordingWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every call errors (escalation-failure tests).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn tickets(&self) -> Vec<TicketCard> {
        self.tickets.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<(String, TicketCard)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn thread_messages(&self) -> Vec<RecordedThreadMessage> {
        self.thread_messages.lock().unwrap().clone()
    }

    pub fn ephemerals(&self) -> Vec<RecordedEphemeral> {
        self.ephemerals.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), DeskpilotError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeskpilotError::Workspace {
                message: "workspace unreachable".into(),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl WorkspaceTransport for RecordingWorkspace {
    async fn post_ticket(&self, card: &TicketCard) -> Result<String, DeskpilotError> {
        self.check()?;
        let n = self.next_thread.fetch_add(1, Ordering::SeqCst) + 1;
        self.tickets.lock().unwrap().push(card.clone());
        Ok(format!("thr-{n}"))
    }

    async fn edit_ticket(
        &self,
        workspace_thread_key: &str,
        card: &TicketCard,
    ) -> Result<(), DeskpilotError> {
        self.check()?;
        self.edits
            .lock()
            .unwrap()
            .push((workspace_thread_key.to_string(), card.clone()));
        Ok(())
    }

    async fn post_thread_message(
        &self,
        workspace_thread_key: &str,
        text: &str,
        role_label: &str,
    ) -> Result<(), DeskpilotError> {
        self.check()?;
        self.thread_messages
            .lock()
            .unwrap()
            .push(RecordedThreadMessage {
                thread_key: workspace_thread_key.to_string(),
                text: text.to_string(),
                role_label: role_label.to_string(),
            });
        Ok(())
    }

    async fn post_ephemeral(
        &self,
        workspace_thread_key: &str,
        agent_id: &str,
        text: &str,
    ) -> Result<(), DeskpilotError> {
        self.check()?;
        self.ephemerals.lock().unwrap().push(RecordedEphemeral {
            thread_key: workspace_thread_key.to_string(),
            agent_id: agent_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}
