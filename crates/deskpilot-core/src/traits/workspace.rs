// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent-workspace transport contract.
//!
//! Covers the outbound half of the workspace integration: posting ticket
//! cards, editing them as the claim/close lifecycle advances, and writing
//! into ticket threads. Inbound button callbacks and thread replies arrive
//! through the gateway webhooks as typed events.

use async_trait::async_trait;

use crate::error::DeskpilotError;
use crate::types::TicketCard;

/// Contract for the team chat workspace where agents claim tickets.
#[async_trait]
pub trait WorkspaceTransport: Send + Sync {
    /// Posts a new ticket card and returns the workspace thread key.
    async fn post_ticket(&self, card: &TicketCard) -> Result<String, DeskpilotError>;

    /// Replaces the body and action set of an existing ticket card.
    async fn edit_ticket(
        &self,
        workspace_thread_key: &str,
        card: &TicketCard,
    ) -> Result<(), DeskpilotError>;

    /// Posts a message into a ticket thread, labeled with the author role
    /// (e.g. "User", "System").
    async fn post_thread_message(
        &self,
        workspace_thread_key: &str,
        text: &str,
        role_label: &str,
    ) -> Result<(), DeskpilotError>;

    /// Posts a message visible only to one agent (stale-claim notices).
    async fn post_ephemeral(
        &self,
        workspace_thread_key: &str,
        agent_id: &str,
        text: &str,
    ) -> Result<(), DeskpilotError>;
}
