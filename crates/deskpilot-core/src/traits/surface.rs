// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound user-surface contract.
//!
//! The only thing the dispatcher may assume about a surface front-end is
//! that it can receive text and, where supported, render action buttons.

use async_trait::async_trait;

use crate::error::DeskpilotError;
use crate::types::ActionButton;

/// Contract for delivering messages back to an end user.
#[async_trait]
pub trait UserSurface: Send + Sync {
    /// Sends plain text into the user-side conversation.
    async fn send_text(&self, channel_key: &str, text: &str) -> Result<(), DeskpilotError>;

    /// Sends a prompt with action buttons. Surfaces without button support
    /// render the prompt text alone.
    async fn send_actions(
        &self,
        channel_key: &str,
        prompt_text: &str,
        actions: &[ActionButton],
    ) -> Result<(), DeskpilotError>;
}
