// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording user surface.

use std::sync::Mutex;

use async_trait::async_trait;
use deskpilot_core::types::ActionButton;
use deskpilot_core::{DeskpilotError, UserSurface};

/// One recorded outbound text.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedText {
    pub channel_key: String,
    pub text: String,
}

/// One recorded action prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedActions {
    pub channel_key: String,
    pub prompt_text: String,
    pub actions: Vec<ActionButton>,
}

/// User surface double that records instead of delivering.
#[derive(Default)]
pub struct RecordingSurface {
    texts: Mutex<Vec<RecordedText>>,
    actions: Mutex<Vec<RecordedActions>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> Vec<RecordedText> {
        self.texts.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<RecordedActions> {
        self.actions.lock().unwrap().clone()
    }

    /// Texts delivered to one channel, in order.
    pub fn texts_for(&self, channel_key: &str) -> Vec<String> {
        self.texts
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.channel_key == channel_key)
            .map(|t| t.text.clone())
            .collect()
    }
}

#[async_trait]
impl UserSurface for RecordingSurface {
    async fn send_text(&self, channel_key: &str, text: &str) -> Result<(), DeskpilotError> {
        self.texts.lock().unwrap().push(RecordedText {
            channel_key: channel_key.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_actions(
        &self,
        channel_key: &str,
        prompt_text: &str,
        actions: &[ActionButton],
    ) -> Result<(), DeskpilotError> {
        self.actions.lock().unwrap().push(RecordedActions {
            channel_key: channel_key.to_string(),
            prompt_text: prompt_text.to_string(),
            actions: actions.to_vec(),
        });
        Ok(())
    }
}
