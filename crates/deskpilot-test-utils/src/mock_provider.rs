// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider with pre-scripted responses.
//!
//! Responses are popped from a FIFO queue. When the queue is empty, a
//! default "mock response" text is returned. An optional failure mode
//! makes every call error, for degradation tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use deskpilot_core::traits::provider::{Completion, CompletionRequest, TokenUsage};
use deskpilot_core::{DeskpilotError, LlmProvider};
use tokio::sync::Mutex;

/// A mock LLM provider that returns pre-configured responses in order.
pub struct ScriptedProvider {
    responses: Arc<Mutex<VecDeque<String>>>,
    failing: AtomicBool,
}

impl ScriptedProvider {
    /// Create a provider with an empty queue (every call returns the
    /// default text).
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            failing: AtomicBool::new(false),
        }
    }

    /// Create a provider pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            failing: AtomicBool::new(false),
        }
    }

    /// Queue another response.
    pub async fn push_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(text.into());
    }

    /// Toggle the failure mode: when set, every call errors.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, DeskpilotError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeskpilotError::Provider {
                message: "scripted failure".into(),
                source: None,
            });
        }
        let text = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock response".to_string());
        Ok(Completion {
            text,
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn responses_return_in_order_then_default() {
        let provider =
            ScriptedProvider::with_responses(vec!["first".into(), "second".into()]);
        let req = || CompletionRequest::new("q");
        assert_eq!(provider.complete(req()).await.unwrap().text, "first");
        assert_eq!(provider.complete(req()).await.unwrap().text, "second");
        assert_eq!(provider.complete(req()).await.unwrap().text, "mock response");
    }

    #[tokio::test]
    async fn failure_mode_errors() {
        let provider = ScriptedProvider::new();
        provider.set_failing(true);
        assert!(provider.complete(CompletionRequest::new("q")).await.is_err());
        provider.set_failing(false);
        assert!(provider.complete(CompletionRequest::new("q")).await.is_ok());
    }
}
