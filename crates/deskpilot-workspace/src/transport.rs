// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the agent-workspace API.
//!
//! All four outbound calls (ticket post, card edit, thread message,
//! ephemeral) are idempotent on the workspace side, so transient failures
//! (429, 5xx) retry twice with exponential backoff and jitter.

use std::time::Duration;

use async_trait::async_trait;
use deskpilot_core::{DeskpilotError, TicketCard, WorkspaceTransport};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 2;
const BACKOFF_BASE_MS: u64 = 250;
const BACKOFF_JITTER: f64 = 0.25;

/// HTTP implementation of [`WorkspaceTransport`].
#[derive(Debug, Clone)]
pub struct HttpWorkspaceTransport {
    client: reqwest::Client,
    base_url: String,
    channel: String,
}

#[derive(Serialize)]
struct PostTicketRequest<'a> {
    channel: &'a str,
    #[serde(flatten)]
    card: &'a TicketCard,
}

#[derive(Deserialize)]
struct PostTicketResponse {
    thread_key: String,
}

#[derive(Serialize)]
struct ThreadMessageRequest<'a> {
    text: &'a str,
    role_label: &'a str,
}

#[derive(Serialize)]
struct EphemeralRequest<'a> {
    agent_id: &'a str,
    text: &'a str,
}

impl HttpWorkspaceTransport {
    pub fn new(
        base_url: impl Into<String>,
        channel: impl Into<String>,
        api_token: Option<&str>,
    ) -> Result<Self, DeskpilotError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = api_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                DeskpilotError::Config(format!("invalid workspace API token: {e}"))
            })?;
            headers.insert("authorization", value);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DeskpilotError::Workspace {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            channel: channel.into(),
        })
    }

    /// Posts `body` to `url`, retrying transient failures, and returns the
    /// response text.
    async fn post_with_retry(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<String, DeskpilotError> {
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, url, "retrying workspace call");
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(url).json(body).send().await {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(DeskpilotError::Workspace {
                        message: format!("workspace request failed: {e}"),
                        source: Some(Box::new(e)),
                    });
                    continue;
                }
            };

            let status = response.status();
            debug!(status = %status, attempt, url, "workspace response");

            if status.is_success() {
                return response.text().await.map_err(|e| DeskpilotError::Workspace {
                    message: format!("failed to read workspace response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let body_text = response.text().await.unwrap_or_default();
            let error = DeskpilotError::Workspace {
                message: format!("workspace returned {status}: {body_text}"),
                source: None,
            };
            if is_transient(status) {
                last_error = Some(error);
                continue;
            }
            return Err(error);
        }

        Err(last_error.unwrap_or_else(|| DeskpilotError::Workspace {
            message: "workspace call failed after retries".into(),
            source: None,
        }))
    }
}

fn is_transient(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

/// Exponential backoff with jitter: 250ms, 500ms, +/-25%.
fn backoff_delay(attempt: u32) -> Duration {
    let base = BACKOFF_BASE_MS as f64 * 2f64.powi(attempt as i32 - 1);
    let jitter_range = base * BACKOFF_JITTER;
    let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
    Duration::from_millis((base + jitter).max(1.0) as u64)
}

#[async_trait]
impl WorkspaceTransport for HttpWorkspaceTransport {
    async fn post_ticket(&self, card: &TicketCard) -> Result<String, DeskpilotError> {
        let url = format!("{}/tickets", self.base_url);
        let body = serde_json::to_value(PostTicketRequest {
            channel: &self.channel,
            card,
        })
        .map_err(|e| DeskpilotError::Internal(format!("ticket serialization: {e}")))?;

        let text = self.post_with_retry(&url, &body).await?;
        let parsed: PostTicketResponse =
            serde_json::from_str(&text).map_err(|e| DeskpilotError::Workspace {
                message: format!("malformed ticket response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(parsed.thread_key)
    }

    async fn edit_ticket(
        &self,
        workspace_thread_key: &str,
        card: &TicketCard,
    ) -> Result<(), DeskpilotError> {
        let url = format!("{}/tickets/{workspace_thread_key}", self.base_url);
        let body = serde_json::to_value(card)
            .map_err(|e| DeskpilotError::Internal(format!("card serialization: {e}")))?;
        self.post_with_retry(&url, &body).await?;
        Ok(())
    }

    async fn post_thread_message(
        &self,
        workspace_thread_key: &str,
        text: &str,
        role_label: &str,
    ) -> Result<(), DeskpilotError> {
        let url = format!("{}/threads/{workspace_thread_key}/messages", self.base_url);
        let body = serde_json::to_value(ThreadMessageRequest { text, role_label })
            .map_err(|e| DeskpilotError::Internal(format!("message serialization: {e}")))?;
        self.post_with_retry(&url, &body).await?;
        Ok(())
    }

    async fn post_ephemeral(
        &self,
        workspace_thread_key: &str,
        agent_id: &str,
        text: &str,
    ) -> Result<(), DeskpilotError> {
        let url = format!("{}/threads/{workspace_thread_key}/ephemeral", self.base_url);
        let body = serde_json::to_value(EphemeralRequest { agent_id, text })
            .map_err(|e| DeskpilotError::Internal(format!("ephemeral serialization: {e}")))?;
        self.post_with_retry(&url, &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskpilot_core::types::ActionButton;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn card() -> TicketCard {
        TicketCard {
            title: "Support request from U1: help".into(),
            body: "Reason: low confidence\n".into(),
            actions: vec![ActionButton {
                label: "Accept".into(),
                payload: "accept".into(),
            }],
        }
    }

    #[tokio::test]
    async fn post_ticket_returns_thread_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tickets"))
            .and(body_partial_json(
                serde_json::json!({"channel": "support-escalations"}),
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"thread_key": "thr-123"})),
            )
            .mount(&server)
            .await;

        let transport =
            HttpWorkspaceTransport::new(server.uri(), "support-escalations", None).unwrap();
        let thread_key = transport.post_ticket(&card()).await.unwrap();
        assert_eq!(thread_key, "thr-123");
    }

    #[tokio::test]
    async fn transient_failure_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tickets"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/tickets"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"thread_key": "thr-9"})),
            )
            .mount(&server)
            .await;

        let transport = HttpWorkspaceTransport::new(server.uri(), "ch", None).unwrap();
        let thread_key = transport.post_ticket(&card()).await.unwrap();
        assert_eq!(thread_key, "thr-9");
    }

    #[tokio::test]
    async fn exhausted_retries_fail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tickets"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3) // initial + 2 retries
            .mount(&server)
            .await;

        let transport = HttpWorkspaceTransport::new(server.uri(), "ch", None).unwrap();
        let err = transport.post_ticket(&card()).await.unwrap_err();
        assert!(matches!(err, DeskpilotError::Workspace { .. }));
    }

    #[tokio::test]
    async fn client_error_does_not_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tickets"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpWorkspaceTransport::new(server.uri(), "ch", None).unwrap();
        assert!(transport.post_ticket(&card()).await.is_err());
    }

    #[tokio::test]
    async fn bearer_token_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads/thr-1/messages"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let transport = HttpWorkspaceTransport::new(server.uri(), "ch", Some("tok-1")).unwrap();
        transport
            .post_thread_message("thr-1", "hello", "User")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ephemeral_posts_agent_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/threads/thr-1/ephemeral"))
            .and(body_partial_json(serde_json::json!({"agent_id": "A9"})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let transport = HttpWorkspaceTransport::new(server.uri(), "ch", None).unwrap();
        transport
            .post_ephemeral("thr-1", "A9", "Already claimed by Priya.")
            .await
            .unwrap();
    }

    #[test]
    fn backoff_grows_and_stays_positive() {
        for attempt in 1..=3 {
            let d = backoff_delay(attempt);
            assert!(d.as_millis() >= 1);
        }
    }
}
