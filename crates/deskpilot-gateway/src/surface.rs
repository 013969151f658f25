// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound user-surface delivery over a configured callback URL.
//!
//! The front-end's only contract is receiving text and, where supported,
//! action buttons. Deliveries are user-visible and therefore not
//! idempotent, so they never retry.

use async_trait::async_trait;
use deskpilot_core::types::ActionButton;
use deskpilot_core::{DeskpilotError, UserSurface};
use serde::Serialize;

/// HTTP implementation of [`UserSurface`].
#[derive(Debug, Clone)]
pub struct HttpUserSurface {
    client: reqwest::Client,
    callback_url: String,
}

#[derive(Serialize)]
struct TextPayload<'a> {
    channel_key: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct ActionsPayload<'a> {
    channel_key: &'a str,
    prompt_text: &'a str,
    actions: &'a [ActionButton],
}

impl HttpUserSurface {
    pub fn new(callback_url: impl Into<String>, api_token: Option<&str>) -> Result<Self, DeskpilotError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = api_token {
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| DeskpilotError::Config(format!("invalid surface API token: {e}")))?;
            headers.insert("authorization", value);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| DeskpilotError::Surface {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            callback_url: callback_url.into(),
        })
    }

    async fn post(
        &self,
        path: &str,
        payload: &impl Serialize,
    ) -> Result<(), DeskpilotError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.callback_url))
            .json(payload)
            .send()
            .await
            .map_err(|e| DeskpilotError::Surface {
                message: format!("surface delivery failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        if !response.status().is_success() {
            return Err(DeskpilotError::Surface {
                message: format!("surface returned {}", response.status()),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl UserSurface for HttpUserSurface {
    async fn send_text(&self, channel_key: &str, text: &str) -> Result<(), DeskpilotError> {
        self.post("messages", &TextPayload { channel_key, text }).await
    }

    async fn send_actions(
        &self,
        channel_key: &str,
        prompt_text: &str,
        actions: &[ActionButton],
    ) -> Result<(), DeskpilotError> {
        self.post(
            "actions",
            &ActionsPayload {
                channel_key,
                prompt_text,
                actions,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_text_posts_to_callback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_partial_json(serde_json::json!({
                "channel_key": "chan-1",
                "text": "hello"
            })))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let surface = HttpUserSurface::new(server.uri(), None).unwrap();
        surface.send_text("chan-1", "hello").await.unwrap();
    }

    #[tokio::test]
    async fn send_actions_posts_buttons() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/actions"))
            .and(body_partial_json(serde_json::json!({
                "actions": [{"label": "Option 1", "payload": "1"}]
            })))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let surface = HttpUserSurface::new(server.uri(), None).unwrap();
        surface
            .send_actions(
                "chan-1",
                "pick one",
                &[ActionButton {
                    label: "Option 1".into(),
                    payload: "1".into(),
                }],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn server_error_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let surface = HttpUserSurface::new(server.uri(), None).unwrap();
        let err = surface.send_text("chan-1", "hello").await.unwrap_err();
        assert!(matches!(err, DeskpilotError::Surface { .. }));
    }
}
