// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP-backed calendar provider.
//!
//! Speaks a small JSON API over the external calendar service:
//! `POST {base}/freebusy` and `POST {base}/events`. Deadlines are applied
//! by the orchestrator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deskpilot_core::traits::calendar::{CalendarEvent, EventRequest, TimeWindow};
use deskpilot_core::{CalendarProvider, DeskpilotError};
use serde::{Deserialize, Serialize};

/// Client for the calendar service.
#[derive(Debug, Clone)]
pub struct HttpCalendar {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct FreebusyRequest {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct FreebusyResponse {
    busy: Vec<BusyPeriod>,
}

#[derive(Deserialize)]
struct BusyPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl HttpCalendar {
    pub fn new(base_url: impl Into<String>, api_token: Option<&str>) -> Result<Self, DeskpilotError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = api_token {
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| DeskpilotError::Config(format!("invalid calendar API token: {e}")))?;
            headers.insert("authorization", value);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| DeskpilotError::Calendar {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        payload: &impl Serialize,
    ) -> Result<T, DeskpilotError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .json(payload)
            .send()
            .await
            .map_err(|e| DeskpilotError::Calendar {
                message: format!("calendar request failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        if !response.status().is_success() {
            return Err(DeskpilotError::Calendar {
                message: format!("calendar returned {}", response.status()),
                source: None,
            });
        }
        response.json().await.map_err(|e| DeskpilotError::Calendar {
            message: format!("malformed calendar response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl CalendarProvider for HttpCalendar {
    async fn freebusy(&self, window: TimeWindow) -> Result<Vec<TimeWindow>, DeskpilotError> {
        let response: FreebusyResponse = self
            .post_json(
                "freebusy",
                &FreebusyRequest {
                    start: window.start,
                    end: window.end,
                },
            )
            .await?;
        Ok(response
            .busy
            .into_iter()
            .map(|b| TimeWindow::new(b.start, b.end))
            .collect())
    }

    async fn create_event(&self, request: EventRequest) -> Result<CalendarEvent, DeskpilotError> {
        self.post_json("events", &request).await
    }
}
