// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP-backed implementations of the retrieval contracts.
//!
//! The embedding service and the vector index are external systems; these
//! thin clients speak their JSON APIs. Deadlines are applied by the
//! orchestrator, not here.

use async_trait::async_trait;
use deskpilot_core::traits::retrieval::ScoredChunk;
use deskpilot_core::{DeskpilotError, Embedder, VectorIndex};
use serde::{Deserialize, Serialize};

/// Client for a `POST {base}/embed` embedding service.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DeskpilotError> {
        let response = self
            .client
            .post(format!("{}/embed", self.base_url))
            .json(&EmbedRequest { text })
            .send()
            .await
            .map_err(|e| DeskpilotError::Vector {
                message: format!("embed request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            return Err(DeskpilotError::Vector {
                message: format!("embed service returned {}", response.status()),
                source: None,
            });
        }

        let body: EmbedResponse =
            response.json().await.map_err(|e| DeskpilotError::Vector {
                message: format!("malformed embed response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(body.embedding)
    }
}

/// Client for a `POST {base}/query` vector index.
#[derive(Debug, Clone)]
pub struct HttpVectorIndex {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    embedding: &'a [f32],
    k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    chunks: Vec<ScoredChunk>,
}

impl HttpVectorIndex {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&str>,
    ) -> Result<Vec<ScoredChunk>, DeskpilotError> {
        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&QueryRequest {
                embedding,
                k,
                filter,
            })
            .send()
            .await
            .map_err(|e| DeskpilotError::Vector {
                message: format!("index query failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            return Err(DeskpilotError::Vector {
                message: format!("vector index returned {}", response.status()),
                source: None,
            });
        }

        let body: QueryResponse =
            response.json().await.map_err(|e| DeskpilotError::Vector {
                message: format!("malformed index response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(body.chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn embedder_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embedding": [0.1, 0.2]})),
            )
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(server.uri());
        let embedding = embedder.embed("hello").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn embedder_maps_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(server.uri());
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, DeskpilotError::Vector { .. }));
    }

    #[tokio::test]
    async fn index_query_round_trip() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "chunks": [{
                "id": "c1",
                "text": "SOC2 overview",
                "score": 0.82,
                "metadata": {"section": "Compliance", "category": "compliance"}
            }]
        });
        Mock::given(method("POST"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let index = HttpVectorIndex::new(server.uri());
        let chunks = index.query(&[0.1], 5, None).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "c1");
        assert_eq!(chunks[0].metadata.category.as_deref(), Some("compliance"));
    }
}
