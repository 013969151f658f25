// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedder and vector index with canned results.

use async_trait::async_trait;
use deskpilot_core::traits::retrieval::{ChunkMetadata, ScoredChunk};
use deskpilot_core::{DeskpilotError, Embedder, VectorIndex};
use std::sync::Mutex;

/// Embedder returning a fixed vector for every input.
pub struct CannedEmbedder {
    embedding: Vec<f32>,
}

impl CannedEmbedder {
    pub fn new(embedding: Vec<f32>) -> Self {
        Self { embedding }
    }
}

impl Default for CannedEmbedder {
    fn default() -> Self {
        Self::new(vec![1.0, 0.0, 0.0])
    }
}

#[async_trait]
impl Embedder for CannedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, DeskpilotError> {
        Ok(self.embedding.clone())
    }
}

/// Vector index serving a fixed chunk list, replaceable mid-test.
pub struct CannedIndex {
    chunks: Mutex<Vec<ScoredChunk>>,
}

impl CannedIndex {
    pub fn new(chunks: Vec<ScoredChunk>) -> Self {
        Self {
            chunks: Mutex::new(chunks),
        }
    }

    /// Empty index (forces the no-evidence path).
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Replace the served chunks.
    pub fn set_chunks(&self, chunks: Vec<ScoredChunk>) {
        *self.chunks.lock().unwrap() = chunks;
    }

    /// Convenience constructor for one well-scored chunk.
    pub fn chunk(
        id: &str,
        section: &str,
        text: &str,
        score: f32,
        category: Option<&str>,
    ) -> ScoredChunk {
        ScoredChunk {
            id: id.to_string(),
            text: text.to_string(),
            score,
            embedding: Some(vec![score, 0.1, 0.0]),
            metadata: ChunkMetadata {
                section: section.to_string(),
                category: category.map(String::from),
                confidence_weight: 0.8,
            },
        }
    }
}

#[async_trait]
impl VectorIndex for CannedIndex {
    async fn query(
        &self,
        _embedding: &[f32],
        k: usize,
        _filter: Option<&str>,
    ) -> Result<Vec<ScoredChunk>, DeskpilotError> {
        Ok(self.chunks.lock().unwrap().iter().take(k).cloned().collect())
    }
}
