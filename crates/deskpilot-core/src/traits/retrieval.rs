// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding and vector-index contracts backing retrieval-augmented answers.
//!
//! The index itself (and the pipeline that populates it) is external; the
//! answerer only queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DeskpilotError;

/// Contract for the query-embedding model.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DeskpilotError>;
}

/// Metadata attached to an indexed chunk at ingestion time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Knowledge-base section the chunk belongs to.
    pub section: String,
    /// Content category (e.g. "compliance", "pricing", "legal").
    #[serde(default)]
    pub category: Option<String>,
    /// Ingestion-time quality weight in [0, 1].
    #[serde(default = "default_confidence_weight")]
    pub confidence_weight: f32,
}

fn default_confidence_weight() -> f32 {
    0.5
}

/// One nearest-neighbour hit from the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    /// Cosine similarity against the query embedding.
    pub score: f32,
    /// Chunk embedding when the index returns it (used for MMR).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub metadata: ChunkMetadata,
}

/// Contract for the vector similarity index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Nearest-`k` lookup, optionally filtered by category.
    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&str>,
    ) -> Result<Vec<ScoredChunk>, DeskpilotError>;
}

/// Cosine similarity between two equal-length vectors.
///
/// Returns 0.0 for mismatched lengths or zero-magnitude inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![0.5, 0.5, 0.7];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_lengths_is_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn cosine_zero_magnitude_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
