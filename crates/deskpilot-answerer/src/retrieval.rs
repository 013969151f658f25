// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Candidate selection: MMR diversification and keyword re-ranking.
//!
//! The index returns nearest-K by cosine similarity; MMR trades relevance
//! against redundancy among the kept chunks, then Reciprocal Rank Fusion
//! (k=60) merges the vector ranking with a keyword-overlap ranking so an
//! exact-term match is not buried by semantically-close boilerplate.

use std::collections::HashMap;

use deskpilot_core::traits::retrieval::{cosine_similarity, ScoredChunk};

/// RRF constant per research literature.
const RRF_K: f32 = 60.0;

/// Maximal Marginal Relevance selection.
///
/// Iteratively keeps the candidate maximising
/// `lambda * sim(query, d) - (1 - lambda) * max sim(d, kept)`.
/// Candidates without embeddings contribute zero redundancy and are scored
/// on relevance alone.
pub fn mmr_select(
    query_embedding: &[f32],
    candidates: &[ScoredChunk],
    lambda: f32,
    k: usize,
) -> Vec<ScoredChunk> {
    if candidates.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut remaining: Vec<&ScoredChunk> = candidates.iter().collect();
    let mut kept: Vec<ScoredChunk> = Vec::with_capacity(k.min(candidates.len()));

    while kept.len() < k && !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_score = f32::MIN;

        for (idx, candidate) in remaining.iter().enumerate() {
            let relevance = match &candidate.embedding {
                Some(embedding) => cosine_similarity(query_embedding, embedding),
                None => candidate.score,
            };
            let redundancy = kept
                .iter()
                .filter_map(|kept_chunk| {
                    match (&candidate.embedding, &kept_chunk.embedding) {
                        (Some(a), Some(b)) => Some(cosine_similarity(a, b)),
                        _ => None,
                    }
                })
                .fold(0.0f32, f32::max);
            let mmr = lambda * relevance - (1.0 - lambda) * redundancy;
            if mmr > best_score {
                best_score = mmr;
                best_idx = idx;
            }
        }

        kept.push(remaining.remove(best_idx).clone());
    }

    kept
}

/// Ranks chunks by query keyword overlap (terms of 3+ chars, lowercase).
///
/// Returns `(id, overlap)` pairs sorted descending; chunks with zero
/// overlap are omitted so they contribute nothing to the fusion.
pub fn keyword_rank(query: &str, chunks: &[ScoredChunk]) -> Vec<(String, usize)> {
    let terms: Vec<String> = query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(String::from)
        .collect();
    if terms.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<(String, usize)> = chunks
        .iter()
        .filter_map(|chunk| {
            let haystack = chunk.text.to_lowercase();
            let overlap = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
            (overlap > 0).then(|| (chunk.id.clone(), overlap))
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Reciprocal Rank Fusion: merge two ranked id lists into one ranking.
///
/// RRF score for document d = sum(1 / (k + rank_i)) over the lists
/// containing d, k = 60.
pub fn reciprocal_rank_fusion(
    vector_ranked: &[String],
    keyword_ranked: &[String],
) -> Vec<(String, f32)> {
    let mut scores: HashMap<String, f32> = HashMap::new();

    for (rank, id) in vector_ranked.iter().enumerate() {
        *scores.entry(id.clone()).or_insert(0.0) += 1.0 / (RRF_K + rank as f32 + 1.0);
    }
    for (rank, id) in keyword_ranked.iter().enumerate() {
        *scores.entry(id.clone()).or_insert(0.0) += 1.0 / (RRF_K + rank as f32 + 1.0);
    }

    let mut fused: Vec<(String, f32)> = scores.into_iter().collect();
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

/// Reorders `chunks` by fusing their vector ranking with keyword overlap.
pub fn rerank(query: &str, chunks: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
    if chunks.len() < 2 {
        return chunks;
    }

    let vector_ranked: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
    let keyword_ranked: Vec<String> = keyword_rank(query, &chunks)
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    let fused = reciprocal_rank_fusion(&vector_ranked, &keyword_ranked);

    let position: HashMap<&str, usize> = fused
        .iter()
        .enumerate()
        .map(|(i, (id, _))| (id.as_str(), i))
        .collect();

    let mut reordered = chunks;
    reordered.sort_by_key(|c| position.get(c.id.as_str()).copied().unwrap_or(usize::MAX));
    reordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskpilot_core::traits::retrieval::ChunkMetadata;

    fn chunk(id: &str, text: &str, score: f32, embedding: Option<Vec<f32>>) -> ScoredChunk {
        ScoredChunk {
            id: id.into(),
            text: text.into(),
            score,
            embedding,
            metadata: ChunkMetadata::default(),
        }
    }

    #[test]
    fn mmr_prefers_diverse_results() {
        let query = vec![1.0, 0.0];
        // a and b are duplicates; c is less relevant but distinct. MMR
        // should keep a then c, not the duplicate b.
        let candidates = vec![
            chunk("a", "", 0.0, Some(vec![1.0, 0.0])),
            chunk("b", "", 0.0, Some(vec![1.0, 0.0])),
            chunk("c", "", 0.0, Some(vec![0.7071, 0.7071])),
        ];
        let kept = mmr_select(&query, &candidates, 0.4, 2);
        let ids: Vec<&str> = kept.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn mmr_caps_at_k() {
        let query = vec![1.0];
        let candidates = vec![
            chunk("a", "", 0.9, Some(vec![1.0])),
            chunk("b", "", 0.8, Some(vec![0.9])),
        ];
        assert_eq!(mmr_select(&query, &candidates, 0.7, 1).len(), 1);
        assert_eq!(mmr_select(&query, &candidates, 0.7, 10).len(), 2);
        assert!(mmr_select(&query, &[], 0.7, 3).is_empty());
    }

    #[test]
    fn mmr_without_embeddings_falls_back_to_score_order() {
        let query = vec![1.0];
        let candidates = vec![
            chunk("low", "", 0.2, None),
            chunk("high", "", 0.9, None),
        ];
        let kept = mmr_select(&query, &candidates, 0.7, 1);
        assert_eq!(kept[0].id, "high");
    }

    #[test]
    fn keyword_rank_counts_overlap() {
        let chunks = vec![
            chunk("a", "SOC2 audits and SOC2 controls", 0.0, None),
            chunk("b", "general onboarding notes", 0.0, None),
            chunk("c", "SOC2 pricing for audits", 0.0, None),
        ];
        let ranked = keyword_rank("soc2 audits pricing", &chunks);
        assert_eq!(ranked[0].0, "c", "c matches all three terms");
        assert!(ranked.iter().all(|(id, _)| id != "b"));
    }

    #[test]
    fn rrf_doc_in_both_lists_wins() {
        let vector = vec!["d1".to_string(), "d2".to_string()];
        let keyword = vec!["d1".to_string(), "d3".to_string()];
        let fused = reciprocal_rank_fusion(&vector, &keyword);
        assert_eq!(fused[0].0, "d1");
        let expected = 2.0 / 61.0;
        assert!((fused[0].1 - expected).abs() < 0.001);
    }

    #[test]
    fn rerank_promotes_exact_term_match() {
        let chunks = vec![
            chunk("fluffy", "our platform is modern and helpful", 0.9, None),
            chunk("exact", "HIPAA safeguards: encryption and audit logs", 0.85, None),
        ];
        let reordered = rerank("hipaa encryption", chunks);
        assert_eq!(reordered[0].id, "exact");
    }

    #[test]
    fn rerank_single_chunk_is_identity() {
        let chunks = vec![chunk("only", "text", 0.5, None)];
        let reordered = rerank("query", chunks);
        assert_eq!(reordered.len(), 1);
        assert_eq!(reordered[0].id, "only");
    }
}
