// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The retrieval answerer.
//!
//! embed -> nearest-K -> MMR -> keyword re-rank -> grounded generation ->
//! confidence extraction. The answerer reports an answer and its
//! confidence; whether that answer ships or the session escalates is the
//! orchestrator's call.

use std::sync::Arc;

use deskpilot_config::model::RetrievalConfig;
use deskpilot_core::traits::provider::CompletionRequest;
use deskpilot_core::traits::retrieval::ScoredChunk;
use deskpilot_core::types::Citation;
use deskpilot_core::{DeskpilotError, Embedder, LlmProvider, VectorIndex};
use tracing::{debug, info};

use crate::confidence;
use crate::retrieval;

/// Category of an answer, taken from the top retrieved chunks' metadata.
/// Drives the CTA suppression rule and the per-category thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerCategory {
    General,
    Compliance,
    Pricing,
    /// Legal/privacy requests (deletion, data subject rights, terms).
    Legal,
}

/// An answer with its evidence.
#[derive(Debug, Clone)]
pub struct AnswerResult {
    pub text: String,
    pub confidence: f64,
    pub citations: Vec<Citation>,
    pub category: AnswerCategory,
    /// False when retrieval evidence was too thin to trust the model's own
    /// confidence score.
    pub supported: bool,
}

const SYSTEM_PROMPT: &str = "You are a customer support assistant. Answer strictly from the \
     provided context. Cite the sections you used. If the context does not \
     contain the answer, say \"I don't have that information\" instead of \
     guessing.";

const NO_EVIDENCE_REPLY: &str =
    "I don't have that information on hand. Let me bring in a specialist who can help.";

const ALREADY_ANSWERED_REPLY: &str =
    "I covered that just above -- is there anything else you'd like to know?";

const SALES_CTA: &str = "Would you like to see it in action? I can set up a quick demo.";

const CITATION_PREVIEW_CHARS: usize = 160;

/// Retrieval-augmented answerer over the external embedder, index, and LLM.
pub struct RetrievalAnswerer {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    provider: Arc<dyn LlmProvider>,
    config: RetrievalConfig,
    low_confidence_ceil: f64,
}

impl RetrievalAnswerer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        provider: Arc<dyn LlmProvider>,
        config: RetrievalConfig,
        low_confidence_ceil: f64,
    ) -> Self {
        Self {
            embedder,
            index,
            provider,
            config,
            low_confidence_ceil,
        }
    }

    /// Produces an answer with confidence and citations for one question.
    ///
    /// `recent_ai_texts` are the session's last AI turns; facts already
    /// delivered there are not repeated.
    pub async fn answer(
        &self,
        question: &str,
        recent_ai_texts: &[&str],
    ) -> Result<AnswerResult, DeskpilotError> {
        let question = normalize(question);

        let embedding = self.embedder.embed(&question).await?;
        let candidates = self
            .index
            .query(&embedding, self.config.fetch_k, None)
            .await?;

        if candidates.is_empty() {
            info!("retrieval returned no candidates");
            return Ok(AnswerResult {
                text: NO_EVIDENCE_REPLY.to_string(),
                confidence: 0.0,
                citations: Vec::new(),
                category: AnswerCategory::General,
                supported: false,
            });
        }

        let supporting = candidates
            .iter()
            .filter(|c| c.score >= self.config.similarity_floor)
            .count();
        let supported = supporting >= self.config.min_supporting_chunks;

        let kept = retrieval::mmr_select(
            &embedding,
            &candidates,
            self.config.mmr_lambda,
            self.config.keep_k,
        );
        let kept = retrieval::rerank(&question, kept);
        let category = categorize(&kept);

        debug!(
            candidates = candidates.len(),
            supporting,
            kept = kept.len(),
            category = ?category,
            "retrieval complete"
        );

        let request = CompletionRequest::new(build_prompt(&question, &kept))
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(1024);
        let completion = self.provider.complete(request).await?;

        let (mut text, mut score) = confidence::extract(&completion.text);

        if !supported && score > self.low_confidence_ceil {
            // Thin evidence caps the model's self-reported confidence so
            // the orchestrator escalates.
            score = self.low_confidence_ceil;
        }

        text = dedup_against_recent(
            &text,
            &recent_ai_texts
                [recent_ai_texts.len().saturating_sub(self.config.recent_ai_dedup_turns)..],
        );

        if supported && allows_sales_cta(category) && !text.contains(SALES_CTA) {
            text = format!("{text}\n\n{SALES_CTA}");
        }

        let citations = kept
            .iter()
            .map(|chunk| Citation {
                section: chunk.metadata.section.clone(),
                preview: preview(&chunk.text),
            })
            .collect();

        Ok(AnswerResult {
            text,
            confidence: score,
            citations,
            category,
            supported,
        })
    }
}

fn normalize(question: &str) -> String {
    question.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn preview(text: &str) -> String {
    if text.len() <= CITATION_PREVIEW_CHARS {
        return text.to_string();
    }
    let mut cut = CITATION_PREVIEW_CHARS;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}

/// Category of the answer, decided by the top chunks' metadata.
fn categorize(kept: &[ScoredChunk]) -> AnswerCategory {
    for chunk in kept {
        match chunk.metadata.category.as_deref() {
            Some("legal") | Some("privacy") => return AnswerCategory::Legal,
            Some("compliance") => return AnswerCategory::Compliance,
            Some("pricing") => return AnswerCategory::Pricing,
            _ => {}
        }
    }
    AnswerCategory::General
}

/// Compliance, privacy, and legal answers never carry a sales suffix.
fn allows_sales_cta(category: AnswerCategory) -> bool {
    matches!(category, AnswerCategory::General | AnswerCategory::Pricing)
}

fn build_prompt(question: &str, chunks: &[ScoredChunk]) -> String {
    let mut context = String::new();
    for chunk in chunks {
        context.push_str(&format!("[{}]\n{}\n\n", chunk.metadata.section, chunk.text));
    }
    format!(
        "Context:\n{context}Question: {question}\n\n\
         Answer from the context, citing section names. Finish with a line:\n\
         CONFIDENCE: <0.0-1.0 how well the context supports your answer>"
    )
}

/// Drops sentences already delivered in recent AI turns. A fully-duplicated
/// answer collapses to a short reference back.
fn dedup_against_recent(text: &str, recent: &[&str]) -> String {
    if recent.is_empty() {
        return text.to_string();
    }
    let seen: Vec<String> = recent.iter().map(|t| normalize_sentence(t)).collect();

    let sentences: Vec<&str> = split_sentences(text);
    let fresh: Vec<&str> = sentences
        .iter()
        .filter(|s| {
            let needle = normalize_sentence(s);
            needle.len() < 20 || !seen.iter().any(|turn| turn.contains(&needle))
        })
        .copied()
        .collect();

    if fresh.is_empty() {
        return ALREADY_ANSWERED_REPLY.to_string();
    }
    if fresh.len() == sentences.len() {
        return text.to_string();
    }
    fresh.join(" ")
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let end = idx + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

fn normalize_sentence(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use deskpilot_core::traits::provider::{Completion, TokenUsage};
    use deskpilot_core::traits::retrieval::ChunkMetadata;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, DeskpilotError> {
            Ok(vec![1.0, 0.0])
        }
    }

    struct FixedIndex {
        chunks: Vec<ScoredChunk>,
    }

    #[async_trait]
    impl VectorIndex for FixedIndex {
        async fn query(
            &self,
            _embedding: &[f32],
            k: usize,
            _filter: Option<&str>,
        ) -> Result<Vec<ScoredChunk>, DeskpilotError> {
            Ok(self.chunks.iter().take(k).cloned().collect())
        }
    }

    struct FixedProvider {
        reply: String,
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<Completion, DeskpilotError> {
            Ok(Completion {
                text: self.reply.clone(),
                usage: TokenUsage::default(),
            })
        }
    }

    fn chunk(id: &str, text: &str, score: f32, category: Option<&str>) -> ScoredChunk {
        ScoredChunk {
            id: id.into(),
            text: text.into(),
            score,
            embedding: Some(vec![score, 0.1]),
            metadata: ChunkMetadata {
                section: format!("Section {id}"),
                category: category.map(String::from),
                confidence_weight: 0.8,
            },
        }
    }

    fn answerer(chunks: Vec<ScoredChunk>, reply: &str) -> RetrievalAnswerer {
        RetrievalAnswerer::new(
            Arc::new(FixedEmbedder),
            Arc::new(FixedIndex { chunks }),
            Arc::new(FixedProvider {
                reply: reply.into(),
            }),
            RetrievalConfig::default(),
            0.50,
        )
    }

    #[tokio::test]
    async fn grounded_answer_with_citations() {
        let chunks = vec![
            chunk("a", "SOC2 is a security audit framework.", 0.9, Some("compliance")),
            chunk("b", "Audits cover controls and evidence.", 0.8, Some("compliance")),
        ];
        let result = answerer(chunks, "SOC2 is an audit framework. CONFIDENCE: 0.87")
            .answer("What is SOC2?", &[])
            .await
            .unwrap();
        assert_eq!(result.confidence, 0.87);
        assert!(result.citations.len() >= 1);
        assert_eq!(result.category, AnswerCategory::Compliance);
        assert!(result.supported);
        // Compliance answers never carry the sales suffix.
        assert!(!result.text.contains("quick demo"));
    }

    #[tokio::test]
    async fn empty_retrieval_is_honest_zero_confidence() {
        let result = answerer(vec![], "irrelevant")
            .answer("Where is your office?", &[])
            .await
            .unwrap();
        assert_eq!(result.confidence, 0.0);
        assert!(!result.supported);
        assert!(result.text.contains("don't have that information"));
    }

    #[tokio::test]
    async fn thin_evidence_caps_confidence() {
        // Only one chunk above the 0.35 floor; min_supporting_chunks is 2.
        let chunks = vec![
            chunk("a", "tangent", 0.55, None),
            chunk("b", "noise", 0.10, None),
        ];
        let result = answerer(chunks, "Confident rambling. CONFIDENCE: 0.95")
            .answer("anything", &[])
            .await
            .unwrap();
        assert!(result.confidence <= 0.50);
        assert!(!result.supported);
    }

    #[tokio::test]
    async fn general_answer_gets_sales_cta() {
        let chunks = vec![
            chunk("a", "The platform automates evidence collection.", 0.9, None),
            chunk("b", "Dashboards track audit progress.", 0.8, None),
        ];
        let result = answerer(chunks, "It automates evidence collection. CONFIDENCE: 0.9")
            .answer("What does the platform do?", &[])
            .await
            .unwrap();
        assert!(result.text.contains("quick demo"));
    }

    #[tokio::test]
    async fn legal_answer_suppresses_cta() {
        let chunks = vec![
            chunk("a", "Deletion requests complete within 30 days.", 0.9, Some("legal")),
            chunk("b", "Data subject rights are honored.", 0.8, Some("legal")),
        ];
        let result = answerer(chunks, "Deletion completes within 30 days. CONFIDENCE: 0.9")
            .answer("How do I delete my data?", &[])
            .await
            .unwrap();
        assert_eq!(result.category, AnswerCategory::Legal);
        assert!(!result.text.contains("quick demo"));
    }

    #[tokio::test]
    async fn repeated_fact_is_deduplicated() {
        let chunks = vec![
            chunk("a", "SOC2 has five trust criteria.", 0.9, None),
            chunk("b", "Criteria include security and privacy.", 0.8, None),
        ];
        let prior = "SOC2 certification usually takes three to six months to complete.";
        let reply = "SOC2 certification usually takes three to six months to complete. CONFIDENCE: 0.9";
        let result = answerer(chunks, reply)
            .answer("How long does SOC2 take?", &[prior])
            .await
            .unwrap();
        assert!(
            result.text.contains("covered that just above"),
            "got: {}",
            result.text
        );
    }

    #[test]
    fn sentence_splitting() {
        let parts = split_sentences("One. Two! Three? Tail");
        assert_eq!(parts, vec!["One.", "Two!", "Three?", "Tail"]);
    }

    #[test]
    fn categorize_prefers_first_tagged_chunk() {
        let kept = vec![chunk("a", "", 0.9, None), chunk("b", "", 0.8, Some("pricing"))];
        assert_eq!(categorize(&kept), AnswerCategory::Pricing);
    }
}
