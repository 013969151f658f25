// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered intent classification.
//!
//! A deterministic pattern pass handles the high-precision cases; the
//! semantic LLM pass runs only when patterns are ambiguous, and its result
//! is adopted only when it beats the pattern score. The classifier reports;
//! routing decisions stay in the orchestrator.

pub mod patterns;
pub mod semantic;

use std::sync::Arc;

use deskpilot_config::model::LexiconConfig;
use deskpilot_core::{Intent, LlmProvider};
use tracing::debug;

pub use patterns::{
    Classification, ClassifierSource, InfoCategory, PatternScores, AMBIGUITY_FLOOR,
};

/// Confidence assigned when nothing resolves and the classifier defaults
/// to `Information`.
const DEFAULT_INFORMATION_CONFIDENCE: f64 = 0.60;

/// The layered intent classifier.
pub struct IntentClassifier {
    lexicons: LexiconConfig,
    provider: Option<Arc<dyn LlmProvider>>,
}

impl IntentClassifier {
    /// Pattern-only classifier (semantic pass disabled).
    pub fn pattern_only(lexicons: LexiconConfig) -> Self {
        Self {
            lexicons,
            provider: None,
        }
    }

    /// Classifier with the semantic LLM fallback enabled.
    pub fn new(lexicons: LexiconConfig, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            lexicons,
            provider: Some(provider),
        }
    }

    /// Classifies one utterance.
    ///
    /// `has_pending_slots` enables slot-selection parsing. This never
    /// fails: when the semantic pass is unavailable or errors, the pattern
    /// verdict stands, defaulting to `Information` when nothing matched at
    /// all (`ClassifierUnavailable` degradation).
    pub async fn classify(&self, text: &str, has_pending_slots: bool) -> Classification {
        let pattern = patterns::classify(text, has_pending_slots, &self.lexicons);

        debug!(
            intent = %pattern.intent,
            confidence = pattern.confidence,
            reason = pattern.reason,
            "pattern pass"
        );

        // Decisive pattern results never pay for an LLM call. Slot
        // selections and abuse verdicts are always decisive.
        if pattern.confidence >= AMBIGUITY_FLOOR
            || matches!(pattern.intent, Intent::SlotSelection { .. } | Intent::Abusive)
        {
            return pattern;
        }

        if let Some(provider) = &self.provider
            && let Some(verdict) = semantic::classify(provider.as_ref(), text).await
            && verdict.confidence > pattern.confidence
        {
            debug!(
                intent = %verdict.intent,
                confidence = verdict.confidence,
                "semantic pass adopted"
            );
            return Classification {
                intent: verdict.intent,
                confidence: verdict.confidence,
                source: ClassifierSource::Semantic,
                reason: "semantic pass",
                ..pattern
            };
        }

        // Unresolved: treat as an information request at the floor.
        Classification {
            intent: Intent::Information,
            confidence: pattern.confidence.max(DEFAULT_INFORMATION_CONFIDENCE),
            source: ClassifierSource::PatternFallback,
            reason: "unresolved, defaulting to information",
            ..pattern
        }
    }
}
