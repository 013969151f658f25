// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic fallback pass.
//!
//! One LLM call, invoked only when the pattern pass scored below the
//! ambiguity floor. The model returns `Intent:` / `Confidence:` /
//! `Reason:` lines which are parsed leniently; anything unparseable is
//! treated as no result.

use deskpilot_core::traits::provider::CompletionRequest;
use deskpilot_core::{Intent, LlmProvider};
use tracing::warn;

/// Parsed result of a semantic classification.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticVerdict {
    pub intent: Intent,
    pub confidence: f64,
}

const SYSTEM_PROMPT: &str =
    "You are an expert at classifying customer support intents. Focus on what \
     the user wants to DO, not just the topics mentioned.";

/// Builds the classification prompt for one utterance.
pub fn build_prompt(text: &str) -> String {
    format!(
        "Classify the intent of this support message.\n\
         \n\
         Message: \"{text}\"\n\
         \n\
         Categories:\n\
         - information: wants to learn about features, compliance, pricing, or how things work\n\
         - scheduling: wants to book a demo, meeting, or call\n\
         - technical_support: has a technical problem, error, or needs implementation help\n\
         - abusive: hostile or abusive content\n\
         - unknown: none of the above\n\
         \n\
         Important distinctions:\n\
         - \"What is a demo?\" = information (asking ABOUT demos)\n\
         - \"Schedule a demo\" = scheduling (wants to BOOK one)\n\
         - \"How does SOC2 work?\" = information\n\
         - \"SOC2 checks are failing\" = technical_support\n\
         \n\
         Respond with exactly:\n\
         Intent: <category>\n\
         Confidence: <0.0-1.0>\n\
         Reason: <one line>"
    )
}

/// Extracts the verdict from the model reply. Returns `None` when either
/// required line is missing or malformed.
pub fn parse_reply(reply: &str) -> Option<SemanticVerdict> {
    let mut intent = None;
    let mut confidence = None;

    for line in reply.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Intent:") {
            intent = match rest.trim().to_lowercase().as_str() {
                "information" => Some(Intent::Information),
                "scheduling" => Some(Intent::Scheduling),
                "technical_support" => Some(Intent::TechnicalSupport),
                "abusive" => Some(Intent::Abusive),
                "unknown" => Some(Intent::Unknown),
                _ => None,
            };
        } else if let Some(rest) = line.strip_prefix("Confidence:") {
            confidence = rest.trim().parse::<f64>().ok().map(|c| c.clamp(0.0, 1.0));
        }
    }

    Some(SemanticVerdict {
        intent: intent?,
        confidence: confidence?,
    })
}

/// Runs the semantic pass. Failures are reported as `None`; the caller
/// falls back to the pattern verdict.
pub async fn classify(provider: &dyn LlmProvider, text: &str) -> Option<SemanticVerdict> {
    let request = CompletionRequest::new(build_prompt(text))
        .with_system(SYSTEM_PROMPT)
        .with_max_tokens(150);

    match provider.complete(request).await {
        Ok(completion) => {
            let verdict = parse_reply(&completion.text);
            if verdict.is_none() {
                warn!("semantic classifier returned an unparseable reply");
            }
            verdict
        }
        Err(e) => {
            warn!(error = %e, "semantic classification failed, using pattern result");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_well_formed_reply() {
        let reply = "Intent: scheduling\nConfidence: 0.85\nReason: wants a demo";
        let verdict = parse_reply(reply).unwrap();
        assert_eq!(verdict.intent, Intent::Scheduling);
        assert_eq!(verdict.confidence, 0.85);
    }

    #[test]
    fn parse_tolerates_extra_whitespace_and_case() {
        let reply = "  Intent:   TECHNICAL_SUPPORT  \n  Confidence:  0.7  ";
        let verdict = parse_reply(reply).unwrap();
        assert_eq!(verdict.intent, Intent::TechnicalSupport);
    }

    #[test]
    fn parse_clamps_confidence() {
        let reply = "Intent: information\nConfidence: 1.7";
        let verdict = parse_reply(reply).unwrap();
        assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn parse_missing_confidence_is_none() {
        assert!(parse_reply("Intent: information").is_none());
    }

    #[test]
    fn parse_unknown_category_is_none() {
        assert!(parse_reply("Intent: sales\nConfidence: 0.9").is_none());
    }

    #[test]
    fn prompt_contains_the_message() {
        let prompt = build_prompt("do you do quarterly reviews?");
        assert!(prompt.contains("do you do quarterly reviews?"));
        assert!(prompt.contains("Intent:"));
    }
}
