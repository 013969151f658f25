// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic pattern pass.
//!
//! High-precision keyword rules with zero cost and zero latency. The
//! semantic pass only runs when these scores are ambiguous. The
//! design-critical rule lives here: questions ABOUT demos ("what is a
//! demo?") must not trigger scheduling, so informational qualifiers demote
//! the scheduling score.

use deskpilot_config::model::LexiconConfig;
use deskpilot_core::Intent;

/// Explicit booking language (contains, case-insensitive).
const SCHEDULING_PHRASES: &[(&str, f64)] = &[
    ("schedule a demo", 0.95),
    ("schedule a meeting", 0.95),
    ("schedule a call", 0.95),
    ("book a demo", 0.95),
    ("book a meeting", 0.95),
    ("book a call", 0.95),
    ("set up a demo", 0.90),
    ("set up a meeting", 0.90),
    ("set up a call", 0.90),
    ("arrange a demo", 0.90),
    ("can i schedule", 0.90),
    ("can we schedule", 0.90),
    ("i want to schedule", 0.90),
    ("i'd like to schedule", 0.90),
    ("i would like to schedule", 0.90),
    ("i'd like a demo", 0.85),
    ("when can we meet", 0.85),
    ("when are you available", 0.85),
    ("schedule", 0.70),
    ("book", 0.65),
    ("demo", 0.65),
    ("meeting", 0.60),
];

/// Informational qualifiers that mark a question ABOUT a demo/meeting
/// rather than an attempt to book one.
const INFO_QUALIFIERS: &[&str] = &[
    "what is",
    "what's",
    "what are",
    "what does",
    "what happens",
    "what will",
    "what would",
    "how long",
    "how much time",
    "how does",
    "how do",
    "tell me about",
    "explain",
    "describe",
];

/// Technical problem markers.
const TECHNICAL_MARKERS: &[(&str, f64)] = &[
    ("500", 0.90),
    ("404", 0.90),
    ("401", 0.90),
    ("403", 0.90),
    ("not working", 0.90),
    ("doesn't work", 0.90),
    ("isn't working", 0.90),
    ("broken", 0.85),
    ("failing", 0.85),
    ("failed", 0.80),
    ("error", 0.85),
    ("bug", 0.80),
    ("crash", 0.85),
    ("is down", 0.90),
    ("offline", 0.85),
    ("timeout", 0.80),
    ("can't log in", 0.85),
    ("cannot log in", 0.85),
];

/// Information-seeking markers.
const INFO_MARKERS: &[(&str, f64)] = &[
    ("what is", 0.85),
    ("what are", 0.85),
    ("what does", 0.85),
    ("how does", 0.85),
    ("how do", 0.75),
    ("tell me about", 0.85),
    ("explain", 0.80),
    ("where can i find", 0.85),
    ("where is", 0.70),
    ("documentation", 0.85),
    ("docs", 0.75),
    ("guide", 0.70),
    ("pricing", 0.85),
    ("how much", 0.85),
    ("cost", 0.75),
    ("features", 0.80),
    ("do you support", 0.80),
    ("can you help with", 0.75),
];

/// Pricing vocabulary used for category tagging.
const PRICING_MARKERS: &[&str] = &["pricing", "price", "cost", "how much", "quote", "rate"];

/// Feature vocabulary used for category tagging.
const FEATURE_MARKERS: &[&str] = &["feature", "capability", "functionality", "integration"];

/// The score below which the pattern pass is considered ambiguous.
pub const AMBIGUITY_FLOOR: f64 = 0.60;

/// Which pass produced the classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierSource {
    Pattern,
    Semantic,
    /// Pattern fallback after a failed or unavailable semantic pass.
    PatternFallback,
}

/// Topic category of an information query; selects the answer threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoCategory {
    Compliance,
    Pricing,
    Features,
    General,
}

/// Classifier verdict. The classifier reports; routing stays in the
/// orchestrator.
#[derive(Debug, Clone)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f64,
    pub source: ClassifierSource,
    pub info_category: InfoCategory,
    /// Urgency vocabulary present (outage-style escalation trigger).
    pub urgent: bool,
    /// Explicit request to reach a human.
    pub human_request: bool,
    /// Enterprise-tier pricing vocabulary present.
    pub enterprise_pricing: bool,
    pub reason: &'static str,
}

/// Raw per-intent scores from the pattern pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternScores {
    pub scheduling: f64,
    pub technical: f64,
    pub information: f64,
    pub abusive: f64,
}

/// Parses a slot selection out of the message: a bare number, "option N",
/// or "slot N". Returns the 1-based index.
pub fn parse_slot_selection(text: &str) -> Option<u32> {
    let trimmed = text.trim().to_lowercase();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.parse().ok();
    }
    for prefix in ["option", "slot", "number", "choice"] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            let rest = rest.trim_start_matches([' ', '#']);
            if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                return rest.parse().ok();
            }
        }
    }
    None
}

fn best_match(lower: &str, markers: &[(&str, f64)]) -> f64 {
    markers
        .iter()
        .filter(|(phrase, _)| lower.contains(phrase))
        .map(|(_, score)| *score)
        .fold(0.0, f64::max)
}

/// True when a scheduling noun is preceded by an informational qualifier
/// anywhere in the message ("what is a demo", "how long is a demo").
fn has_info_qualified_demo(lower: &str) -> bool {
    let mentions_demo = lower.contains("demo") || lower.contains("meeting") || lower.contains("call");
    mentions_demo
        && INFO_QUALIFIERS.iter().any(|q| {
            lower
                .find(q)
                .is_some_and(|qpos| ["demo", "meeting", "call"].iter().any(|noun| {
                    lower.find(noun).is_some_and(|npos| npos > qpos)
                }))
        })
}

/// Computes the pattern scores with disambiguation demotions applied.
pub fn score(text: &str, lexicons: &LexiconConfig) -> PatternScores {
    let lower = text.to_lowercase();

    let mut scores = PatternScores {
        scheduling: best_match(&lower, SCHEDULING_PHRASES),
        technical: best_match(&lower, TECHNICAL_MARKERS),
        information: best_match(&lower, INFO_MARKERS),
        abusive: if lexicons.abuse_terms.iter().any(|t| contains_term(&lower, t)) {
            0.90
        } else {
            0.0
        },
    };

    // Questions ABOUT demos resolve to Information, not Scheduling.
    if has_info_qualified_demo(&lower) {
        scores.scheduling = (scores.scheduling - 0.30).max(0.0);
        scores.information = scores.information.max(0.85);
    }

    // Compliance/pricing information queries are not technical support
    // even when they mention "help" or "work".
    let compliance_query = lexicons.compliance_terms.iter().any(|t| lower.contains(t));
    let pricing_query = PRICING_MARKERS.iter().any(|m| lower.contains(m));
    if (compliance_query || pricing_query)
        && INFO_QUALIFIERS.iter().any(|q| lower.contains(q))
    {
        scores.technical = (scores.technical - 0.40).max(0.0);
        scores.scheduling = (scores.scheduling - 0.25).max(0.0);
        scores.information = scores.information.max(0.85);
    }

    scores
}

/// Word-boundary-ish containment for single-word lexicon terms; phrase
/// terms fall back to substring containment.
fn contains_term(lower: &str, term: &str) -> bool {
    if term.contains(' ') {
        return lower.contains(term);
    }
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == term)
}

/// Runs the full pattern pass.
///
/// `has_pending_slots` gates slot-selection parsing: a bare "3" with no
/// open offers is `Unknown`, never `SlotSelection`.
pub fn classify(
    text: &str,
    has_pending_slots: bool,
    lexicons: &LexiconConfig,
) -> Classification {
    let lower = text.to_lowercase();

    let urgent = lexicons.urgency_terms.iter().any(|t| contains_term(&lower, t));
    let human_request = lexicons
        .human_request_terms
        .iter()
        .any(|t| lower.contains(t));
    let enterprise_pricing = lexicons
        .enterprise_pricing_terms
        .iter()
        .any(|t| lower.contains(t));

    let info_category = if lexicons.compliance_terms.iter().any(|t| lower.contains(t)) {
        InfoCategory::Compliance
    } else if enterprise_pricing || PRICING_MARKERS.iter().any(|m| lower.contains(m)) {
        InfoCategory::Pricing
    } else if FEATURE_MARKERS.iter().any(|m| lower.contains(m)) {
        InfoCategory::Features
    } else {
        InfoCategory::General
    };

    let base = |intent, confidence, reason| Classification {
        intent,
        confidence,
        source: ClassifierSource::Pattern,
        info_category,
        urgent,
        human_request,
        enterprise_pricing,
        reason,
    };

    if let Some(index) = parse_slot_selection(text) {
        if has_pending_slots {
            return base(
                Intent::SlotSelection { index },
                0.95,
                "slot selection against open offers",
            );
        }
        if lower.trim().chars().all(|c| c.is_ascii_digit()) {
            // A bare number with nothing offered means nothing yet.
            return base(Intent::Unknown, 0.40, "bare number without open offers");
        }
    }

    let scores = score(text, lexicons);

    if scores.abusive > 0.0 {
        return base(Intent::Abusive, scores.abusive, "abuse lexicon match");
    }

    let best = scores
        .scheduling
        .max(scores.technical)
        .max(scores.information);

    if best < AMBIGUITY_FLOOR {
        return base(Intent::Unknown, best, "no decisive pattern");
    }

    if scores.scheduling == best {
        base(Intent::Scheduling, best, "scheduling phrase match")
    } else if scores.technical == best {
        base(Intent::TechnicalSupport, best, "technical marker match")
    } else {
        base(Intent::Information, best, "information marker match")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicons() -> LexiconConfig {
        LexiconConfig::default()
    }

    #[test]
    fn explicit_booking_is_scheduling() {
        let c = classify("Can I schedule a demo?", false, &lexicons());
        assert_eq!(c.intent, Intent::Scheduling);
        assert!(c.confidence >= 0.90);
    }

    #[test]
    fn what_is_a_demo_is_information() {
        let c = classify("What is a demo?", false, &lexicons());
        assert_eq!(c.intent, Intent::Information, "got {c:?}");
    }

    #[test]
    fn how_long_is_a_demo_is_information() {
        let c = classify("How long is a demo?", false, &lexicons());
        assert_eq!(c.intent, Intent::Information);
    }

    #[test]
    fn tell_me_about_your_demo_is_information() {
        let c = classify("Tell me about your demo", false, &lexicons());
        assert_eq!(c.intent, Intent::Information);
    }

    #[test]
    fn bare_number_with_pending_slots_is_selection() {
        let c = classify("3", true, &lexicons());
        assert_eq!(c.intent, Intent::SlotSelection { index: 3 });
    }

    #[test]
    fn option_n_is_selection() {
        let c = classify("Option 2", true, &lexicons());
        assert_eq!(c.intent, Intent::SlotSelection { index: 2 });
        let c = classify("slot #4", true, &lexicons());
        assert_eq!(c.intent, Intent::SlotSelection { index: 4 });
    }

    #[test]
    fn bare_number_without_pending_slots_is_unknown() {
        let c = classify("3", false, &lexicons());
        assert_eq!(c.intent, Intent::Unknown);
        assert!(c.confidence < AMBIGUITY_FLOOR);
    }

    #[test]
    fn http_error_is_technical() {
        let c = classify("The API keeps returning 500 errors", false, &lexicons());
        assert_eq!(c.intent, Intent::TechnicalSupport);
        assert!(c.confidence >= 0.90);
    }

    #[test]
    fn abuse_lexicon_wins() {
        let c = classify("this service is garbage", false, &lexicons());
        assert_eq!(c.intent, Intent::Abusive);
    }

    #[test]
    fn compliance_question_is_information_with_category() {
        let c = classify("What is SOC2?", false, &lexicons());
        assert_eq!(c.intent, Intent::Information);
        assert_eq!(c.info_category, InfoCategory::Compliance);
    }

    #[test]
    fn how_does_soc2_work_is_not_technical() {
        let c = classify("How does SOC2 work?", false, &lexicons());
        assert_eq!(c.intent, Intent::Information);
    }

    #[test]
    fn enterprise_pricing_is_flagged() {
        let c = classify(
            "What does enterprise pricing look like for 500 seats?",
            false,
            &lexicons(),
        );
        assert_eq!(c.intent, Intent::Information);
        assert!(c.enterprise_pricing);
        assert_eq!(c.info_category, InfoCategory::Pricing);
    }

    #[test]
    fn urgency_and_human_request_flags() {
        let c = classify(
            "Our production is down, this is urgent, connect me with support",
            false,
            &lexicons(),
        );
        assert!(c.urgent);
        assert!(c.human_request);
    }

    #[test]
    fn greeting_is_ambiguous() {
        let c = classify("hey there", false, &lexicons());
        assert_eq!(c.intent, Intent::Unknown);
        assert!(c.confidence < AMBIGUITY_FLOOR);
    }

    #[test]
    fn abuse_term_needs_word_boundary() {
        // "classy" contains "ass"-like fragments in sloppier matchers;
        // ensure single-word terms match whole words only.
        let c = classify("that was a classy demo, book it", false, &lexicons());
        assert_ne!(c.intent, Intent::Abusive);
    }

    #[test]
    fn parse_slot_selection_variants() {
        assert_eq!(parse_slot_selection("2"), Some(2));
        assert_eq!(parse_slot_selection("  14 "), Some(14));
        assert_eq!(parse_slot_selection("Option 3"), Some(3));
        assert_eq!(parse_slot_selection("slot 1"), Some(1));
        assert_eq!(parse_slot_selection("three"), None);
        assert_eq!(parse_slot_selection("option three"), None);
        assert_eq!(parse_slot_selection(""), None);
    }
}
