// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing the structured `CONFIDENCE:` footer out of model output.

/// Default when the model omits or mangles the footer.
const DEFAULT_CONFIDENCE: f64 = 0.60;

/// Splits the trailing `CONFIDENCE: <score>` line off the answer text.
///
/// Returns the cleaned answer and the clamped score. A missing or
/// unparseable footer yields the medium default.
pub fn extract(text: &str) -> (String, f64) {
    if let Some(pos) = text.rfind("CONFIDENCE:") {
        let (body, footer) = text.split_at(pos);
        let raw = footer.trim_start_matches("CONFIDENCE:").trim();
        let score = raw
            .split_whitespace()
            .next()
            .and_then(|t| t.parse::<f64>().ok())
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_CONFIDENCE);
        return (body.trim_end().to_string(), score);
    }
    (text.trim_end().to_string(), DEFAULT_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_trailing_footer() {
        let (text, score) = extract("SOC2 is an audit framework.\n\nCONFIDENCE: 0.87");
        assert_eq!(text, "SOC2 is an audit framework.");
        assert_eq!(score, 0.87);
    }

    #[test]
    fn missing_footer_defaults_medium() {
        let (text, score) = extract("Just an answer.");
        assert_eq!(text, "Just an answer.");
        assert_eq!(score, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn clamps_out_of_range() {
        let (_, score) = extract("x\nCONFIDENCE: 1.8");
        assert_eq!(score, 1.0);
        let (_, score) = extract("x\nCONFIDENCE: -0.2");
        assert_eq!(score, 0.0);
    }

    #[test]
    fn garbage_footer_defaults_medium() {
        let (text, score) = extract("answer\nCONFIDENCE: high");
        assert_eq!(text, "answer");
        assert_eq!(score, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn uses_last_footer_when_repeated() {
        let (text, score) = extract("CONFIDENCE: 0.2 is what I'd say.\nCONFIDENCE: 0.9");
        assert_eq!(score, 0.9);
        assert!(text.contains("0.2"));
    }
}
