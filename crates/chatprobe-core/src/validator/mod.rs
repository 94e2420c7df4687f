//! Response validation.
//!
//! Every check is a pure function of its arguments: no I/O, no shared mutable
//! state, and no panics on odd input. Blank or malformed text is a valid input
//! that simply yields a negative verdict, so a validator can never abort a run.
//!
//! Each check comes in two forms:
//! - a boolean free function (`is_quality_response`, `is_hallucinated`, ...)
//!   using the built-in avoidance table
//! - a [`ResponseValidator`] method returning a [`Verdict`] with the reason,
//!   using whatever [`AvoidancePhrases`] the validator was built with

pub mod patterns;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::phrases::AvoidancePhrases;

/// Both responses must be longer than this (in characters) to be consistent.
pub const MIN_MULTILINGUAL_CHARS: usize = 10;

/// Distinct prompt words that must appear in a relevant response.
pub const MIN_RELEVANT_MATCHES: usize = 2;

/// Markers that must never survive into rendered output.
pub const FORBIDDEN_RENDERED_MARKERS: &[&str] = &["<script>", "javascript:"];

lazy_static! {
    static ref DEFAULT_VALIDATOR: ResponseValidator = ResponseValidator::new();
}

/// Which heuristic produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Quality,
    MultilingualConsistency,
    Hallucination,
    Sanitization,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Quality => "quality",
            CheckKind::MultilingualConsistency => "multilingual_consistency",
            CheckKind::Hallucination => "hallucination",
            CheckKind::Sanitization => "sanitization",
        }
    }
}

/// Outcome of a single check.
///
/// `passed` is always the "good" direction: for the hallucination check a
/// passing verdict means the response is *not* hallucinated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub check: CheckKind,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    pub fn pass(check: CheckKind) -> Self {
        Self {
            check,
            passed: true,
            reason: None,
        }
    }

    pub fn fail(check: CheckKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        debug!(check = check.as_str(), %reason, "check failed");
        Self {
            check,
            passed: false,
            reason: Some(reason),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.passed
    }

    pub fn is_fail(&self) -> bool {
        !self.passed
    }
}

/// Validates captured response text.
///
/// Cheap to clone and `Send + Sync`; share one per run or build one per
/// worker, it makes no difference.
#[derive(Debug, Clone, Default)]
pub struct ResponseValidator {
    phrases: AvoidancePhrases,
}

impl ResponseValidator {
    /// Validator using the built-in avoidance table.
    pub fn new() -> Self {
        Self::with_phrases(AvoidancePhrases::builtin())
    }

    /// Validator using a custom avoidance table.
    pub fn with_phrases(phrases: AvoidancePhrases) -> Self {
        Self { phrases }
    }

    pub fn phrases(&self) -> &AvoidancePhrases {
        &self.phrases
    }

    /// Judge completeness, markup well-formedness and keyword relevance.
    ///
    /// Keywords match as case-insensitive substrings and *any* one suffices.
    /// An empty keyword list is vacuously satisfied.
    pub fn check_quality<S: AsRef<str>>(&self, response: &str, expected_keywords: &[S]) -> Verdict {
        let kind = CheckKind::Quality;

        if response.trim().is_empty() {
            return Verdict::fail(kind, "response is blank");
        }

        if patterns::has_incomplete_thought(response) {
            return Verdict::fail(kind, "response trails off or has no complete sentence");
        }

        if patterns::has_malformed_markup(response) {
            return Verdict::fail(kind, "response contains malformed markup");
        }

        if !patterns::contains_any_keyword(response, expected_keywords) {
            let keywords: Vec<&str> = expected_keywords.iter().map(|k| k.as_ref()).collect();
            return Verdict::fail(
                kind,
                format!("none of the expected keywords {:?} found", keywords),
            );
        }

        Verdict::pass(kind)
    }

    /// Coarse check that both language variants produced substantial content.
    ///
    /// This does not compare meaning across languages.
    pub fn check_multilingual(&self, primary: &str, secondary: &str) -> Verdict {
        let kind = CheckKind::MultilingualConsistency;

        for (label, text) in [("primary", primary), ("secondary", secondary)] {
            if text.trim().is_empty() {
                return Verdict::fail(kind, format!("{} response is blank", label));
            }
            let chars = text.chars().count();
            if chars <= MIN_MULTILINGUAL_CHARS {
                return Verdict::fail(
                    kind,
                    format!(
                        "{} response has {} characters, needs more than {}",
                        label, chars, MIN_MULTILINGUAL_CHARS
                    ),
                );
            }
        }

        Verdict::pass(kind)
    }

    /// Check that a response neither avoids the prompt nor ignores it.
    ///
    /// Fails when the response contains an avoidance phrase, or when fewer
    /// than [`MIN_RELEVANT_MATCHES`] distinct prompt words longer than three
    /// characters appear in it.
    ///
    /// A prompt with fewer than two such words can never be judged relevant,
    /// so it always fails unless the avoidance branch fires first. This is a
    /// known limitation of the heuristic and is kept as-is.
    pub fn check_hallucination(&self, response: &str, prompt: &str) -> Verdict {
        let kind = CheckKind::Hallucination;

        if let Some(phrase) = self.phrases.find_in(response) {
            return Verdict::fail(kind, format!("response contains avoidance phrase '{}'", phrase));
        }

        let matched = patterns::matching_prompt_words(response, prompt);
        if matched.len() < MIN_RELEVANT_MATCHES {
            return Verdict::fail(
                kind,
                format!(
                    "only {} prompt word(s) found in response {:?}, needs {}",
                    matched.len(),
                    matched,
                    MIN_RELEVANT_MATCHES
                ),
            );
        }

        Verdict::pass(kind)
    }

    /// Check that executable markup was neutralised on the way to the page.
    ///
    /// Output identical to the raw input counts as unsanitized, even when the
    /// input was already harmless.
    pub fn check_sanitized(&self, raw_input: &str, rendered_output: &str) -> Verdict {
        let kind = CheckKind::Sanitization;

        if let Some(marker) = FORBIDDEN_RENDERED_MARKERS
            .iter()
            .find(|m| rendered_output.contains(*m))
        {
            return Verdict::fail(kind, format!("rendered output contains '{}'", marker));
        }

        if rendered_output == raw_input {
            return Verdict::fail(kind, "rendered output is identical to raw input");
        }

        Verdict::pass(kind)
    }
}

/// Judge response quality with the default validator.
pub fn is_quality_response<S: AsRef<str>>(response: &str, expected_keywords: &[S]) -> bool {
    DEFAULT_VALIDATOR
        .check_quality(response, expected_keywords)
        .passed
}

/// Check that two language variants both produced substantial content.
pub fn is_multilingual_consistent(primary: &str, secondary: &str) -> bool {
    DEFAULT_VALIDATOR.check_multilingual(primary, secondary).passed
}

/// Classify a response as hallucinated using the built-in avoidance table.
pub fn is_hallucinated(response: &str, prompt: &str) -> bool {
    !DEFAULT_VALIDATOR.check_hallucination(response, prompt).passed
}

/// Check rendered output against its raw input.
pub fn is_sanitized(raw_input: &str, rendered_output: &str) -> bool {
    DEFAULT_VALIDATOR
        .check_sanitized(raw_input, rendered_output)
        .passed
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_KEYWORDS: &[&str] = &[];

    #[test]
    fn test_quality_service_scenario() {
        assert!(is_quality_response(
            "We offer several services for your business",
            &["service", "available"],
        ));
    }

    #[test]
    fn test_quality_blank_fails() {
        let validator = ResponseValidator::new();
        let verdict = validator.check_quality("   \n\t", NO_KEYWORDS);
        assert!(verdict.is_fail());
        assert_eq!(verdict.reason.as_deref(), Some("response is blank"));
        assert!(!is_quality_response("", NO_KEYWORDS));
    }

    #[test]
    fn test_quality_incomplete_thought_fails_even_with_keyword() {
        assert!(!is_quality_response("Our services include...", &["service"]));
        assert!(!is_quality_response("Our services include --", &["service"]));
        assert!(!is_quality_response("?!?", NO_KEYWORDS));
    }

    #[test]
    fn test_quality_unterminated_tag_fails() {
        let verdict = ResponseValidator::new().check_quality("Here is <div class='x'", NO_KEYWORDS);
        assert!(verdict.is_fail());
        assert_eq!(verdict.check, CheckKind::Quality);
        assert!(verdict.reason.unwrap().contains("markup"));
    }

    #[test]
    fn test_quality_well_formed_markup_passes() {
        assert!(is_quality_response("Use <b>bold</b> for emphasis.", NO_KEYWORDS));
    }

    #[test]
    fn test_quality_missing_keywords_fails() {
        let verdict =
            ResponseValidator::new().check_quality("The weather is nice today.", &["service"]);
        assert!(verdict.is_fail());
        assert!(verdict.reason.unwrap().contains("service"));
    }

    #[test]
    fn test_multilingual_boundary() {
        assert!(!is_multilingual_consistent("0123456789", "a long enough answer"));
        assert!(!is_multilingual_consistent("a long enough answer", "0123456789"));
        assert!(is_multilingual_consistent("01234567890", "a long enough answer"));
        assert!(!is_multilingual_consistent("            ", "a long enough answer"));
    }

    #[test]
    fn test_multilingual_counts_characters_not_bytes() {
        // 10 Arabic letters are 20 bytes but only 10 characters.
        let arabic = "مرحبامرحبا";
        assert_eq!(arabic.chars().count(), 10);
        assert!(!is_multilingual_consistent("a long enough answer", arabic));
    }

    #[test]
    fn test_hallucination_avoidance_phrase() {
        assert!(is_hallucinated(
            "I cannot help with artificial intelligence questions",
            "Explain artificial intelligence",
        ));
        assert_eq!(
            is_hallucinated("I CANNOT answer", "anything"),
            is_hallucinated("i cannot answer", "anything"),
        );
    }

    #[test]
    fn test_hallucination_relevance() {
        assert!(!is_hallucinated(
            "Artificial intelligence is the study of intelligent agents.",
            "Explain artificial intelligence in simple terms",
        ));
        assert!(is_hallucinated(
            "Bananas are yellow.",
            "Explain artificial intelligence in simple terms",
        ));
    }

    #[test]
    fn test_hallucination_short_prompt_limitation() {
        // "Hello" alone can never reach two qualifying words.
        assert!(is_hallucinated("Hello there, I'm doing well", "Hello"));
    }

    #[test]
    fn test_hallucination_custom_phrases() {
        let validator = ResponseValidator::with_phrases(
            AvoidancePhrases::empty().with_language("en", ["no comment"]),
        );
        let verdict = validator.check_hallucination("No comment on services.", "services today");
        assert!(verdict.is_fail());
        assert!(verdict.reason.unwrap().contains("no comment"));

        // Built-in phrases are gone from a custom table.
        let verdict = validator.check_hallucination(
            "I cannot list available services",
            "list available services",
        );
        assert!(verdict.is_pass());
    }

    #[test]
    fn test_sanitized() {
        assert!(is_sanitized(
            "<script>alert(1)</script>",
            "&lt;script&gt;alert(1)&lt;/script&gt;"
        ));
        assert!(!is_sanitized("hello", "<script>alert(1)</script>"));
        assert!(!is_sanitized("x", "click javascript:void(0)"));
    }

    #[test]
    fn test_sanitized_identity_fails_for_benign_input() {
        let verdict = ResponseValidator::new().check_sanitized("hello", "hello");
        assert!(verdict.is_fail());
        assert_eq!(
            verdict.reason.as_deref(),
            Some("rendered output is identical to raw input")
        );
    }

    #[test]
    fn test_verdict_serializes_check_name() {
        let json = serde_json::to_value(Verdict::pass(CheckKind::MultilingualConsistency)).unwrap();
        assert_eq!(json["check"], "multilingual_consistency");
        assert_eq!(json["passed"], true);
        assert!(json.get("reason").is_none());
    }
}
