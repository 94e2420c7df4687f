//! Property tests for the response validators.

use chatprobe_core::{
    is_hallucinated, is_multilingual_consistent, is_quality_response, is_sanitized,
    AvoidancePhrases, ResponseValidator,
};
use proptest::prelude::*;

const NO_KEYWORDS: &[&str] = &[];

/// Text without markup brackets or sentence terminators.
fn plain_text() -> impl Strategy<Value = String> {
    "[a-zA-Z ,]{0,60}"
}

proptest! {
    #[test]
    fn trailing_ellipsis_or_dashes_always_fail(
        body in "[a-zA-Z][a-zA-Z ,]{0,60}",
        suffix in prop::sample::select(vec!["...", "--"]),
        keyword in "[a-z]{1,8}",
    ) {
        let response = format!("{} {} {}", keyword, body, suffix);
        prop_assert!(!is_quality_response(&response, &[keyword.as_str()]));
        prop_assert!(!is_quality_response(&response, NO_KEYWORDS));
    }

    #[test]
    fn unterminated_opening_tag_always_fails(before in plain_text(), attrs in "[a-z =']{0,20}") {
        let response = format!("{}<div{}", before, attrs);
        prop_assert!(!is_quality_response(&response, NO_KEYWORDS));
    }

    #[test]
    fn empty_keywords_only_depend_on_structure(text in "[a-zA-Z .!?<>-]{0,80}") {
        let validator = ResponseValidator::new();
        let with_none = validator.check_quality(&text, NO_KEYWORDS).passed;
        let structural = !text.trim().is_empty()
            && !chatprobe_core::validator::patterns::has_incomplete_thought(&text)
            && !chatprobe_core::validator::patterns::has_malformed_markup(&text);
        prop_assert_eq!(with_none, structural);
    }

    #[test]
    fn avoidance_phrase_always_hallucinated(
        before in plain_text(),
        after in plain_text(),
        prompt in "[a-zA-Z ]{0,60}",
    ) {
        let response = format!("{} I cannot {}", before, after);
        prop_assert!(is_hallucinated(&response, &prompt));
    }

    #[test]
    fn hallucination_is_case_insensitive(response in "[a-zA-Z ]{0,60}", prompt in "[a-zA-Z ]{0,60}") {
        prop_assert_eq!(
            is_hallucinated(&response.to_uppercase(), &prompt),
            is_hallucinated(&response.to_lowercase(), &prompt),
        );
    }

    #[test]
    fn identical_output_is_never_sanitized(text in ".{0,80}") {
        prop_assert!(!is_sanitized(&text, &text));
    }

    #[test]
    fn script_tag_is_never_sanitized(input in ".{0,40}", before in ".{0,40}", after in ".{0,40}") {
        let output = format!("{}<script>{}", before, after);
        prop_assert!(!is_sanitized(&input, &output));
    }

    #[test]
    fn short_side_is_never_consistent(short in "[a-z]{0,10}", long in "[a-z]{11,40}") {
        prop_assert!(!is_multilingual_consistent(&short, &long));
        prop_assert!(!is_multilingual_consistent(&long, &short));
    }

    #[test]
    fn validators_never_panic(a in any::<String>(), b in any::<String>()) {
        let validator = ResponseValidator::with_phrases(AvoidancePhrases::builtin());
        let _ = validator.check_quality(&a, &[b.as_str()]);
        let _ = validator.check_multilingual(&a, &b);
        let _ = validator.check_hallucination(&a, &b);
        let _ = validator.check_sanitized(&a, &b);
    }
}

#[test]
fn hello_prompt_is_flagged_by_coarse_relevance() {
    assert!(is_hallucinated("Hello there, I'm doing well", "Hello"));
}

#[test]
fn services_query_passes_quality() {
    assert!(is_quality_response(
        "We offer several services for your business",
        &["service", "available"],
    ));
}
