//! Shared detection patterns for response validation.
//!
//! The regexes here are compiled once and reused by every check in
//! [`ResponseValidator`](super::ResponseValidator). Keeping the shapes in one
//! place means a new heuristic is added here without touching verdict logic.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Malformed markup, as a single alternation over three tag shapes:
    /// - an opening `<` with no closing `>` before end of text
    /// - a closing `>` with no `<` anywhere before it
    /// - an opening `<` followed by another `<` (or end of text) before any `>`
    pub static ref MALFORMED_MARKUP_PATTERN: Regex = Regex::new(
        r"<[^>]*$|^[^<]*>|<[^>]*(<|$)"
    ).unwrap();

    /// Runs of sentence terminators.
    pub static ref SENTENCE_TERMINATOR_PATTERN: Regex = Regex::new(r"[.!?]+").unwrap();
}

/// Suffixes that mark a response as trailing off mid-thought.
pub const INCOMPLETE_SUFFIXES: &[&str] = &["...", "--"];

/// Prompt words must be longer than this (in characters) to count toward relevance.
pub const MIN_RELEVANT_WORD_CHARS: usize = 3;

/// Count sentence-terminator-delimited segments.
///
/// Trailing empty segments are discarded, so text made only of terminators
/// (`"..."`, `"?!"`) has zero segments while `"Hi"` has one.
pub fn count_sentences(text: &str) -> usize {
    if text.trim().is_empty() {
        return 0;
    }

    let mut segments: Vec<&str> = SENTENCE_TERMINATOR_PATTERN.split(text).collect();
    while segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    segments.len()
}

/// Check if text trails off or has no sentence content at all.
pub fn has_incomplete_thought(text: &str) -> bool {
    let trimmed = text.trim();
    INCOMPLETE_SUFFIXES.iter().any(|s| trimmed.ends_with(s)) || count_sentences(text) == 0
}

/// Check if text contains an unbalanced angle-bracket tag.
pub fn has_malformed_markup(text: &str) -> bool {
    MALFORMED_MARKUP_PATTERN.is_match(text)
}

/// Check if text contains any keyword, case-insensitively.
///
/// An empty keyword list is vacuously satisfied.
pub fn contains_any_keyword<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    if keywords.is_empty() {
        return true;
    }

    let lower = text.to_lowercase();
    keywords
        .iter()
        .any(|kw| lower.contains(&kw.as_ref().to_lowercase()))
}

/// Distinct lower-cased prompt words longer than [`MIN_RELEVANT_WORD_CHARS`]
/// that appear as substrings of the response.
pub fn matching_prompt_words(response: &str, prompt: &str) -> Vec<String> {
    let lower_response = response.to_lowercase();
    let mut matched: Vec<String> = Vec::new();

    for word in prompt.to_lowercase().split_whitespace() {
        if word.chars().count() <= MIN_RELEVANT_WORD_CHARS {
            continue;
        }
        if lower_response.contains(word) && !matched.iter().any(|m| m == word) {
            matched.push(word.to_string());
        }
    }

    matched
}
