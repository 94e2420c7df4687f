//! Avoidance-phrase table.
//!
//! Canned refusal / inability phrases, keyed by language code. A response
//! containing any of them is classified as hallucinated regardless of its
//! relevance to the prompt.
//!
//! The table ships with English and Arabic defaults and can be replaced from
//! YAML/JSON, either standalone or through the `avoidance_phrases` section of a
//! fixture file:
//!
//! ```yaml
//! en:
//!   - "i cannot"
//!   - "as an ai"
//! fr:
//!   - "je ne peux pas"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::fixture::FixtureError;

/// Avoidance phrases per language code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct AvoidancePhrases {
    by_language: BTreeMap<String, Vec<String>>,
}

impl AvoidancePhrases {
    /// Create an empty table (nothing is ever flagged by phrase).
    pub fn empty() -> Self {
        Self {
            by_language: BTreeMap::new(),
        }
    }

    /// The built-in English and Arabic table.
    pub fn builtin() -> Self {
        Self::empty()
            .with_language("en", ["i cannot", "i'm not able", "as an ai", "i don't have"])
            .with_language("ar", ["لا أستطيع", "غير قادر", "كمنظمة ذكاء اصطناعي"])
    }

    /// Add (or replace) the phrases for a language.
    pub fn with_language<I, S>(mut self, language: impl Into<String>, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.by_language
            .insert(language.into(), phrases.into_iter().map(Into::into).collect());
        self
    }

    /// Parse a table from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, FixtureError> {
        let table: AvoidancePhrases = serde_yaml::from_str(yaml)?;
        table.validate()?;
        Ok(table)
    }

    /// Parse a table from JSON.
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        let table: AvoidancePhrases = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Load a table from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        if crate::fixture::is_json_path(path) {
            Self::from_json(&contents)
        } else {
            Self::from_yaml(&contents)
        }
    }

    /// Reject empty phrases, which would match every response.
    pub(crate) fn validate(&self) -> Result<(), FixtureError> {
        for (language, phrases) in &self.by_language {
            if phrases.iter().any(|p| p.trim().is_empty()) {
                return Err(FixtureError::Validation(format!(
                    "empty avoidance phrase for language '{}'",
                    language
                )));
            }
        }
        Ok(())
    }

    /// Language codes with at least one phrase.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.by_language
            .iter()
            .filter(|(_, phrases)| !phrases.is_empty())
            .map(|(lang, _)| lang.as_str())
    }

    /// Phrases configured for one language.
    pub fn phrases(&self, language: &str) -> &[String] {
        self.by_language
            .get(language)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of phrases across all languages.
    pub fn len(&self) -> usize {
        self.by_language.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the first phrase (any language) contained in `text`, case-insensitively.
    ///
    /// Responses are not tagged with a language, so every language is searched.
    pub fn find_in(&self, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        self.by_language
            .values()
            .flatten()
            .find(|phrase| lower.contains(&phrase.to_lowercase()))
            .map(String::as_str)
    }
}

impl Default for AvoidancePhrases {
    fn default() -> Self {
        Self::builtin()
    }
}
