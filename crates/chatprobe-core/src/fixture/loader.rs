//! Fixture parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use super::schema::validate_fixture_schema;
use crate::phrases::AvoidancePhrases;
use crate::validator::ResponseValidator;

/// Security scenario tag for script injection prompts.
pub const SCRIPT_INJECTION: &str = "script_injection";

/// Security scenario tag for prompt injection prompts.
pub const PROMPT_INJECTION: &str = "prompt_injection";

/// Errors that can occur when loading fixtures.
///
/// All of these indicate a broken test environment rather than a defect in
/// the system under test, and are fatal for any scenario that needs the data.
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Failed to read fixture file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Fixture schema violation: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Fixture validation failed: {0}")]
    Validation(String),

    #[error("Query '{query}' has no {field} for language '{language}'")]
    MissingLanguage {
        query: String,
        language: String,
        field: &'static str,
    },

    #[error("Unknown query: {0}")]
    UnknownQuery(String),

    #[error("Unknown security test: {0}")]
    UnknownSecurityTest(String),
}

/// A prompt with its expected keywords, per language.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    /// Stable identifier (e.g., "services")
    pub id: String,

    /// Prompt text keyed by language code
    pub prompts: BTreeMap<String, String>,

    /// Expected keywords keyed by language code; an empty list means no constraint
    #[serde(default)]
    pub expected_keywords: BTreeMap<String, Vec<String>>,
}

impl Query {
    /// Prompt text for a language.
    pub fn prompt(&self, language: &str) -> Result<&str, FixtureError> {
        self.prompts
            .get(language)
            .map(String::as_str)
            .ok_or_else(|| self.missing(language, "prompt"))
    }

    /// Expected keywords for a language.
    pub fn expected_keywords(&self, language: &str) -> Result<&[String], FixtureError> {
        self.expected_keywords
            .get(language)
            .map(Vec::as_slice)
            .ok_or_else(|| self.missing(language, "expected keywords"))
    }

    /// Resolve prompt and keywords for a language in one step.
    pub fn resolve(&self, language: &str) -> Result<ResolvedQuery, FixtureError> {
        Ok(ResolvedQuery {
            query_id: self.id.clone(),
            language: language.to_string(),
            prompt: self.prompt(language)?.to_string(),
            expected_keywords: self.expected_keywords(language)?.to_vec(),
        })
    }

    /// Languages this query has a prompt for.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.prompts.keys().map(String::as_str)
    }

    fn missing(&self, language: &str, field: &'static str) -> FixtureError {
        FixtureError::MissingLanguage {
            query: self.id.clone(),
            language: language.to_string(),
            field,
        }
    }
}

/// A query resolved for one language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedQuery {
    pub query_id: String,
    pub language: String,
    pub prompt: String,
    pub expected_keywords: Vec<String>,
}

/// An adversarial prompt tagged by scenario name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityPrompt {
    /// Scenario tag (e.g., "script_injection", "prompt_injection")
    pub name: String,

    /// The prompt to submit
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Numeric thresholds read by scenarios.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationRules {
    /// Maximum acceptable time until a response appears
    pub max_response_time_ms: u64,
}

impl ValidationRules {
    pub fn max_response_time(&self) -> Duration {
        Duration::from_millis(self.max_response_time_ms)
    }

    /// True when `elapsed` does not exceed the maximum response time.
    pub fn within_response_time(&self, elapsed: Duration) -> bool {
        elapsed <= self.max_response_time()
    }
}

/// The full set of fixtures for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Common queries checked for quality and relevance
    pub queries: Vec<Query>,

    /// Adversarial prompts
    #[serde(default)]
    pub security_tests: Vec<SecurityPrompt>,

    /// Thresholds
    pub validation_rules: ValidationRules,

    /// Overrides the built-in avoidance-phrase table when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avoidance_phrases: Option<AvoidancePhrases>,
}

impl FixtureSet {
    /// Parse fixtures from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse fixtures from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, FixtureError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Load fixtures from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let fixtures = if is_json_path(path) {
            Self::from_json(&contents)?
        } else {
            Self::from_yaml(&contents)?
        };

        info!(
            path = %path.display(),
            queries = fixtures.queries.len(),
            security_tests = fixtures.security_tests.len(),
            "loaded fixtures"
        );
        Ok(fixtures)
    }

    fn from_value(value: serde_json::Value) -> Result<Self, FixtureError> {
        validate_fixture_schema(&value).map_err(FixtureError::SchemaViolation)?;
        let fixtures: FixtureSet = serde_json::from_value(value)?;
        fixtures.validate()?;
        Ok(fixtures)
    }

    /// Semantic checks the schema cannot express.
    pub fn validate(&self) -> Result<(), FixtureError> {
        if self.queries.is_empty() {
            return Err(FixtureError::Validation("no queries defined".to_string()));
        }

        let mut seen = HashSet::new();
        for query in &self.queries {
            if !seen.insert(query.id.as_str()) {
                return Err(FixtureError::Validation(format!(
                    "Duplicate query ID: {}",
                    query.id
                )));
            }

            if query.prompts.is_empty() {
                return Err(FixtureError::Validation(format!(
                    "query '{}' has no prompts",
                    query.id
                )));
            }

            for language in query.prompts.keys() {
                query.expected_keywords(language)?;
            }
            for language in query.expected_keywords.keys() {
                query.prompt(language)?;
            }
        }

        let mut seen = HashSet::new();
        for test in &self.security_tests {
            if !seen.insert(test.name.as_str()) {
                return Err(FixtureError::Validation(format!(
                    "Duplicate security test: {}",
                    test.name
                )));
            }
        }

        if self.validation_rules.max_response_time_ms == 0 {
            return Err(FixtureError::Validation(
                "validation_rules.max_response_time_ms must be positive".to_string(),
            ));
        }

        if let Some(phrases) = &self.avoidance_phrases {
            phrases.validate()?;
        }

        Ok(())
    }

    /// Languages every query has a prompt for.
    pub fn languages(&self) -> Vec<String> {
        let mut queries = self.queries.iter();
        let Some(first) = queries.next() else {
            return Vec::new();
        };

        let mut common: BTreeSet<&str> = first.languages().collect();
        for query in queries {
            let langs: BTreeSet<&str> = query.languages().collect();
            common = common.intersection(&langs).copied().collect();
        }
        common.into_iter().map(str::to_string).collect()
    }

    /// Look up a query by id.
    pub fn query(&self, id: &str) -> Result<&Query, FixtureError> {
        self.queries
            .iter()
            .find(|q| q.id == id)
            .ok_or_else(|| FixtureError::UnknownQuery(id.to_string()))
    }

    /// Resolve one query for one language.
    pub fn resolve(&self, query_id: &str, language: &str) -> Result<ResolvedQuery, FixtureError> {
        self.query(query_id)?.resolve(language)
    }

    /// Resolve every query for one language.
    ///
    /// Fails on the first query missing that language.
    pub fn resolve_all(&self, language: &str) -> Result<Vec<ResolvedQuery>, FixtureError> {
        self.queries.iter().map(|q| q.resolve(language)).collect()
    }

    /// Look up a security prompt by scenario tag.
    pub fn security_prompt(&self, name: &str) -> Result<&SecurityPrompt, FixtureError> {
        self.security_tests
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| FixtureError::UnknownSecurityTest(name.to_string()))
    }

    /// The avoidance table for this run: the fixture's own, or the built-in one.
    pub fn avoidance_phrases(&self) -> AvoidancePhrases {
        self.avoidance_phrases.clone().unwrap_or_default()
    }

    /// A validator configured with this fixture set's avoidance table.
    pub fn validator(&self) -> ResponseValidator {
        ResponseValidator::with_phrases(self.avoidance_phrases())
    }
}

pub(crate) fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
