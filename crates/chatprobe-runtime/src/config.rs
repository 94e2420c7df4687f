//! Runtime configuration.
//!
//! Durations are written in human-readable form (`"30s"`, `"500ms"`,
//! `"1m 30s"`) and parsed with `humantime`.

use chatprobe_core::AppConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const LANGUAGE_KEY: &str = "runtime.language";
pub const IDLE_TIMEOUT_KEY: &str = "runtime.idle_timeout";
pub const PAUSE_KEY: &str = "runtime.pause_between_prompts";
pub const LONG_INPUT_REPEAT_KEY: &str = "runtime.long_input_repeat";

/// Errors from runtime configuration.
#[derive(Error, Debug)]
pub enum RuntimeConfigError {
    #[error("Failed to read runtime config: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid duration for '{key}': {source}")]
    InvalidDuration {
        key: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("Invalid number for '{key}': {value}")]
    InvalidNumber { key: String, value: String },

    #[error("Runtime config invalid: {0}")]
    Invalid(String),
}

/// Settings for a scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Language code the run targets (e.g., "en", "ar")
    pub language: String,

    /// Upper bound on waiting for the session to go idle after a prompt
    #[serde(with = "duration_str")]
    pub idle_timeout: Duration,

    /// Pause between consecutive prompts in multi-prompt scenarios
    #[serde(with = "duration_str")]
    pub pause_between_prompts: Duration,

    /// How many times the filler phrase is repeated in the long-input prompt
    pub long_input_repeat: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            idle_timeout: Duration::from_secs(30),
            pause_between_prompts: Duration::from_secs(3),
            long_input_repeat: 100,
        }
    }
}

impl RuntimeConfig {
    /// Create a config for a language with default timings.
    pub fn for_language(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Default::default()
        }
    }

    /// Parse a config from YAML (JSON is valid YAML).
    pub fn from_yaml(yaml: &str) -> Result<Self, RuntimeConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RuntimeConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Read `runtime.*` keys from the harness config; absent keys keep defaults.
    pub fn from_app_config(app: &AppConfig) -> Result<Self, RuntimeConfigError> {
        let mut config = Self::default();

        if let Some(language) = app.get(LANGUAGE_KEY) {
            config.language = language.to_string();
        }
        if let Some(value) = app.get(IDLE_TIMEOUT_KEY) {
            config.idle_timeout = parse_duration(IDLE_TIMEOUT_KEY, value)?;
        }
        if let Some(value) = app.get(PAUSE_KEY) {
            config.pause_between_prompts = parse_duration(PAUSE_KEY, value)?;
        }
        if let Some(value) = app.get(LONG_INPUT_REPEAT_KEY) {
            config.long_input_repeat =
                value
                    .trim()
                    .parse()
                    .map_err(|_| RuntimeConfigError::InvalidNumber {
                        key: LONG_INPUT_REPEAT_KEY.to_string(),
                        value: value.to_string(),
                    })?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), RuntimeConfigError> {
        if self.language.trim().is_empty() {
            return Err(RuntimeConfigError::Invalid(
                "language must not be empty".to_string(),
            ));
        }
        if self.idle_timeout.is_zero() {
            return Err(RuntimeConfigError::Invalid(
                "idle_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, RuntimeConfigError> {
    humantime::parse_duration(value.trim()).map_err(|source| RuntimeConfigError::InvalidDuration {
        key: key.to_string(),
        source,
    })
}

/// Serde adapter for human-readable durations.
pub(crate) mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom)
    }
}
