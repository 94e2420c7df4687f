//! Harness configuration.
//!
//! A flat, immutable key/value store: selectors, target URL, browser choice
//! and the mobile-emulation flag. Built once at startup and passed by
//! reference; nothing here is global.
//!
//! Files may be flat (`chat.input.selector: "#prompt"`) or nested
//! (`chat: { input: { selector: "#prompt" } }`); nested maps are flattened to
//! dotted keys. Scalar values are stored as strings.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const APP_URL: &str = "app.url";
pub const BROWSER: &str = "browser";
pub const TEST_MOBILE: &str = "test.mobile";
pub const INPUT_SELECTOR: &str = "chat.input.selector";
pub const SEND_SELECTOR: &str = "chat.send.selector";
pub const RESPONSE_SELECTOR: &str = "chat.response.selector";
pub const LOADING_SELECTOR: &str = "chat.loading.selector";

/// Errors that can occur when loading or reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config root must be a map of keys to values")]
    NotAMap,

    #[error("Config key '{0}' must hold a string, number or boolean")]
    UnsupportedValue(String),

    #[error("Missing required config key: {0}")]
    MissingKey(String),
}

/// Element selectors for the chat page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selectors {
    pub input: String,
    pub send: String,
    pub response: String,
    /// Some pages have no loading indicator
    pub loading: Option<String>,
}

/// Immutable configuration store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AppConfig {
    values: BTreeMap<String, String>,
}

impl AppConfig {
    /// Build a config from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse a config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(&value)
    }

    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Load a config from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = if crate::fixture::is_json_path(path) {
            Self::from_json(&contents)?
        } else {
            Self::from_yaml(&contents)?
        };

        info!(path = %path.display(), keys = config.len(), "loaded config");
        Ok(config)
    }

    fn from_value(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let map = value.as_object().ok_or(ConfigError::NotAMap)?;
        let mut values = BTreeMap::new();
        flatten_into(&mut values, None, map)?;
        Ok(Self { values })
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Look up a key that must be present.
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    pub fn app_url(&self) -> Result<&str, ConfigError> {
        self.require(APP_URL)
    }

    pub fn browser(&self) -> Result<&str, ConfigError> {
        self.require(BROWSER)
    }

    /// Mobile emulation flag; anything but a case-insensitive "true" is false.
    pub fn is_mobile(&self) -> bool {
        self.get(TEST_MOBILE)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    /// Chat page selectors; input, send and response are required.
    pub fn selectors(&self) -> Result<Selectors, ConfigError> {
        Ok(Selectors {
            input: self.require(INPUT_SELECTOR)?.to_string(),
            send: self.require(SEND_SELECTOR)?.to_string(),
            response: self.require(RESPONSE_SELECTOR)?.to_string(),
            loading: self.get(LOADING_SELECTOR).map(str::to_string),
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn flatten_into(
    out: &mut BTreeMap<String, String>,
    prefix: Option<&str>,
    map: &serde_json::Map<String, serde_json::Value>,
) -> Result<(), ConfigError> {
    use serde_json::Value;

    for (key, value) in map {
        let full_key = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key.clone(),
        };

        match value {
            Value::String(s) => {
                out.insert(full_key, s.clone());
            }
            Value::Bool(b) => {
                out.insert(full_key, b.to_string());
            }
            Value::Number(n) => {
                out.insert(full_key, n.to_string());
            }
            Value::Object(nested) => flatten_into(out, Some(&full_key), nested)?,
            Value::Null => {}
            Value::Array(_) => return Err(ConfigError::UnsupportedValue(full_key)),
        }
    }

    Ok(())
}
