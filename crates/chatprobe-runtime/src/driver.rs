//! Session driver boundary.
//!
//! A [`SessionDriver`] is whatever puts a prompt in front of the chat
//! interface and reads back what it rendered: a browser session, an HTTP
//! client, or the in-memory [`ScriptedDriver`]. It owns all waiting and retry
//! policy; validators only ever see the materialised response text.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Errors from session drivers.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Session not ready: {0}")]
    NotReady(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Session closed")]
    Closed,

    #[error("Session error: {0}")]
    Session(String),
}

/// A chat session under test.
///
/// # Contract
/// - `submit_prompt` types and sends one prompt
/// - `wait_until_idle` returns `Ok(false)` if the session is still busy when
///   the timeout elapses; that is not an error
/// - `latest_response_text` returns the most recent rendered response, or an
///   empty string if none has appeared yet
#[async_trait]
pub trait SessionDriver: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        "session"
    }

    async fn submit_prompt(&self, text: &str) -> Result<(), DriverError>;

    async fn latest_response_text(&self) -> Result<String, DriverError>;

    async fn wait_until_idle(&self, timeout: Duration) -> Result<bool, DriverError>;
}

/// Canned prompt → response pairs for a [`ScriptedDriver`].
///
/// ```yaml
/// latency: 250ms
/// fallback: "I'm happy to help with that."
/// responses:
///   "What services are available?": "We offer several services."
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    /// Simulated time until each response is rendered
    #[serde(default, with = "crate::config::duration_str")]
    pub latency: Duration,

    /// Response for prompts not listed in `responses`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,

    #[serde(default)]
    pub responses: BTreeMap<String, String>,
}

impl Transcript {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            DriverError::NotReady(format!("cannot read transcript {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&contents).map_err(|e| {
            DriverError::NotReady(format!("invalid transcript {}: {}", path.display(), e))
        })
    }
}

#[derive(Debug, Clone)]
struct Exchange {
    prompt: String,
    response: String,
    submitted_at: Instant,
}

/// In-memory driver that answers from a [`Transcript`].
///
/// Responses become visible `latency` after submission, measured on the
/// tokio clock so paused-time tests stay deterministic.
pub struct ScriptedDriver {
    transcript: Transcript,
    exchanges: Mutex<Vec<Exchange>>,
    closed: Mutex<bool>,
}

impl ScriptedDriver {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript,
            exchanges: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
        }
    }

    /// Driver that answers every prompt with the same text.
    pub fn echoing(response: impl Into<String>) -> Self {
        Self::new(Transcript {
            fallback: Some(response.into()),
            ..Default::default()
        })
    }

    pub fn with_response(mut self, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        self.transcript
            .responses
            .insert(prompt.into(), response.into());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.transcript.latency = latency;
        self
    }

    /// Prompts submitted so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.exchanges
            .lock()
            .iter()
            .map(|e| e.prompt.clone())
            .collect()
    }

    /// Reject all further calls.
    pub fn close(&self) {
        *self.closed.lock() = true;
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if *self.closed.lock() {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }

    fn remaining_latency(&self) -> Duration {
        self.exchanges
            .lock()
            .last()
            .map(|e| self.transcript.latency.saturating_sub(e.submitted_at.elapsed()))
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionDriver for ScriptedDriver {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn submit_prompt(&self, text: &str) -> Result<(), DriverError> {
        self.ensure_open()?;

        let response = self
            .transcript
            .responses
            .get(text)
            .or(self.transcript.fallback.as_ref())
            .cloned()
            .unwrap_or_default();

        self.exchanges.lock().push(Exchange {
            prompt: text.to_string(),
            response,
            submitted_at: Instant::now(),
        });
        Ok(())
    }

    async fn latest_response_text(&self) -> Result<String, DriverError> {
        self.ensure_open()?;

        let exchanges = self.exchanges.lock();
        Ok(exchanges
            .iter()
            .rev()
            .find(|e| e.submitted_at.elapsed() >= self.transcript.latency)
            .map(|e| e.response.clone())
            .unwrap_or_default())
    }

    async fn wait_until_idle(&self, timeout: Duration) -> Result<bool, DriverError> {
        self.ensure_open()?;

        let remaining = self.remaining_latency();
        if remaining > timeout {
            tokio::time::sleep(timeout).await;
            return Ok(false);
        }
        tokio::time::sleep(remaining).await;
        Ok(true)
    }
}
