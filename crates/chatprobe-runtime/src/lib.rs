//! # chatprobe-runtime
//!
//! End-to-end scenarios for chat interfaces.
//!
//! The validators in `chatprobe-core` only judge text. This crate supplies
//! the text: a [`SessionDriver`] submits prompts and reads back rendered
//! responses, and a [`ScenarioRunner`] walks the fixture set through the
//! standard scenarios (common queries, formatting, response time, fallback,
//! injection, special characters, long input, multilingual).
//!
//! ## Example
//!
//! ```rust,ignore
//! use chatprobe_core::FixtureSet;
//! use chatprobe_runtime::{RuntimeConfig, ScenarioRunner, ScriptedDriver, Transcript};
//! use std::sync::Arc;
//!
//! let fixtures = Arc::new(FixtureSet::from_file("fixtures.yaml")?);
//! let driver = Arc::new(ScriptedDriver::new(Transcript::from_file("transcript.yaml")?));
//! let runner = ScenarioRunner::new(driver, fixtures, RuntimeConfig::for_language("en"));
//!
//! let report = runner.run_all().await?;
//! assert!(report.passed());
//! ```

pub mod config;
pub mod driver;
pub mod scenarios;

pub use config::{RuntimeConfig, RuntimeConfigError};
pub use driver::{DriverError, ScriptedDriver, SessionDriver, Transcript};
pub use scenarios::{RunReport, Scenario, ScenarioError, ScenarioOutcome, ScenarioRunner};
