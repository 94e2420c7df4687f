//! # chatprobe-core
//!
//! Deterministic response validation for chat UI test suites.
//!
//! This crate answers, for a response captured from a chat interface:
//! - Is it complete, well-formed and on topic?
//! - Is it a canned refusal, or unrelated to the prompt?
//! - Was executable markup neutralised before rendering?
//!
//! ## Key Guarantees
//!
//! 1. **Pure**: Validators do no I/O and hold no mutable state
//! 2. **Total**: Blank or odd input yields a negative verdict, never an error
//! 3. **Explicit config**: Fixtures and settings are immutable values passed by reference
//! 4. **Parallel-safe**: Validators are `Send + Sync` and need no locking
//!
//! ## Example
//!
//! ```rust,ignore
//! use chatprobe_core::{FixtureSet, is_quality_response, is_hallucinated};
//!
//! let fixtures = FixtureSet::from_file("fixtures.yaml")?;
//! let query = fixtures.query("services")?.resolve("en")?;
//! let response = "We offer several services for your business.";
//!
//! assert!(is_quality_response(response, &query.expected_keywords));
//! assert!(!is_hallucinated(response, &query.prompt));
//! ```

pub mod config;
pub mod fixture;
pub mod language;
pub mod phrases;
pub mod validator;

// Re-export main types at crate root
pub use config::{AppConfig, ConfigError, Selectors};
pub use fixture::{
    FixtureError, FixtureSet, Query, ResolvedQuery, SecurityPrompt, ValidationRules,
    PROMPT_INJECTION, SCRIPT_INJECTION,
};
pub use language::{expected_direction, is_rtl, TextDirection};
pub use phrases::AvoidancePhrases;
pub use validator::{
    is_hallucinated, is_multilingual_consistent, is_quality_response, is_sanitized, CheckKind,
    ResponseValidator, Verdict,
};
