//! Fixture model.
//!
//! Fixtures are structured test data: prompts per language, expected keywords
//! per language, adversarial prompts tagged by scenario, and validation
//! thresholds. They are loaded once, validated against an embedded JSON
//! Schema, and read-only afterwards.

mod loader;
mod schema;

pub use loader::{
    FixtureError, FixtureSet, Query, ResolvedQuery, SecurityPrompt, ValidationRules,
    PROMPT_INJECTION, SCRIPT_INJECTION,
};
pub use schema::{is_valid_fixture, validate_fixture_schema, SchemaError};

pub(crate) use loader::is_json_path;
