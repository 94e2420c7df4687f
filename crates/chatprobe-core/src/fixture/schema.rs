//! JSON Schema validation for fixture files.
//!
//! Fixture documents (JSON or YAML) are checked against
//! `schema/fixtures.schema.json` before deserialization, so a malformed file
//! reports every problem with its location instead of the first serde error.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded fixture schema (loaded at compile time).
const FIXTURE_SCHEMA_JSON: &str = include_str!("../../schema/fixtures.schema.json");

static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, SchemaError>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid schema JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Failed to compile schema: {0}")]
    Compile(String),
}

fn compile_schema(source: &str) -> Result<jsonschema::Validator, SchemaError> {
    let schema: serde_json::Value = serde_json::from_str(source)?;
    jsonschema::options()
        .build(&schema)
        .map_err(|e| SchemaError::Compile(e.to_string()))
}

/// The fixture schema, compiled on first use.
fn fixture_validator() -> Result<&'static jsonschema::Validator, &'static SchemaError> {
    COMPILED_SCHEMA
        .get_or_init(|| compile_schema(FIXTURE_SCHEMA_JSON))
        .as_ref()
}

/// Validate a fixture document against the schema.
///
/// Returns every violation as `"<message> at <instance path>"`.
pub fn validate_fixture_schema(fixture_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = fixture_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(fixture_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check if a fixture document is valid against the schema.
pub fn is_valid_fixture(fixture_json: &serde_json::Value) -> bool {
    fixture_validator()
        .map(|v| v.is_valid(fixture_json))
        .unwrap_or(false)
}
