//! Subcommand implementations.
//!
//! Each command returns `Ok(true)` on pass, `Ok(false)` on a failed check and
//! `Err` when its inputs cannot be loaded.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use chatprobe_core::{
    expected_direction, AppConfig, AvoidancePhrases, FixtureError, FixtureSet, ResolvedQuery,
    ResponseValidator, SecurityPrompt, TextDirection, Verdict,
};
use chatprobe_runtime::{
    RunReport, RuntimeConfig, Scenario, ScenarioRunner, ScriptedDriver, Transcript,
};

use crate::{CheckCommands, FixtureCommands};

pub struct RunArgs {
    pub fixtures: PathBuf,
    pub transcript: PathBuf,
    pub config: Option<PathBuf>,
    pub language: Option<String>,
    pub scenarios: Vec<String>,
}

pub fn check(cmd: CheckCommands, json: bool) -> Result<bool> {
    let verdict = match cmd {
        CheckCommands::Quality { response, keywords } => {
            ResponseValidator::new().check_quality(&response, &keywords)
        }
        CheckCommands::Hallucination {
            response,
            prompt,
            phrases,
        } => {
            let phrases = match phrases {
                Some(path) => AvoidancePhrases::from_file(&path).with_context(|| {
                    format!("loading avoidance phrases from {}", path.display())
                })?,
                None => AvoidancePhrases::builtin(),
            };
            ResponseValidator::with_phrases(phrases).check_hallucination(&response, &prompt)
        }
        CheckCommands::Sanitized { input, output } => {
            ResponseValidator::new().check_sanitized(&input, &output)
        }
        CheckCommands::Multilingual { primary, secondary } => {
            ResponseValidator::new().check_multilingual(&primary, &secondary)
        }
    };

    print_verdict(&verdict, json)?;
    Ok(verdict.passed)
}

fn print_verdict(verdict: &Verdict, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(verdict)?);
    } else if verdict.passed {
        println!("PASS {}", verdict.check.as_str());
    } else {
        println!(
            "FAIL {}: {}",
            verdict.check.as_str(),
            verdict.reason.as_deref().unwrap_or("check failed")
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct ValidationSummary {
    file: String,
    valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
    queries: usize,
    security_tests: usize,
    languages: Vec<String>,
}

#[derive(Serialize)]
struct FixtureView<'a> {
    language: &'a str,
    direction: TextDirection,
    max_response_time_ms: u64,
    queries: Vec<ResolvedQuery>,
    security_tests: &'a [SecurityPrompt],
}

pub fn fixtures(cmd: FixtureCommands, json: bool) -> Result<bool> {
    match cmd {
        FixtureCommands::Validate { file } => validate_fixtures(&file, json),
        FixtureCommands::Show { file, language } => {
            let set = FixtureSet::from_file(&file)
                .with_context(|| format!("loading fixtures from {}", file.display()))?;
            let view = FixtureView {
                language: &language,
                direction: expected_direction(&language),
                max_response_time_ms: set.validation_rules.max_response_time_ms,
                queries: set.resolve_all(&language)?,
                security_tests: &set.security_tests,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{}", serde_yaml::to_string(&view)?);
            }
            Ok(true)
        }
    }
}

fn validate_fixtures(file: &Path, json: bool) -> Result<bool> {
    let mut summary = ValidationSummary {
        file: file.display().to_string(),
        valid: false,
        errors: Vec::new(),
        queries: 0,
        security_tests: 0,
        languages: Vec::new(),
    };

    match FixtureSet::from_file(file) {
        Ok(set) => {
            summary.valid = true;
            summary.queries = set.queries.len();
            summary.security_tests = set.security_tests.len();
            summary.languages = set.languages();
        }
        Err(FixtureError::SchemaViolation(errors)) => summary.errors = errors,
        Err(e) => summary.errors.push(e.to_string()),
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if summary.valid {
        println!(
            "✓ {} is valid ({} queries, {} security tests, languages: {})",
            summary.file,
            summary.queries,
            summary.security_tests,
            summary.languages.join(", ")
        );
    } else {
        println!("✗ {} is invalid:", summary.file);
        for error in &summary.errors {
            println!("  - {}", error);
        }
    }

    Ok(summary.valid)
}

pub async fn run(args: RunArgs, json: bool) -> Result<bool> {
    let fixtures = FixtureSet::from_file(&args.fixtures)
        .with_context(|| format!("loading fixtures from {}", args.fixtures.display()))?;
    let transcript = Transcript::from_file(&args.transcript)?;

    let mut config = match &args.config {
        Some(path) => {
            let app = AppConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            RuntimeConfig::from_app_config(&app)?
        }
        None => RuntimeConfig::default(),
    };
    if let Some(language) = args.language {
        config.language = language;
    }

    let scenarios = if args.scenarios.is_empty() {
        Scenario::ALL.to_vec()
    } else {
        args.scenarios
            .iter()
            .map(|name| Scenario::from_name(name))
            .collect::<Result<Vec<_>, _>>()?
    };

    info!(
        language = %config.language,
        scenarios = scenarios.len(),
        "starting run"
    );

    let driver = Arc::new(ScriptedDriver::new(transcript));
    let runner = ScenarioRunner::new(driver, Arc::new(fixtures), config);
    let report = runner.run_selected(&scenarios).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report.passed())
}

fn print_report(report: &RunReport) {
    println!(
        "chatprobe run (language: {}, driver: {})",
        report.language, report.driver
    );

    for outcome in &report.outcomes {
        let status = if !outcome.passed {
            "FAIL"
        } else if outcome.skipped {
            "SKIP"
        } else {
            "PASS"
        };
        println!(
            "  {} {} ({} prompt(s), {} ms)",
            status,
            outcome.scenario,
            outcome.prompts_sent,
            outcome.elapsed.as_millis()
        );
        if let Some(error) = &outcome.error {
            println!("       error: {}", error);
        }
        for failure in &outcome.failures {
            println!("       - {}", failure);
        }
        for note in &outcome.notes {
            println!("       note: {}", note);
        }
    }

    let passed = report.outcomes.iter().filter(|o| o.passed).count();
    println!(
        "{}/{} scenarios passed",
        passed,
        report.outcomes.len()
    );
}
