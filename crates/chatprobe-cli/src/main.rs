//! chatprobe CLI
//!
//! Exit codes: 0 when every check passes, 1 when a check or scenario fails,
//! 2 when inputs cannot be loaded.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

const EXIT_PASS: i32 = 0;
const EXIT_FAIL: i32 = 1;
const EXIT_ERROR: i32 = 2;

/// Response checks and end-to-end scenario runs for chat interfaces
#[derive(Parser)]
#[command(name = "chatprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single validator on literal text
    #[command(subcommand)]
    Check(CheckCommands),

    /// Inspect fixture files
    #[command(subcommand)]
    Fixtures(FixtureCommands),

    /// Run scenarios against a scripted transcript
    Run {
        /// Fixture set (YAML or JSON)
        #[arg(long)]
        fixtures: PathBuf,

        /// Transcript of canned responses
        #[arg(long)]
        transcript: PathBuf,

        /// Harness config with `runtime.*` keys
        #[arg(long)]
        config: Option<PathBuf>,

        /// Language to run (overrides config)
        #[arg(long)]
        language: Option<String>,

        /// Only run the named scenario (repeatable)
        #[arg(long = "scenario")]
        scenarios: Vec<String>,
    },
}

#[derive(Subcommand)]
enum CheckCommands {
    /// Completeness, markup and keyword relevance
    Quality {
        #[arg(long)]
        response: String,

        /// Expected keyword; any one suffices (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,
    },

    /// Avoidance phrases and prompt relevance
    Hallucination {
        #[arg(long)]
        response: String,

        #[arg(long)]
        prompt: String,

        /// Avoidance phrase table (YAML or JSON)
        #[arg(long)]
        phrases: Option<PathBuf>,
    },

    /// Executable markup in rendered output
    Sanitized {
        #[arg(long)]
        input: String,

        #[arg(long)]
        output: String,
    },

    /// Both language variants produced content
    Multilingual {
        #[arg(long)]
        primary: String,

        #[arg(long)]
        secondary: String,
    },
}

#[derive(Subcommand)]
enum FixtureCommands {
    /// Validate a fixture file against the schema and semantic rules
    Validate { file: PathBuf },

    /// Show the queries resolved for one language
    Show {
        file: PathBuf,

        #[arg(long)]
        language: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Check(cmd) => commands::check(cmd, cli.json),
        Commands::Fixtures(cmd) => commands::fixtures(cmd, cli.json),
        Commands::Run {
            fixtures,
            transcript,
            config,
            language,
            scenarios,
        } => {
            let args = commands::RunArgs {
                fixtures,
                transcript,
                config,
                language,
                scenarios,
            };
            commands::run(args, cli.json).await
        }
    };

    let code = match result {
        Ok(true) => EXIT_PASS,
        Ok(false) => EXIT_FAIL,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };
    std::process::exit(code);
}
