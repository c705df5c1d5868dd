//! # cmlint CLI entry point
//!
//! Parses command-line arguments, initializes tracing from the verbosity
//! level, and runs the lint.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cmlint_cli::lint::{run_lint, LintArgs};

/// Compliance data linter.
///
/// Lints compliance-profile data files against the v2.0.0 schema and
/// compiles every profile's Hiera parameters under every confinement
/// context, reporting errors, warnings, and notes.
#[derive(Parser, Debug)]
#[command(name = "cmlint", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    lint: LintArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level; the environment still
    // wins when RUST_LOG is set.
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run_lint(&cli.lint) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
