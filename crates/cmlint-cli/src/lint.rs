//! # Lint Run
//!
//! Drives a full lint of the given input locations and prints the
//! accumulated diagnostics, one per line, prefixed by severity.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use cmlint_engine::Linter;

/// Arguments for a lint run.
#[derive(Args, Debug)]
pub struct LintArgs {
    /// Files or directories holding compliance profile data.
    #[arg(value_name = "PATH", default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Suppress notes in the output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Treat warnings as failures.
    #[arg(short, long)]
    pub strict: bool,
}

/// Execute a lint run.
///
/// Returns exit code: 0 when the run passed, 1 when diagnostics failed it.
/// An input location that exists neither as a file nor as a directory is
/// an operational error and surfaces as `Err`.
pub fn run_lint(args: &LintArgs) -> Result<u8> {
    let mut linter = Linter::new(&args.paths).context("failed to load input data")?;
    linter.validate();

    tracing::info!(files = linter.files().len(), "corpus loaded");

    for error in linter.errors() {
        println!("ERROR: {error}");
    }
    for warning in linter.warnings() {
        println!("WARN: {warning}");
    }
    if !args.quiet {
        for note in linter.notes() {
            println!("NOTE: {note}");
        }
    }

    println!(
        "{} file(s): {} error(s), {} warning(s), {} note(s)",
        linter.files().len(),
        linter.errors().len(),
        linter.warnings().len(),
        linter.notes().len()
    );

    let failed = !linter.errors().is_empty() || (args.strict && !linter.warnings().is_empty());
    if failed {
        Ok(1)
    } else {
        Ok(0)
    }
}
