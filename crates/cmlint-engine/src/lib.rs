//! # cmlint-engine — Compliance-Profile Validation & Hiera Compilation
//!
//! Validates a corpus of compliance-profile documents against the fixed
//! v2.0.0 schema and compiles, per profile and per confinement context,
//! the flattened Hiera parameter map consumed by downstream automation.
//!
//! ## Pipeline
//!
//! ```text
//! paths ──▶ store (parse + deep merge)
//!              │
//!              ▼
//!        rules (shape checks, per document)
//!              │
//!              ▼
//!        confine (context enumeration from the merged view)
//!              │
//!              ▼
//!        hiera (confined merge, cross-reference, parameter resolution)
//!              │
//!              ▼
//!        Report { errors, warnings, notes }
//! ```
//!
//! The engine is single-threaded and fully synchronous. Diagnostics
//! accumulate in one [`Report`]; no unit of work can abort another — a
//! malformed document or an unresolvable profile is reported and the run
//! continues.
//!
//! ## Crate Policy
//!
//! - Depends only on `cmlint-core` internally.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod confine;
pub mod hiera;
pub mod rules;
pub mod store;

use std::path::PathBuf;

pub use cmlint_core::{Report, Value};
pub use confine::ConfinementContext;
pub use hiera::HieraResult;
pub use store::{Corpus, LoadError, MERGED_KEY};

/// Validation driver: owns the corpus and the accumulated report.
///
/// One `Linter` corresponds to one run. Nothing persists between runs.
#[derive(Debug)]
pub struct Linter {
    corpus: Corpus,
    report: Report,
}

impl Linter {
    /// Ingest the given input locations and build the corpus.
    ///
    /// Unparseable files are recorded in the report and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when a location exists neither as a file nor
    /// as a directory — the only fatal condition of a run.
    pub fn new(paths: &[PathBuf]) -> Result<Linter, LoadError> {
        let mut report = Report::new();
        let corpus = store::load_corpus(paths, &mut report)?;
        Ok(Linter { corpus, report })
    }

    /// Run the full validation: schema rules over every document, then
    /// Hiera compilation for every profile — once unconfined and once per
    /// derived confinement context.
    pub fn validate(&mut self) {
        if self.corpus.is_empty() {
            tracing::warn!("no data: no input location produced a parseable document");
            return;
        }

        rules::lint_corpus(&self.corpus, &mut self.report);

        let contexts = confine::enumerate_contexts(self.corpus.merged());
        tracing::debug!(contexts = contexts.len(), "derived confinement contexts");

        let profiles: Vec<String> = self
            .corpus
            .merged()
            .get("profiles")
            .and_then(|p| p.as_mapping().ok())
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();

        if profiles.is_empty() {
            self.report.note("no profiles found");
            return;
        }

        for profile in &profiles {
            hiera::compile(&self.corpus, profile, None, &mut self.report);
            for context in &contexts {
                hiera::compile(&self.corpus, profile, Some(context), &mut self.report);
            }
        }
    }

    /// Compile the Hiera parameter map for one profile under an optional
    /// confinement context, appending diagnostics to this run's report.
    pub fn compile_hiera(
        &mut self,
        profile: &str,
        context: Option<&ConfinementContext>,
    ) -> HieraResult {
        hiera::compile(&self.corpus, profile, context, &mut self.report)
    }

    /// The corpus built for this run.
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Paths of successfully loaded files, excluding the merged view.
    pub fn files(&self) -> Vec<&str> {
        self.corpus.files()
    }

    /// Errors recorded so far, in append order.
    pub fn errors(&self) -> &[String] {
        self.report.errors()
    }

    /// Warnings recorded so far, in append order.
    pub fn warnings(&self) -> &[String] {
        self.report.warnings()
    }

    /// Notes recorded so far, in append order.
    pub fn notes(&self) -> &[String] {
        self.report.notes()
    }

    /// The full report.
    pub fn report(&self) -> &Report {
        &self.report
    }
}
