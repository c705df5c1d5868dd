//! # Diagnostics Report
//!
//! Three independent, append-only sequences — errors, warnings, notes —
//! accumulated over the lifetime of one validation run. Entries are never
//! deduplicated: the same finding reported twice means the corpus contains
//! it twice.
//!
//! The report is an explicit context object passed `&mut` into every rule
//! and compile call. There is no process-wide diagnostic state.

use serde::Serialize;

/// Severity of a single diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Structurally required data is wrong; the run is considered failed.
    Error,
    /// Schema laxness or suspicious redefinition; the run still passes.
    Warning,
    /// Benign observation recorded for operator visibility.
    Note,
}

/// Append-only diagnostics accumulated during a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    errors: Vec<String>,
    warnings: Vec<String>,
    notes: Vec<String>,
}

impl Report {
    /// An empty report.
    pub fn new() -> Report {
        Report::default()
    }

    /// Append an error.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Append a warning.
    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Append a note.
    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    /// Append under an explicit severity.
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        match severity {
            Severity::Error => self.error(message),
            Severity::Warning => self.warning(message),
            Severity::Note => self.note(message),
        }
    }

    /// All errors, in append order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// All warnings, in append order.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// All notes, in append order.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// True when no diagnostics of any severity have been recorded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty() && self.notes.is_empty()
    }

    /// True when no errors have been recorded (warnings and notes allowed).
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    /// Append every entry of `other`, preserving its internal order.
    pub fn merge(&mut self, other: Report) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.notes.extend(other.notes);
    }
}
