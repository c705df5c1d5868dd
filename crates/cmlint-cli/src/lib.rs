//! # cmlint-cli — Compliance Data Linter CLI
//!
//! Provides the `cmlint` command-line interface over the validation and
//! Hiera compilation engine in `cmlint-engine`.
//!
//! ```bash
//! cmlint                       # lint the current directory
//! cmlint data/ extra.yaml      # lint a directory plus a single file
//! cmlint --strict data/        # warnings also fail the run
//! cmlint --quiet data/         # suppress notes
//! ```
//!
//! Exit codes: 0 when the run passed, 1 when diagnostics failed it, 2 on
//! an operational error such as an input location that does not exist.

pub mod lint;
