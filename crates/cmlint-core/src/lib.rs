//! # cmlint-core — Foundational Types for Compliance-Profile Linting
//!
//! This crate is the leaf of the cmlint DAG: the generic document tree
//! parsed from compliance-profile YAML/JSON, the append-only diagnostics
//! report, and the structured errors raised while working with either.
//! Every other crate in the workspace depends on `cmlint-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Tagged variants, not dynamic typing.** The [`Value`] tree makes the
//!    shape of untrusted input explicit. Down-casting is a fallible,
//!    type-named operation — never a silent coercion.
//!
//! 2. **Diagnostics are data.** The [`Report`] carries three independent
//!    append-only sequences. Rules and compilers receive it `&mut` and
//!    append; nothing in the workspace holds shared mutable diagnostic
//!    state.
//!
//! 3. **Order is meaning.** Mappings preserve insertion order because
//!    document discovery order drives merge resolution and conflict
//!    messages. Re-running an unchanged corpus yields byte-identical
//!    diagnostics.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cmlint-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod report;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use report::{Report, Severity};
pub use value::{Value, ValueError, KNOCKOUT_PREFIX};
