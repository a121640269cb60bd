//! Command-line interface for lisp-harness.
//!
//! Provides the batch and single-file evaluation modes plus registry and
//! S-expression inspection commands.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
