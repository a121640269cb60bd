//! lisp-harness: cross-dialect verification harness for Lisp sources.
//!
//! Candidate sources are compiled/loaded and then tested with each
//! dialect's own toolchain (Clojure, ClojureScript, Common Lisp, Emacs Lisp,
//! Scheme). Results are aggregated per dialect and reported as a summary
//! or a JSON record.

pub mod cli;
pub mod dialect;
pub mod error;
pub mod harness;
pub mod metrics;
pub mod report;
pub mod sexp;

// Re-export commonly used error types
pub use error::{ConfigError, DialectError, RecordError, ReportError};
