//! Error types for lisp-harness operations.
//!
//! Defines error types for the subsystems that can fail outside of a verdict:
//! - Dialect registry lookups and descriptor validation
//! - Batch record decoding
//! - Harness configuration loading
//! - Report persistence
//!
//! Toolchain failures and timeouts are not errors here: they are expected
//! outcomes and are recorded inside a [`crate::harness::Verdict`].

use thiserror::Error;

/// Errors that can occur during dialect registry operations.
#[derive(Debug, Error)]
pub enum DialectError {
    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("Invalid dialect descriptor '{tag}': {reason}")]
    InvalidDescriptor { tag: String, reason: String },
}

/// Errors that can occur while decoding one batch record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("JSON decode error: {0}")]
    Decode(String),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Read error: {0}")]
    Read(String),
}

/// Errors that can occur while loading or validating harness configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Dialect error: {0}")]
    Dialect(#[from] DialectError),
}

/// Errors that can occur while persisting a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
