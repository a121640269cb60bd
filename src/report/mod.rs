//! Human-readable and serialized reports.
//!
//! Rendering only reads [`AggregateStats`] and [`Verdict`]; nothing here
//! touches the evaluation pipeline.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReportError;
use crate::harness::{rate, AggregateStats, Verdict};

/// Label used when a record carries no repo or path.
const UNKNOWN_LABEL: &str = "?";

/// Renders the batch summary.
///
/// Shows at most `error_limit` entries of the error listing.
pub fn render_summary(stats: &AggregateStats, error_limit: usize) -> String {
    let mut out = String::new();
    let total = stats.total_examples;

    if total == 0 {
        let _ = writeln!(out, "No examples to evaluate");
    } else {
        let _ = writeln!(out, "\n=== Lisp-Fixer Evaluation Results ===");
        let _ = writeln!(out, "Total examples: {}", total);
        let _ = writeln!(
            out,
            "Compile success: {}/{} ({:.1}%)",
            stats.compile_success,
            total,
            stats.compile_rate()
        );
        let _ = writeln!(
            out,
            "Test success: {}/{} ({:.1}%)",
            stats.test_success,
            total,
            stats.test_rate()
        );
        let _ = writeln!(
            out,
            "Both success: {}/{} ({:.1}%)",
            stats.both_success,
            total,
            stats.both_rate()
        );
        if stats.timeouts > 0 {
            let _ = writeln!(out, "Timeouts: {}", stats.timeouts);
        }
    }
    if stats.structural_errors > 0 {
        let _ = writeln!(out, "Malformed records: {}", stats.structural_errors);
    }
    if stats.interrupted {
        let _ = writeln!(out, "Run interrupted: results are partial");
    }

    if total > 0 {
        let _ = writeln!(out, "\n--- By Dialect ---");
        for (dialect, counts) in &stats.by_dialect {
            let _ = writeln!(
                out,
                "{}: {}/{} ({:.1}%) both success",
                dialect,
                counts.both_success,
                counts.total,
                rate(counts.both_success, counts.total)
            );
        }
    }

    if !stats.errors.is_empty() {
        let _ = writeln!(out, "\n--- Errors ({} total) ---", stats.errors.len());
        for error in stats.errors.iter().take(error_limit) {
            let _ = writeln!(out, "Line {}: {}", error.line, error.error);
        }
        if stats.errors.len() > error_limit {
            let _ = writeln!(out, "... and {} more errors", stats.errors.len() - error_limit);
        }
    }

    if !stats.examples.is_empty() {
        let _ = writeln!(out, "\n--- Example Results ---");
        for example in &stats.examples {
            let status = if example.result.is_pass() { "✓" } else { "✗" };
            let _ = writeln!(
                out,
                "{} {}/{} ({})",
                status,
                example.repo.as_deref().unwrap_or(UNKNOWN_LABEL),
                example.path.as_deref().unwrap_or(UNKNOWN_LABEL),
                example.dialect
            );
        }
    }

    out
}

/// Renders the single-example result.
pub fn render_verdict(file: &Path, dialect: &str, verdict: &Verdict) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\nFile: {}", file.display());
    let _ = writeln!(out, "Dialect: {}", dialect);
    let _ = writeln!(out, "Compile success: {}", verdict.compile_success);
    let _ = writeln!(out, "Test success: {}", verdict.test_success);
    if let Some(error) = &verdict.error {
        let _ = writeln!(out, "Error: {}", error);
    }
    out
}

/// Persisted record of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dataset: String,
    /// Counters, listings and the `interrupted` flag.
    #[serde(flatten)]
    pub stats: AggregateStats,
}

impl BatchReport {
    pub fn new(dataset: impl Into<String>, started_at: DateTime<Utc>, stats: AggregateStats) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            dataset: dataset.into(),
            stats,
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the report as pretty JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
