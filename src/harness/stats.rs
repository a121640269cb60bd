//! Aggregate statistics accumulated over a batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::verdict::Verdict;

/// Success counters for one dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectCounts {
    pub total: usize,
    pub compile_success: usize,
    pub test_success: usize,
    pub both_success: usize,
    pub timeouts: usize,
}

impl DialectCounts {
    fn record(&mut self, verdict: &Verdict) {
        self.total += 1;
        if verdict.compile_success {
            self.compile_success += 1;
        }
        if verdict.test_success {
            self.test_success += 1;
        }
        if verdict.is_pass() {
            self.both_success += 1;
        }
        if verdict.is_timeout() {
            self.timeouts += 1;
        }
    }
}

/// Whether an error came from the input or from an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The record could not be turned into a request.
    Structural,
    /// The request was evaluated and its verdict carries an error.
    Evaluation,
}

/// One entry of the error listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub line: usize,
    pub kind: ErrorKind,
    pub error: String,
}

/// A verdict retained verbatim for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub line: Option<usize>,
    pub repo: Option<String>,
    pub path: Option<String>,
    pub dialect: String,
    pub result: Verdict,
}

/// Running totals for a batch.
///
/// Per-dialect counters always sum to the overall counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_examples: usize,
    pub compile_success: usize,
    pub test_success: usize,
    pub both_success: usize,
    pub timeouts: usize,
    pub structural_errors: usize,
    pub by_dialect: BTreeMap<String, DialectCounts>,
    pub errors: Vec<ErrorRecord>,
    pub examples: Vec<SampleRecord>,
    pub sample_limit: usize,
    pub interrupted: bool,
}

impl AggregateStats {
    pub fn new(sample_limit: usize) -> Self {
        Self {
            total_examples: 0,
            compile_success: 0,
            test_success: 0,
            both_success: 0,
            timeouts: 0,
            structural_errors: 0,
            by_dialect: BTreeMap::new(),
            errors: Vec::new(),
            examples: Vec::new(),
            sample_limit,
            interrupted: false,
        }
    }

    /// Folds one verdict into the totals.
    pub fn record_verdict(&mut self, verdict: Verdict) {
        self.total_examples += 1;
        if verdict.compile_success {
            self.compile_success += 1;
        }
        if verdict.test_success {
            self.test_success += 1;
        }
        if verdict.is_pass() {
            self.both_success += 1;
        }
        if verdict.is_timeout() {
            self.timeouts += 1;
        }
        self.by_dialect
            .entry(verdict.dialect.clone())
            .or_default()
            .record(&verdict);

        let line = verdict.provenance.line.unwrap_or(0);
        if let Some(error) = &verdict.error {
            self.errors.push(ErrorRecord {
                line,
                kind: ErrorKind::Evaluation,
                error: error.clone(),
            });
        }

        if self.examples.len() < self.sample_limit {
            self.examples.push(SampleRecord {
                line: verdict.provenance.line,
                repo: verdict.provenance.repo.clone(),
                path: verdict.provenance.path.clone(),
                dialect: verdict.dialect.clone(),
                result: verdict,
            });
        }
    }

    /// Records a record that never became a request.
    pub fn record_structural_error(&mut self, line: usize, error: impl Into<String>) {
        self.structural_errors += 1;
        self.errors.push(ErrorRecord {
            line,
            kind: ErrorKind::Structural,
            error: error.into(),
        });
    }

    /// Compile success rate in percent.
    pub fn compile_rate(&self) -> f64 {
        rate(self.compile_success, self.total_examples)
    }

    /// Test success rate in percent.
    pub fn test_rate(&self) -> f64 {
        rate(self.test_success, self.total_examples)
    }

    /// Both-stages success rate in percent.
    pub fn both_rate(&self) -> f64 {
        rate(self.both_success, self.total_examples)
    }
}

impl Default for AggregateStats {
    fn default() -> Self {
        Self::new(super::config::DEFAULT_SAMPLE_LIMIT)
    }
}

/// `part / total` as a percentage, 0.0 for an empty total.
pub fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}
