//! Recording interface over the raw Prometheus metrics.
//!
//! Every method is a no-op until [`init_metrics`](super::init_metrics) has
//! run, so library users and tests need not set anything up.

use super::prometheus::{EVALUATIONS_IN_FLIGHT, EVALUATIONS_TOTAL, RECORD_ERRORS_TOTAL, STAGE_DURATION};
use crate::harness::{FailureKind, Stage, Verdict};

/// Metrics collector for harness operations.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector;

/// Decrements the in-flight gauge when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(gauge) = EVALUATIONS_IN_FLIGHT.get() {
            gauge.dec();
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    /// Marks an evaluation as running until the returned guard drops.
    pub fn evaluation_started(&self) -> InFlightGuard {
        if let Some(gauge) = EVALUATIONS_IN_FLIGHT.get() {
            gauge.inc();
        }
        InFlightGuard { _private: () }
    }

    /// Records a finished evaluation and the durations of the stages it ran.
    pub fn record_verdict(&self, verdict: &Verdict) {
        let outcome = outcome_label(verdict);
        if let Some(total) = EVALUATIONS_TOTAL.get() {
            total.with_label_values(&[verdict.dialect.as_str(), outcome.as_str()]).inc();
        }

        if let Some(duration) = STAGE_DURATION.get() {
            if ran_toolchain(verdict) {
                duration
                    .with_label_values(&[verdict.dialect.as_str(), Stage::Compile.as_str()])
                    .observe(verdict.compile_duration_secs);
            }
            if let Some(secs) = verdict.test_duration_secs {
                duration
                    .with_label_values(&[verdict.dialect.as_str(), Stage::Test.as_str()])
                    .observe(secs);
            }
        }

        tracing::trace!(
            dialect = %verdict.dialect,
            outcome = %outcome,
            "Recorded evaluation metric"
        );
    }

    /// Records a batch record that could not be decoded.
    pub fn record_record_error(&self) {
        if let Some(counter) = RECORD_ERRORS_TOTAL.get() {
            counter.inc();
        }
        tracing::trace!("Recorded record error metric");
    }
}

/// False for verdicts rejected before the compile stage started.
fn ran_toolchain(verdict: &Verdict) -> bool {
    !matches!(
        verdict.failure,
        Some(FailureKind::UnsupportedDialect | FailureKind::MalformedSource | FailureKind::SourceIo)
    )
}

/// `pass`, or the failure kind of a failed verdict.
fn outcome_label(verdict: &Verdict) -> String {
    match verdict.failure {
        _ if verdict.is_pass() => "pass".to_string(),
        Some(kind) => kind.to_string(),
        None => "fail".to_string(),
    }
}
