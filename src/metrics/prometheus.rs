//! Prometheus metrics registration and export.
//!
//! This module defines the Prometheus metrics recorded by the harness and
//! provides functions for initializing, registering, and exporting them.

use prometheus::{Counter, CounterVec, Encoder, Gauge, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all harness metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Total evaluations, labeled by dialect and outcome (`pass` or a failure kind).
pub static EVALUATIONS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Stage duration in seconds, labeled by dialect and stage.
pub static STAGE_DURATION: OnceLock<HistogramVec> = OnceLock::new();

/// Records that never became an evaluation request.
pub static RECORD_ERRORS_TOTAL: OnceLock<Counter> = OnceLock::new();

/// Evaluations currently running.
pub static EVALUATIONS_IN_FLIGHT: OnceLock<Gauge> = OnceLock::new();

/// Initialize all metrics and register them with the registry.
///
/// Call once at startup. Later calls build a fresh registry that is then
/// discarded, so the first registration wins.
///
/// # Errors
///
/// Returns a `prometheus::Error` if metric registration fails.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let registry = Registry::new();

    let evaluations_total = CounterVec::new(
        Opts::new(
            "lisp_harness_evaluations_total",
            "Total number of candidate evaluations",
        ),
        &["dialect", "outcome"],
    )?;

    let stage_duration = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "lisp_harness_stage_duration_seconds",
            "Toolchain stage duration in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["dialect", "stage"],
    )?;

    let record_errors_total = Counter::new(
        "lisp_harness_record_errors_total",
        "Total batch records rejected before evaluation",
    )?;

    let evaluations_in_flight = Gauge::new(
        "lisp_harness_evaluations_in_flight",
        "Number of evaluations currently running",
    )?;

    registry.register(Box::new(evaluations_total.clone()))?;
    registry.register(Box::new(stage_duration.clone()))?;
    registry.register(Box::new(record_errors_total.clone()))?;
    registry.register(Box::new(evaluations_in_flight.clone()))?;

    // Already-set cells mean metrics were initialized earlier.
    let _ = REGISTRY.set(registry);
    let _ = EVALUATIONS_TOTAL.set(evaluations_total);
    let _ = STAGE_DURATION.set(stage_duration);
    let _ = RECORD_ERRORS_TOTAL.set(record_errors_total);
    let _ = EVALUATIONS_IN_FLIGHT.set(evaluations_in_flight);

    tracing::debug!("Prometheus metrics initialized");

    Ok(())
}

/// Export all registered metrics in Prometheus text format.
///
/// Returns a comment line instead when the registry is not initialized or
/// encoding fails.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized. Call init_metrics() first.\n".to_string();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# Error encoding metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
        assert!(REGISTRY.get().is_some());
    }

    #[test]
    fn test_export_after_init() {
        init_metrics().unwrap();
        if let Some(counter) = RECORD_ERRORS_TOTAL.get() {
            counter.inc();
        }

        let text = export_metrics();
        assert!(!text.starts_with("# Error"));
        assert!(text.contains("lisp_harness_record_errors_total"));
    }
}
