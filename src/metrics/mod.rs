//! Prometheus metrics for harness runs.
//!
//! # Example
//!
//! ```ignore
//! use lisp_harness::metrics::{init_metrics, export_metrics};
//!
//! init_metrics()?;
//! // ... run a batch ...
//! std::fs::write("metrics.prom", export_metrics())?;
//! ```

pub mod collectors;
pub mod prometheus;

pub use collectors::{InFlightGuard, MetricsCollector};
pub use prometheus::{export_metrics, init_metrics};

pub use prometheus::{
    EVALUATIONS_IN_FLIGHT, EVALUATIONS_TOTAL, RECORD_ERRORS_TOTAL, REGISTRY, STAGE_DURATION,
};
