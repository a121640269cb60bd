//! Evaluation harness.
//!
//! Runs candidate Lisp sources through a dialect's compile/load and test
//! toolchains:
//! 1. Materialize the source in a scoped temporary file
//! 2. Run the compile stage under a timeout
//! 3. Run the test stage only if compilation succeeded
//! 4. Fold the result into a [`Verdict`]
//!
//! [`BatchRunner`] drives a JSONL dataset through the [`Evaluator`] and
//! accumulates [`AggregateStats`].

pub mod batch;
pub mod config;
pub mod evaluator;
pub mod process;
pub mod request;
pub mod source;
pub mod stats;
pub mod verdict;

pub use batch::{record_lines, BatchRunner};
pub use config::HarnessConfig;
pub use evaluator::Evaluator;
pub use process::{run_stage, StageOutcome};
pub use request::{parse_record, EvaluationRequest};
pub use source::ScopedSource;
pub use stats::{rate, AggregateStats, DialectCounts, ErrorKind, ErrorRecord, SampleRecord};
pub use verdict::{
    FailureKind, Provenance, Stage, Verdict, COMPILE_TIMEOUT_MARKER, TEST_TIMEOUT_MARKER,
};
