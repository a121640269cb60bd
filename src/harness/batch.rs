//! Batch runner: streams JSONL records through the evaluator.
//!
//! Each record is decoded and evaluated inside its own fault boundary, so a
//! malformed line, an unsupported dialect, or even a panicking evaluation
//! becomes an entry in the aggregate instead of aborting the run. Up to
//! `parallel` evaluations are in flight; completions are folded in input
//! order at a single point, so the statistics do not depend on parallelism.

use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::config::HarnessConfig;
use super::evaluator::Evaluator;
use super::request::parse_record;
use super::stats::AggregateStats;
use super::verdict::Verdict;
use crate::error::RecordError;
use crate::metrics::MetricsCollector;

/// Result of processing one input line.
#[derive(Debug)]
enum Step {
    Evaluated(Verdict),
    Rejected { line: usize, error: String },
}

/// Aborts the wrapped task if dropped before completion.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Splits a reader into raw lines (without `\n` or a trailing `\r`).
///
/// A read error is yielded once and ends the stream.
pub fn record_lines<R>(reader: R) -> impl Stream<Item = io::Result<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    async_stream::stream! {
        let mut segments = reader.split(b'\n');
        loop {
            match segments.next_segment().await {
                Ok(Some(mut bytes)) => {
                    if bytes.last() == Some(&b'\r') {
                        bytes.pop();
                    }
                    yield Ok(bytes);
                }
                Ok(None) => break,
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    }
}

/// Drives a batch of records through an [`Evaluator`].
#[derive(Debug, Clone)]
pub struct BatchRunner {
    evaluator: Arc<Evaluator>,
    parallel: usize,
    sample_limit: usize,
    metrics: MetricsCollector,
}

impl BatchRunner {
    pub fn new(evaluator: Arc<Evaluator>, config: &HarnessConfig) -> Self {
        Self {
            evaluator,
            parallel: config.parallel.max(1),
            sample_limit: config.sample_limit,
            metrics: MetricsCollector::new(),
        }
    }

    /// Runs every line of a JSONL file. Only failing to open the file is an error.
    pub async fn run_file<F>(&self, path: &Path, shutdown: F) -> io::Result<AggregateStats>
    where
        F: Future<Output = ()>,
    {
        let file = tokio::fs::File::open(path).await?;
        info!(dataset = %path.display(), parallel = self.parallel, "Starting batch");
        let lines = record_lines(BufReader::new(file));
        Ok(self.run_until(lines, shutdown).await)
    }

    /// Runs all lines to exhaustion.
    pub async fn run<S>(&self, lines: S) -> AggregateStats
    where
        S: Stream<Item = io::Result<Vec<u8>>>,
    {
        self.run_until(lines, std::future::pending()).await
    }

    /// Runs lines until exhausted or until `shutdown` resolves.
    ///
    /// On shutdown, in-flight evaluations are dropped (releasing their
    /// temporary files and killing their process groups) and the partial
    /// statistics are returned with `interrupted` set.
    pub async fn run_until<S, F>(&self, lines: S, shutdown: F) -> AggregateStats
    where
        S: Stream<Item = io::Result<Vec<u8>>>,
        F: Future<Output = ()>,
    {
        let evaluator = Arc::clone(&self.evaluator);
        let steps = lines
            .enumerate()
            .map(move |(index, line)| process_line(Arc::clone(&evaluator), index + 1, line))
            .buffered(self.parallel);
        let mut steps = std::pin::pin!(steps);
        let mut shutdown = std::pin::pin!(shutdown);

        let mut stats = AggregateStats::new(self.sample_limit);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!(processed = stats.total_examples + stats.structural_errors, "Batch interrupted");
                    stats.interrupted = true;
                    break;
                }
                step = steps.next() => match step {
                    Some(Step::Evaluated(verdict)) => stats.record_verdict(verdict),
                    Some(Step::Rejected { line, error }) => {
                        warn!(line = line, error = %error, "Skipping record");
                        self.metrics.record_record_error();
                        stats.record_structural_error(line, error);
                    }
                    None => break,
                },
            }
        }

        info!(
            total = stats.total_examples,
            compile_success = stats.compile_success,
            both_success = stats.both_success,
            errors = stats.errors.len(),
            "Batch finished"
        );
        stats
    }
}

/// Decodes and evaluates one line inside its own task.
async fn process_line(evaluator: Arc<Evaluator>, line: usize, raw: io::Result<Vec<u8>>) -> Step {
    let bytes = match raw {
        Ok(bytes) => bytes,
        Err(e) => {
            return Step::Rejected {
                line,
                error: RecordError::Read(e.to_string()).to_string(),
            };
        }
    };
    let request = match parse_record(line, &bytes) {
        Ok(request) => request,
        Err(e) => {
            return Step::Rejected {
                line,
                error: e.to_string(),
            };
        }
    };

    let mut task = AbortOnDrop(tokio::spawn(async move {
        evaluator.evaluate_request(&request).await
    }));
    match (&mut task.0).await {
        Ok(verdict) => Step::Evaluated(verdict),
        Err(e) => Step::Rejected {
            line,
            error: format!("Unexpected error: {}", e),
        },
    }
}
