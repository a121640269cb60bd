//! Single-example evaluator.
//!
//! Maps a (source, dialect) pair to a [`Verdict`]: materialize the source,
//! run the compile/load stage, and run the test stage only if compilation
//! succeeded. Every fault is folded into the verdict; nothing here returns
//! an error to the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::config::HarnessConfig;
use super::process::run_stage;
use super::request::EvaluationRequest;
use super::source::ScopedSource;
use super::verdict::{FailureKind, Stage, Verdict};
use crate::dialect::{DialectDescriptor, DialectRegistry};
use crate::error::ConfigError;
use crate::metrics::MetricsCollector;
use crate::sexp;

/// Evaluates candidates against the registered toolchains.
#[derive(Debug, Clone)]
pub struct Evaluator {
    registry: Arc<DialectRegistry>,
    compile_timeout: Duration,
    test_timeout: Duration,
    max_error_chars: usize,
    precheck: bool,
    temp_dir: Option<PathBuf>,
    metrics: MetricsCollector,
}

impl Evaluator {
    /// Creates an evaluator over a shared registry.
    pub fn new(registry: Arc<DialectRegistry>, config: &HarnessConfig) -> Self {
        Self {
            registry,
            compile_timeout: config.compile_timeout(),
            test_timeout: config.test_timeout(),
            max_error_chars: config.max_error_chars,
            precheck: config.precheck,
            temp_dir: config.temp_dir.clone(),
            metrics: MetricsCollector::new(),
        }
    }

    /// Validates `config` and builds the evaluator with its effective registry.
    pub fn from_config(config: &HarnessConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = Arc::new(config.registry()?);
        Ok(Self::new(registry, config))
    }

    /// Overrides both stage timeouts.
    pub fn with_timeouts(mut self, compile: Duration, test: Duration) -> Self {
        self.compile_timeout = compile;
        self.test_timeout = test;
        self
    }

    /// Evaluates `source` under `dialect` using a scoped temporary file.
    pub async fn evaluate(&self, source: &str, dialect: &str) -> Verdict {
        let _in_flight = self.metrics.evaluation_started();
        let verdict = self.evaluate_source(source, dialect).await;
        self.metrics.record_verdict(&verdict);
        verdict
    }

    /// Evaluates a batch request, carrying its provenance into the verdict.
    pub async fn evaluate_request(&self, request: &EvaluationRequest) -> Verdict {
        let _in_flight = self.metrics.evaluation_started();
        let verdict = self
            .evaluate_source(&request.source, &request.dialect)
            .await
            .with_provenance(request.provenance.clone());
        self.metrics.record_verdict(&verdict);
        verdict
    }

    /// Evaluates an existing file in place; no temporary copy is made.
    pub async fn evaluate_path(&self, path: &Path, dialect: &str) -> Verdict {
        let _in_flight = self.metrics.evaluation_started();
        let verdict = self.evaluate_existing(path, dialect).await;
        self.metrics.record_verdict(&verdict);
        verdict
    }

    async fn evaluate_source(&self, source: &str, dialect: &str) -> Verdict {
        let descriptor = match self.resolve(dialect) {
            Ok(descriptor) => descriptor,
            Err(verdict) => return verdict,
        };
        if let Some(verdict) = self.precheck_rejects(source, dialect) {
            return verdict;
        }

        let scoped = match ScopedSource::create(source, &descriptor.extension, self.temp_dir.as_deref()) {
            Ok(scoped) => scoped,
            Err(e) => {
                warn!(dialect = %dialect, error = %e, "Failed to materialize source");
                return Verdict::rejected(
                    dialect,
                    FailureKind::SourceIo,
                    format!("failed to write temporary source: {}", e),
                );
            }
        };

        let mut verdict = Verdict::pending(dialect);
        self.run_stages(descriptor, scoped.path(), &mut verdict).await;
        scoped.close();
        verdict
    }

    async fn evaluate_existing(&self, path: &Path, dialect: &str) -> Verdict {
        let descriptor = match self.resolve(dialect) {
            Ok(descriptor) => descriptor,
            Err(verdict) => return verdict,
        };
        if self.precheck {
            match tokio::fs::read_to_string(path).await {
                Ok(source) => {
                    if let Some(verdict) = self.precheck_rejects(&source, dialect) {
                        return verdict;
                    }
                }
                Err(e) => {
                    return Verdict::rejected(
                        dialect,
                        FailureKind::SourceIo,
                        format!("failed to read {}: {}", path.display(), e),
                    );
                }
            }
        }

        let mut verdict = Verdict::pending(dialect);
        self.run_stages(descriptor, path, &mut verdict).await;
        verdict
    }

    fn resolve(&self, dialect: &str) -> Result<&DialectDescriptor, Verdict> {
        self.registry.lookup(dialect).map_err(|e| {
            warn!(dialect = %dialect, "Unsupported dialect");
            Verdict::rejected(dialect, FailureKind::UnsupportedDialect, e.to_string())
        })
    }

    fn precheck_rejects(&self, source: &str, dialect: &str) -> Option<Verdict> {
        if !self.precheck {
            return None;
        }
        sexp::check(source).err().map(|issue| {
            debug!(dialect = %dialect, issue = %issue, "Pre-check rejected source");
            Verdict::rejected(
                dialect,
                FailureKind::MalformedSource,
                format!("Malformed S-expression: {}", issue),
            )
        })
    }

    /// Compile, then test only if compile passed.
    async fn run_stages(&self, descriptor: &DialectDescriptor, file: &Path, verdict: &mut Verdict) {
        let compile = run_stage(&descriptor.compile, file, self.compile_timeout).await;
        verdict.record_compile(&compile, self.max_error_chars);
        debug!(
            dialect = %descriptor.tag,
            stage = Stage::Compile.as_str(),
            success = verdict.compile_success,
            elapsed_ms = compile.elapsed().as_millis() as u64,
            "Stage finished"
        );
        if !verdict.compile_success {
            return;
        }

        let test = run_stage(&descriptor.test, file, self.test_timeout).await;
        verdict.record_test(&test, self.max_error_chars);
        debug!(
            dialect = %descriptor.tag,
            stage = Stage::Test.as_str(),
            success = verdict.test_success,
            elapsed_ms = test.elapsed().as_millis() as u64,
            "Stage finished"
        );
    }
}
