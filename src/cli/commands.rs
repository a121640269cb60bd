//! CLI command definitions for lisp-harness.
//!
//! `eval` runs either a JSONL batch or a single file, `dialects` lists the
//! effective registry, and `sexp` runs the lexical balance check.

use crate::harness::{BatchRunner, Evaluator, HarnessConfig};
use crate::metrics::{export_metrics, init_metrics};
use crate::report::{render_summary, render_verdict, BatchReport};
use crate::sexp;
use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

/// Exit status for a run stopped by Ctrl-C or SIGTERM.
const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Cross-dialect verification harness for Lisp sources.
#[derive(Parser)]
#[command(name = "lisp-harness")]
#[command(about = "Compile and test Lisp candidates across Clojure, Common Lisp, Emacs Lisp and Scheme")]
#[command(version)]
#[command(
    long_about = "lisp-harness runs candidate sources through each dialect's compile/load and test toolchains and reports per-dialect success rates.\n\nExample usage:\n  lisp-harness eval --dataset fixes.jsonl --output results.json\n  lisp-harness eval --file fix.el --dialect el"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// YAML harness configuration (timeouts, parallelism, extra dialects).
    #[arg(long, env = "LISP_HARNESS_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Evaluate a JSONL dataset or a single file.
    #[command(alias = "evaluate")]
    Eval(EvalArgs),

    /// List the registered dialects and their toolchain commands.
    Dialects,

    /// Check that files have balanced S-expressions.
    Sexp(SexpArgs),
}

/// Arguments for `lisp-harness eval`.
#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("mode").required(true).args(["dataset", "file"])))]
pub struct EvalArgs {
    /// JSONL dataset to evaluate (batch mode).
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Single file to evaluate in place.
    #[arg(long, requires = "dialect")]
    pub file: Option<PathBuf>,

    /// Dialect tag for single-file evaluation (clj, cljs, lisp, el, scm).
    #[arg(long, requires = "file", conflicts_with = "dataset")]
    pub dialect: Option<String>,

    /// Write the batch report as JSON to this path.
    #[arg(short = 'o', long, conflicts_with = "file")]
    pub output: Option<PathBuf>,

    /// Write Prometheus metrics in text format to this path after the batch.
    #[arg(long, conflicts_with = "file")]
    pub metrics_out: Option<PathBuf>,

    /// Number of evaluations to run concurrently.
    #[arg(short = 'j', long)]
    pub parallel: Option<usize>,

    /// Compile/load stage timeout in seconds.
    #[arg(long)]
    pub compile_timeout: Option<u64>,

    /// Test stage timeout in seconds.
    #[arg(long)]
    pub test_timeout: Option<u64>,

    /// Number of individual results kept in the report.
    #[arg(long)]
    pub sample_limit: Option<usize>,

    /// Reject sources with unbalanced S-expressions before running toolchains.
    #[arg(long)]
    pub precheck: bool,

    /// Directory for temporary source files.
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,
}

/// Arguments for `lisp-harness sexp`.
#[derive(Parser, Debug)]
pub struct SexpArgs {
    /// Files to check.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parse CLI arguments and run the selected command.
///
/// For control over logging initialization, use `parse_cli()` and `run_with_cli()`.
pub async fn run() -> anyhow::Result<ExitCode> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Eval(args) => run_eval_command(args, cli.config.as_deref()).await,
        Commands::Dialects => run_dialects_command(cli.config.as_deref()),
        Commands::Sexp(args) => run_sexp_command(args),
    }
}

// ============================================================================
// Eval Command Implementation
// ============================================================================

fn load_config(path: Option<&Path>) -> anyhow::Result<HarnessConfig> {
    match path {
        Some(path) => HarnessConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(HarnessConfig::default()),
    }
}

/// Applies command-line overrides on top of the file configuration.
fn apply_overrides(mut config: HarnessConfig, args: &EvalArgs) -> anyhow::Result<HarnessConfig> {
    if let Some(parallel) = args.parallel {
        config = config.with_parallel(parallel);
    }
    if let Some(secs) = args.compile_timeout {
        config = config.with_compile_timeout_secs(secs);
    }
    if let Some(secs) = args.test_timeout {
        config = config.with_test_timeout_secs(secs);
    }
    if let Some(limit) = args.sample_limit {
        config = config.with_sample_limit(limit);
    }
    if args.precheck {
        config = config.with_precheck(true);
    }
    if let Some(dir) = &args.temp_dir {
        config = config.with_temp_dir(dir);
    }
    config.validate()?;
    Ok(config)
}

async fn run_eval_command(args: EvalArgs, config_path: Option<&Path>) -> anyhow::Result<ExitCode> {
    let config = apply_overrides(load_config(config_path)?, &args)?;

    match (&args.dataset, &args.file, &args.dialect) {
        (Some(dataset), None, None) => run_batch(dataset, &args, &config).await,
        (None, Some(file), Some(dialect)) => run_single(file, dialect, &config).await,
        _ => Err(anyhow::anyhow!(
            "Must specify either --dataset or both --file and --dialect"
        )),
    }
}

async fn run_batch(dataset: &Path, args: &EvalArgs, config: &HarnessConfig) -> anyhow::Result<ExitCode> {
    if args.metrics_out.is_some() {
        init_metrics()?;
    }

    let started_at = Utc::now();
    let evaluator = Arc::new(Evaluator::from_config(config)?);
    let runner = BatchRunner::new(evaluator, config);

    let stats = runner
        .run_file(dataset, shutdown_signal())
        .await
        .with_context(|| format!("Failed to open dataset {}", dataset.display()))?;

    print!("{}", render_summary(&stats, config.error_listing_limit));

    let interrupted = stats.interrupted;
    if let Some(output) = &args.output {
        let report = BatchReport::new(dataset.display().to_string(), started_at, stats);
        report
            .write_json(output)
            .with_context(|| format!("Failed to write report to {}", output.display()))?;
        println!("\nResults saved to {}", output.display());
    }

    if let Some(path) = &args.metrics_out {
        std::fs::write(path, export_metrics())
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
        info!(path = %path.display(), "Metrics written");
    }

    if interrupted {
        return Ok(ExitCode::from(INTERRUPTED_EXIT_CODE));
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_single(file: &Path, dialect: &str, config: &HarnessConfig) -> anyhow::Result<ExitCode> {
    if !file.exists() {
        return Err(anyhow::anyhow!("File does not exist: {}", file.display()));
    }

    let evaluator = Evaluator::from_config(config)?;
    // Dropping the evaluation kills the stage's process group.
    let verdict = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            warn!(file = %file.display(), "Evaluation interrupted");
            return Ok(ExitCode::from(INTERRUPTED_EXIT_CODE));
        }
        verdict = evaluator.evaluate_path(file, dialect) => verdict,
    };
    print!("{}", render_verdict(file, dialect, &verdict));

    if verdict.is_pass() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Resolves on Ctrl-C or SIGTERM.
///
/// Stages run in their own process groups and do not receive terminal
/// signals; in-flight work is dropped by the caller instead.
async fn shutdown_signal() {
    tokio::select! {
        _ = interrupt() => warn!("Received Ctrl-C, stopping"),
        _ = terminate() => warn!("Received SIGTERM, stopping"),
    }
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

// ============================================================================
// Dialects / Sexp Commands
// ============================================================================

fn run_dialects_command(config_path: Option<&Path>) -> anyhow::Result<ExitCode> {
    let config = load_config(config_path)?;
    let registry = config.registry()?;

    for descriptor in registry.descriptors() {
        println!("{} ({})", descriptor.tag, descriptor.extension);
        println!("  compile: {}", descriptor.compile.join(" "));
        println!("  test:    {}", descriptor.test.join(" "));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_sexp_command(args: SexpArgs) -> anyhow::Result<ExitCode> {
    let mut all_valid = true;

    for path in &args.files {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                println!("{}: Valid: false (cannot read: {})", path.display(), e);
                all_valid = false;
                continue;
            }
        };
        match sexp::check(&text) {
            Ok(()) => println!("{}: Valid: true", path.display()),
            Err(issue) => {
                println!("{}: Valid: false ({})", path.display(), issue);
                all_valid = false;
            }
        }
    }

    if all_valid {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
