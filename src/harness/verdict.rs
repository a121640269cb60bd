//! Verdicts: the two-stage outcome of evaluating one candidate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::process::StageOutcome;

/// Error marker recorded when the compile/load stage times out.
pub const COMPILE_TIMEOUT_MARKER: &str = "Compilation timeout";

/// Error marker recorded when the test stage times out.
pub const TEST_TIMEOUT_MARKER: &str = "Test timeout";

/// Why a verdict is not a full pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedDialect,
    MalformedSource,
    SourceIo,
    CompileFailed,
    CompileTimeout,
    TestFailed,
    TestTimeout,
    LaunchFailed,
}

impl FailureKind {
    pub fn is_timeout(self) -> bool {
        matches!(self, FailureKind::CompileTimeout | FailureKind::TestTimeout)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedDialect => write!(f, "unsupported_dialect"),
            Self::MalformedSource => write!(f, "malformed_source"),
            Self::SourceIo => write!(f, "source_io"),
            Self::CompileFailed => write!(f, "compile_failed"),
            Self::CompileTimeout => write!(f, "compile_timeout"),
            Self::TestFailed => write!(f, "test_failed"),
            Self::TestTimeout => write!(f, "test_timeout"),
            Self::LaunchFailed => write!(f, "launch_failed"),
        }
    }
}

/// Where a candidate came from; used only for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// 1-based line in the batch input.
    pub line: Option<usize>,
    /// Origin identifier (repository).
    pub repo: Option<String>,
    /// Path label within the origin.
    pub path: Option<String>,
}

/// Result of evaluating one candidate under one dialect.
///
/// Built only through the stage-recording methods, which keep
/// `test_success` implying `compile_success`, and leave the test duration
/// unset unless the test stage actually ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub dialect: String,
    pub compile_success: bool,
    pub compile_duration_secs: f64,
    pub test_success: bool,
    pub test_duration_secs: Option<f64>,
    pub failure: Option<FailureKind>,
    pub error: Option<String>,
    #[serde(default)]
    pub provenance: Provenance,
}

/// Which stage an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compile,
    Test,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Compile => "compile",
            Stage::Test => "test",
        }
    }
}

impl Verdict {
    /// A verdict with neither stage run yet.
    pub fn pending(dialect: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            compile_success: false,
            compile_duration_secs: 0.0,
            test_success: false,
            test_duration_secs: None,
            failure: None,
            error: None,
            provenance: Provenance::default(),
        }
    }

    /// A verdict that failed before any toolchain ran.
    pub fn rejected(dialect: impl Into<String>, failure: FailureKind, error: impl Into<String>) -> Self {
        let mut verdict = Self::pending(dialect);
        verdict.failure = Some(failure);
        verdict.error = Some(error.into());
        verdict
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Records the compile/load stage.
    pub fn record_compile(&mut self, outcome: &StageOutcome, max_error_chars: usize) {
        self.compile_duration_secs = outcome.elapsed().as_secs_f64();
        self.compile_success = outcome.is_success();
        if !self.compile_success {
            let (failure, error) = describe_failure(Stage::Compile, outcome, max_error_chars);
            self.failure = Some(failure);
            self.error = Some(error);
        }
    }

    /// Records the test stage. Ignored unless compilation succeeded.
    pub fn record_test(&mut self, outcome: &StageOutcome, max_error_chars: usize) {
        if !self.compile_success {
            return;
        }
        self.test_duration_secs = Some(outcome.elapsed().as_secs_f64());
        self.test_success = outcome.is_success();
        if !self.test_success {
            let (failure, error) = describe_failure(Stage::Test, outcome, max_error_chars);
            self.failure = Some(failure);
            self.error = Some(error);
        }
    }

    /// Both stages passed.
    pub fn is_pass(&self) -> bool {
        self.compile_success && self.test_success
    }

    pub fn is_timeout(&self) -> bool {
        self.failure.is_some_and(FailureKind::is_timeout)
    }

    pub fn test_duration(&self) -> Option<Duration> {
        self.test_duration_secs.map(Duration::from_secs_f64)
    }
}

/// Classifies a failed stage and picks its diagnostic text.
///
/// Standard error wins; standard output is the fallback; a synthetic message
/// is used when both are empty.
fn describe_failure(stage: Stage, outcome: &StageOutcome, max_chars: usize) -> (FailureKind, String) {
    match outcome {
        StageOutcome::TimedOut { .. } => match stage {
            Stage::Compile => (FailureKind::CompileTimeout, COMPILE_TIMEOUT_MARKER.to_string()),
            Stage::Test => (FailureKind::TestTimeout, TEST_TIMEOUT_MARKER.to_string()),
        },
        StageOutcome::LaunchFailed { message, .. } => {
            (FailureKind::LaunchFailed, truncate(message, max_chars))
        }
        StageOutcome::Exited { code, stdout, stderr, .. } => {
            let kind = match stage {
                Stage::Compile => FailureKind::CompileFailed,
                Stage::Test => FailureKind::TestFailed,
            };
            let text = if !stderr.trim().is_empty() {
                truncate(stderr, max_chars)
            } else if !stdout.trim().is_empty() {
                truncate(stdout, max_chars)
            } else {
                match code {
                    Some(code) => format!("{} exited with status {}", stage.as_str(), code),
                    None => format!("{} terminated by signal", stage.as_str()),
                }
            };
            (kind, text)
        }
    }
}

/// Truncates on a char boundary, marking the cut.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        format!("{}... [truncated]", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exited(success: bool, code: i32, stdout: &str, stderr: &str) -> StageOutcome {
        StageOutcome::Exited {
            code: Some(code),
            success,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            elapsed: Duration::from_millis(250),
        }
    }

    #[test]
    fn test_full_pass() {
        let mut verdict = Verdict::pending("clj");
        verdict.record_compile(&exited(true, 0, "", ""), 100);
        verdict.record_test(&exited(true, 0, "ok", ""), 100);

        assert!(verdict.is_pass());
        assert_eq!(verdict.failure, None);
        assert_eq!(verdict.error, None);
        assert_eq!(verdict.test_duration(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_compile_failure_skips_test() {
        let mut verdict = Verdict::pending("lisp");
        verdict.record_compile(&exited(false, 1, "out", "err"), 100);
        verdict.record_test(&exited(true, 0, "", ""), 100);

        assert!(!verdict.compile_success);
        assert!(!verdict.test_success);
        assert_eq!(verdict.test_duration_secs, None);
        assert_eq!(verdict.failure, Some(FailureKind::CompileFailed));
        assert_eq!(verdict.error.as_deref(), Some("err"));
    }

    #[test]
    fn test_stdout_fallback_and_synthetic_message() {
        let mut verdict = Verdict::pending("scm");
        verdict.record_compile(&exited(false, 2, "only stdout", "  \n"), 100);
        assert_eq!(verdict.error.as_deref(), Some("only stdout"));

        let mut verdict = Verdict::pending("scm");
        verdict.record_compile(&exited(true, 0, "", ""), 100);
        verdict.record_test(&exited(false, 7, "", ""), 100);
        assert_eq!(verdict.error.as_deref(), Some("test exited with status 7"));
        assert_eq!(verdict.failure, Some(FailureKind::TestFailed));
    }

    #[test]
    fn test_timeout_markers() {
        let timed_out = StageOutcome::TimedOut {
            elapsed: Duration::from_secs(1),
        };

        let mut verdict = Verdict::pending("el");
        verdict.record_compile(&timed_out, 100);
        assert_eq!(verdict.error.as_deref(), Some(COMPILE_TIMEOUT_MARKER));
        assert!(verdict.is_timeout());

        let mut verdict = Verdict::pending("el");
        verdict.record_compile(&exited(true, 0, "", ""), 100);
        verdict.record_test(&timed_out, 100);
        assert_eq!(verdict.error.as_deref(), Some(TEST_TIMEOUT_MARKER));
        assert_eq!(verdict.failure, Some(FailureKind::TestTimeout));
        assert!(verdict.compile_success && !verdict.test_success);
    }

    #[test]
    fn test_rejected() {
        let verdict = Verdict::rejected("rkt", FailureKind::UnsupportedDialect, "Unsupported dialect: rkt");
        assert!(!verdict.compile_success && !verdict.test_success);
        assert_eq!(verdict.compile_duration_secs, 0.0);
        assert!(verdict.error.is_some());
    }

    #[test]
    fn test_error_truncated() {
        let long = "x".repeat(50);
        let mut verdict = Verdict::pending("clj");
        verdict.record_compile(&exited(false, 1, "", &long), 10);
        assert_eq!(verdict.error.as_deref(), Some("xxxxxxxxxx... [truncated]"));
    }

    #[test]
    fn test_truncate_unicode() {
        let result = truncate("héllo wörld", 2);
        assert!(result.starts_with('h'));
        assert!(result.ends_with("... [truncated]"));
    }

    #[test]
    fn test_failure_kind_serialization() {
        let json = serde_json::to_string(&FailureKind::CompileTimeout).unwrap();
        assert_eq!(json, "\"compile_timeout\"");
        assert_eq!(FailureKind::LaunchFailed.to_string(), "launch_failed");
    }
}
