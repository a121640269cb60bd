//! Running one toolchain stage under a wall-clock timeout.
//!
//! Every stage is spawned as the leader of its own process group. If the
//! stage times out, or the future awaiting it is dropped before the child
//! finishes, the whole group is killed so that no helper process the
//! toolchain forked keeps running or keeps the source file open.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, warn};

/// How a stage invocation ended.
#[derive(Debug)]
pub enum StageOutcome {
    /// The process ran to completion.
    Exited {
        code: Option<i32>,
        success: bool,
        stdout: String,
        stderr: String,
        elapsed: Duration,
    },
    /// The process exceeded its timeout and was killed.
    TimedOut { elapsed: Duration },
    /// The process could not be started or waited on.
    LaunchFailed { message: String, elapsed: Duration },
}

impl StageOutcome {
    pub fn elapsed(&self) -> Duration {
        match self {
            StageOutcome::Exited { elapsed, .. }
            | StageOutcome::TimedOut { elapsed }
            | StageOutcome::LaunchFailed { elapsed, .. } => *elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Exited { success: true, .. })
    }
}

/// Kills a process group when dropped, unless disarmed.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; an already-empty group yields ESRCH.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!(pgid = pgid, error = %err, "Failed to kill process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

/// Runs `template` with `file` appended as the final argument.
///
/// Standard input is closed; standard output and error are captured and
/// decoded lossily. Never returns an error: spawn and wait faults become
/// [`StageOutcome::LaunchFailed`].
pub async fn run_stage(template: &[String], file: &Path, timeout: Duration) -> StageOutcome {
    let start = Instant::now();

    let Some((program, args)) = template.split_first() else {
        return StageOutcome::LaunchFailed {
            message: "empty command template".to_string(),
            elapsed: start.elapsed(),
        };
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .arg(file)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    debug!(program = %program, file = %file.display(), timeout_ms = timeout.as_millis() as u64, "Spawning stage");

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            return StageOutcome::LaunchFailed {
                message: format!("failed to launch '{}': {}", program, e),
                elapsed: start.elapsed(),
            };
        }
    };

    let mut guard = ProcessGroupGuard::new(child.id());
    let result = tokio::time::timeout(timeout, child.wait_with_output()).await;
    let elapsed = start.elapsed();

    match result {
        Ok(Ok(output)) => {
            guard.disarm();
            StageOutcome::Exited {
                code: output.status.code(),
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                elapsed,
            }
        }
        Ok(Err(e)) => StageOutcome::LaunchFailed {
            message: format!("failed waiting on '{}': {}", program, e),
            elapsed,
        },
        Err(_) => {
            warn!(program = %program, elapsed_ms = elapsed.as_millis() as u64, "Stage timed out, killing process group");
            drop(guard);
            StageOutcome::TimedOut { elapsed }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    fn source(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("candidate.scm");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_success_captures_output() {
        let dir = TempDir::new().unwrap();
        let file = source(&dir, "(display 1)");

        // The file path arrives as $0 for `sh -c`.
        let outcome = run_stage(&sh("cat \"$0\""), &file, Duration::from_secs(5)).await;
        match outcome {
            StageOutcome::Exited { code, success, stdout, .. } => {
                assert!(success);
                assert_eq!(code, Some(0));
                assert_eq!(stdout, "(display 1)");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let dir = TempDir::new().unwrap();
        let file = source(&dir, "");

        let outcome = run_stage(&sh("echo boom >&2; exit 3"), &file, Duration::from_secs(5)).await;
        assert!(!outcome.is_success());
        match outcome {
            StageOutcome::Exited { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr.trim(), "boom");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_bounded() {
        let dir = TempDir::new().unwrap();
        let file = source(&dir, "");

        let start = Instant::now();
        let outcome = run_stage(&sh("sleep 30"), &file, Duration::from_millis(300)).await;
        assert!(matches!(outcome, StageOutcome::TimedOut { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_kills_forked_helpers() {
        let dir = TempDir::new().unwrap();
        let file = source(&dir, "");

        let outcome = run_stage(
            &sh("sleep 30 & echo $! > \"$0.pid\"; wait"),
            &file,
            Duration::from_millis(500),
        )
        .await;
        assert!(matches!(outcome, StageOutcome::TimedOut { .. }));

        let pid = std::fs::read_to_string(dir.path().join("candidate.scm.pid")).unwrap();
        let stat_path = format!("/proc/{}/stat", pid.trim());

        // Gone, or a zombie waiting to be reaped, counts as dead.
        let mut dead = false;
        for _ in 0..40 {
            match std::fs::read_to_string(&stat_path) {
                Err(_) => dead = true,
                Ok(stat) => {
                    let state = stat.rsplit(')').next().and_then(|rest| rest.trim().chars().next());
                    dead = state == Some('Z');
                }
            }
            if dead {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(dead, "helper process survived the timeout");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = TempDir::new().unwrap();
        let file = source(&dir, "");

        let template = vec!["definitely-not-a-real-toolchain-xyz".to_string()];
        let outcome = run_stage(&template, &file, Duration::from_secs(5)).await;
        match outcome {
            StageOutcome::LaunchFailed { message, .. } => {
                assert!(message.contains("definitely-not-a-real-toolchain-xyz"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_template() {
        let outcome = run_stage(&[], Path::new("/tmp/x"), Duration::from_secs(1)).await;
        assert!(matches!(outcome, StageOutcome::LaunchFailed { .. }));
    }
}
