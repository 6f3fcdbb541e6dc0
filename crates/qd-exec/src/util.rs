use std::{process::Stdio, time::Duration};

use tokio::process::{Child, Command};
use tracing::trace;

use crate::error::{ExecError, ExecResult};

/// How long a SIGTERM'd child gets before it is killed outright.
const KILL_GRACE: Duration = Duration::from_millis(500);

pub fn cmd_program(program: &str, args: &[String]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(|s| s.as_str()));
    cmd
}

/// Run a short-lived helper command and return its stdout.
///
/// The child is killed if `timeout` elapses first.
pub async fn run_capture(mut cmd: Command, timeout: Duration) -> ExecResult<String> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    trace!(target: "qd.exec.util", command = ?cmd.as_std(), "run");
    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(output) => output.map_err(|e| ExecError::Spawn(e.to_string()))?,
        Err(_) => {
            return Err(ExecError::Timeout {
                ms: timeout.as_millis() as u64,
            });
        }
    };

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }
    match output.status.code() {
        Some(code) => Err(ExecError::NonZeroExit {
            code,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
        None => Err(ExecError::KilledBySignal),
    }
}

/// Quote `arg` for a POSIX shell, as needed when a command line travels through a remote shell.
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// SIGTERM the child, then kill it if it has not exited within the grace period.
pub async fn kill_graceful(child: &mut Child) -> std::io::Result<()> {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            if let Some(id) = child.id() {
                // SAFETY: plain kill(2) on a pid we own; failure (already reaped) is harmless.
                unsafe {
                    libc::kill(id as libc::pid_t, libc::SIGTERM);
                }
                if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_ok() {
                    return Ok(());
                }
            }
        }
    }
    match child.kill().await {
        Ok(()) => Ok(()),
        // Already exited and reaped.
        Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_quote_leaves_plain_words() {
        assert_eq!(shell_quote("bjobs"), "bjobs");
        assert_eq!(shell_quote("/tmp/run-1/job.LSF-stdout"), "/tmp/run-1/job.LSF-stdout");
    }

    #[test]
    fn shell_quote_wraps_special_characters() {
        assert_eq!(shell_quote("select[type==X]"), "'select[type==X]'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_capture_returns_stdout() {
        let out = run_capture(
            cmd_program("echo", &["hello".to_string()]),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_capture_reports_exit_code() {
        let err = run_capture(cmd_program("false", &[]), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::NonZeroExit { code: 1, .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_capture_times_out() {
        let err = run_capture(
            cmd_program("sleep", &["5".to_string()]),
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { ms: 100 }));
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let err = run_capture(
            cmd_program("/definitely/not/a/program", &[]),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExecError::Spawn(_)));
    }
}
