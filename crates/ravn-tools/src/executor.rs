// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::tool::{ExecutionResult, ExitStatus};

/// How long to keep draining pipes after the shell exits or is killed.
/// Background grandchildren can hold the pipes open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Runs one shell command per call in a fresh subprocess.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    shell: String,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new("bash")
    }
}

impl CommandExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self { shell: shell.into() }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Execute `command` as `<shell> -c <command>` with a hard `timeout`.
    ///
    /// Never fails: launch problems, timeouts and non-zero exits are all
    /// reported through [`ExecutionResult::exit_status`].
    pub async fn execute(&self, command: &str, timeout: Duration) -> ExecutionResult {
        debug!(shell = %self.shell, cmd = %command, timeout_secs = timeout.as_secs_f64(), "executing command");

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command);
        // No terminal input for the child, and no lingering process if this
        // future is dropped.
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        // New session: the child becomes leader of its own process group, so a
        // timeout can kill everything it spawned, and it cannot reach our
        // controlling terminal through /dev/tty.
        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                warn!(shell = %self.shell, error = %e, "failed to launch shell");
                return ExecutionResult::launch_error(format!("failed to launch `{}`: {e}", self.shell));
            }
        };

        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let readers = [
            drain(child.stdout.take(), stdout_buf.clone()),
            drain(child.stderr.take(), stderr_buf.clone()),
        ];

        let exit_status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => ExitStatus::Code(exit_code(status)),
            Ok(Err(e)) => {
                warn!(error = %e, "waiting for command failed");
                finish(readers).await;
                let mut stderr = take(&stderr_buf).await;
                if !stderr.is_empty() && !stderr.ends_with('\n') {
                    stderr.push('\n');
                }
                stderr.push_str(&format!("failed to wait for command: {e}"));
                return ExecutionResult::new(take(&stdout_buf).await, stderr, ExitStatus::LaunchError);
            }
            Err(_) => {
                warn!(cmd = %command, timeout_secs = timeout.as_secs_f64(), "command timed out; killing process group");
                kill_process_group(&child);
                let _ = child.kill().await;
                ExitStatus::Timeout
            }
        };

        finish(readers).await;
        ExecutionResult::new(take(&stdout_buf).await, take(&stderr_buf).await, exit_status)
    }
}

fn drain<R>(reader: Option<R>, buf: Arc<Mutex<Vec<u8>>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut reader) = reader else { return };
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.lock().await.extend_from_slice(&chunk[..n]),
            }
        }
    })
}

/// Wait briefly for the pipe readers, then abandon whatever is still open.
/// Bytes read so far stay in the shared buffers.
async fn finish(readers: [JoinHandle<()>; 2]) {
    for mut handle in readers {
        if tokio::time::timeout(DRAIN_GRACE, &mut handle).await.is_err() {
            handle.abort();
        }
    }
}

async fn take(buf: &Mutex<Vec<u8>>) -> String {
    let bytes = std::mem::take(&mut *buf.lock().await);
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(unix)]
fn kill_process_group(child: &tokio::process::Child) {
    if let Some(pid) = child.id() {
        // setsid made the child a group leader: pgid == pid.
        unsafe {
            libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &tokio::process::Child) {}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|s| -s))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    const TEN: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn echo_captures_stdout_and_zero_exit() {
        let r = CommandExecutor::default().execute("echo hello world", TEN).await;
        assert_eq!(r.stdout, "hello world\n");
        assert_eq!(r.stderr, "");
        assert_eq!(r.exit_status, ExitStatus::Code(0));
    }

    #[tokio::test]
    async fn stderr_and_exit_code_captured_separately() {
        let r = CommandExecutor::default()
            .execute("echo out; echo err >&2; exit 3", TEN)
            .await;
        assert_eq!(r.stdout, "out\n");
        assert_eq!(r.stderr, "err\n");
        assert_eq!(r.exit_status, ExitStatus::Code(3));
    }

    #[tokio::test]
    async fn no_shell_state_leaks_between_calls() {
        let exec = CommandExecutor::default();
        exec.execute("export RAVN_LEAK=1; cd /", TEN).await;
        let r = exec.execute("echo \"[${RAVN_LEAK:-unset}]\"", TEN).await;
        assert_eq!(r.stdout, "[unset]\n");
    }

    #[tokio::test]
    async fn stdin_is_detached() {
        let r = CommandExecutor::default().execute("cat; echo done", TEN).await;
        assert_eq!(r.stdout, "done\n");
    }

    #[tokio::test]
    async fn timeout_returns_promptly_with_partial_output() {
        let start = Instant::now();
        let r = CommandExecutor::default()
            .execute("echo started; sleep 30", Duration::from_secs(1))
            .await;
        assert_eq!(r.exit_status, ExitStatus::Timeout);
        assert_eq!(r.stdout, "started\n");
        assert!(start.elapsed() < Duration::from_secs(5), "took {:?}", start.elapsed());
    }

    #[tokio::test]
    async fn timeout_kills_background_children_too() {
        let start = Instant::now();
        let r = CommandExecutor::default()
            .execute("sleep 30 & sleep 30", Duration::from_millis(300))
            .await;
        assert_eq!(r.exit_status, ExitStatus::Timeout);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn missing_shell_is_launch_error() {
        let r = CommandExecutor::new("/nonexistent/ravn-shell").execute("true", TEN).await;
        assert_eq!(r.exit_status, ExitStatus::LaunchError);
        assert!(r.stderr.contains("/nonexistent/ravn-shell"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn signal_exit_reports_negated_signal() {
        let r = CommandExecutor::default().execute("kill -9 $$", TEN).await;
        assert_eq!(r.exit_status, ExitStatus::Code(-9));
    }

    #[tokio::test]
    async fn invalid_utf8_is_decoded_lossily() {
        let r = CommandExecutor::default().execute("printf 'a\\377b'", TEN).await;
        assert_eq!(r.stdout, "a\u{FFFD}b");
    }
}
