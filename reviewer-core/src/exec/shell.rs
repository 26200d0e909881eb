// reviewer-core/src/exec/shell.rs

//! Core implementation for executing shell commands.

use super::{ExecutionOutcome, ProcessRunner, RunOptions, EXIT_CANCELLED, EXIT_TIMED_OUT};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long to keep draining pipes after the child was killed. A grandchild
/// that inherited the pipes can keep them open past the shell's death.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Executes command strings through the platform shell (`sh -c` on Unix,
/// `cmd /C` on Windows).
///
/// **Warning:** commands run exactly as given. Callers are responsible for
/// building them from trusted configuration or properly quoted arguments.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    shell_arg: String,
}

impl ShellRunner {
    pub fn new() -> Self {
        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };
        Self::with_shell(shell, shell_arg)
    }

    pub fn with_shell(shell: impl Into<String>, shell_arg: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            shell_arg: shell_arg.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct Captured {
    bytes: Vec<u8>,
    dropped: usize,
}

impl Captured {
    fn into_string(self, stream: &str, command: &str) -> String {
        if self.dropped > 0 {
            warn!(
                command = %command,
                stream,
                dropped_bytes = self.dropped,
                "Captured output exceeded the limit and was truncated"
            );
        }
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

enum Ending {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Bytes read so far from one stream. Shared with the reader task so an
/// abandoned reader still leaves its output behind.
type Sink = Arc<Mutex<Captured>>;

fn lock(sink: &Sink) -> std::sync::MutexGuard<'_, Captured> {
    sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reads the whole stream so the child never blocks on a full pipe, keeping
/// at most `cap` bytes.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, cap: usize, sink: Sink) {
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let mut captured = lock(&sink);
                let room = cap.saturating_sub(captured.bytes.len());
                let keep = room.min(n);
                captured.bytes.extend_from_slice(&buf[..keep]);
                captured.dropped += n - keep;
            }
            Err(e) => {
                warn!(error = %e, "Failed reading child output");
                break;
            }
        }
    }
}

struct Reader {
    task: JoinHandle<()>,
    sink: Sink,
}

fn start_reader<R: AsyncRead + Unpin + Send + 'static>(stream: Option<R>, cap: usize) -> Option<Reader> {
    stream.map(|stream| {
        let sink = Sink::default();
        let task = tokio::spawn(read_capped(stream, cap, Arc::clone(&sink)));
        Reader { task, sink }
    })
}

/// Waits up to the grace period for EOF, then takes whatever was read.
async fn collect(reader: Option<Reader>) -> Captured {
    let Some(Reader { mut task, sink }) = reader else {
        return Captured::default();
    };
    match tokio::time::timeout(DRAIN_GRACE, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Output reader task failed"),
        Err(_) => {
            debug!("Output pipe still open after grace period; keeping partial output");
            task.abort();
        }
    }
    let captured = std::mem::take(&mut *lock(&sink));
    captured
}

/// Kills the shell and everything it started. The shell leads its own
/// process group on Unix.
async fn terminate(child: &mut Child, command: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: plain signal delivery to the group led by our own child.
        let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
        if rc != 0 {
            debug!(command = %command, pid, "Process group already gone");
        }
    }
    if let Err(e) = child.kill().await {
        warn!(command = %command, error = %e, "Failed to kill command process");
    }
}

fn append_line(stream: &mut String, line: &str) {
    if !stream.is_empty() && !stream.ends_with('\n') {
        stream.push('\n');
    }
    stream.push_str(line);
}

#[async_trait]
impl ProcessRunner for ShellRunner {
    async fn run(&self, command: &str, options: &RunOptions) -> ExecutionOutcome {
        debug!(command = %command, working_dir = ?options.working_dir, "Executing shell command");

        let mut cmd = Command::new(&self.shell);
        cmd.arg(&self.shell_arg)
            .arg(command)
            .current_dir(&options.working_dir)
            .envs(&options.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %command, error = %e, "Failed to spawn command process");
                return ExecutionOutcome::launch_failure(format!(
                    "Failed to spawn shell process for command '{}': {}",
                    command, e
                ));
            }
        };

        let cap = options.max_capture_bytes;
        let stdout_reader = start_reader(child.stdout.take(), cap);
        let stderr_reader = start_reader(child.stderr.take(), cap);

        let ending = tokio::select! {
            status = child.wait() => Ending::Exited(status),
            _ = tokio::time::sleep(options.timeout) => Ending::TimedOut,
            _ = options.cancel.cancelled() => Ending::Cancelled,
        };

        if !matches!(ending, Ending::Exited(_)) {
            terminate(&mut child, command).await;
        }

        let stdout = collect(stdout_reader).await.into_string("stdout", command);
        let mut stderr = collect(stderr_reader).await.into_string("stderr", command);

        let exit_code = match ending {
            Ending::Exited(Ok(status)) => status.code().unwrap_or(-1),
            Ending::Exited(Err(e)) => {
                warn!(command = %command, error = %e, "Failed waiting for command process");
                append_line(&mut stderr, &format!("Failed to wait for command: {}", e));
                -1
            }
            Ending::TimedOut => {
                warn!(command = %command, timeout_secs = options.timeout.as_secs_f64(), "Command timed out");
                append_line(
                    &mut stderr,
                    &format!("Command timed out after {:.1}s", options.timeout.as_secs_f64()),
                );
                EXIT_TIMED_OUT
            }
            Ending::Cancelled => {
                warn!(command = %command, "Command cancelled");
                append_line(&mut stderr, "Command cancelled");
                EXIT_CANCELLED
            }
        };

        debug!(
            "Shell command exit status: {}\nStdout preview (first 3 lines):\n{}\nStderr preview (first 3 lines):\n{}",
            exit_code,
            stdout.lines().take(3).collect::<Vec<_>>().join("\n"),
            stderr.lines().take(3).collect::<Vec<_>>().join("\n")
        );

        ExecutionOutcome {
            stdout,
            stderr,
            exit_code,
        }
    }
}
