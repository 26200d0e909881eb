// reviewer-core/src/exec/mod.rs

//! Running external commands and capturing their outcome.
//!
//! Everything that spawns a process goes through a [`ProcessRunner`]. A runner
//! never returns an error: launch failures, timeouts and cancellations are all
//! folded into an [`ExecutionOutcome`] with a nonzero exit code, so callers
//! always have stdout, stderr and a status to report on.

pub mod shell;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use shell::ShellRunner;

/// Upper bound on bytes captured per stream (10 MiB).
pub const MAX_CAPTURE_BYTES: usize = 10 * 1024 * 1024;

/// Wall-clock limit applied when the configuration does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Exit code reported when the command could not be started.
pub const EXIT_LAUNCH_FAILURE: i32 = 1;
/// Exit code reported when the command ran past its timeout.
pub const EXIT_TIMED_OUT: i32 = 124;
/// Exit code reported when the request was cancelled mid-run.
pub const EXIT_CANCELLED: i32 = 130;

/// Structured result of a single command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionOutcome {
    /// Captured standard output (lossy UTF-8, capped).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8, capped).
    pub stderr: String,
    /// Process exit code, or one of the synthetic `EXIT_*` codes.
    pub exit_code: i32,
}

impl ExecutionOutcome {
    /// Checks if the command executed successfully (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Outcome for a command that never started.
    pub fn launch_failure(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: message.into(),
            exit_code: EXIT_LAUNCH_FAILURE,
        }
    }
}

/// Where and how long a command may run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub working_dir: PathBuf,
    /// Extra environment variables layered over the inherited environment.
    pub env: HashMap<String, String>,
    pub timeout: Duration,
    pub max_capture_bytes: usize,
    pub cancel: CancellationToken,
}

impl RunOptions {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            env: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
            max_capture_bytes: MAX_CAPTURE_BYTES,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_max_capture_bytes(mut self, max: usize) -> Self {
        self.max_capture_bytes = max;
        self
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

/// Runs a command string and reports what happened.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: &str, options: &RunOptions) -> ExecutionOutcome;
}
