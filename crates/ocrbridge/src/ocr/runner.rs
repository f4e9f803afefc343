//! Engine subprocess execution.
//!
//! [`ProcessRunner`] is the seam between the OCR service and the operating system.
//! [`TokioProcessRunner`] is the real implementation; tests plug in scripted fakes.
//!
//! # Process lifetime
//!
//! The runner owns exactly one child per call and it never outlives the call:
//!
//! - stdout and stderr are drained by dedicated tasks while the child runs, so a
//!   large OCR result cannot fill a pipe buffer and stall the engine
//! - when the time limit passes the child is killed and reaped before returning
//! - any other exit path drops the child with `kill_on_drop(true)`

use super::types::ValidatedRequest;
use crate::core::config::ProcessConfig;
use async_trait::async_trait;
use std::borrow::Cow;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Upper bound on how long to wait for pipes to close after the child has exited.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Program and argument vector for one engine run.
///
/// Arguments are handed to the OS verbatim, never through a shell, so file paths and
/// language strings cannot inject commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl EngineInvocation {
    /// `<executable> <script> <file> --dpi=<dpi> --lang=<lang>`
    pub fn new(config: &ProcessConfig, request: &ValidatedRequest) -> Self {
        Self {
            program: config.executable_path.clone(),
            args: vec![
                config.script_path.clone().into_os_string(),
                request.file_path.clone().into_os_string(),
                OsString::from(format!("--dpi={}", request.dpi)),
                OsString::from(format!("--lang={}", request.lang)),
            ],
        }
    }

    /// Space-joined rendering for log messages.
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.to_string_lossy())
            .chain(self.args.iter().map(|arg| arg.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a child that exited on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// Failures of the runner itself, as opposed to failures reported by the engine.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to execute '{}': {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Process timed out after {:.2} seconds", .elapsed.as_secs_f64())]
    Timeout { elapsed: Duration },

    #[error("Failed to collect process output: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs an [`EngineInvocation`] to completion or until `limit` elapses.
///
/// Implementations must not leave the child running when they return, whatever the
/// outcome.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &EngineInvocation, limit: Duration) -> Result<ProcessOutput, RunnerError>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &EngineInvocation, limit: Duration) -> Result<ProcessOutput, RunnerError> {
        let started = Instant::now();

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let pid = child.id();
        tracing::debug!("Spawned OCR engine (PID: {:?}): {}", pid, invocation.display_command());

        let stdout_task = drain(child.stdout.take());
        let stderr_task = drain(child.stderr.take());

        let status = match timeout(limit, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                stdout_task.abort();
                stderr_task.abort();
                return Err(RunnerError::Io(e));
            }
            Err(_) => {
                let elapsed = started.elapsed();
                // kill() sends SIGKILL and waits, so the child is reaped here
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill timed out OCR engine (PID: {:?}): {}", pid, e);
                }
                stdout_task.abort();
                stderr_task.abort();
                return Err(RunnerError::Timeout { elapsed });
            }
        };

        // A grandchild may still hold the pipes open after the engine exits.
        let remaining = limit.saturating_sub(started.elapsed()).max(PIPE_DRAIN_GRACE);
        let (stdout, stderr) = collect_output(stdout_task, stderr_task, remaining, started).await?;

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code: status.code(),
        })
    }
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buffer).await?;
        }
        Ok(buffer)
    })
}

/// Join both reader tasks within `limit`. On any failure both tasks are aborted so no
/// reader outlives the call.
async fn collect_output(
    stdout_task: JoinHandle<std::io::Result<Vec<u8>>>,
    stderr_task: JoinHandle<std::io::Result<Vec<u8>>>,
    limit: Duration,
    started: Instant,
) -> Result<(Vec<u8>, Vec<u8>), RunnerError> {
    let stdout_abort = stdout_task.abort_handle();
    let stderr_abort = stderr_task.abort_handle();

    let collected = timeout(limit, async {
        let stdout = join_drain(stdout_task).await?;
        let stderr = join_drain(stderr_task).await?;
        Ok::<_, std::io::Error>((stdout, stderr))
    })
    .await;

    match collected {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => {
            stdout_abort.abort();
            stderr_abort.abort();
            Err(RunnerError::Io(e))
        }
        Err(_) => {
            tracing::warn!("OCR engine exited but its output pipes stayed open; abandoning readers");
            stdout_abort.abort();
            stderr_abort.abort();
            Err(RunnerError::Timeout {
                elapsed: started.elapsed(),
            })
        }
    }
}

async fn join_drain(task: JoinHandle<std::io::Result<Vec<u8>>>) -> std::io::Result<Vec<u8>> {
    task.await
        .map_err(|e| std::io::Error::other(format!("Output reader task failed: {}", e)))?
}
