//! The OCR facade: validate, run the engine, interpret its output.

use super::response::{EngineText, parse_engine_output};
use super::runner::{EngineInvocation, ProcessOutput, ProcessRunner, RunnerError, TokioProcessRunner};
use super::types::{OcrFailure, OcrRequest, OcrResult, ValidatedRequest};
use super::validation::validate_request;
use crate::Result;
use crate::core::config::ProcessConfig;
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest stdout/stderr excerpt attached to a log event.
const LOG_SNIPPET_CHARS: usize = 500;

/// Runtime backing [`OcrService::process_sync`], created on first use.
static GLOBAL_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create global Tokio runtime - system may be out of resources")
});

/// Runs OCR requests against the configured external engine.
///
/// The service is cheap to clone; clones share the read-only configuration and the
/// process runner, so one instance can serve concurrent callers.
///
/// # Example
///
/// ```rust,no_run
/// use ocrbridge::{OcrRequest, OcrService, ProcessConfig};
///
/// # fn main() -> ocrbridge::Result<()> {
/// let service = OcrService::new(ProcessConfig::default())?;
/// let result = service.process_sync(OcrRequest::new("scan.png").with_dpi(300));
///
/// match result.text() {
///     Some(text) => println!("{} pages: {}", result.pages(), text),
///     None => eprintln!("Error: {}", result.error().unwrap_or_default()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct OcrService {
    config: Arc<ProcessConfig>,
    runner: Arc<dyn ProcessRunner>,
}

impl std::fmt::Debug for OcrService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrService").field("config", &self.config).finish_non_exhaustive()
    }
}

impl OcrService {
    /// Create a service that launches real engine processes.
    ///
    /// # Errors
    ///
    /// Returns `OcrBridgeError::Validation` if `config` violates its invariants.
    pub fn new(config: ProcessConfig) -> Result<Self> {
        Self::with_runner(config, Arc::new(TokioProcessRunner::new()))
    }

    /// Create a service with a custom [`ProcessRunner`].
    pub fn with_runner(config: ProcessConfig, runner: Arc<dyn ProcessRunner>) -> Result<Self> {
        let config = config.normalized();
        config.validate()?;

        Ok(Self {
            config: Arc::new(config),
            runner,
        })
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    pub fn supported_extensions(&self) -> &[String] {
        &self.config.supported_extensions
    }

    pub fn supported_languages(&self) -> &[String] {
        &self.config.supported_languages
    }

    /// Run one OCR request.
    ///
    /// Always returns a result: invalid requests fail before any process is spawned,
    /// and every engine-side problem is converted into a failure result.
    /// `processing_time` covers the whole call, validation included.
    pub async fn process(&self, request: OcrRequest) -> OcrResult {
        let started = Instant::now();

        let validated = match validate_request(&request, &self.config) {
            Ok(validated) => validated,
            Err(failure) => {
                tracing::debug!(
                    file = %request.file_path.display(),
                    kind = %failure.kind(),
                    "OCR request rejected: {}",
                    failure
                );
                return OcrResult::failure(failure, started.elapsed());
            }
        };

        let invocation = EngineInvocation::new(&self.config, &validated);
        let run = self.runner.run(&invocation, self.config.timeout()).await;

        match run {
            Ok(output) => match parse_engine_output(&output) {
                Ok(EngineText { text, pages }) => {
                    let processing_time = started.elapsed();
                    log_success(&validated, pages, &text, processing_time);
                    OcrResult::success(text, pages, processing_time)
                }
                Err(failure) => {
                    log_engine_failure(&validated.file_path, &failure, &output);
                    OcrResult::failure(failure, started.elapsed())
                }
            },
            Err(RunnerError::Timeout { elapsed }) => {
                tracing::error!(
                    file = %validated.file_path.display(),
                    timeout = self.config.timeout_seconds,
                    elapsed = elapsed.as_secs_f64(),
                    timed_out = true,
                    "OCR process timed out"
                );
                OcrResult::failure(
                    OcrFailure::Timeout {
                        timeout_seconds: self.config.timeout_seconds,
                        elapsed,
                    },
                    started.elapsed(),
                )
            }
            Err(err) => {
                tracing::error!(
                    file = %validated.file_path.display(),
                    command = %invocation.display_command(),
                    timed_out = false,
                    "OCR process could not be run: {}",
                    err
                );
                OcrResult::failure(
                    OcrFailure::ProcessFailed {
                        exit_code: None,
                        stderr: err.to_string(),
                    },
                    started.elapsed(),
                )
            }
        }
    }

    /// Blocking wrapper for [`process`](Self::process).
    ///
    /// Must not be called from inside an async runtime; use `process` there.
    pub fn process_sync(&self, request: OcrRequest) -> OcrResult {
        GLOBAL_RUNTIME.block_on(self.process(request))
    }
}

fn log_success(request: &ValidatedRequest, pages: u32, text: &str, processing_time: Duration) {
    tracing::info!(
        file = %request.file_path.display(),
        pages,
        text_length = text.len(),
        processing_time = (processing_time.as_secs_f64() * 100.0).round() / 100.0,
        "OCR process completed"
    );
}

fn log_engine_failure(file: &Path, failure: &OcrFailure, output: &ProcessOutput) {
    let stdout = snippet(&output.stdout_lossy());
    let stderr = snippet(&output.stderr_lossy());

    match failure {
        OcrFailure::MalformedOutput { reason, .. } => tracing::error!(
            file = %file.display(),
            exit_code = ?output.exit_code,
            stdout = %stdout,
            stderr = %stderr,
            timed_out = false,
            "OCR output is not valid JSON: {}",
            reason
        ),
        _ => tracing::error!(
            file = %file.display(),
            exit_code = ?output.exit_code,
            kind = %failure.kind(),
            stdout = %stdout,
            stderr = %stderr,
            timed_out = false,
            "OCR process failed: {}",
            failure
        ),
    }
}

fn snippet(s: &str) -> String {
    let s = s.trim();
    match s.char_indices().nth(LOG_SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}
