use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// One OCR call as supplied by the caller.
///
/// `dpi` and `lang` fall back to the configured defaults when `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrRequest {
    pub file_path: PathBuf,
    pub dpi: Option<u32>,
    pub lang: Option<String>,
}

impl OcrRequest {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            dpi: None,
            lang: None,
        }
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
}

/// A request that passed validation, with defaults resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub file_path: PathBuf,
    pub dpi: u32,
    pub lang: String,
}

/// Tag identifying the kind of an [`OcrFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrFailureKind {
    NotFound,
    NotAFile,
    UnsupportedExtension,
    InvalidDpi,
    UnsupportedLanguage,
    Timeout,
    MalformedOutput,
    EngineReportedError,
    ProcessFailed,
}

impl OcrFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::NotAFile => "not_a_file",
            Self::UnsupportedExtension => "unsupported_extension",
            Self::InvalidDpi => "invalid_dpi",
            Self::UnsupportedLanguage => "unsupported_language",
            Self::Timeout => "timeout",
            Self::MalformedOutput => "malformed_output",
            Self::EngineReportedError => "engine_reported_error",
            Self::ProcessFailed => "process_failed",
        }
    }
}

impl fmt::Display for OcrFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an OCR call did not produce text.
///
/// The first five variants are raised by validation before any process is spawned
/// and can be fixed by the caller. The rest come from running the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OcrFailure {
    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Path is not a file: {}", .path.display())]
    NotAFile { path: PathBuf },

    #[error("Unsupported extension: .{extension}. Supported: {}", join_list(.supported))]
    UnsupportedExtension { extension: String, supported: Vec<String> },

    #[error("DPI out of range {min}..{max}: received {dpi}")]
    InvalidDpi { dpi: u32, min: u32, max: u32 },

    #[error("Unsupported language: {code}. Supported: {}", join_list(.supported))]
    UnsupportedLanguage { code: String, supported: Vec<String> },

    #[error("OCR process exceeded the time limit of {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64, elapsed: Duration },

    #[error("OCR process output is not valid JSON: {reason}")]
    MalformedOutput { reason: String, stdout: String },

    #[error("{message}")]
    EngineReportedError { message: String },

    #[error("OCR process failed with {}: {stderr}", describe_exit(.exit_code))]
    ProcessFailed { exit_code: Option<i32>, stderr: String },
}

fn join_list(items: &[String]) -> String {
    items.join(", ")
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}

impl OcrFailure {
    pub fn kind(&self) -> OcrFailureKind {
        match self {
            Self::NotFound { .. } => OcrFailureKind::NotFound,
            Self::NotAFile { .. } => OcrFailureKind::NotAFile,
            Self::UnsupportedExtension { .. } => OcrFailureKind::UnsupportedExtension,
            Self::InvalidDpi { .. } => OcrFailureKind::InvalidDpi,
            Self::UnsupportedLanguage { .. } => OcrFailureKind::UnsupportedLanguage,
            Self::Timeout { .. } => OcrFailureKind::Timeout,
            Self::MalformedOutput { .. } => OcrFailureKind::MalformedOutput,
            Self::EngineReportedError { .. } => OcrFailureKind::EngineReportedError,
            Self::ProcessFailed { .. } => OcrFailureKind::ProcessFailed,
        }
    }

    /// True for failures raised by input validation, which the caller can fix.
    pub fn is_caller_correctable(&self) -> bool {
        matches!(
            self.kind(),
            OcrFailureKind::NotFound
                | OcrFailureKind::NotAFile
                | OcrFailureKind::UnsupportedExtension
                | OcrFailureKind::InvalidDpi
                | OcrFailureKind::UnsupportedLanguage
        )
    }
}

/// Success or failure payload of an [`OcrResult`].
#[derive(Debug, Clone, PartialEq)]
pub enum OcrOutcome {
    Success { text: String, pages: u32 },
    Failure(OcrFailure),
}

/// Immutable outcome of one OCR call.
///
/// Built through [`OcrResult::success`] or [`OcrResult::failure`]; exactly one of
/// [`text`](Self::text) and [`error`](Self::error) is present.
///
/// Serialises as a flat record:
///
/// ```json
/// {"success": true, "text": "Hola", "error": null, "error_kind": null, "pages": 1, "processing_time": 0.42}
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResult {
    outcome: OcrOutcome,
    processing_time: Duration,
}

impl OcrResult {
    pub fn success(text: impl Into<String>, pages: u32, processing_time: Duration) -> Self {
        Self {
            outcome: OcrOutcome::Success {
                text: text.into(),
                pages,
            },
            processing_time,
        }
    }

    pub fn failure(failure: OcrFailure, processing_time: Duration) -> Self {
        Self {
            outcome: OcrOutcome::Failure(failure),
            processing_time,
        }
    }

    pub fn outcome(&self) -> &OcrOutcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> OcrOutcome {
        self.outcome
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, OcrOutcome::Success { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.outcome {
            OcrOutcome::Success { text, .. } => Some(text),
            OcrOutcome::Failure(_) => None,
        }
    }

    /// Human-readable failure reason, `None` on success.
    pub fn error(&self) -> Option<String> {
        self.as_failure().map(ToString::to_string)
    }

    pub fn as_failure(&self) -> Option<&OcrFailure> {
        match &self.outcome {
            OcrOutcome::Failure(failure) => Some(failure),
            OcrOutcome::Success { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<OcrFailureKind> {
        self.as_failure().map(OcrFailure::kind)
    }

    /// Pages processed; 0 unless successful.
    pub fn pages(&self) -> u32 {
        match &self.outcome {
            OcrOutcome::Success { pages, .. } => *pages,
            OcrOutcome::Failure(_) => 0,
        }
    }

    pub fn processing_time(&self) -> Duration {
        self.processing_time
    }

    pub fn processing_time_secs(&self) -> f64 {
        self.processing_time.as_secs_f64()
    }
}

#[derive(Serialize)]
struct OcrResultRecord<'a> {
    success: bool,
    text: Option<&'a str>,
    error: Option<String>,
    error_kind: Option<OcrFailureKind>,
    pages: u32,
    processing_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a Path>,
}

impl Serialize for OcrResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.record(None).serialize(serializer)
    }
}

impl OcrResult {
    fn record<'a>(&'a self, file: Option<&'a Path>) -> OcrResultRecord<'a> {
        OcrResultRecord {
            success: self.is_success(),
            text: self.text(),
            error: self.error(),
            error_kind: self.failure_kind(),
            pages: self.pages(),
            processing_time: self.processing_time_secs(),
            file,
        }
    }

    /// Serialise to JSON with a `file` field naming the processed path.
    pub fn to_json_with_file(&self, file: &Path) -> crate::Result<serde_json::Value> {
        Ok(serde_json::to_value(self.record(Some(file)))?)
    }
}
