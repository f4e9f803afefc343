//! Decoding of the engine's stdout protocol.
//!
//! The engine prints one JSON object:
//!
//! - success: `{"success": true, "text": "...", "pages": 1}`
//! - failure: `{"success": false, "error": "..."}`
//!
//! or exits non-zero, optionally with `{"error": "..."}` on stdout and diagnostics on
//! stderr.

use super::runner::ProcessOutput;
use super::types::OcrFailure;
use serde::Deserialize;

/// Message used when the engine reports failure without saying why.
pub const UNKNOWN_ENGINE_ERROR: &str = "unknown OCR engine error";

/// Text and page count extracted by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineText {
    pub text: String,
    pub pages: u32,
}

/// Raw JSON object printed by the engine. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnginePayload {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Interpret a finished engine run.
///
/// Non-zero exits become `EngineReportedError` when stdout carries a JSON `error`,
/// otherwise `ProcessFailed`. Zero exits must print a well-formed payload; anything
/// else is `MalformedOutput`.
pub fn parse_engine_output(output: &ProcessOutput) -> Result<EngineText, OcrFailure> {
    let stdout = output.stdout_lossy();
    let stdout = stdout.trim();

    if !output.success() {
        if let Some(message) = error_field(stdout) {
            return Err(OcrFailure::EngineReportedError { message });
        }

        return Err(OcrFailure::ProcessFailed {
            exit_code: output.exit_code,
            stderr: output.stderr_lossy().trim().to_string(),
        });
    }

    let payload = decode_payload(stdout)?;

    if !payload.success.unwrap_or(false) {
        return Err(OcrFailure::EngineReportedError {
            message: payload
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ENGINE_ERROR.to_string()),
        });
    }

    let text = payload.text.ok_or_else(|| malformed("success payload is missing 'text'", stdout))?;
    let pages = payload
        .pages
        .ok_or_else(|| malformed("success payload is missing 'pages'", stdout))?;

    Ok(EngineText { text, pages })
}

fn decode_payload(stdout: &str) -> Result<EnginePayload, OcrFailure> {
    if stdout.is_empty() {
        return Err(malformed("empty output", stdout));
    }

    let value: serde_json::Value = serde_json::from_str(stdout).map_err(|e| malformed(e.to_string(), stdout))?;

    if !value.is_object() {
        return Err(malformed("expected a JSON object", stdout));
    }

    serde_json::from_value(value).map_err(|e| malformed(e.to_string(), stdout))
}

/// The `error` string of a JSON object on stdout, if there is one.
fn error_field(stdout: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(stdout).ok()?;
    value
        .get("error")
        .and_then(|e| e.as_str())
        .filter(|e| !e.trim().is_empty())
        .map(str::to_string)
}

fn malformed(reason: impl Into<String>, stdout: &str) -> OcrFailure {
    OcrFailure::MalformedOutput {
        reason: reason.into(),
        stdout: stdout.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::types::OcrFailureKind;

    fn output(stdout: &str, stderr: &str, exit_code: Option<i32>) -> ProcessOutput {
        ProcessOutput {
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
            exit_code,
        }
    }

    #[test]
    fn test_success_payload() {
        let parsed = parse_engine_output(&output(
            r#"{"success": true, "text": "Hola", "pages": 1}"#,
            "",
            Some(0),
        ))
        .unwrap();
        assert_eq!(
            parsed,
            EngineText {
                text: "Hola".to_string(),
                pages: 1
            }
        );
    }

    #[test]
    fn test_success_payload_with_trailing_newline_and_unicode() {
        let parsed = parse_engine_output(&output(
            "{\"success\": true, \"text\": \"Año\\n\\n--- Page Break ---\\n\\nçà\", \"pages\": 2}\n",
            "",
            Some(0),
        ))
        .unwrap();
        assert_eq!(parsed.pages, 2);
        assert!(parsed.text.contains("--- Page Break ---"));
        assert!(parsed.text.starts_with("Año"));
    }

    #[test]
    fn test_not_json_is_malformed() {
        let failure = parse_engine_output(&output("not json", "", Some(0))).unwrap_err();
        assert_eq!(failure.kind(), OcrFailureKind::MalformedOutput);
    }

    #[test]
    fn test_empty_stdout_is_malformed() {
        let failure = parse_engine_output(&output("   \n", "", Some(0))).unwrap_err();
        assert_eq!(failure.kind(), OcrFailureKind::MalformedOutput);
    }

    #[test]
    fn test_non_object_json_is_malformed() {
        let failure = parse_engine_output(&output("[1, 2, 3]", "", Some(0))).unwrap_err();
        assert_eq!(failure.kind(), OcrFailureKind::MalformedOutput);
    }

    #[test]
    fn test_wrong_field_types_are_malformed() {
        let failure = parse_engine_output(&output(
            r#"{"success": true, "text": "x", "pages": "one"}"#,
            "",
            Some(0),
        ))
        .unwrap_err();
        assert_eq!(failure.kind(), OcrFailureKind::MalformedOutput);
    }

    #[test]
    fn test_success_without_text_is_malformed() {
        let failure = parse_engine_output(&output(r#"{"success": true, "pages": 1}"#, "", Some(0))).unwrap_err();
        assert_eq!(failure.kind(), OcrFailureKind::MalformedOutput);
        assert!(failure.to_string().contains("'text'"));
    }

    #[test]
    fn test_success_without_pages_is_malformed() {
        let failure = parse_engine_output(&output(r#"{"success": true, "text": "x"}"#, "", Some(0))).unwrap_err();
        assert!(failure.to_string().contains("'pages'"));
    }

    #[test]
    fn test_success_false_with_error() {
        let failure = parse_engine_output(&output(
            r#"{"success": false, "error": "TesseractError: no lang data"}"#,
            "",
            Some(0),
        ))
        .unwrap_err();
        assert_eq!(
            failure,
            OcrFailure::EngineReportedError {
                message: "TesseractError: no lang data".to_string()
            }
        );
    }

    #[test]
    fn test_success_false_without_error_uses_fallback() {
        let failure = parse_engine_output(&output(r#"{"success": false}"#, "", Some(0))).unwrap_err();
        assert_eq!(failure.to_string(), UNKNOWN_ENGINE_ERROR);
    }

    #[test]
    fn test_missing_success_flag_is_engine_error() {
        let failure = parse_engine_output(&output(r#"{"text": "x", "pages": 1}"#, "", Some(0))).unwrap_err();
        assert_eq!(failure.kind(), OcrFailureKind::EngineReportedError);
    }

    #[test]
    fn test_nonzero_exit_with_json_error() {
        let failure = parse_engine_output(&output(
            r#"{"success": false, "error": "File not found: /x.png"}"#,
            "",
            Some(1),
        ))
        .unwrap_err();
        assert_eq!(failure.kind(), OcrFailureKind::EngineReportedError);
        assert_eq!(failure.to_string(), "File not found: /x.png");
    }

    #[test]
    fn test_nonzero_exit_without_json() {
        let failure = parse_engine_output(&output(
            "",
            "Traceback (most recent call last):\n  ModuleNotFoundError\n",
            Some(2),
        ))
        .unwrap_err();
        match failure {
            OcrFailure::ProcessFailed { exit_code, stderr } => {
                assert_eq!(exit_code, Some(2));
                assert!(stderr.contains("ModuleNotFoundError"));
            }
            other => panic!("unexpected failure: {:?}", other),
        }
    }

    #[test]
    fn test_nonzero_exit_with_json_lacking_error() {
        let failure = parse_engine_output(&output(r#"{"success": false}"#, "boom", Some(1))).unwrap_err();
        assert_eq!(failure.kind(), OcrFailureKind::ProcessFailed);
    }

    #[test]
    fn test_signal_termination_is_process_failed() {
        let failure = parse_engine_output(&output("", "", None)).unwrap_err();
        assert_eq!(
            failure,
            OcrFailure::ProcessFailed {
                exit_code: None,
                stderr: String::new()
            }
        );
    }
}
