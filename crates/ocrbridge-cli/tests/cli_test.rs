//! Integration tests for the ocrbridge binary, driven by a `/bin/sh` mock engine.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const ENV_KEYS: [&str; 6] = [
    "OCRBRIDGE_PYTHON_PATH",
    "OCRBRIDGE_SCRIPT_PATH",
    "OCRBRIDGE_DEFAULT_DPI",
    "OCRBRIDGE_MAX_DPI",
    "OCRBRIDGE_DEFAULT_LANG",
    "OCRBRIDGE_TIMEOUT",
];

/// Workspace with an engine script and an `ocrbridge.toml` pointing at it.
fn workspace(engine: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let script = dir.path().join("engine.sh");
    fs::write(&script, format!("#!/bin/sh\n{}\n", engine)).unwrap();
    fs::write(
        dir.path().join("ocrbridge.toml"),
        format!(
            "executable_path = \"/bin/sh\"\nscript_path = \"{}\"\ntimeout_seconds = 10\n",
            script.display()
        ),
    )
    .unwrap();
    fs::write(dir.path().join("scan.png"), b"fake png").unwrap();
    dir
}

fn ocrbridge(cwd: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_ocrbridge"));
    command.args(args).current_dir(cwd).env("RUST_LOG", "off");
    for key in ENV_KEYS {
        command.env_remove(key);
    }
    command.output().expect("Failed to run ocrbridge")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const HOLA: &str = r#"printf '{"success":true,"text":"Hola mundo","pages":1}'"#;

#[test]
fn test_process_prints_summary_and_text() {
    let dir = workspace(HOLA);

    let output = ocrbridge(dir.path(), &["process", "scan.png", "--dpi", "300", "--lang", "spa"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    let first = out.lines().next().unwrap_or_default();
    assert!(first.starts_with("Processing file: /") && first.ends_with("/scan.png"), "{}", first);
    assert!(out.contains("DPI: 300"));
    assert!(out.contains("Pages processed: 1"));
    assert!(out.contains("Characters extracted: 10"));
    assert!(out.contains("--- Extracted text ---\n\nHola mundo\n\n--- End of text ---"));
}

#[test]
fn test_process_writes_output_file() {
    let dir = workspace(HOLA);

    let output = ocrbridge(dir.path(), &["process", "scan.png", "--output", "out.txt"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "Hola mundo");
    assert!(!stdout(&output).contains("--- Extracted text ---"));
}

#[test]
fn test_process_json_format() {
    let dir = workspace(HOLA);

    let output = ocrbridge(dir.path(), &["process", "scan.png", "--format", "json"]);

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["text"], "Hola mundo");
    assert_eq!(value["pages"], 1);
    assert!(value["file"].as_str().unwrap().ends_with("scan.png"));
}

#[test]
fn test_validation_failure_exits_nonzero() {
    let dir = workspace(HOLA);

    let output = ocrbridge(dir.path(), &["process", "scan.png", "--dpi", "5000"]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.starts_with("Error: DPI out of range"), "stderr: {}", err);
    assert!(!err.contains("panicked"));
}

#[test]
fn test_engine_error_exits_nonzero() {
    let dir = workspace(r#"printf '{"success":false,"error":"Tesseract is not installed"}'; exit 1"#);

    let output = ocrbridge(dir.path(), &["process", "scan.png"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error: Tesseract is not installed"));
}

#[test]
fn test_batch_reports_each_file() {
    let dir = workspace(r#"printf '{"success":true,"text":"%s","pages":2}' "$(basename "$1")""#);
    fs::write(dir.path().join("notes.xyz"), b"x").unwrap();

    let output = ocrbridge(dir.path(), &["batch", "scan.png", "notes.xyz"]);

    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("scan.png: OK (2 pages"));
    assert!(lines[1].contains("notes.xyz: Error: Unsupported extension: .xyz"));
}

#[test]
fn test_supported_lists_defaults() {
    let dir = workspace(HOLA);

    let output = ocrbridge(dir.path(), &["supported", "--format", "json"]);

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["languages"], serde_json::json!(["spa", "eng", "spa+eng"]));
    assert!(value["extensions"].as_array().unwrap().contains(&serde_json::json!("pdf")));
}

#[test]
fn test_config_prints_effective_toml() {
    let dir = workspace(HOLA);

    let output = ocrbridge(dir.path(), &["config"]);

    assert!(output.status.success());
    let printed: toml::Table = toml::from_str(&stdout(&output)).unwrap();
    assert_eq!(printed.get("executable_path").and_then(|v| v.as_str()), Some("/bin/sh"));
    assert_eq!(printed.get("timeout_seconds").and_then(|v| v.as_integer()), Some(10));
    assert_eq!(printed.get("default_dpi").and_then(|v| v.as_integer()), Some(1000));
}

#[test]
fn test_explicit_config_flag() {
    let dir = workspace(HOLA);
    let other = tempfile::tempdir().unwrap();
    let config: PathBuf = dir.path().join("ocrbridge.toml");

    let output = ocrbridge(
        other.path(),
        &["--config", config.to_str().unwrap(), "process", dir.path().join("scan.png").to_str().unwrap()],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Hola mundo"));
}

#[test]
fn test_invalid_config_file_reports_error() {
    let dir = workspace(HOLA);
    fs::write(dir.path().join("broken.toml"), "default_dpi = \"high\"").unwrap();

    let output = ocrbridge(dir.path(), &["--config", "broken.toml", "supported"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("Error: Failed to load configuration"));
}
