//! Shared fixtures for integration tests.
//!
//! Tests stand in for the real OCR engine with small `/bin/sh` scripts. The shell is
//! configured as the executable and the script as `script_path`, so the script sees the
//! same `<file> --dpi=N --lang=L` arguments the real engine would.

#![allow(dead_code)]

use ocrbridge::{OcrService, ProcessConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary workspace holding a mock engine script and input files.
pub struct MockEngine {
    pub dir: TempDir,
    pub script: PathBuf,
}

impl MockEngine {
    /// Write `body` as the engine script.
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let script = dir.path().join("ocr_engine.sh");
        fs::write(&script, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write mock engine");
        Self { dir, script }
    }

    /// Engine that prints a fixed success payload.
    pub fn replying(text: &str, pages: u32) -> Self {
        let body = serde_json::json!({"success": true, "text": text, "pages": pages});
        Self::new(&format!("printf '%s' '{}'", body))
    }

    pub fn config(&self) -> ProcessConfig {
        ProcessConfig {
            executable_path: PathBuf::from("/bin/sh"),
            script_path: self.script.clone(),
            ..Default::default()
        }
    }

    pub fn service(&self) -> OcrService {
        OcrService::new(self.config()).expect("Mock engine config should be valid")
    }

    pub fn service_with_timeout(&self, timeout_seconds: u64) -> OcrService {
        let config = ProcessConfig {
            timeout_seconds,
            ..self.config()
        };
        OcrService::new(config).expect("Mock engine config should be valid")
    }

    /// Create an input file inside the workspace.
    pub fn input(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, b"\x89PNG fake image").expect("Failed to write input file");
        path
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
