//! Engine process configuration.
//!
//! [`ProcessConfig`] describes how to launch the external OCR engine and which
//! requests it accepts. It is built once at startup (from defaults, a config file,
//! and environment overrides), validated, and then shared read-only.

use crate::{OcrBridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lowest DPI accepted by the engine.
pub const MIN_DPI: u32 = 72;

/// File name searched for by [`ProcessConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "ocrbridge.toml";

pub const ENV_PYTHON_PATH: &str = "OCRBRIDGE_PYTHON_PATH";
pub const ENV_SCRIPT_PATH: &str = "OCRBRIDGE_SCRIPT_PATH";
pub const ENV_DEFAULT_DPI: &str = "OCRBRIDGE_DEFAULT_DPI";
pub const ENV_MAX_DPI: &str = "OCRBRIDGE_MAX_DPI";
pub const ENV_DEFAULT_LANG: &str = "OCRBRIDGE_DEFAULT_LANG";
pub const ENV_TIMEOUT: &str = "OCRBRIDGE_TIMEOUT";

/// Configuration for launching the OCR engine.
///
/// Every field has a default, so a config file only needs the keys it changes:
///
/// ```toml
/// executable_path = "/opt/ocr/venv/bin/python3"
/// script_path = "/opt/ocr/scripts/ocr.py"
/// default_dpi = 300
/// timeout_seconds = 60
/// supported_languages = ["spa", "eng", "spa+eng", "deu"]
/// ```
///
/// # Example
///
/// ```rust
/// use ocrbridge::ProcessConfig;
///
/// let config = ProcessConfig::default();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_dpi, 2000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Interpreter used to launch the engine script
    pub executable_path: PathBuf,

    /// Entry point of the engine, passed as the first argument
    pub script_path: PathBuf,

    /// DPI used when a request does not specify one
    pub default_dpi: u32,

    /// Language code used when a request does not specify one
    pub default_lang: String,

    /// Hard wall-clock limit for one engine run
    pub timeout_seconds: u64,

    /// Lower-case file extensions without the leading dot
    pub supported_extensions: Vec<String>,

    /// Accepted language codes, including composite entries such as `spa+eng`
    pub supported_languages: Vec<String>,

    /// Upper DPI bound (inclusive)
    pub max_dpi: u32,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            executable_path: PathBuf::from("venv/bin/python3"),
            script_path: PathBuf::from("scripts/ocr.py"),
            default_dpi: 1000,
            default_lang: "spa".to_string(),
            timeout_seconds: 120,
            supported_extensions: ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "pdf"]
                .into_iter()
                .map(String::from)
                .collect(),
            supported_languages: ["spa", "eng", "spa+eng"].into_iter().map(String::from).collect(),
            max_dpi: 2000,
        }
    }
}

impl ProcessConfig {
    /// Wall-clock limit for one engine run.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Whether `extension` (case-insensitive, without dot) is accepted.
    pub fn supports_extension(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.supported_extensions.iter().any(|e| *e == extension)
    }

    /// Whether `code` is listed verbatim in `supported_languages`.
    pub fn supports_language(&self, code: &str) -> bool {
        self.supported_languages.iter().any(|l| l == code)
    }

    /// Check the invariants every component relies on.
    ///
    /// # Errors
    ///
    /// Returns `OcrBridgeError::Validation` when `MIN_DPI <= default_dpi <= max_dpi`
    /// does not hold, the timeout is zero, or an allow-list is empty.
    pub fn validate(&self) -> Result<()> {
        if self.default_dpi < MIN_DPI {
            return Err(OcrBridgeError::validation(format!(
                "default_dpi must be at least {}, got {}",
                MIN_DPI, self.default_dpi
            )));
        }

        if self.default_dpi > self.max_dpi {
            return Err(OcrBridgeError::validation(format!(
                "default_dpi ({}) must not exceed max_dpi ({})",
                self.default_dpi, self.max_dpi
            )));
        }

        if self.timeout_seconds == 0 {
            return Err(OcrBridgeError::validation("timeout_seconds must be greater than zero"));
        }

        if self.supported_extensions.is_empty() {
            return Err(OcrBridgeError::validation("supported_extensions must not be empty"));
        }

        if self.supported_languages.is_empty() {
            return Err(OcrBridgeError::validation("supported_languages must not be empty"));
        }

        if self.default_lang.trim().is_empty() {
            return Err(OcrBridgeError::validation("default_lang must not be empty"));
        }

        Ok(())
    }

    /// Lower-case extensions, strip leading dots and drop duplicates, keeping order.
    pub fn normalized(mut self) -> Self {
        let mut extensions: Vec<String> = Vec::with_capacity(self.supported_extensions.len());
        for ext in &self.supported_extensions {
            let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
            if !ext.is_empty() && !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }
        self.supported_extensions = extensions;

        let mut languages: Vec<String> = Vec::with_capacity(self.supported_languages.len());
        for lang in &self.supported_languages {
            let lang = lang.trim().to_string();
            if !lang.is_empty() && !languages.contains(&lang) {
                languages.push(lang);
            }
        }
        self.supported_languages = languages;

        self
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `OcrBridgeError::Validation` if the file cannot be read or is invalid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;

        toml::from_str::<Self>(&content)
            .map(Self::normalized)
            .map_err(|e| {
                OcrBridgeError::validation_with_source(format!("Invalid TOML in {}: {}", path.as_ref().display(), e), e)
            })
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;

        serde_yaml_ng::from_str::<Self>(&content)
            .map(Self::normalized)
            .map_err(|e| {
                OcrBridgeError::validation_with_source(format!("Invalid YAML in {}: {}", path.as_ref().display(), e), e)
            })
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;

        serde_json::from_str::<Self>(&content)
            .map(Self::normalized)
            .map_err(|e| {
                OcrBridgeError::validation_with_source(format!("Invalid JSON in {}: {}", path.as_ref().display(), e), e)
            })
    }

    /// Load configuration choosing the format from the file extension.
    ///
    /// `.json` and `.yaml`/`.yml` are parsed accordingly; anything else is read as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "json" => Self::from_json_file(path),
            "yaml" | "yml" => Self::from_yaml_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Render as a TOML document that [`from_toml_file`](Self::from_toml_file) reads back.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Discover `ocrbridge.toml` in the current directory or any parent.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(OcrBridgeError::Io)?;

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                tracing::debug!("Using configuration file {}", candidate.display());
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Defaults with `OCRBRIDGE_*` environment overrides applied, ignoring config files.
    pub fn from_env() -> Self {
        Self::default().apply_env_overrides().normalized()
    }

    /// Apply `OCRBRIDGE_*` environment variables on top of this configuration.
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup`, keyed by the `OCRBRIDGE_*` names.
    ///
    /// Numeric values that do not parse are ignored with a warning.
    pub fn apply_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = get(ENV_PYTHON_PATH) {
            self.executable_path = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_SCRIPT_PATH) {
            self.script_path = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_DEFAULT_LANG) {
            self.default_lang = value.trim().to_string();
        }
        if let Some(dpi) = parse_numeric(ENV_DEFAULT_DPI, get(ENV_DEFAULT_DPI)) {
            self.default_dpi = dpi;
        }
        if let Some(dpi) = parse_numeric(ENV_MAX_DPI, get(ENV_MAX_DPI)) {
            self.max_dpi = dpi;
        }
        if let Some(secs) = parse_numeric(ENV_TIMEOUT, get(ENV_TIMEOUT)) {
            self.timeout_seconds = secs;
        }

        self
    }

    /// Build the effective configuration the way the CLI and services do.
    ///
    /// Order: explicit file (if given), else a discovered `ocrbridge.toml`, else defaults;
    /// then environment overrides; then normalisation and validation.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let base = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::discover()?.unwrap_or_default(),
        };

        let config = base.apply_env_overrides().normalized();
        config.validate()?;
        Ok(config)
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| OcrBridgeError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}

fn parse_numeric<T: std::str::FromStr>(key: &str, value: Option<String>) -> Option<T> {
    let value = value?;
    match value.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Failed to parse {}='{}', keeping the configured value", key, value);
            None
        }
    }
}
