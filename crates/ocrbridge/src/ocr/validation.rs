//! Request validation run before any engine process is spawned.
//!
//! Checks run in a fixed order and stop at the first failure: path existence,
//! regular file, extension, DPI range, language.

use super::types::{OcrFailure, OcrRequest, ValidatedRequest};
use crate::core::config::{MIN_DPI, ProcessConfig};
use std::path::Path;

/// Validate `request` against `config`, resolving default DPI and language.
///
/// Pure apart from the filesystem metadata lookup.
pub fn validate_request(request: &OcrRequest, config: &ProcessConfig) -> Result<ValidatedRequest, OcrFailure> {
    let dpi = request.dpi.unwrap_or(config.default_dpi);
    let lang = request.lang.clone().unwrap_or_else(|| config.default_lang.clone());

    validate_path(&request.file_path)?;
    validate_extension(&request.file_path, config)?;
    validate_dpi(dpi, config)?;
    validate_language(&lang, config)?;

    Ok(ValidatedRequest {
        file_path: request.file_path.clone(),
        dpi,
        lang,
    })
}

/// The path must exist and be a regular file (symlinks are followed).
pub fn validate_path(path: &Path) -> Result<(), OcrFailure> {
    let metadata = std::fs::metadata(path).map_err(|_| OcrFailure::NotFound {
        path: path.to_path_buf(),
    })?;

    if !metadata.is_file() {
        return Err(OcrFailure::NotAFile {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Lower-cased text after the last `.` of the file name, empty when there is none.
///
/// Unlike `Path::extension`, a dot-file such as `.png` yields `png`.
pub fn file_extension(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()))
        .unwrap_or_default()
}

pub fn validate_extension(path: &Path, config: &ProcessConfig) -> Result<(), OcrFailure> {
    let extension = file_extension(path);

    if extension.is_empty() || !config.supports_extension(&extension) {
        return Err(OcrFailure::UnsupportedExtension {
            extension,
            supported: config.supported_extensions.clone(),
        });
    }

    Ok(())
}

pub fn validate_dpi(dpi: u32, config: &ProcessConfig) -> Result<(), OcrFailure> {
    if !(MIN_DPI..=config.max_dpi).contains(&dpi) {
        return Err(OcrFailure::InvalidDpi {
            dpi,
            min: MIN_DPI,
            max: config.max_dpi,
        });
    }

    Ok(())
}

/// Accept `lang` when the whole string is allow-listed, or when every `+`-separated
/// component is. The failure names the first component that is not listed.
pub fn validate_language(lang: &str, config: &ProcessConfig) -> Result<(), OcrFailure> {
    if config.supports_language(lang) {
        return Ok(());
    }

    for code in lang.split('+') {
        if !config.supports_language(code) {
            return Err(OcrFailure::UnsupportedLanguage {
                code: code.to_string(),
                supported: config.supported_languages.clone(),
            });
        }
    }

    Ok(())
}
