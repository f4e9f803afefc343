//! Error types for ocrbridge.
//!
//! Two error families live in this crate and they never mix:
//!
//! - [`OcrBridgeError`] covers infrastructure failures outside a single OCR call:
//!   loading and validating configuration, reading config files, serialization.
//!   These are returned as `Err` from constructors and loaders.
//! - [`crate::ocr::OcrFailure`] is the per-call taxonomy (missing file, bad DPI,
//!   engine timeout, ...). It is carried inside [`crate::ocr::OcrResult`] and is
//!   never returned as `Err` from [`crate::ocr::OcrService::process`].
//!
//! **System errors bubble up unchanged:** `OcrBridgeError::Io` wraps
//! `std::io::Error` through `?` and is never rewrapped as a validation error.
//!
//! # Example
//!
//! ```rust
//! use ocrbridge::{OcrBridgeError, Result};
//!
//! fn read_script(path: &str) -> Result<String> {
//!     let content = std::fs::read_to_string(path)?;
//!
//!     if content.is_empty() {
//!         return Err(OcrBridgeError::validation(format!("Engine script is empty: {}", path)));
//!     }
//!
//!     Ok(content)
//! }
//! ```
use thiserror::Error;

/// Result type alias using `OcrBridgeError`.
pub type Result<T> = std::result::Result<T, OcrBridgeError>;

/// Infrastructure error type for ocrbridge.
///
/// # Variants
///
/// - `Io` - File system and I/O errors (always bubble up)
/// - `Validation` - Invalid configuration values or unreadable config files
/// - `Serialization` - JSON/TOML/YAML encoding and decoding errors
#[derive(Debug, Error)]
pub enum OcrBridgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl From<serde_json::Error> for OcrBridgeError {
    fn from(err: serde_json::Error) -> Self {
        OcrBridgeError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::ser::Error> for OcrBridgeError {
    fn from(err: toml::ser::Error) -> Self {
        OcrBridgeError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl OcrBridgeError {
    error_constructor!(validation, Validation);
    error_constructor!(serialization, Serialization);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: OcrBridgeError = io_err.into();
        assert!(matches!(err, OcrBridgeError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_validation_error() {
        let err = OcrBridgeError::validation("default_dpi exceeds max_dpi");
        assert_eq!(err.to_string(), "Validation error: default_dpi exceeds max_dpi");
    }

    #[test]
    fn test_validation_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad param");
        let err = OcrBridgeError::validation_with_source("invalid config", source);
        assert_eq!(err.to_string(), "Validation error: invalid config");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_serialization_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad format");
        let err = OcrBridgeError::serialization_with_source("JSON encode failed", source);
        assert_eq!(err.to_string(), "Serialization error: JSON encode failed");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: OcrBridgeError = json_err.into();
        assert!(matches!(err, OcrBridgeError::Serialization { .. }));
    }

    #[test]
    fn test_toml_ser_error_is_serialization() {
        let toml_err = toml::to_string(&vec![1, 2, 3]).unwrap_err();
        let err: OcrBridgeError = toml_err.into();
        assert!(matches!(err, OcrBridgeError::Serialization { .. }));
    }

    #[test]
    fn test_io_error_bubbles_unchanged() {
        fn read_file() -> Result<String> {
            let content = std::fs::read_to_string("/nonexistent/ocrbridge/file.toml")?;
            Ok(content)
        }

        assert!(matches!(read_file().unwrap_err(), OcrBridgeError::Io(_)));
    }
}
