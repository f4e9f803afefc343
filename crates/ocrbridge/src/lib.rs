//! ocrbridge - run an external OCR engine as a subprocess
//!
//! ocrbridge wraps an OCR engine script (typically a Python program driving Tesseract)
//! behind a typed API. Requests are validated before any process is spawned, the engine
//! runs under a hard time limit, and its JSON output is turned into an [`OcrResult`]
//! that is either text plus page count or a categorized [`OcrFailure`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ocrbridge::{OcrRequest, OcrService, ProcessConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> ocrbridge::Result<()> {
//! let config = ProcessConfig::load(None)?;
//! let service = OcrService::new(config)?;
//!
//! let result = service
//!     .process(OcrRequest::new("scan.png").with_dpi(300).with_lang("spa"))
//!     .await;
//! println!("{:?}", result.text());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core Module** (`core`): process configuration and config file discovery
//! - **OCR Module** (`ocr`): validation, subprocess execution, output decoding, batching
//! - **Errors** (`error`): library errors for configuration and I/O

#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod ocr;

pub use error::{OcrBridgeError, Result};

pub use crate::core::config::ProcessConfig;
pub use ocr::{
    OcrFailure, OcrFailureKind, OcrOutcome, OcrRequest, OcrResult, OcrService, ProcessRunner, TokioProcessRunner,
    process_batch,
};
