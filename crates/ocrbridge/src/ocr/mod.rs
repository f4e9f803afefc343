//! OCR request pipeline.
//!
//! A request flows through four stages:
//!
//! - [`validation`] checks the file, extension, DPI and language and resolves defaults
//! - [`runner`] launches the engine as `<executable> <script> <file> --dpi=N --lang=L`
//! - [`response`] decodes the JSON the engine prints on stdout
//! - [`service`] ties the stages together and always produces an [`OcrResult`]
//!
//! [`batch`] fans a list of requests out over a bounded number of engine processes.

pub mod batch;
pub mod response;
pub mod runner;
pub mod service;
pub mod types;
pub mod validation;

pub use batch::process_batch;
pub use response::{EngineText, parse_engine_output};
pub use runner::{EngineInvocation, ProcessOutput, ProcessRunner, RunnerError, TokioProcessRunner};
pub use service::OcrService;
pub use types::{OcrFailure, OcrFailureKind, OcrOutcome, OcrRequest, OcrResult, ValidatedRequest};
pub use validation::validate_request;
