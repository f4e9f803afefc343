//! Core configuration shared by every OCR component.

pub mod config;

pub use config::{CONFIG_FILE_NAME, MIN_DPI, ProcessConfig};
