//! Error handling for the extraction and report pipeline
//!
//! Defines the typed failure kinds callers can recover from and establishes
//! a unified Result type using anyhow for context chaining.

use thiserror::Error;

/// Failure kinds raised by the pipeline.
///
/// Functions return `anyhow::Result`; callers that need to branch on a kind
/// use `err.downcast_ref::<PipelineError>()`.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("header row not found in sheet '{}' (keywords: {})", .sheet, .keywords.join(", "))]
    HeaderNotFound { sheet: String, keywords: Vec<String> },

    #[error("row {row}: missing required field '{field}'")]
    MissingRequiredField { row: usize, field: String },

    #[error("report overflow: {companies} companies exceed template capacity of {capacity}")]
    ReportOverflow { companies: usize, capacity: usize },

    #[error("field '{field}': value '{raw}' does not match date format '{format}'")]
    DateFormatMismatch {
        field: String,
        raw: String,
        format: String,
    },

    #[error("sheet '{}' not found (available: {})", .sheet, .available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("a synchronization is already running")]
    SyncInProgress,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = anyhow::Result<T>;
