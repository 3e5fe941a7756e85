//! Error types for the annotation and tiling core.

use thiserror::Error;

/// Errors that can occur in the annotation, tiling, and export pipeline.
#[derive(Error, Debug)]
pub enum CoreError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding or decoding error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration value; the operation aborts before any I/O
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error
        message: String,
    },

    /// Operation requires input that is not present
    #[error("empty input: {what}")]
    EmptyInput {
        /// What was expected but missing
        what: String,
    },

    /// A dataset export is already running for this session
    #[error("a dataset export is already in progress")]
    ExportInProgress,

    /// Geotransform with a zero pixel width cannot convert coordinates
    #[error("geotransform has zero pixel width")]
    PixelSizeZero,

    /// A position CSV row could not be parsed
    #[error("invalid position data at line {line}: {message}")]
    InvalidPosition {
        /// 1-based line number of the offending row
        line: usize,
        /// Description of the parse failure
        message: String,
    },
}

impl CoreError {
    /// Create an invalid configuration error with a message.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an empty input error.
    pub fn empty_input(what: impl Into<String>) -> Self {
        Self::EmptyInput { what: what.into() }
    }

    /// Create an invalid position error for a CSV row.
    pub fn invalid_position(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidPosition {
            line,
            message: message.into(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
