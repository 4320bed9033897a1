//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, JSON, TIFF and JPEG errors, and provides semantic variants
//! for session setup, argument validation and graph evaluation failures.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("JPEG error: {0}")]
    Jpeg(#[from] jpeg_encoder::EncodingError),

    #[error("Authentication failed for project `{project}`: {reason}")]
    Authentication { project: String, reason: String },

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Invalid date range for {label}: start {start} is not before end {end}")]
    InvalidDateRange {
        label: &'static str,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Size must be greater than 0, got: {size}")]
    ZeroSize { size: usize },

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Raster grids do not match: {left} vs {right}")]
    GridMismatch { left: String, right: String },

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("External error: {0}")]
    External(String),
}

impl Error {
    pub fn external<E: std::fmt::Display>(e: E) -> Self {
        Error::External(e.to_string())
    }
}
