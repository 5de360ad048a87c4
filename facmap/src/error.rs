//! Error types for facmap
//!
//! Only run-level failures live here. Per-request backend failures are
//! `GeocodeError` (see `types`) and never abort a run.

use thiserror::Error;

/// Run-level error
#[derive(Debug, Error)]
pub enum FacmapError {
    /// No row produced a marker; nothing is written
    #[error("Nothing resolved ({misses} unresolved rows) - check API key or regions")]
    NothingResolved { misses: usize },

    /// Input spreadsheet could not be read
    #[error("Workbook error: {0}")]
    Workbook(String),

    /// Unresolved-address report could not be written
    #[error("Report error: {0}")]
    Report(String),

    /// Map page or popup template failed to render
    #[error("Render error: {0}")]
    Render(String),

    /// Backend construction failed (HTTP client, missing key)
    #[error("Geocoder setup error: {0}")]
    Geocoder(String),

    /// Invalid normalizer or geocoder pattern
    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// facmap-common error
    #[error("Common error: {0}")]
    Common(#[from] facmap_common::Error),
}

impl FacmapError {
    pub(crate) fn pattern(pattern: &str, err: regex::Error) -> Self {
        FacmapError::Pattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for facmap operations
pub type FacmapResult<T> = Result<T, FacmapError>;
