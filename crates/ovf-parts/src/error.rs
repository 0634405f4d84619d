//! Error types for part assignment.

use thiserror::Error;

/// Errors that can occur when configuring part assignment.
///
/// The assignment pass itself never fails: degenerate contours are skipped,
/// not reported.
#[derive(Error, Debug)]
pub enum PartsError {
    /// Invalid assignment settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for part assignment operations.
pub type Result<T> = std::result::Result<T, PartsError>;
