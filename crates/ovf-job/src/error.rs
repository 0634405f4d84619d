//! Error types for the job model.

use thiserror::Error;

/// Errors that can occur while loading or saving a job.
#[derive(Error, Debug)]
pub enum JobError {
    /// JSON (de)serialization failed.
    #[error("invalid job json: {0}")]
    Json(#[from] serde_json::Error),

    /// The part mapping uses the key reserved for unassigned geometry.
    #[error("part key 0 is reserved for unassigned geometry (found part {0:?})")]
    ReservedPartKey(String),
}

/// Result type for job operations.
pub type Result<T> = std::result::Result<T, JobError>;
