//! Error types for jirahist-core.
//!
//! The engine itself never fails a whole issue; these errors describe the
//! per-record problems it recovers from (and logs) internally, plus the
//! configuration problems surfaced to callers when tables are built.

use thiserror::Error;

/// Result type alias for jirahist-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in jirahist-core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Timestamp in neither RFC 3339 nor Jira's `+0000` offset form.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Sprint id or sprint descriptor that could not be parsed.
    #[error("invalid sprint value: {0}")]
    InvalidSprint(String),

    /// Custom field value nested deeper than the extractor follows.
    #[error("field '{field}' nested deeper than {limit} levels")]
    FieldTooDeep { field: String, limit: usize },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid lookup table or engine configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
