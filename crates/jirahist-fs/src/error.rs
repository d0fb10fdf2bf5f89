//! Error types for configuration and input loading.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for filesystem operations.
pub type Result<T> = std::result::Result<T, FsError>;

/// Errors that can occur while loading configuration or issues.
#[derive(Debug, Error)]
pub enum FsError {
    /// Input path does not exist.
    #[error("path not found: '{0}'")]
    NotFound(PathBuf),

    /// Configuration file declares a version this build cannot read.
    #[error("unsupported config version {0} (expected 1)")]
    UnsupportedVersion(u32),

    /// Configuration is syntactically valid but unusable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// YAML parsing error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] jirahist_core::CoreError),
}
