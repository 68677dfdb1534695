//! Error types for sloppose

use thiserror::Error;

/// Result type for sloppose operations
pub type Result<T> = std::result::Result<T, SlopposeError>;

/// sloppose error types
#[derive(Error, Debug)]
pub enum SlopposeError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Unsupported compose version: {0}")]
    UnsupportedVersion(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
