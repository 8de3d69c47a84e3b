//! Validation errors for model construction.

use thiserror::Error;

/// Result type for model construction.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building model values from raw inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid volume: {0}")]
    InvalidVolume(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Unsupported recipe: {0}")]
    UnsupportedRecipe(String),

    #[error("Unsupported mode: {0}")]
    UnsupportedMode(String),
}
