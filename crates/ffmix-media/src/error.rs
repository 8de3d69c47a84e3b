//! Error types for media operations.

use ffmix_models::ModelError;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Maximum number of bytes of engine diagnostics carried by an error.
pub const STDERR_TAIL_BYTES: usize = 4000;

/// Errors that can occur while planning or executing a render.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported recipe: {0}")]
    UnsupportedRecipe(String),

    #[error("Unsupported mode: {0}")]
    UnsupportedMode(String),

    #[error("Failed to fetch {input}: {message}")]
    ResourceUnavailable { input: String, message: String },

    #[error("Downloaded {input} is too large (> {limit_mb} MB)")]
    ResourceTooLarge { input: String, limit_mb: u64 },

    #[error("FFmpeg command failed: {message}")]
    ExecutionFailure {
        message: String,
        stderr_tail: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFmpeg not found: {0}")]
    FfmpegNotFound(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an execution failure carrying a bounded tail of diagnostics.
    pub fn execution_failed(
        message: impl Into<String>,
        stderr: Option<&str>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ExecutionFailure {
            message: message.into(),
            stderr_tail: stderr.map(stderr_tail),
            exit_code,
        }
    }

    /// Create a fetch failure naming the input that failed.
    pub fn unavailable(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Short machine-readable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::UnsupportedRecipe(_) => "unsupported_recipe",
            Self::UnsupportedMode(_) => "unsupported_mode",
            Self::ResourceUnavailable { .. } | Self::ResourceTooLarge { .. } => {
                "resource_unavailable"
            }
            Self::ExecutionFailure { .. } => "execution_failure",
            Self::Timeout(_) => "timeout",
            Self::FfmpegNotFound(_) | Self::Io(_) | Self::JsonParse(_) | Self::Internal(_) => {
                "internal"
            }
        }
    }
}

impl From<ModelError> for MediaError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::UnsupportedRecipe(msg) => Self::UnsupportedRecipe(msg),
            ModelError::UnsupportedMode(msg) => Self::UnsupportedMode(msg),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

/// Last [`STDERR_TAIL_BYTES`] of a diagnostic log, cut on a char boundary.
pub fn stderr_tail(stderr: &str) -> String {
    if stderr.len() <= STDERR_TAIL_BYTES {
        return stderr.to_string();
    }
    let mut start = stderr.len() - STDERR_TAIL_BYTES;
    while !stderr.is_char_boundary(start) {
        start += 1;
    }
    stderr[start..].to_string()
}
