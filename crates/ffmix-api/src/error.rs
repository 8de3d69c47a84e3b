//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use ffmix_media::MediaError;
use ffmix_models::ModelError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Media(#[from] MediaError),

    /// An opaque error whose details are withheld from the client.
    #[error("An internal error occurred")]
    Redacted(Box<ApiError>),
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        Self::Media(err.into())
    }
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Hide internal details when `production` is set.
    ///
    /// Status and code are kept; only the detail message is replaced.
    pub fn redact(self, production: bool) -> Self {
        if production && self.is_opaque() {
            Self::Redacted(Box::new(self))
        } else {
            self
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Redacted(inner) => inner.status_code(),
            ApiError::Media(e) => match e {
                MediaError::InvalidInput(_) | MediaError::UnsupportedMode(_) => {
                    StatusCode::BAD_REQUEST
                }
                MediaError::ResourceTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                MediaError::ResourceUnavailable { .. } => StatusCode::BAD_GATEWAY,
                MediaError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                MediaError::UnsupportedRecipe(_)
                | MediaError::ExecutionFailure { .. }
                | MediaError::FfmpegNotFound(_)
                | MediaError::Io(_)
                | MediaError::JsonParse(_)
                | MediaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Machine-readable error class.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::BadRequest(_) => "invalid_input",
            ApiError::Internal(_) => "internal",
            ApiError::Redacted(inner) => inner.code(),
            ApiError::Media(e) => e.kind(),
        }
    }

    fn is_opaque(&self) -> bool {
        matches!(
            self,
            ApiError::Internal(_)
                | ApiError::Media(
                    MediaError::UnsupportedRecipe(_)
                        | MediaError::FfmpegNotFound(_)
                        | MediaError::Io(_)
                        | MediaError::JsonParse(_)
                        | MediaError::Internal(_)
                )
        )
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: ErrorDetail,
    code: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message(String),
    Execution {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stderr_tail: Option<String>,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        if status.is_server_error() {
            error!(error = ?self, code, "Request failed");
        }

        let detail = match &self {
            ApiError::Media(MediaError::ExecutionFailure {
                message,
                stderr_tail,
                exit_code,
            }) => ErrorDetail::Execution {
                message: message.clone(),
                exit_code: *exit_code,
                stderr_tail: stderr_tail.clone(),
            },
            _ => ErrorDetail::Message(self.to_string()),
        };

        (status, Json(ErrorResponse { detail, code })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(MediaError::invalid_input("x")), StatusCode::BAD_REQUEST),
            (
                ApiError::from(MediaError::UnsupportedMode("letterbox".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(MediaError::ResourceTooLarge {
                    input: "video".into(),
                    limit_mb: 500,
                }),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                ApiError::from(MediaError::unavailable("music", "404")),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::from(MediaError::execution_failed("boom", Some("err"), Some(1))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(MediaError::UnsupportedRecipe("loudest".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::unauthorized("missing key"), StatusCode::UNAUTHORIZED),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }

    #[test]
    fn test_model_errors_are_bad_requests() {
        let err = ApiError::from(ModelError::InvalidDuration("duration_ms must be positive".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "invalid_input");
    }

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_internal_error_is_opaque_in_production() {
        let err = ApiError::from(MediaError::internal("temp dir at /var/tmp/ffmix_x failed"));
        let (status, body) = body_json(err.redact(true)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "internal");
        assert_eq!(body["detail"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_internal_error_is_detailed_outside_production() {
        let err = ApiError::from(MediaError::internal("temp dir at /var/tmp/ffmix_x failed"));
        let (_, body) = body_json(err.redact(false)).await;

        assert!(body["detail"].as_str().unwrap().contains("/var/tmp/ffmix_x"));
    }

    #[tokio::test]
    async fn test_client_errors_are_never_redacted() {
        let err = ApiError::from(MediaError::invalid_input("end_ms must be greater than start_ms"));
        let (status, body) = body_json(err.redact(true)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("end_ms"));
    }
}
