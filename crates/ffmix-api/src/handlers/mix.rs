//! Mix handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::info;

use ffmix_models::MixRequest;

use crate::error::{ApiError, ApiResult};
use crate::metrics::{record_artifact_size, record_render_failure};
use crate::state::AppState;

/// File name suggested to clients for every artifact.
pub const ARTIFACT_FILENAME: &str = "out.mp4";

/// Compose voice and background music over a video.
pub async fn mix(
    State(state): State<AppState>,
    body: Result<Json<MixRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    info!(
        duration_ms = req.duration_ms,
        has_voice = req.voice_url.is_some(),
        "Mix requested"
    );

    let artifact = state.renderer.render_mix(&req).await.map_err(|e| {
        record_render_failure("mix", e.kind());
        ApiError::from(e).redact(state.config.is_production())
    })?;

    record_artifact_size("mix", artifact.bytes.len());
    Ok(artifact_response(artifact.bytes))
}

/// Return an artifact as an mp4 attachment.
pub fn artifact_response(bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", ARTIFACT_FILENAME),
            ),
        ],
        bytes,
    )
        .into_response()
}
