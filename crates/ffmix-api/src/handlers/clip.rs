//! Clip handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use tracing::info;

use ffmix_models::ClipRequest;

use crate::error::{ApiError, ApiResult};
use crate::handlers::mix::artifact_response;
use crate::metrics::{record_artifact_size, record_render_failure};
use crate::state::AppState;

/// Extract and reframe a sub-clip of a video.
pub async fn clip(
    State(state): State<AppState>,
    body: Result<Json<ClipRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    info!(
        start_ms = req.start_ms,
        end_ms = req.end_ms,
        width = req.target_width,
        height = req.target_height,
        "Clip requested"
    );

    let artifact = state.renderer.render_clip(&req).await.map_err(|e| {
        record_render_failure("clip", e.kind());
        ApiError::from(e).redact(state.config.is_production())
    })?;

    record_artifact_size("clip", artifact.bytes.len());
    Ok(artifact_response(artifact.bytes))
}
