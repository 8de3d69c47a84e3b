//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "ffmix_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "ffmix_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "ffmix_http_requests_in_flight";

    // Render metrics
    pub const RENDER_FAILURES_TOTAL: &str = "ffmix_render_failures_total";
    pub const ARTIFACT_BYTES: &str = "ffmix_artifact_bytes";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a failed render.
pub fn record_render_failure(operation: &str, kind: &str) {
    let labels = [
        ("operation", operation.to_string()),
        ("kind", kind.to_string()),
    ];
    counter!(names::RENDER_FAILURES_TOTAL, &labels).increment(1);
}

/// Record the size of a returned artifact.
pub fn record_artifact_size(operation: &str, bytes: usize) {
    let labels = [("operation", operation.to_string())];
    histogram!(names::ARTIFACT_BYTES, &labels).record(bytes as f64);
}

/// Collapse unknown paths so scanners cannot blow up label cardinality.
fn sanitize_path(path: &str) -> String {
    match path {
        "/health" | "/ready" | "/metrics" | "/mix" | "/clip" => path.to_string(),
        _ => "other".to_string(),
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/mix"), "/mix");
        assert_eq!(sanitize_path("/clip"), "/clip");
        assert_eq!(sanitize_path("/wp-admin/setup.php"), "other");
    }
}
