//! Axum HTTP API server.
//!
//! This crate provides:
//! - `POST /mix` and `POST /clip` returning rendered mp4 artifacts
//! - Optional shared API key check
//! - Request ids, request logging and Prometheus metrics
//! - Liveness and readiness probes

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
