//! Application state.

use std::sync::Arc;

use ffmix_media::{RenderConfig, Renderer};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub renderer: Arc<Renderer>,
}

impl AppState {
    /// Create application state from explicit parts.
    pub fn new(config: ApiConfig, renderer: Renderer) -> Self {
        Self {
            config,
            renderer: Arc::new(renderer),
        }
    }

    /// Create application state backed by HTTP, ffprobe and ffmpeg.
    pub fn from_config(config: ApiConfig, render: RenderConfig) -> ffmix_media::MediaResult<Self> {
        Ok(Self::new(config, Renderer::from_config(render)?))
    }
}
