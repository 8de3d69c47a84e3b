//! Wire-facing request schemas.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ModelError, ModelResult};
use crate::policy::{QualityPreset, ReframeMode};
use crate::timing::MediaDuration;
use crate::track::{TrackSpec, Volume};

/// Maximum accepted URL length.
pub const MAX_URL_LENGTH: usize = 2048;

/// Largest accepted clip frame edge in pixels.
pub const MAX_FRAME_EDGE: u32 = 8192;

/// Request to mix voice and background music into a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MixRequest {
    /// Public URL of the input video
    pub video_url: String,

    /// Public URL of the voice-over audio
    #[serde(default)]
    pub voice_url: Option<String>,

    /// Public URL of the background music
    pub music_url: String,

    /// Voice (base) duration in milliseconds
    pub duration_ms: i64,

    /// Background music volume multiplier, within [0, 2]
    #[serde(default = "default_music_volume")]
    pub music_volume: f64,

    /// Music fade-out length in milliseconds
    #[serde(default = "default_fade_out_ms")]
    pub fade_out_ms: i64,

    /// Voice volume multiplier, within [0, 3]
    #[serde(default = "default_voice_volume")]
    pub voice_volume: f64,
}

fn default_music_volume() -> f64 {
    0.18
}
fn default_fade_out_ms() -> i64 {
    1_000
}
fn default_voice_volume() -> f64 {
    1.0
}

impl MixRequest {
    /// Validate the request.
    pub fn validate(&self) -> ModelResult<()> {
        validate_http_url(&self.video_url)?;
        validate_http_url(&self.music_url)?;
        if let Some(voice_url) = &self.voice_url {
            validate_http_url(voice_url)?;
        }
        check_volume("music_volume", self.music_volume, 2.0)?;
        check_volume("voice_volume", self.voice_volume, 3.0)?;
        self.base_duration()?;
        self.fade_out()?;
        Ok(())
    }

    /// Voice duration, the base of the composition window.
    pub fn base_duration(&self) -> ModelResult<MediaDuration> {
        MediaDuration::from_millis(self.duration_ms)
    }

    pub fn fade_out(&self) -> ModelResult<MediaDuration> {
        MediaDuration::from_optional_millis(self.fade_out_ms)
    }

    pub fn music_track(&self) -> ModelResult<TrackSpec> {
        Ok(TrackSpec::music(Volume::new(self.music_volume)?, self.fade_out()?))
    }

    /// Voice track, if a voice URL was supplied.
    pub fn voice_track(&self) -> ModelResult<Option<TrackSpec>> {
        match self.voice_url {
            Some(_) => Ok(Some(TrackSpec::voice(Volume::new(self.voice_volume)?))),
            None => Ok(None),
        }
    }
}

/// Request to extract and reframe a sub-clip of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClipRequest {
    /// Public URL of the input video
    pub video_url: String,

    /// Clip start in milliseconds
    pub start_ms: i64,

    /// Clip end in milliseconds (exclusive)
    pub end_ms: i64,

    /// Output frame width
    #[serde(default = "default_target_width")]
    pub target_width: u32,

    /// Output frame height
    #[serde(default = "default_target_height")]
    pub target_height: u32,

    /// Reframing recipe (only "cover_center" is defined)
    #[serde(default = "default_reframe_mode")]
    pub reframe_mode: String,

    /// Encoder quality preset ("fast", "balanced", "high")
    #[serde(default = "default_quality_preset")]
    pub quality_preset: String,
}

fn default_target_width() -> u32 {
    1080
}
fn default_target_height() -> u32 {
    1920
}
fn default_reframe_mode() -> String {
    ReframeMode::CoverCenter.as_str().to_string()
}
fn default_quality_preset() -> String {
    "balanced".to_string()
}

impl ClipRequest {
    /// Validate the request.
    ///
    /// Range ordering (`end > start`) is checked by the clip planner.
    pub fn validate(&self) -> ModelResult<()> {
        validate_http_url(&self.video_url)?;
        self.start()?;
        self.end()?;
        check_frame_edge("target_width", self.target_width)?;
        check_frame_edge("target_height", self.target_height)?;
        Ok(())
    }

    pub fn start(&self) -> ModelResult<MediaDuration> {
        MediaDuration::from_optional_millis(self.start_ms)
    }

    pub fn end(&self) -> ModelResult<MediaDuration> {
        MediaDuration::from_optional_millis(self.end_ms)
    }

    pub fn reframe_mode(&self) -> ModelResult<ReframeMode> {
        self.reframe_mode.parse()
    }

    pub fn quality_preset(&self) -> ModelResult<QualityPreset> {
        self.quality_preset.parse()
    }
}

/// Validate that a URL is a non-empty absolute http(s) URL.
pub fn validate_http_url(url: &str) -> ModelResult<Url> {
    if url.len() > MAX_URL_LENGTH {
        return Err(ModelError::InvalidUrl(format!(
            "URL exceeds maximum length of {} characters",
            MAX_URL_LENGTH
        )));
    }

    let url = url.trim();
    if url.is_empty() {
        return Err(ModelError::InvalidUrl("URL cannot be empty".to_string()));
    }

    let parsed = Url::parse(url)
        .map_err(|e| ModelError::InvalidUrl(format!("Invalid URL format: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ModelError::InvalidUrl(format!(
                "URL must start with http(s), got scheme '{}'",
                scheme
            )))
        }
    }

    if parsed.host_str().is_none() {
        return Err(ModelError::InvalidUrl("URL must have a host".to_string()));
    }

    Ok(parsed)
}

fn check_volume(field: &str, value: f64, max: f64) -> ModelResult<()> {
    if !value.is_finite() || value < 0.0 || value > max {
        return Err(ModelError::InvalidVolume(format!(
            "{} must be within [0, {}], got {}",
            field, max, value
        )));
    }
    Ok(())
}

fn check_frame_edge(field: &str, value: u32) -> ModelResult<()> {
    if value == 0 || value > MAX_FRAME_EDGE || value % 2 != 0 {
        return Err(ModelError::InvalidDimensions(format!(
            "{} must be an even number within [2, {}], got {}",
            field, MAX_FRAME_EDGE, value
        )));
    }
    Ok(())
}
