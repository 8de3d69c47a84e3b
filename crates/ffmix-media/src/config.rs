//! Render configuration.

use std::time::Duration;

use ffmix_models::{
    CompositionPolicy, EncodingConfig, FadeAnchor, MixDurationPolicy, ModelError, TailPolicy,
    VideoTailPolicy,
};

use crate::error::MediaResult;

/// Configuration for downloads, engine execution and composition policy.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Prefix of per-request temporary directories
    pub tmp_prefix: String,
    /// Total timeout for each input download
    pub http_timeout: Duration,
    /// Per-input download size limit in MB
    pub max_download_mb: u64,
    /// Engine binary
    pub ffmpeg_bin: String,
    /// Probe binary
    pub ffprobe_bin: String,
    /// Optional engine execution timeout in seconds
    pub exec_timeout_secs: Option<u64>,
    /// Synchronization policy for compositions
    pub policy: CompositionPolicy,
    /// Output encoding
    pub encoding: EncodingConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tmp_prefix: "ffmix_".to_string(),
            http_timeout: Duration::from_secs(300),
            max_download_mb: 500,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            exec_timeout_secs: None,
            policy: CompositionPolicy::default(),
            encoding: EncodingConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Create config from environment variables.
    ///
    /// Unknown policy names fail with `UnsupportedRecipe`; a tail length
    /// that is not an integer fails with `InvalidInput`.
    pub fn from_env() -> MediaResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> MediaResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let tail = match lookup("EXTRA_MUSIC_MS") {
            Some(s) => parse_tail(&s)?,
            None => TailPolicy::default(),
        };

        let mix_duration = match lookup("MIX_DURATION_POLICY") {
            Some(s) => s.parse::<MixDurationPolicy>()?,
            None => MixDurationPolicy::default(),
        };
        let video_tail = match lookup("VIDEO_TAIL") {
            Some(s) => s.parse::<VideoTailPolicy>()?,
            None => VideoTailPolicy::default(),
        };
        let fade_anchor = match lookup("FADE_ANCHOR") {
            Some(s) => s.parse::<FadeAnchor>()?,
            None => FadeAnchor::default(),
        };

        Ok(Self {
            tmp_prefix: lookup("TMP_PREFIX").unwrap_or(defaults.tmp_prefix),
            http_timeout: lookup("HTTP_TIMEOUT_SEC")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            max_download_mb: lookup("MAX_DOWNLOAD_MB")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_download_mb),
            ffmpeg_bin: lookup("FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            ffprobe_bin: lookup("FFPROBE_BIN").unwrap_or(defaults.ffprobe_bin),
            exec_timeout_secs: lookup("EXEC_TIMEOUT_SEC")
                .and_then(|s| s.parse().ok())
                .filter(|secs: &u64| *secs > 0),
            policy: CompositionPolicy {
                tail,
                mix_duration,
                video_tail,
                fade_anchor,
            },
            encoding: defaults.encoding,
        })
    }
}

/// Tail policy from a millisecond count; negative counts clamp to no tail.
fn parse_tail(raw: &str) -> MediaResult<TailPolicy> {
    let ms = raw.trim().parse::<i64>().map_err(|_| {
        ModelError::InvalidDuration(format!(
            "EXTRA_MUSIC_MS must be an integer number of milliseconds, got '{}'",
            raw
        ))
    })?;
    Ok(TailPolicy::from_millis(ms.max(0).unsigned_abs()))
}
