//! Output encoding configuration.
//!
//! The service emits one normalized container: H.264 video (copied when no
//! video transform is needed), AAC audio, fast-start MP4.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Speed preset for re-encoded video.
pub const DEFAULT_PRESET: &str = "fast";
/// Quality for re-encoded video.
pub const DEFAULT_CRF: u8 = 18;
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";

/// Output encoding settings.
///
/// Missing fields deserialize to the service defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EncodingConfig {
    /// Video codec used only when the video stream must be re-encoded
    pub codec: String,
    /// x264 speed preset
    pub preset: String,
    /// Quality for re-encoded video (0-51, lower is better)
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Move the moov atom to the front for progressive playback
    pub faststart: bool,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.into(),
            preset: DEFAULT_PRESET.into(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.into(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.into(),
            faststart: true,
        }
    }
}

impl EncodingConfig {
    /// Create a new encoding configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Returns a new config with updated preset.
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Arguments for copying the video stream untouched.
    pub fn video_copy_args(&self) -> Vec<String> {
        vec!["-c:v".to_string(), "copy".to_string()]
    }

    /// Arguments for re-encoding the video stream.
    pub fn video_encode_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]
    }

    /// Arguments for the composed audio stream.
    pub fn audio_args(&self) -> Vec<String> {
        vec![
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ]
    }

    /// Container-level arguments.
    pub fn container_args(&self) -> Vec<String> {
        let mut args = vec!["-map_metadata".to_string(), "-1".to_string()];
        if self.faststart {
            args.extend_from_slice(&["-movflags".to_string(), "+faststart".to_string()]);
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EncodingConfig::default();
        assert_eq!(config.codec, "libx264");
        assert_eq!(config.audio_bitrate, "192k");
        assert!(config.faststart);
    }

    #[test]
    fn test_encode_args() {
        let args = EncodingConfig::default().with_crf(22).video_encode_args();
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"-crf".to_string()));
        assert!(args.contains(&"22".to_string()));
    }

    #[test]
    fn test_container_args() {
        let args = EncodingConfig::default().container_args();
        assert_eq!(args, vec!["-map_metadata", "-1", "-movflags", "+faststart"]);
    }
}
