//! Logical input tracks of a composition.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::timing::MediaDuration;

/// Upper bound for any volume multiplier.
pub const MAX_VOLUME: f64 = 10.0;

/// Kind of logical input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Music,
    Voice,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Music => "music",
            Self::Voice => "voice",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A volume multiplier within `[0, MAX_VOLUME]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Volume(f64);

impl Volume {
    /// Unity gain.
    pub const UNITY: Self = Self(1.0);

    pub fn new(value: f64) -> ModelResult<Self> {
        if !value.is_finite() || !(0.0..=MAX_VOLUME).contains(&value) {
            return Err(ModelError::InvalidVolume(format!(
                "volume must be within [0, {}], got {}",
                MAX_VOLUME, value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::UNITY
    }
}

/// Planning description of one audio contributor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrackSpec {
    pub kind: TrackKind,
    pub volume: Volume,
    /// Requested trailing fade-out; zero disables the fade.
    pub fade_out: MediaDuration,
}

impl TrackSpec {
    /// Background music, optionally faded out.
    pub fn music(volume: Volume, fade_out: MediaDuration) -> Self {
        Self {
            kind: TrackKind::Music,
            volume,
            fade_out,
        }
    }

    /// Voice-over, never faded.
    pub fn voice(volume: Volume) -> Self {
        Self {
            kind: TrackKind::Voice,
            volume,
            fade_out: MediaDuration::ZERO,
        }
    }

    /// The audio stream already carried by the video.
    pub fn native_audio() -> Self {
        Self {
            kind: TrackKind::Video,
            volume: Volume::UNITY,
            fade_out: MediaDuration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_bounds() {
        assert!(Volume::new(0.0).is_ok());
        assert!(Volume::new(10.0).is_ok());
        assert!(Volume::new(10.01).is_err());
        assert!(Volume::new(-0.1).is_err());
        assert!(Volume::new(f64::NAN).is_err());
    }

    #[test]
    fn test_track_constructors() {
        let voice = TrackSpec::voice(Volume::UNITY);
        assert_eq!(voice.kind, TrackKind::Voice);
        assert!(voice.fade_out.is_zero());

        let music = TrackSpec::music(Volume::new(0.18).unwrap(), MediaDuration::new(1_000));
        assert_eq!(music.kind, TrackKind::Music);
        assert_eq!(music.fade_out, MediaDuration::new(1_000));
    }
}
