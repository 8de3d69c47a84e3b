//! Composition and clip policies.
//!
//! Every behavior that changed between service revisions is a named policy
//! here rather than a code branch: the tail appended after the voice, the
//! duration rule used when two audio sources are mixed, whether the video
//! gets a matching frozen-frame tail, and where the music fade sits.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::timing::MediaDuration;

/// Default tail appended after the base duration (1 second).
pub const DEFAULT_TAIL_MS: u64 = 1_000;

/// Extra duration appended after the base duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TailPolicy {
    /// Output length equals the base duration.
    NoTail,
    /// Output length is base plus a fixed tail.
    Fixed(MediaDuration),
}

impl TailPolicy {
    /// Policy from a configured tail length; zero selects [`TailPolicy::NoTail`].
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::NoTail
        } else {
            Self::Fixed(MediaDuration::new(ms))
        }
    }

    /// A fixed tail of [`DEFAULT_TAIL_MS`].
    pub fn fixed_default() -> Self {
        Self::Fixed(MediaDuration::new(DEFAULT_TAIL_MS))
    }

    /// Tail length; zero for [`TailPolicy::NoTail`].
    pub fn tail(&self) -> MediaDuration {
        match self {
            Self::NoTail => MediaDuration::ZERO,
            Self::Fixed(tail) => *tail,
        }
    }
}

impl Default for TailPolicy {
    fn default() -> Self {
        Self::fixed_default()
    }
}

/// Rule for the length of a two-source audio mix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MixDurationPolicy {
    /// Mix ends with the shorter input.
    Shortest,
    /// Mix ends with the first input (voice or native audio).
    First,
    /// Mix runs to the longer input and is then cut to the window total.
    #[default]
    LongestThenTrim,
}

impl MixDurationPolicy {
    /// Value of the engine's mixer `duration` option.
    pub fn engine_duration(&self) -> &'static str {
        match self {
            Self::Shortest => "shortest",
            Self::First => "first",
            Self::LongestThenTrim => "longest",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shortest => "shortest",
            Self::First => "first",
            Self::LongestThenTrim => "longest_then_trim",
        }
    }
}

impl fmt::Display for MixDurationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MixDurationPolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shortest" => Ok(Self::Shortest),
            "first" => Ok(Self::First),
            "longest" | "longest_then_trim" => Ok(Self::LongestThenTrim),
            other => Err(ModelError::UnsupportedRecipe(format!(
                "unknown mix duration policy '{}'",
                other
            ))),
        }
    }
}

/// Treatment of the video stream when the window has a tail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VideoTailPolicy {
    /// Video is copied unmodified; the container ends wherever the streams end.
    #[default]
    Passthrough,
    /// Video is cut at the base, frozen on its last frame for the tail and
    /// faded to black over the tail.
    CloneLastFrame,
}

impl FromStr for VideoTailPolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "passthrough" | "none" => Ok(Self::Passthrough),
            "clone_last_frame" | "clone" => Ok(Self::CloneLastFrame),
            other => Err(ModelError::UnsupportedRecipe(format!(
                "unknown video tail policy '{}'",
                other
            ))),
        }
    }
}

/// Placement of the music fade-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FadeAnchor {
    /// Fade of the requested length ending at the window total.
    #[default]
    Window,
    /// Fade spanning exactly the tail, `[base, base + tail]`.
    Tail,
}

impl FromStr for FadeAnchor {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "window" => Ok(Self::Window),
            "tail" => Ok(Self::Tail),
            other => Err(ModelError::UnsupportedRecipe(format!(
                "unknown fade anchor '{}'",
                other
            ))),
        }
    }
}

/// Full synchronization policy handed to the composition planner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompositionPolicy {
    pub tail: TailPolicy,
    pub mix_duration: MixDurationPolicy,
    pub video_tail: VideoTailPolicy,
    pub fade_anchor: FadeAnchor,
}

impl CompositionPolicy {
    pub fn with_tail(mut self, tail: TailPolicy) -> Self {
        self.tail = tail;
        self
    }

    pub fn with_mix_duration(mut self, mix_duration: MixDurationPolicy) -> Self {
        self.mix_duration = mix_duration;
        self
    }

    pub fn with_video_tail(mut self, video_tail: VideoTailPolicy) -> Self {
        self.video_tail = video_tail;
        self
    }

    pub fn with_fade_anchor(mut self, fade_anchor: FadeAnchor) -> Self {
        self.fade_anchor = fade_anchor;
        self
    }
}

/// Reframing recipe for clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReframeMode {
    /// Scale to cover the target box, crop from the center, square pixels.
    CoverCenter,
}

impl ReframeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CoverCenter => "cover_center",
        }
    }
}

impl FromStr for ReframeMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cover_center" => Ok(Self::CoverCenter),
            other => Err(ModelError::UnsupportedMode(format!(
                "unknown reframe mode '{}'",
                other
            ))),
        }
    }
}

/// Encoder quality/speed trade-off for clips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    Fast,
    #[default]
    Balanced,
    High,
}

impl QualityPreset {
    /// Constant rate factor (lower is better).
    pub fn crf(&self) -> u8 {
        match self {
            Self::Fast => 23,
            Self::Balanced => 20,
            Self::High => 18,
        }
    }

    /// Encoder speed preset.
    pub fn speed_preset(&self) -> &'static str {
        match self {
            Self::Fast => "veryfast",
            Self::Balanced => "fast",
            Self::High => "medium",
        }
    }
}

impl FromStr for QualityPreset {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "high" => Ok(Self::High),
            other => Err(ModelError::UnsupportedMode(format!(
                "unknown quality preset '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_policy_names() {
        assert_eq!("shortest".parse::<MixDurationPolicy>().unwrap(), MixDurationPolicy::Shortest);
        assert_eq!("FIRST".parse::<MixDurationPolicy>().unwrap(), MixDurationPolicy::First);
        assert_eq!(
            "longest".parse::<MixDurationPolicy>().unwrap(),
            MixDurationPolicy::LongestThenTrim
        );
        assert!(matches!(
            "loudest".parse::<MixDurationPolicy>(),
            Err(ModelError::UnsupportedRecipe(_))
        ));
    }

    #[test]
    fn test_video_tail_names() {
        assert_eq!("passthrough".parse::<VideoTailPolicy>().unwrap(), VideoTailPolicy::Passthrough);
        assert_eq!(
            " Clone_Last_Frame ".parse::<VideoTailPolicy>().unwrap(),
            VideoTailPolicy::CloneLastFrame
        );
        assert!(matches!(
            "freeze".parse::<VideoTailPolicy>(),
            Err(ModelError::UnsupportedRecipe(_))
        ));
    }

    #[test]
    fn test_fade_anchor_names() {
        assert_eq!("window".parse::<FadeAnchor>().unwrap(), FadeAnchor::Window);
        assert_eq!("TAIL".parse::<FadeAnchor>().unwrap(), FadeAnchor::Tail);
        assert!(matches!(
            "start".parse::<FadeAnchor>(),
            Err(ModelError::UnsupportedRecipe(_))
        ));
    }

    #[test]
    fn test_tail_from_millis() {
        assert_eq!(TailPolicy::from_millis(0), TailPolicy::NoTail);
        assert_eq!(TailPolicy::from_millis(250).tail(), MediaDuration::new(250));
    }

    #[test]
    fn test_default_policy_matches_latest_revision() {
        let policy = CompositionPolicy::default();
        assert_eq!(policy.tail.tail(), MediaDuration::new(DEFAULT_TAIL_MS));
        assert_eq!(policy.mix_duration, MixDurationPolicy::LongestThenTrim);
        assert_eq!(policy.video_tail, VideoTailPolicy::Passthrough);
    }

    #[test]
    fn test_reframe_mode_rejects_unknown() {
        assert_eq!("cover_center".parse::<ReframeMode>().unwrap(), ReframeMode::CoverCenter);
        assert!(matches!(
            "letterbox".parse::<ReframeMode>(),
            Err(ModelError::UnsupportedMode(_))
        ));
    }

    #[test]
    fn test_quality_presets() {
        let high: QualityPreset = "high".parse().unwrap();
        assert_eq!(high.crf(), 18);
        assert_eq!(QualityPreset::default().speed_preset(), "fast");
    }
}
