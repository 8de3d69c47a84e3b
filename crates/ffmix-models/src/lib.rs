//! Shared data models for the ffmix service.
//!
//! This crate provides plain value types for:
//! - Millisecond/second durations and the composition window
//! - Track descriptions (kind, volume, fade)
//! - Composition and clip policies
//! - Fixed output encoding settings
//! - Wire-facing request schemas

pub mod encoding;
pub mod error;
pub mod policy;
pub mod request;
pub mod timing;
pub mod track;

// Re-export common types
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use policy::{
    CompositionPolicy, FadeAnchor, MixDurationPolicy, QualityPreset, ReframeMode, TailPolicy,
    VideoTailPolicy,
};
pub use request::{ClipRequest, MixRequest};
pub use timing::{CompositionWindow, FadeWindow, MediaDuration};
pub use track::{TrackKind, TrackSpec, Volume};
