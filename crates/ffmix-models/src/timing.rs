//! Millisecond-exact durations and the windows derived from them.
//!
//! Durations are stored as integer milliseconds (the wire unit) and converted
//! to floating seconds only when handed to the engine, so the millisecond
//! value always survives a round trip.

use std::fmt;
use std::ops::Add;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::policy::{FadeAnchor, TailPolicy};

/// Smallest duration handed to the engine, in seconds.
///
/// Zero-length trims and fades are rejected or misbehave in the engine.
pub const MIN_ENGINE_SECS: f64 = 0.001;

/// A non-negative media duration with millisecond precision.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct MediaDuration {
    millis: u64,
}

impl MediaDuration {
    /// The zero duration.
    pub const ZERO: Self = Self { millis: 0 };

    /// Create a duration from a non-negative millisecond count.
    pub const fn new(millis: u64) -> Self {
        Self { millis }
    }

    /// Parse a mandatory duration. Zero and negative values are rejected.
    pub fn from_millis(ms: i64) -> ModelResult<Self> {
        if ms <= 0 {
            return Err(ModelError::InvalidDuration(format!(
                "duration must be > 0 ms, got {}",
                ms
            )));
        }
        Ok(Self::new(ms as u64))
    }

    /// Parse an optional duration. Zero is allowed, negative values are rejected.
    pub fn from_optional_millis(ms: i64) -> ModelResult<Self> {
        if ms < 0 {
            return Err(ModelError::InvalidDuration(format!(
                "duration must be >= 0 ms, got {}",
                ms
            )));
        }
        Ok(Self::new(ms as u64))
    }

    /// Millisecond value.
    pub const fn as_millis(&self) -> u64 {
        self.millis
    }

    /// Exact value in seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.millis as f64 / 1000.0
    }

    /// Value in seconds, clamped to [`MIN_ENGINE_SECS`].
    pub fn engine_secs(&self) -> f64 {
        self.as_secs_f64().max(MIN_ENGINE_SECS)
    }

    pub const fn is_zero(&self) -> bool {
        self.millis == 0
    }

    /// Sum of two durations, saturating at the numeric limit.
    pub fn plus(self, other: Self) -> Self {
        Self::new(self.millis.saturating_add(other.millis))
    }

    /// Difference of two durations, floored at zero.
    pub fn saturating_sub(self, other: Self) -> Self {
        Self::new(self.millis.saturating_sub(other.millis))
    }
}

impl Add for MediaDuration {
    type Output = MediaDuration;

    fn add(self, rhs: Self) -> Self::Output {
        self.plus(rhs)
    }
}

impl fmt::Display for MediaDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

/// The time span a composed output covers: the base (voice) duration plus
/// an optional trailing tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompositionWindow {
    base: MediaDuration,
    tail: MediaDuration,
    total: MediaDuration,
}

impl CompositionWindow {
    /// Derive the window for a base duration under a tail policy.
    pub fn new(base: MediaDuration, tail_policy: TailPolicy) -> Self {
        let tail = tail_policy.tail();
        Self {
            base,
            tail,
            total: base + tail,
        }
    }

    pub fn base(&self) -> MediaDuration {
        self.base
    }

    pub fn tail(&self) -> MediaDuration {
        self.tail
    }

    /// `base + tail`.
    pub fn total(&self) -> MediaDuration {
        self.total
    }

    pub fn has_tail(&self) -> bool {
        !self.tail.is_zero()
    }
}

/// A trailing fade-out range: `[start, start + length]`, always inside
/// `[0, total]` of the window it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FadeWindow {
    start: MediaDuration,
    length: MediaDuration,
}

impl FadeWindow {
    /// A fade of `requested` length ending exactly at `total`.
    ///
    /// A request longer than `total` is shortened so the fade starts at zero.
    pub fn trailing(total: MediaDuration, requested: MediaDuration) -> Self {
        let length = requested.min(total);
        Self {
            start: total.saturating_sub(length),
            length,
        }
    }

    /// The fade applied to music for a composition window.
    ///
    /// Returns `None` when no fade was requested. With [`FadeAnchor::Tail`]
    /// and a non-empty tail, the fade covers exactly `[base, total]`.
    pub fn for_window(
        window: &CompositionWindow,
        requested: MediaDuration,
        anchor: FadeAnchor,
    ) -> Option<Self> {
        if requested.is_zero() {
            return None;
        }
        match anchor {
            FadeAnchor::Tail if window.has_tail() => Some(Self {
                start: window.base(),
                length: window.tail(),
            }),
            _ => Some(Self::trailing(window.total(), requested)),
        }
    }

    pub fn start(&self) -> MediaDuration {
        self.start
    }

    pub fn length(&self) -> MediaDuration {
        self.length
    }

    pub fn end(&self) -> MediaDuration {
        self.start + self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mandatory_duration_rejects_non_positive() {
        assert!(MediaDuration::from_millis(0).is_err());
        assert!(MediaDuration::from_millis(-5).is_err());
        assert_eq!(MediaDuration::from_millis(1).unwrap().as_millis(), 1);
    }

    #[test]
    fn test_optional_duration_allows_zero() {
        assert!(MediaDuration::from_optional_millis(0).unwrap().is_zero());
        assert!(MediaDuration::from_optional_millis(-1).is_err());
    }

    #[test]
    fn test_seconds_preserve_millis() {
        for ms in [1_u64, 7, 999, 1000, 1001, 5_000, 123_456_789] {
            let d = MediaDuration::new(ms);
            assert_eq!((d.as_secs_f64() * 1000.0).round() as u64, ms);
        }
    }

    #[test]
    fn test_seconds_are_monotonic() {
        let values = [0_u64, 1, 2, 999, 1000, 1001, 59_999, 60_000, 3_600_000];
        for a in values {
            for b in values {
                let (da, db) = (MediaDuration::new(a), MediaDuration::new(b));
                assert_eq!(da.as_secs_f64() < db.as_secs_f64(), a < b);
            }
        }
    }

    #[test]
    fn test_engine_secs_clamps_to_epsilon() {
        assert_eq!(MediaDuration::ZERO.engine_secs(), MIN_ENGINE_SECS);
        assert_eq!(MediaDuration::new(2500).engine_secs(), 2.5);
    }

    #[test]
    fn test_window_total_is_base_plus_tail() {
        for base in [1_u64, 250, 5_000, 61_234] {
            for tail in [0_u64, 1, 500, 1_000] {
                let window = CompositionWindow::new(
                    MediaDuration::new(base),
                    TailPolicy::from_millis(tail),
                );
                assert_eq!(window.total().as_millis(), base + tail);
                assert!(window.total() >= window.base());
            }
        }
    }

    #[test]
    fn test_no_tail_policy_window() {
        let window = CompositionWindow::new(MediaDuration::new(5_000), TailPolicy::NoTail);
        assert_eq!(window.total(), MediaDuration::new(5_000));
        assert!(!window.has_tail());
    }

    #[test]
    fn test_fade_stays_inside_window() {
        for total in [1_u64, 300, 1_000, 6_000] {
            for fade in [1_u64, 299, 1_000, 6_000, 60_000] {
                let f = FadeWindow::trailing(MediaDuration::new(total), MediaDuration::new(fade));
                assert!(f.end().as_millis() <= total);
                assert_eq!(f.end().as_millis(), total);
                assert!(f.length().as_millis() <= fade);
            }
        }
    }

    #[test]
    fn test_fade_longer_than_total_starts_at_zero() {
        let f = FadeWindow::trailing(MediaDuration::new(800), MediaDuration::new(2_000));
        assert!(f.start().is_zero());
        assert_eq!(f.length(), MediaDuration::new(800));
    }

    #[test]
    fn test_scenario_base_5s_tail_1s() {
        let window = CompositionWindow::new(MediaDuration::new(5_000), TailPolicy::fixed_default());
        assert_eq!(window.total().as_secs_f64(), 6.0);

        let fade = FadeWindow::for_window(&window, MediaDuration::new(1_000), FadeAnchor::Window)
            .unwrap();
        assert_eq!(fade.start().as_secs_f64(), 5.0);
        assert_eq!(fade.end().as_secs_f64(), 6.0);
    }

    #[test]
    fn test_tail_anchor_covers_tail() {
        let window = CompositionWindow::new(MediaDuration::new(4_000), TailPolicy::from_millis(750));
        let fade = FadeWindow::for_window(&window, MediaDuration::new(3_000), FadeAnchor::Tail)
            .unwrap();
        assert_eq!(fade.start(), MediaDuration::new(4_000));
        assert_eq!(fade.length(), MediaDuration::new(750));
    }

    #[test]
    fn test_tail_anchor_without_tail_falls_back() {
        let window = CompositionWindow::new(MediaDuration::new(4_000), TailPolicy::NoTail);
        let fade = FadeWindow::for_window(&window, MediaDuration::new(1_000), FadeAnchor::Tail)
            .unwrap();
        assert_eq!(fade.start(), MediaDuration::new(3_000));
    }

    #[test]
    fn test_zero_fade_is_none() {
        let window = CompositionWindow::new(MediaDuration::new(4_000), TailPolicy::NoTail);
        assert!(FadeWindow::for_window(&window, MediaDuration::ZERO, FadeAnchor::Window).is_none());
    }
}
