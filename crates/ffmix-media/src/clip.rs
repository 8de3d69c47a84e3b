//! Clip planning: two-stage seek plus cover-center reframing.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use ffmix_models::request::MAX_FRAME_EDGE;
use ffmix_models::{EncodingConfig, MediaDuration, ModelError, QualityPreset, ReframeMode};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::graph::{Filter, FilterNode};

/// How far before the requested start the coarse (keyframe) seek lands.
pub const COARSE_SEEK_LEAD: MediaDuration = MediaDuration::new(2_000);

/// Immutable result of clip planning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipPlan {
    /// Input-side seek, cheap and keyframe-aligned.
    pub coarse_seek: MediaDuration,
    /// Output-side decode-and-discard seek; at most [`COARSE_SEEK_LEAD`].
    pub accurate_seek: MediaDuration,
    pub length: MediaDuration,
    pub target_width: u32,
    pub target_height: u32,
    pub reframe: ReframeMode,
    pub crf: u8,
    pub preset: &'static str,
}

impl ClipPlan {
    /// Reframing chain for the plan's target box.
    pub fn reframe_chain(&self) -> FilterNode {
        match self.reframe {
            ReframeMode::CoverCenter => FilterNode::chain()
                .then(Filter::ScaleCover {
                    width: self.target_width,
                    height: self.target_height,
                })
                .then(Filter::CropCenter {
                    width: self.target_width,
                    height: self.target_height,
                })
                .then(Filter::SquarePixels),
        }
    }

    /// Serialize the plan into an engine command.
    pub fn to_command(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        encoding: &EncodingConfig,
    ) -> FfmpegCommand {
        let video = encoding
            .clone()
            .with_crf(self.crf)
            .with_preset(self.preset);

        FfmpegCommand::new(output)
            .input_seek(self.coarse_seek.as_secs_f64(), input)
            .seek(self.accurate_seek.as_secs_f64())
            .duration(self.length.as_secs_f64())
            .video_filter(&self.reframe_chain())
            .output_args(video.video_encode_args())
            .output_args(encoding.audio_args())
            .output_args(encoding.container_args())
    }
}

/// Plans clip extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipPlanner;

impl ClipPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plan extraction of `[start, end)` reframed to `width` x `height`.
    pub fn plan(
        &self,
        start: MediaDuration,
        end: MediaDuration,
        width: u32,
        height: u32,
        reframe: ReframeMode,
        quality: QualityPreset,
    ) -> MediaResult<ClipPlan> {
        if end <= start {
            return Err(ModelError::InvalidRange(format!(
                "end_ms must be greater than start_ms (start={}, end={})",
                start.as_millis(),
                end.as_millis()
            ))
            .into());
        }
        for (name, edge) in [("target_width", width), ("target_height", height)] {
            if edge == 0 || edge > MAX_FRAME_EDGE || edge % 2 != 0 {
                return Err(MediaError::invalid_input(format!(
                    "{} must be an even number within [2, {}], got {}",
                    name, MAX_FRAME_EDGE, edge
                )));
            }
        }

        let coarse_seek = start.saturating_sub(COARSE_SEEK_LEAD);
        let accurate_seek = start.saturating_sub(coarse_seek);
        let length = end.saturating_sub(start);

        info!(
            start_ms = start.as_millis(),
            length_ms = length.as_millis(),
            coarse_ms = coarse_seek.as_millis(),
            accurate_ms = accurate_seek.as_millis(),
            reframe = reframe.as_str(),
            "Planned clip"
        );

        Ok(ClipPlan {
            coarse_seek,
            accurate_seek,
            length,
            target_width: width,
            target_height: height,
            reframe,
            crf: quality.crf(),
            preset: quality.speed_preset(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> MediaDuration {
        MediaDuration::new(v)
    }

    fn plan_clip(start: u64, end: u64) -> MediaResult<ClipPlan> {
        ClipPlanner::new().plan(
            ms(start),
            ms(end),
            1080,
            1920,
            ReframeMode::CoverCenter,
            QualityPreset::Balanced,
        )
    }

    #[test]
    fn test_two_stage_seek() {
        let plan = plan_clip(10_000, 13_500).unwrap();
        assert_eq!(plan.coarse_seek, ms(8_000));
        assert_eq!(plan.accurate_seek, ms(2_000));
        assert_eq!(plan.length, ms(3_500));
    }

    #[test]
    fn test_start_near_zero() {
        let plan = plan_clip(1_200, 2_000).unwrap();
        assert_eq!(plan.coarse_seek, MediaDuration::ZERO);
        assert_eq!(plan.accurate_seek, ms(1_200));

        let plan = plan_clip(0, 2_000).unwrap();
        assert_eq!(plan.coarse_seek, MediaDuration::ZERO);
        assert_eq!(plan.accurate_seek, MediaDuration::ZERO);
    }

    #[test]
    fn test_seek_parts_sum_to_start() {
        for start in [0, 1, 1_999, 2_000, 2_001, 59_999, 3_600_000] {
            let plan = plan_clip(start, start + 1_000).unwrap();
            assert_eq!(plan.coarse_seek + plan.accurate_seek, ms(start));
            assert!(plan.accurate_seek <= COARSE_SEEK_LEAD);
            let secs = plan.coarse_seek.as_secs_f64() + plan.accurate_seek.as_secs_f64();
            assert!((secs - ms(start).as_secs_f64()).abs() <= 0.001);
        }
    }

    #[test]
    fn test_rejects_empty_range() {
        assert!(matches!(plan_clip(5_000, 5_000), Err(MediaError::InvalidInput(_))));
        assert!(matches!(plan_clip(5_000, 4_000), Err(MediaError::InvalidInput(_))));

        let err = plan_clip(5_000, 5_000).unwrap_err();
        assert!(err.to_string().contains("Invalid range"));
    }

    #[test]
    fn test_rejects_odd_dimensions() {
        let err = ClipPlanner::new()
            .plan(ms(0), ms(1_000), 1081, 1920, ReframeMode::CoverCenter, QualityPreset::Fast)
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }

    #[test]
    fn test_quality_preset_is_applied() {
        let plan = ClipPlanner::new()
            .plan(ms(0), ms(1_000), 720, 1280, ReframeMode::CoverCenter, QualityPreset::High)
            .unwrap();
        assert_eq!((plan.crf, plan.preset), (18, "medium"));
    }

    #[test]
    fn test_command_layout() {
        let plan = plan_clip(10_000, 13_500).unwrap();
        let args = plan
            .to_command("/tmp/job/video.mp4", "/tmp/job/out.mp4", &EncodingConfig::default())
            .build_args();

        let input = args.iter().position(|a| a == "-i").unwrap();
        let seeks: Vec<_> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-ss")
            .map(|(i, _)| (i, args[i + 1].as_str()))
            .collect();
        assert_eq!(seeks.len(), 2);
        assert!(seeks[0].0 < input && seeks[0].1 == "8.000");
        assert!(seeks[1].0 > input && seeks[1].1 == "2.000");

        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(
            args[vf + 1],
            "scale=1080:1920:force_original_aspect_ratio=increase,crop=1080:1920:(iw-ow)/2:(ih-oh)/2,setsar=1"
        );
        assert!(args.windows(2).any(|w| w[0] == "-crf" && w[1] == "20"));
        assert!(args.windows(2).any(|w| w[0] == "-preset" && w[1] == "fast"));
        assert!(args.windows(2).any(|w| w[0] == "-t" && w[1] == "3.500"));
    }
}
