//! Request orchestration.
//!
//! A render validates and plans before provisioning anything, then creates a
//! per-request temporary directory, fetches inputs, inspects the video when
//! the recipe depends on it, runs the engine once and reads the artifact back
//! into memory. The directory is removed when the render returns, whatever
//! the outcome.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, info};

use ffmix_models::{ClipRequest, MixRequest, TrackKind};

use crate::clip::ClipPlanner;
use crate::command::{FfmpegRunner, PlanExecutor};
use crate::compose::{CompositionPlanner, MixInputs, Recipe};
use crate::config::RenderConfig;
use crate::download::{HttpFetcher, MediaFetcher};
use crate::error::{MediaError, MediaResult};
use crate::probe::{FfprobeInspector, StreamInspector};

/// Counter of completed renders, labelled by operation and recipe.
pub const RENDERS_METRIC: &str = "ffmix_renders_total";

const OUTPUT_FILE: &str = "out.mp4";

/// A finished output held in memory.
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub bytes: Vec<u8>,
    /// Composition recipe, for mix renders.
    pub recipe: Option<Recipe>,
}

/// Runs mix and clip requests end to end.
pub struct Renderer {
    config: RenderConfig,
    composer: CompositionPlanner,
    clipper: ClipPlanner,
    fetcher: Arc<dyn MediaFetcher>,
    inspector: Arc<dyn StreamInspector>,
    executor: Arc<dyn PlanExecutor>,
}

impl Renderer {
    /// Create a renderer with explicit collaborators.
    pub fn new(
        config: RenderConfig,
        fetcher: Arc<dyn MediaFetcher>,
        inspector: Arc<dyn StreamInspector>,
        executor: Arc<dyn PlanExecutor>,
    ) -> Self {
        Self {
            composer: CompositionPlanner::new(config.policy),
            clipper: ClipPlanner::new(),
            config,
            fetcher,
            inspector,
            executor,
        }
    }

    /// Create a renderer backed by HTTP, ffprobe and ffmpeg.
    pub fn from_config(config: RenderConfig) -> MediaResult<Self> {
        let fetcher = HttpFetcher::new(config.http_timeout, config.max_download_mb)?;
        let inspector = FfprobeInspector::new(config.ffprobe_bin.clone());
        let mut runner = FfmpegRunner::new(config.ffmpeg_bin.clone());
        if let Some(secs) = config.exec_timeout_secs {
            runner = runner.with_timeout(secs);
        }
        Ok(Self::new(
            config,
            Arc::new(fetcher),
            Arc::new(inspector),
            Arc::new(runner),
        ))
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Compose voice and music over a video.
    pub async fn render_mix(&self, req: &MixRequest) -> MediaResult<RenderedArtifact> {
        req.validate()?;
        let base = req.base_duration()?;
        let music = req.music_track()?;
        let voice = req.voice_track()?;

        // Planning errors surface before any download or process
        let preflight = self.composer.plan(base, &music, voice.as_ref(), true)?;

        let workspace = self.workspace()?;
        let inputs = MixInputs {
            video: workspace.path().join("video.mp4"),
            music: workspace.path().join("music.mp3"),
            voice: req
                .voice_url
                .as_ref()
                .map(|_| workspace.path().join("voice.mp3")),
        };

        let voice_fetch = async {
            match (&req.voice_url, &inputs.voice) {
                (Some(url), Some(dest)) => self.fetcher.fetch(TrackKind::Voice, url, dest).await,
                _ => Ok(0),
            }
        };
        let (video_bytes, music_bytes, voice_bytes) = tokio::try_join!(
            self.fetcher
                .fetch(TrackKind::Video, &req.video_url, &inputs.video),
            self.fetcher
                .fetch(TrackKind::Music, &req.music_url, &inputs.music),
            voice_fetch,
        )?;
        debug!(video_bytes, music_bytes, voice_bytes, "Inputs downloaded");

        // Native audio only matters when there is no voice
        let plan = if voice.is_some() {
            preflight
        } else {
            let has_audio = self.inspector.has_audio_stream(&inputs.video).await;
            self.composer.plan(base, &music, None, has_audio)?
        };

        let output = workspace.path().join(OUTPUT_FILE);
        let cmd = plan.to_command(&inputs, &output, &self.config.encoding)?;
        self.executor.execute(&cmd).await?;

        let bytes = read_artifact(&output).await?;
        metrics::counter!(RENDERS_METRIC, "operation" => "mix", "recipe" => plan.recipe.as_str())
            .increment(1);
        info!(
            recipe = %plan.recipe,
            total_ms = plan.duration_bound.as_millis(),
            bytes = bytes.len(),
            "Mix rendered"
        );

        Ok(RenderedArtifact {
            bytes,
            recipe: Some(plan.recipe),
        })
    }

    /// Extract and reframe a sub-clip of a video.
    pub async fn render_clip(&self, req: &ClipRequest) -> MediaResult<RenderedArtifact> {
        req.validate()?;
        let plan = self.clipper.plan(
            req.start()?,
            req.end()?,
            req.target_width,
            req.target_height,
            req.reframe_mode()?,
            req.quality_preset()?,
        )?;

        let workspace = self.workspace()?;
        let input = workspace.path().join("video.mp4");
        self.fetcher
            .fetch(TrackKind::Video, &req.video_url, &input)
            .await?;

        let output = workspace.path().join(OUTPUT_FILE);
        let cmd = plan.to_command(&input, &output, &self.config.encoding);
        self.executor.execute(&cmd).await?;

        let bytes = read_artifact(&output).await?;
        metrics::counter!(RENDERS_METRIC, "operation" => "clip", "recipe" => plan.reframe.as_str())
            .increment(1);
        info!(
            length_ms = plan.length.as_millis(),
            bytes = bytes.len(),
            "Clip rendered"
        );

        Ok(RenderedArtifact {
            bytes,
            recipe: None,
        })
    }

    fn workspace(&self) -> MediaResult<TempDir> {
        let dir = tempfile::Builder::new()
            .prefix(&self.config.tmp_prefix)
            .tempdir()?;
        debug!(path = %dir.path().display(), "Created request workspace");
        Ok(dir)
    }
}

/// Read the engine output, requiring a non-empty file.
async fn read_artifact(path: &Path) -> MediaResult<Vec<u8>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => Ok(tokio::fs::read(path).await?),
        _ => Err(MediaError::execution_failed(
            "output file was not produced",
            None,
            None,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::FfmpegCommand;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Default)]
    struct FakeFetcher {
        calls: AtomicUsize,
        fail: Option<TrackKind>,
    }

    #[async_trait]
    impl MediaFetcher for FakeFetcher {
        async fn fetch(&self, input: TrackKind, _url: &str, dest: &Path) -> MediaResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail == Some(input) {
                return Err(MediaError::unavailable(input.as_str(), "404 Not Found"));
            }
            tokio::fs::write(dest, b"input").await?;
            Ok(5)
        }
    }

    struct FakeInspector {
        calls: AtomicUsize,
        has_audio: bool,
    }

    #[async_trait]
    impl StreamInspector for FakeInspector {
        async fn has_audio_stream(&self, _path: &Path) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.has_audio
        }
    }

    #[derive(Default)]
    struct FakeExecutor {
        commands: Mutex<Vec<Vec<String>>>,
        outputs: Mutex<Vec<PathBuf>>,
        produce: bool,
    }

    #[async_trait]
    impl PlanExecutor for FakeExecutor {
        async fn execute(&self, command: &FfmpegCommand) -> MediaResult<()> {
            self.commands.lock().unwrap().push(command.build_args());
            self.outputs
                .lock()
                .unwrap()
                .push(command.output_path().to_path_buf());
            if self.produce {
                tokio::fs::write(command.output_path(), b"mp4").await?;
            }
            Ok(())
        }
    }

    struct Harness {
        fetcher: Arc<FakeFetcher>,
        inspector: Arc<FakeInspector>,
        executor: Arc<FakeExecutor>,
        renderer: Renderer,
    }

    fn harness(has_audio: bool, produce: bool, fail: Option<TrackKind>) -> Harness {
        let fetcher = Arc::new(FakeFetcher {
            fail,
            ..Default::default()
        });
        let inspector = Arc::new(FakeInspector {
            calls: AtomicUsize::new(0),
            has_audio,
        });
        let executor = Arc::new(FakeExecutor {
            produce,
            ..Default::default()
        });
        let renderer = Renderer::new(
            RenderConfig::default(),
            fetcher.clone(),
            inspector.clone(),
            executor.clone(),
        );
        Harness {
            fetcher,
            inspector,
            executor,
            renderer,
        }
    }

    fn mix(voice: bool) -> MixRequest {
        MixRequest {
            video_url: "https://cdn.example.com/video.mp4".to_string(),
            voice_url: voice.then(|| "https://cdn.example.com/voice.mp3".to_string()),
            music_url: "https://cdn.example.com/music.mp3".to_string(),
            duration_ms: 5_000,
            music_volume: 0.18,
            fade_out_ms: 1_000,
            voice_volume: 1.0,
        }
    }

    fn clip(start_ms: i64, end_ms: i64) -> ClipRequest {
        ClipRequest {
            video_url: "https://cdn.example.com/video.mp4".to_string(),
            start_ms,
            end_ms,
            target_width: 1080,
            target_height: 1920,
            reframe_mode: "cover_center".to_string(),
            quality_preset: "balanced".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mix_with_voice_skips_probe() {
        let h = harness(true, true, None);
        let artifact = assert_ok!(h.renderer.render_mix(&mix(true)).await);

        assert_eq!(artifact.bytes, b"mp4");
        assert_eq!(artifact.recipe, Some(Recipe::VoiceOverMusic));
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 3);
        assert_eq!(h.inspector.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mix_without_voice_uses_probe() {
        let h = harness(false, true, None);
        let artifact = h.renderer.render_mix(&mix(false)).await.unwrap();

        assert_eq!(artifact.recipe, Some(Recipe::MusicOnly));
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.inspector.calls.load(Ordering::SeqCst), 1);
        let args = h.executor.commands.lock().unwrap()[0].clone();
        assert!(!args.join(" ").contains("amix"));
    }

    #[tokio::test]
    async fn test_invalid_clip_range_provisions_nothing() {
        let h = harness(true, true, None);
        let err = h.renderer.render_clip(&clip(5_000, 5_000)).await.unwrap_err();

        assert!(matches!(err, MediaError::InvalidInput(_)));
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.inspector.calls.load(Ordering::SeqCst), 0);
        assert!(h.executor.commands.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_mix_provisions_nothing() {
        let h = harness(true, true, None);
        let mut req = mix(true);
        req.duration_ms = 0;
        assert_err!(h.renderer.render_mix(&req).await);
        assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_output_is_execution_failure() {
        let h = harness(true, false, None);
        let err = h.renderer.render_clip(&clip(0, 1_000)).await.unwrap_err();
        assert!(matches!(err, MediaError::ExecutionFailure { .. }));
    }

    #[tokio::test]
    async fn test_workspace_removed_after_render() {
        let h = harness(true, true, None);
        h.renderer.render_clip(&clip(10_000, 13_500)).await.unwrap();

        let output = h.executor.outputs.lock().unwrap()[0].clone();
        let dir = output.parent().unwrap().to_path_buf();
        assert!(dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("ffmix_"));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_fetch_failure_names_input_and_cleans_up() {
        let h = harness(true, true, Some(TrackKind::Music));
        let err = h.renderer.render_mix(&mix(true)).await.unwrap_err();
        match err {
            MediaError::ResourceUnavailable { input, .. } => assert_eq!(input, "music"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(h.executor.commands.lock().unwrap().is_empty());
    }
}
