//! Composition planning.
//!
//! Turns durations, track descriptions and two presence flags into an
//! immutable [`CompositionPlan`]: the filter graph that mixes voice, music and
//! native video audio into one output track, plus output mapping and the
//! overall duration bound.
//!
//! Recipes are chosen in a fixed order:
//! 1. voice present: voice over music
//! 2. no voice, video has audio: native audio under music
//! 3. no voice, silent video: music alone, no mix node
//!
//! Every recipe ends with a node trimming the output audio to the window
//! total, so upstream length mismatches never leak into the artifact.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use ffmix_models::{
    CompositionPolicy, CompositionWindow, EncodingConfig, FadeWindow, MediaDuration, TailPolicy,
    TrackKind, TrackSpec, VideoTailPolicy,
};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::graph::{Filter, FilterGraph, FilterNode, StreamRef, StreamType};

/// Input index of the video file.
pub const VIDEO_INPUT: usize = 0;
/// Input index of the music file.
pub const MUSIC_INPUT: usize = 1;
/// Input index of the voice file, when present.
pub const VOICE_INPUT: usize = 2;

/// Label of the final audio output.
pub const AUDIO_OUT: &str = "aout";
/// Label of the transformed video output.
pub const VIDEO_OUT: &str = "vout";

const MUSIC_LABEL: &str = "music";
const VOICE_LABEL: &str = "voice";
const ORIG_LABEL: &str = "orig";
const MIXED_LABEL: &str = "mixed";

/// The closed set of supported audio compositions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipe {
    VoiceOverMusic,
    NativeAudioWithMusic,
    MusicOnly,
}

impl Recipe {
    /// Select the recipe for the given presence flags.
    ///
    /// A voice track wins over native video audio.
    pub fn select(voice_present: bool, video_has_audio: bool) -> Self {
        match (voice_present, video_has_audio) {
            (true, _) => Self::VoiceOverMusic,
            (false, true) => Self::NativeAudioWithMusic,
            (false, false) => Self::MusicOnly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VoiceOverMusic => "voice_over_music",
            Self::NativeAudioWithMusic => "native_audio_with_music",
            Self::MusicOnly => "music_only",
        }
    }

    /// Whether the recipe reads the voice input.
    pub fn uses_voice(&self) -> bool {
        matches!(self, Self::VoiceOverMusic)
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects what is mapped into the output container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OutputSelector {
    /// First stream of a type from an input file, e.g. `0:v:0`.
    Stream { index: usize, stream: StreamType },
    /// A labelled graph output, e.g. `[aout]`.
    Graph(String),
}

impl fmt::Display for OutputSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream { index, stream } => {
                let spec = match stream {
                    StreamType::Audio => 'a',
                    StreamType::Video => 'v',
                };
                write!(f, "{}:{}:0", index, spec)
            }
            Self::Graph(label) => write!(f, "[{}]", label),
        }
    }
}

/// Local files backing a composition.
#[derive(Debug, Clone)]
pub struct MixInputs {
    pub video: PathBuf,
    pub music: PathBuf,
    pub voice: Option<PathBuf>,
}

/// Immutable result of composition planning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionPlan {
    pub recipe: Recipe,
    pub window: CompositionWindow,
    /// Music fade, if one was requested.
    pub fade: Option<FadeWindow>,
    pub graph: FilterGraph,
    pub video: OutputSelector,
    pub audio: OutputSelector,
    /// Overall output duration; always the window total.
    pub duration_bound: MediaDuration,
    /// Whether the video stream must be re-encoded.
    pub reencode_video: bool,
}

impl CompositionPlan {
    /// Number of input files the plan reads.
    pub fn input_count(&self) -> usize {
        if self.recipe.uses_voice() {
            3
        } else {
            2
        }
    }

    /// Serialize the plan into an engine command.
    pub fn to_command(
        &self,
        inputs: &MixInputs,
        output: impl AsRef<Path>,
        encoding: &EncodingConfig,
    ) -> MediaResult<FfmpegCommand> {
        let mut cmd = FfmpegCommand::new(output)
            .input(&inputs.video)
            .input(&inputs.music);

        if self.recipe.uses_voice() {
            let voice = inputs.voice.as_ref().ok_or_else(|| {
                MediaError::internal("voice recipe planned without a voice input")
            })?;
            cmd = cmd.input(voice);
        }

        cmd = cmd
            .filter_complex(&self.graph)
            .map(self.video.to_string())
            .map(self.audio.to_string())
            .duration(self.duration_bound.as_secs_f64());

        let video_args = if self.reencode_video {
            encoding.video_encode_args()
        } else {
            encoding.video_copy_args()
        };

        Ok(cmd
            .output_args(video_args)
            .output_args(encoding.audio_args())
            .output_args(encoding.container_args()))
    }
}

/// Plans compositions under a fixed synchronization policy.
#[derive(Debug, Clone, Default)]
pub struct CompositionPlanner {
    policy: CompositionPolicy,
}

impl CompositionPlanner {
    pub fn new(policy: CompositionPolicy) -> Self {
        Self { policy }
    }

    /// Plan a composition using the configured tail policy.
    pub fn plan(
        &self,
        base: MediaDuration,
        music: &TrackSpec,
        voice: Option<&TrackSpec>,
        video_has_audio: bool,
    ) -> MediaResult<CompositionPlan> {
        self.plan_with_tail(base, self.policy.tail, music, voice, video_has_audio)
    }

    /// Plan a composition with an explicit tail policy.
    pub fn plan_with_tail(
        &self,
        base: MediaDuration,
        tail: TailPolicy,
        music: &TrackSpec,
        voice: Option<&TrackSpec>,
        video_has_audio: bool,
    ) -> MediaResult<CompositionPlan> {
        if base.is_zero() {
            return Err(MediaError::invalid_input("base duration must be positive"));
        }
        if music.kind != TrackKind::Music {
            return Err(MediaError::UnsupportedRecipe(format!(
                "{} track cannot be used as music",
                music.kind
            )));
        }
        if let Some(voice) = voice {
            if voice.kind != TrackKind::Voice {
                return Err(MediaError::UnsupportedRecipe(format!(
                    "{} track cannot be used as voice",
                    voice.kind
                )));
            }
        }

        let recipe = Recipe::select(voice.is_some(), video_has_audio);
        let window = CompositionWindow::new(base, tail);
        let fade = FadeWindow::for_window(&window, music.fade_out, self.policy.fade_anchor);

        let mut graph = FilterGraph::new();
        graph.push(music_node(music, &window, fade.as_ref()));

        let final_input = match (recipe, voice) {
            (Recipe::VoiceOverMusic, Some(voice)) => {
                graph.push(
                    FilterNode::new(vec![StreamRef::audio(VOICE_INPUT)], VOICE_LABEL)
                        .then(Filter::Volume {
                            gain: voice.volume.value(),
                        })
                        .then(Filter::Asetpts),
                );
                graph.push(self.mix_node(VOICE_LABEL));
                MIXED_LABEL
            }
            (Recipe::NativeAudioWithMusic, _) => {
                let native = TrackSpec::native_audio();
                graph.push(
                    FilterNode::new(vec![StreamRef::audio(VIDEO_INPUT)], ORIG_LABEL)
                        .then(Filter::Volume {
                            gain: native.volume.value(),
                        })
                        .then(Filter::Asetpts),
                );
                graph.push(self.mix_node(ORIG_LABEL));
                MIXED_LABEL
            }
            (Recipe::MusicOnly, _) => MUSIC_LABEL,
            (Recipe::VoiceOverMusic, None) => {
                return Err(MediaError::internal("voice recipe selected without a voice track"))
            }
        };

        // Final bound shared by every recipe
        graph.push(
            FilterNode::new(vec![StreamRef::label(final_input)], AUDIO_OUT)
                .then(Filter::Atrim {
                    end: window.total(),
                })
                .then(Filter::Asetpts),
        );

        let (video, reencode_video) = match self.policy.video_tail {
            VideoTailPolicy::CloneLastFrame if window.has_tail() => {
                graph.push(video_tail_node(&window));
                (OutputSelector::Graph(VIDEO_OUT.to_string()), true)
            }
            _ => (
                OutputSelector::Stream {
                    index: VIDEO_INPUT,
                    stream: StreamType::Video,
                },
                false,
            ),
        };

        info!(
            recipe = %recipe,
            base_ms = window.base().as_millis(),
            tail_ms = window.tail().as_millis(),
            total_ms = window.total().as_millis(),
            fade_start_ms = fade.map(|f| f.start().as_millis()),
            mix_duration = %self.policy.mix_duration,
            "Planned composition"
        );

        Ok(CompositionPlan {
            recipe,
            window,
            fade,
            graph,
            video,
            audio: OutputSelector::Graph(AUDIO_OUT.to_string()),
            duration_bound: window.total(),
            reencode_video,
        })
    }

    fn mix_node(&self, first: &str) -> FilterNode {
        FilterNode::new(
            vec![StreamRef::label(first), StreamRef::label(MUSIC_LABEL)],
            MIXED_LABEL,
        )
        .then(Filter::Amix {
            inputs: 2,
            duration: self.policy.mix_duration,
        })
    }
}

fn music_node(music: &TrackSpec, window: &CompositionWindow, fade: Option<&FadeWindow>) -> FilterNode {
    let node = FilterNode::new(vec![StreamRef::audio(MUSIC_INPUT)], MUSIC_LABEL)
        .then(Filter::Atrim {
            end: window.total(),
        })
        .then(Filter::Asetpts)
        .then(Filter::Volume {
            gain: music.volume.value(),
        });
    match fade {
        Some(fade) => node.then(Filter::Afade {
            start: fade.start(),
            length: fade.length(),
        }),
        None => node,
    }
}

/// Trim video to the base, hold the last frame over the tail and fade it out.
fn video_tail_node(window: &CompositionWindow) -> FilterNode {
    FilterNode::new(vec![StreamRef::video(VIDEO_INPUT)], VIDEO_OUT)
        .then(Filter::Trim { end: window.base() })
        .then(Filter::Setpts)
        .then(Filter::Tpad {
            clone: window.tail(),
        })
        .then(Filter::FadeToBlack {
            start: window.base(),
            length: window.tail(),
        })
}
