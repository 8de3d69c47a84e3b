//! Typed FFmpeg filter graph.
//!
//! Plans describe their processing as [`FilterNode`]s built from a closed set
//! of [`Filter`] operations. Text in the engine's filter syntax is produced
//! only when a plan is serialized into a command, and every number goes
//! through [`fmt_secs`] or [`fmt_gain`], so no caller-provided string ever
//! reaches the argument vector.

use std::fmt;

use serde::Serialize;

use ffmix_models::{MediaDuration, MixDurationPolicy};

/// Format a time value in seconds with fixed millisecond precision.
pub fn fmt_secs(secs: f64) -> String {
    format!("{:.3}", secs)
}

/// Format a gain multiplier with fixed precision.
pub fn fmt_gain(gain: f64) -> String {
    format!("{:.3}", gain)
}

/// Media type of an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StreamType {
    Audio,
    Video,
}

impl StreamType {
    fn specifier(&self) -> char {
        match self {
            Self::Audio => 'a',
            Self::Video => 'v',
        }
    }
}

/// Reference to a stream consumed by a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum StreamRef {
    /// First stream of the given type in input file `index`.
    Input { index: usize, stream: StreamType },
    /// Output of an earlier node.
    Label(String),
}

impl StreamRef {
    pub fn audio(index: usize) -> Self {
        Self::Input {
            index,
            stream: StreamType::Audio,
        }
    }

    pub fn video(index: usize) -> Self {
        Self::Input {
            index,
            stream: StreamType::Video,
        }
    }

    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input { index, stream } => write!(f, "[{}:{}]", index, stream.specifier()),
            Self::Label(label) => write!(f, "[{}]", label),
        }
    }
}

/// One filter operation with typed parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Filter {
    /// Cut audio at `end`.
    Atrim { end: MediaDuration },
    /// Reset audio timestamps to start at zero.
    Asetpts,
    /// Scale audio amplitude.
    Volume { gain: f64 },
    /// Fade audio out over `[start, start + length]`.
    Afade { start: MediaDuration, length: MediaDuration },
    /// Mix audio inputs.
    Amix { inputs: usize, duration: MixDurationPolicy },
    /// Cut video at `end`.
    Trim { end: MediaDuration },
    /// Reset video timestamps to start at zero.
    Setpts,
    /// Extend video by repeating its last frame.
    Tpad { clone: MediaDuration },
    /// Fade video to black over `[start, start + length]`.
    FadeToBlack { start: MediaDuration, length: MediaDuration },
    /// Scale so the frame covers `width` x `height`, keeping aspect ratio.
    ScaleCover { width: u32, height: u32 },
    /// Crop `width` x `height` from the center.
    CropCenter { width: u32, height: u32 },
    /// Force square pixels.
    SquarePixels,
}

impl Filter {
    /// Engine filter name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Atrim { .. } => "atrim",
            Self::Asetpts => "asetpts",
            Self::Volume { .. } => "volume",
            Self::Afade { .. } => "afade",
            Self::Amix { .. } => "amix",
            Self::Trim { .. } => "trim",
            Self::Setpts => "setpts",
            Self::Tpad { .. } => "tpad",
            Self::FadeToBlack { .. } => "fade",
            Self::ScaleCover { .. } => "scale",
            Self::CropCenter { .. } => "crop",
            Self::SquarePixels => "setsar",
        }
    }

    /// Render in the engine's filter syntax.
    pub fn render(&self) -> String {
        match self {
            Self::Atrim { end } => format!("atrim=end={}", fmt_secs(end.engine_secs())),
            Self::Asetpts => "asetpts=PTS-STARTPTS".to_string(),
            Self::Volume { gain } => format!("volume={}", fmt_gain(*gain)),
            Self::Afade { start, length } => format!(
                "afade=t=out:st={}:d={}",
                fmt_secs(start.as_secs_f64()),
                fmt_secs(length.engine_secs())
            ),
            Self::Amix { inputs, duration } => format!(
                "amix=inputs={}:duration={}:dropout_transition=0",
                inputs,
                duration.engine_duration()
            ),
            Self::Trim { end } => format!("trim=end={}", fmt_secs(end.engine_secs())),
            Self::Setpts => "setpts=PTS-STARTPTS".to_string(),
            Self::Tpad { clone } => format!(
                "tpad=stop_mode=clone:stop_duration={}",
                fmt_secs(clone.as_secs_f64())
            ),
            Self::FadeToBlack { start, length } => format!(
                "fade=t=out:st={}:d={}:color=black",
                fmt_secs(start.as_secs_f64()),
                fmt_secs(length.engine_secs())
            ),
            Self::ScaleCover { width, height } => format!(
                "scale={}:{}:force_original_aspect_ratio=increase",
                width, height
            ),
            Self::CropCenter { width, height } => {
                format!("crop={}:{}:(iw-ow)/2:(ih-oh)/2", width, height)
            }
            Self::SquarePixels => "setsar=1".to_string(),
        }
    }
}

/// A linear chain of filters from labelled inputs to a labelled output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterNode {
    pub inputs: Vec<StreamRef>,
    pub filters: Vec<Filter>,
    pub output: Option<String>,
}

impl FilterNode {
    /// Create a node reading `inputs` and writing to `output`.
    pub fn new(inputs: Vec<StreamRef>, output: impl Into<String>) -> Self {
        Self {
            inputs,
            filters: Vec::new(),
            output: Some(output.into()),
        }
    }

    /// Create an unlabelled chain (for `-vf`/`-af` use).
    pub fn chain() -> Self {
        Self {
            inputs: Vec::new(),
            filters: Vec::new(),
            output: None,
        }
    }

    /// Append a filter.
    pub fn then(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.iter().any(|f| f.name() == name)
    }

    /// Render in the engine's filter syntax.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for input in &self.inputs {
            out.push_str(&input.to_string());
        }
        let chain: Vec<String> = self.filters.iter().map(Filter::render).collect();
        out.push_str(&chain.join(","));
        if let Some(label) = &self.output {
            out.push('[');
            out.push_str(label);
            out.push(']');
        }
        out
    }
}

/// An ordered set of nodes forming a complex filter graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterGraph {
    nodes: Vec<FilterNode>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: FilterNode) {
        self.nodes.push(node);
    }

    /// Node producing `label`, if any.
    pub fn producer(&self, label: &str) -> Option<&FilterNode> {
        self.nodes
            .iter()
            .find(|n| n.output.as_deref() == Some(label))
    }

    /// Whether any node uses a filter named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.iter().any(|n| n.has_filter(name))
    }

    /// Render as a `-filter_complex` argument.
    pub fn render(&self) -> String {
        self.nodes
            .iter()
            .map(FilterNode::render)
            .collect::<Vec<_>>()
            .join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_precision() {
        assert_eq!(fmt_secs(6.0), "6.000");
        assert_eq!(fmt_secs(0.1 + 0.2), "0.300");
        assert_eq!(fmt_gain(0.18), "0.180");
    }

    #[test]
    fn test_stream_refs() {
        assert_eq!(StreamRef::audio(2).to_string(), "[2:a]");
        assert_eq!(StreamRef::video(0).to_string(), "[0:v]");
        assert_eq!(StreamRef::label("music").to_string(), "[music]");
    }

    #[test]
    fn test_node_render() {
        let node = FilterNode::new(vec![StreamRef::audio(1)], "music")
            .then(Filter::Atrim {
                end: MediaDuration::new(6_000),
            })
            .then(Filter::Asetpts)
            .then(Filter::Volume { gain: 0.18 })
            .then(Filter::Afade {
                start: MediaDuration::new(5_000),
                length: MediaDuration::new(1_000),
            });
        assert_eq!(
            node.render(),
            "[1:a]atrim=end=6.000,asetpts=PTS-STARTPTS,volume=0.180,afade=t=out:st=5.000:d=1.000[music]"
        );
    }

    #[test]
    fn test_graph_render_joins_nodes() {
        let mut graph = FilterGraph::new();
        graph.push(
            FilterNode::new(vec![StreamRef::label("voice"), StreamRef::label("music")], "mixed")
                .then(Filter::Amix {
                    inputs: 2,
                    duration: MixDurationPolicy::Shortest,
                }),
        );
        graph.push(
            FilterNode::new(vec![StreamRef::label("mixed")], "aout").then(Filter::Atrim {
                end: MediaDuration::new(1_500),
            }),
        );
        assert_eq!(
            graph.render(),
            "[voice][music]amix=inputs=2:duration=shortest:dropout_transition=0[mixed];[mixed]atrim=end=1.500[aout]"
        );
        assert!(graph.contains("amix"));
        assert!(graph.producer("aout").is_some());
    }

    #[test]
    fn test_unlabelled_chain() {
        let chain = FilterNode::chain()
            .then(Filter::ScaleCover {
                width: 1080,
                height: 1920,
            })
            .then(Filter::CropCenter {
                width: 1080,
                height: 1920,
            })
            .then(Filter::SquarePixels);
        assert_eq!(
            chain.render(),
            "scale=1080:1920:force_original_aspect_ratio=increase,crop=1080:1920:(iw-ow)/2:(ih-oh)/2,setsar=1"
        );
    }

    #[test]
    fn test_zero_length_trim_uses_epsilon() {
        let f = Filter::Trim {
            end: MediaDuration::ZERO,
        };
        assert_eq!(f.render(), "trim=end=0.001");
    }
}
