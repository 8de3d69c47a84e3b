#![deny(unreachable_patterns)]
//! Composition planning and FFmpeg CLI execution.
//!
//! This crate provides:
//! - A typed filter graph serialized with fixed numeric precision
//! - The composition planner (voice, music and native video audio)
//! - The clip planner (two-stage seek, cover-center reframing)
//! - Fail-open audio stream inspection via ffprobe
//! - Bounded HTTP input downloads
//! - Engine command building and execution with timeout and kill-on-drop
//! - Per-request orchestration with temporary workspaces

pub mod clip;
pub mod command;
pub mod compose;
pub mod config;
pub mod download;
pub mod error;
pub mod graph;
pub mod probe;
pub mod render;

pub use clip::{ClipPlan, ClipPlanner, COARSE_SEEK_LEAD};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner, PlanExecutor};
pub use compose::{CompositionPlan, CompositionPlanner, MixInputs, OutputSelector, Recipe};
pub use config::RenderConfig;
pub use download::{HttpFetcher, MediaFetcher};
pub use error::{MediaError, MediaResult};
pub use graph::{Filter, FilterGraph, FilterNode, StreamRef, StreamType};
pub use probe::{FfprobeInspector, StreamInspector};
pub use render::{RenderedArtifact, Renderer};
