//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{stderr_tail, MediaError, MediaResult, STDERR_TAIL_BYTES};
use crate::graph::{fmt_secs, FilterGraph, FilterNode};

/// Histogram of engine wall time, labelled by outcome.
pub const FFMPEG_DURATION_METRIC: &str = "ffmix_ffmpeg_duration_seconds";

/// Engine log verbosity.
const LOG_LEVEL: &str = "error";

/// Number of arguments included when a command is summarized in logs.
const LOGGED_ARGS: usize = 40;

/// One input file with its input-side options.
#[derive(Debug, Clone, PartialEq)]
struct CommandInput {
    args: Vec<String>,
    path: PathBuf,
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegCommand {
    /// Input files in index order
    inputs: Vec<CommandInput>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after all -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Add an input file.
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.input_with_args(Vec::<String>::new(), path)
    }

    /// Add an input file preceded by input options.
    pub fn input_with_args<I, S>(mut self, args: I, path: impl AsRef<Path>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(CommandInput {
            args: args.into_iter().map(Into::into).collect(),
            path: path.as_ref().to_path_buf(),
        });
        self
    }

    /// Add an input file with a fast (keyframe) seek before it.
    pub fn input_seek(self, seconds: f64, path: impl AsRef<Path>) -> Self {
        self.input_with_args(["-ss".to_string(), fmt_secs(seconds)], path)
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Decode-and-discard seek after the input is opened.
    pub fn seek(self, seconds: f64) -> Self {
        self.output_arg("-ss").output_arg(fmt_secs(seconds))
    }

    /// Set output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(fmt_secs(seconds))
    }

    /// Set a video filter chain.
    pub fn video_filter(self, chain: &FilterNode) -> Self {
        self.output_arg("-vf").output_arg(chain.render())
    }

    /// Set filter complex.
    pub fn filter_complex(self, graph: &FilterGraph) -> Self {
        self.output_arg("-filter_complex").output_arg(graph.render())
    }

    /// Map a stream or graph label into the output.
    pub fn map(self, selector: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(selector)
    }

    /// Input paths in index order.
    pub fn input_paths(&self) -> impl Iterator<Item = &Path> {
        self.inputs.iter().map(|i| i.path.as_path())
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // Overwrite flag
        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-nostdin".to_string());

        // Log level
        args.push("-v".to_string());
        args.push(LOG_LEVEL.to_string());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        // Output args
        args.extend(self.output_args.iter().cloned());

        // Output file
        args.push(self.output.to_string_lossy().to_string());

        args
    }

    /// Short, single-line summary for logs.
    pub fn summary(&self) -> String {
        let args = self.build_args();
        let shown = args.len().min(LOGGED_ARGS);
        let mut line = args[..shown].join(" ");
        if args.len() > LOGGED_ARGS {
            line.push_str(" ...");
        }
        line
    }
}

/// Something that can carry out a built command.
///
/// The engine is the only collaborator that produces artifacts; a failure is
/// reported once and never retried.
#[async_trait]
pub trait PlanExecutor: Send + Sync {
    async fn execute(&self, command: &FfmpegCommand) -> MediaResult<()>;
}

/// Runner for FFmpeg commands with timeout and kill-on-drop cancellation.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    /// Engine binary name or path
    binary: String,
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegRunner {
    /// Create a new runner for the given binary.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout_secs: None,
        }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command.
    ///
    /// The child is killed if this future is dropped (client disconnect or an
    /// outer request timeout) or when the runner's own timeout elapses.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let binary = which::which(&self.binary)
            .map_err(|_| MediaError::FfmpegNotFound(self.binary.clone()))?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", self.binary, args.join(" "));

        let started = Instant::now();
        let mut child = Command::new(binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr was not captured"))?;

        // Keep only the tail of diagnostics while the process runs
        let collector = tokio::spawn(drain_diagnostics(stderr));

        let status = match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(std::time::Duration::from_secs(secs), child.wait()).await {
                    Ok(result) => result?,
                    Err(_) => {
                        warn!("FFmpeg timed out after {} seconds, killing process", secs);
                        let _ = child.kill().await;
                        record_duration(started, "timeout");
                        return Err(MediaError::Timeout(secs));
                    }
                }
            }
            None => child.wait().await?,
        };

        let diagnostics = collector.await.unwrap_or_default();

        if status.success() {
            record_duration(started, "success");
            info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "FFmpeg finished"
            );
            Ok(())
        } else {
            record_duration(started, "failure");
            warn!(
                exit_code = ?status.code(),
                cmd = %cmd.summary(),
                "FFmpeg exited with non-zero status"
            );
            Err(MediaError::execution_failed(
                "FFmpeg exited with non-zero status",
                Some(&diagnostics),
                status.code(),
            ))
        }
    }
}

#[async_trait]
impl PlanExecutor for FfmpegRunner {
    async fn execute(&self, command: &FfmpegCommand) -> MediaResult<()> {
        self.run(command).await
    }
}

fn record_duration(started: Instant, outcome: &'static str) {
    metrics::histogram!(FFMPEG_DURATION_METRIC, "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}

/// Read `stream` to EOF, keeping the last [`STDERR_TAIL_BYTES`] of lines.
///
/// Lines that are not valid UTF-8 are decoded lossily so the pipe is never
/// closed while the engine is still writing.
async fn drain_diagnostics<R: AsyncRead + Unpin>(stream: R) -> String {
    let mut reader = BufReader::new(stream);
    let mut tail = LineTail::new(STDERR_TAIL_BYTES);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                tail.push(line.trim_end_matches(['\n', '\r']).to_string());
            }
            Err(e) => {
                debug!("Stopped reading FFmpeg stderr: {}", e);
                break;
            }
        }
    }
    tail.into_string()
}

/// Bounded buffer holding the most recent lines of a log.
#[derive(Debug)]
struct LineTail {
    lines: VecDeque<String>,
    bytes: usize,
    budget: usize,
}

impl LineTail {
    fn new(budget: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            bytes: 0,
            budget,
        }
    }

    fn push(&mut self, line: String) {
        self.bytes += line.len() + 1;
        self.lines.push_back(line);
        while self.bytes > self.budget && self.lines.len() > 1 {
            if let Some(old) = self.lines.pop_front() {
                self.bytes -= old.len() + 1;
            }
        }
    }

    fn into_string(self) -> String {
        let joined = self.lines.into_iter().collect::<Vec<_>>().join("\n");
        stderr_tail(&joined)
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg(binary: &str) -> MediaResult<PathBuf> {
    which::which(binary).map_err(|_| MediaError::FfmpegNotFound(binary.to_string()))
}
