//! FFprobe stream inspection.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Answers whether a media file carries an audio stream.
///
/// Inspection is fail-open: when the answer cannot be determined the
/// implementation reports `true`.
#[async_trait]
pub trait StreamInspector: Send + Sync {
    async fn has_audio_stream(&self, path: &Path) -> bool;
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_type: Option<String>,
}

/// Inspector backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeInspector {
    binary: String,
}

impl Default for FfprobeInspector {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl FfprobeInspector {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run ffprobe and report whether an audio stream was found.
    pub async fn probe_audio(&self, path: &Path) -> MediaResult<bool> {
        if !path.exists() {
            return Err(MediaError::invalid_input(format!(
                "file not found: {}",
                path.display()
            )));
        }

        let binary = which::which(&self.binary)
            .map_err(|_| MediaError::FfmpegNotFound(self.binary.clone()))?;

        let output = Command::new(binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "stream=index,codec_type",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::execution_failed(
                "FFprobe failed",
                Some(&stderr),
                output.status.code(),
            ));
        }

        audio_present(&output.stdout)
    }
}

#[async_trait]
impl StreamInspector for FfprobeInspector {
    async fn has_audio_stream(&self, path: &Path) -> bool {
        match self.probe_audio(path).await {
            Ok(found) => {
                debug!(path = %path.display(), has_audio = found, "Probed video streams");
                found
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Stream inspection failed, assuming audio is present"
                );
                true
            }
        }
    }
}

/// Whether ffprobe JSON output lists an audio stream.
pub fn audio_present(json: &[u8]) -> MediaResult<bool> {
    let parsed: FfprobeOutput = serde_json::from_slice(json)?;
    Ok(parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio")))
}
