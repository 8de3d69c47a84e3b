//! Input download over HTTP.
//!
//! Inputs are streamed to disk chunk by chunk so a single request never holds
//! a whole file in memory, and a download is aborted as soon as it exceeds
//! the configured size limit.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use ffmix_models::request::validate_http_url;
use ffmix_models::TrackKind;

use crate::error::{MediaError, MediaResult};

/// Fetches a remote input into a local file.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download `url` to `dest`, returning the number of bytes written.
    ///
    /// `input` names the logical input in error messages.
    async fn fetch(&self, input: TrackKind, url: &str, dest: &Path) -> MediaResult<u64>;
}

/// Streaming HTTP fetcher with a per-file size limit.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: u64,
    max_download_mb: u64,
}

impl HttpFetcher {
    /// Create a fetcher with a total request timeout and size limit in MB.
    pub fn new(timeout: Duration, max_download_mb: u64) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaError::internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            max_bytes: max_download_mb.saturating_mul(1024 * 1024),
            max_download_mb,
        })
    }

    fn too_large(&self, input: TrackKind) -> MediaError {
        MediaError::ResourceTooLarge {
            input: input.to_string(),
            limit_mb: self.max_download_mb,
        }
    }

    async fn stream_to_file(
        &self,
        input: TrackKind,
        response: reqwest::Response,
        dest: &Path,
    ) -> MediaResult<u64> {
        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| MediaError::unavailable(input.as_str(), e.to_string()))?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(self.too_large(input));
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, input: TrackKind, url: &str, dest: &Path) -> MediaResult<u64> {
        let url = validate_http_url(url)?;
        debug!(input = %input, url = %url, "Downloading input");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| MediaError::unavailable(input.as_str(), e.to_string()))?;

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(self.too_large(input));
            }
        }

        match self.stream_to_file(input, response, dest).await {
            Ok(bytes) => {
                info!(input = %input, bytes, "Downloaded input");
                Ok(bytes)
            }
            Err(e) => {
                // Leave no partial file behind
                if let Err(rm) = tokio::fs::remove_file(dest).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        warn!(input = %input, error = %rm, "Failed to remove partial download");
                    }
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(limit_mb: u64) -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(10), limit_mb).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/music.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 2048]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("music.mp3");
        let bytes = fetcher(1)
            .fetch(TrackKind::Music, &format!("{}/music.mp3", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(bytes, 2048);
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 2048);
    }

    #[tokio::test]
    async fn test_http_error_names_input() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = fetcher(1)
            .fetch(
                TrackKind::Voice,
                &format!("{}/voice.mp3", server.uri()),
                &dir.path().join("voice.mp3"),
            )
            .await
            .unwrap_err();

        match err {
            MediaError::ResourceUnavailable { input, .. } => assert_eq!(input, "voice"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_oversized_download_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2 * 1024 * 1024]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("video.mp4");
        let err = fetcher(1)
            .fetch(TrackKind::Video, &format!("{}/video.mp4", server.uri()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::ResourceTooLarge { limit_mb: 1, .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_request() {
        let dir = tempfile::tempdir().unwrap();
        let err = fetcher(1)
            .fetch(TrackKind::Video, "file:///etc/passwd", &dir.path().join("v.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }
}
