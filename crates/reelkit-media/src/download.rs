//! Fetching source media over HTTP(S).

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{MediaError, MediaResult};
use crate::metrics;

/// Source of remote media.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download `url` into `dest`, failing if it takes longer than `timeout`.
    ///
    /// Returns the number of bytes written. No partial file is left at
    /// `dest` when the download fails.
    async fn fetch_to(&self, url: &str, dest: &Path, timeout: Duration) -> MediaResult<u64>;
}

/// Reject anything that is not an absolute HTTP(S) URL.
pub fn validate_url(raw: &str) -> MediaResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| MediaError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(MediaError::InvalidUrl(raw.to_string())),
    }
}

/// `reqwest`-backed fetcher with a per-download byte ceiling.
///
/// Bodies are streamed chunk by chunk into the destination file, so memory
/// use does not grow with the size of the source.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(max_bytes: u64) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("reelkit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MediaError::DownloadRequest {
                message: e.to_string(),
            })?;
        Ok(Self { client, max_bytes })
    }

    pub fn with_client(client: reqwest::Client, max_bytes: u64) -> Self {
        Self { client, max_bytes }
    }

    async fn stream_to_file(&self, url: Url, dest: &Path) -> MediaResult<u64> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| request_error(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(MediaError::DownloadTooLarge {
                    url: url.to_string(),
                    limit: self.max_bytes,
                });
            }
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| request_error(url.as_str(), e))?
        {
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(MediaError::DownloadTooLarge {
                    url: url.to_string(),
                    limit: self.max_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        if written == 0 {
            return Err(MediaError::DownloadEmpty {
                url: url.to_string(),
            });
        }
        Ok(written)
    }
}

fn request_error(url: &str, err: reqwest::Error) -> MediaError {
    if err.is_timeout() {
        MediaError::DownloadTimeout {
            url: url.to_string(),
            timeout_secs: 0,
        }
    } else {
        MediaError::DownloadRequest {
            message: format!("{url}: {err}"),
        }
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch_to(&self, raw_url: &str, dest: &Path, timeout: Duration) -> MediaResult<u64> {
        let url = validate_url(raw_url)?;
        debug!(url = %url, path = %dest.display(), "Starting download");

        let result = match tokio::time::timeout(timeout, self.stream_to_file(url, dest)).await {
            Ok(Ok(written)) => Ok(written),
            Ok(Err(MediaError::DownloadTimeout { .. })) | Err(_) => {
                Err(MediaError::DownloadTimeout {
                    url: raw_url.to_string(),
                    timeout_secs: timeout.as_secs(),
                })
            }
            Ok(Err(e)) => Err(e),
        };

        match result {
            Ok(written) => {
                metrics::record_download_bytes(written);
                Ok(written)
            }
            Err(e) => {
                remove_partial(dest).await;
                Err(e)
            }
        }
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial download"),
    }
}

/// Download `url` into `dest`, returning the number of bytes written.
pub async fn fetch_to_file(
    fetcher: &dyn MediaFetcher,
    url: &str,
    dest: &Path,
    timeout: Duration,
) -> MediaResult<u64> {
    let written = fetcher.fetch_to(url, dest, timeout).await?;
    info!(url = %url, path = %dest.display(), bytes = written, "Downloaded media");
    Ok(written)
}

/// Download every URL to its paired destination with at most `concurrency`
/// transfers in flight.
///
/// Returns the destinations in input order. The first failure aborts the
/// remaining transfers.
pub async fn fetch_all(
    fetcher: &dyn MediaFetcher,
    jobs: Vec<(String, PathBuf)>,
    timeout: Duration,
    concurrency: usize,
) -> MediaResult<Vec<PathBuf>> {
    let total = jobs.len();
    let paths = futures::stream::iter(jobs)
        .map(|(url, dest)| async move {
            fetch_to_file(fetcher, &url, &dest, timeout)
                .await
                .map_err(|e| {
                    warn!(url = %url, error = %e, "Download failed");
                    e
                })?;
            Ok::<_, MediaError>(dest)
        })
        .buffered(concurrency.max(1))
        .try_collect::<Vec<_>>()
        .await?;
    debug!(count = total, "All downloads finished");
    Ok(paths)
}
