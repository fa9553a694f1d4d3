use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::core::error::{StarterError, StarterResult};
use crate::core::http::build_http_client;

/// Fetch + unpack collaborator used by every install stage.
///
/// Implementations overwrite existing files at the destination.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn download(&self, url: &str, dest: &Path) -> StarterResult<()>;

    async fn extract(&self, archive: &Path, dest_dir: &Path) -> StarterResult<()>;
}

/// A single file to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
}

/// reqwest + zip backed fetcher.
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new() -> StarterResult<Self> {
        Ok(Self {
            client: build_http_client()?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Download a single file to `dest`.
    ///
    /// Creates parent directories as needed. Drops the file handle
    /// immediately after writing to avoid Windows OS Error 5.
    pub async fn download_file(&self, url: &str, dest: &Path) -> StarterResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StarterError::io(parent, e))?;
        }

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StarterError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;

        {
            let mut file = tokio::fs::File::create(dest)
                .await
                .map_err(|e| StarterError::io(dest, e))?;
            file.write_all(&bytes)
                .await
                .map_err(|e| StarterError::io(dest, e))?;
            file.flush().await.map_err(|e| StarterError::io(dest, e))?;
        }

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, bytes.len());
        Ok(())
    }
}

#[async_trait]
impl ArtifactFetcher for Downloader {
    async fn download(&self, url: &str, dest: &Path) -> StarterResult<()> {
        self.download_file(url, dest).await
    }

    async fn extract(&self, archive: &Path, dest_dir: &Path) -> StarterResult<()> {
        let archive = archive.to_path_buf();
        let dest_dir = dest_dir.to_path_buf();
        tokio::task::spawn_blocking(move || super::extract_zip(&archive, &dest_dir))
            .await
            .map_err(|e| StarterError::Other(format!("extraction task failed: {e}")))?
    }
}

/// Download many files with at most `concurrency` in flight, using
/// `buffer_unordered`.
///
/// Every entry is attempted; failures are logged and returned, they never
/// cancel the remaining downloads.
pub async fn download_batch(
    fetcher: &dyn ArtifactFetcher,
    entries: Vec<DownloadEntry>,
    concurrency: usize,
) -> Vec<(DownloadEntry, StarterError)> {
    info!(
        "Starting batch download: {} files, concurrency={}",
        entries.len(),
        concurrency
    );

    let jobs: Vec<_> = entries
        .into_iter()
        .map(|entry| fetch_entry(fetcher, entry))
        .collect();

    let results: Vec<_> = stream::iter(jobs)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    results
        .into_iter()
        .filter_map(|(entry, result)| match result {
            Ok(()) => None,
            Err(e) => {
                error!("Download of {} failed: {}", entry.url, e);
                Some((entry, e))
            }
        })
        .collect()
}

async fn fetch_entry(
    fetcher: &dyn ArtifactFetcher,
    entry: DownloadEntry,
) -> (DownloadEntry, StarterResult<()>) {
    let result = fetcher.download(&entry.url, &entry.dest).await;
    (entry, result)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    /// Fake fetcher that writes the URL into the destination file and
    /// records peak concurrency.
    #[derive(Default)]
    pub struct RecordingFetcher {
        pub in_flight: AtomicUsize,
        pub peak: AtomicUsize,
        pub calls: Mutex<Vec<DownloadEntry>>,
        pub failing: HashSet<String>,
        pub delay: Duration,
    }

    impl RecordingFetcher {
        pub fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }

        pub fn urls(&self) -> Vec<String> {
            let mut urls: Vec<_> = self
                .calls
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.url.clone())
                .collect();
            urls.sort();
            urls
        }
    }

    #[async_trait]
    impl ArtifactFetcher for RecordingFetcher {
        async fn download(&self, url: &str, dest: &Path) -> StarterResult<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(DownloadEntry {
                url: url.to_string(),
                dest: dest.to_path_buf(),
            });

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(url) {
                return Err(StarterError::DownloadFailed {
                    url: url.to_string(),
                    status: 404,
                });
            }

            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(dest, url)?;
            Ok(())
        }

        async fn extract(&self, _archive: &Path, _dest_dir: &Path) -> StarterResult<()> {
            Ok(())
        }
    }
}
