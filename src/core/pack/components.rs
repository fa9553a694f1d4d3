// ─── Component Downloads ───
// Resolves manifest component references to download URLs and fetches
// them into `mods/` with bounded parallelism.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::ignore::{IgnorePatterns, COMPONENTS_DIR};
use super::manifest::ComponentReference;
use crate::core::downloader::{download_batch, ArtifactFetcher, DownloadEntry};
use crate::core::error::{StarterError, StarterResult};
use crate::core::http::build_http_client_with_timeout;

/// Parallel component downloads.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Per-request budget for a metadata lookup.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

const CURSE_META_BASE: &str = "https://cursemeta.dries007.net";

/// Remote metadata resolution `(component, artifact) -> url`.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn lookup_download_url(&self, component_id: u64, artifact_id: u64)
        -> StarterResult<String>;
}

/// Lookup against the cursemeta mirror.
pub struct CurseMetaLookup {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CurseFileMeta {
    #[serde(rename = "DownloadURL")]
    download_url: Option<String>,
}

impl CurseMetaLookup {
    pub fn new() -> StarterResult<Self> {
        Ok(Self {
            client: build_http_client_with_timeout(LOOKUP_TIMEOUT)?,
            base_url: CURSE_META_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl MetadataLookup for CurseMetaLookup {
    async fn lookup_download_url(
        &self,
        component_id: u64,
        artifact_id: u64,
    ) -> StarterResult<String> {
        let url = format!("{}/{}/{}.json", self.base_url, component_id, artifact_id);
        let lookup_error = |reason: String| StarterError::Lookup {
            component_id,
            artifact_id,
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| lookup_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(lookup_error(format!("HTTP {}", status.as_u16())));
        }

        let meta: CurseFileMeta = response
            .json()
            .await
            .map_err(|e| lookup_error(e.to_string()))?;

        meta.download_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| lookup_error("response has no DownloadURL".into()))
    }
}

/// Summary of a component download run.
#[derive(Debug, Default)]
pub struct ComponentReport {
    pub downloaded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(DownloadEntry, StarterError)>,
}

pub struct ComponentDownloader<'a> {
    lookup: &'a dyn MetadataLookup,
    fetcher: &'a dyn ArtifactFetcher,
    concurrency: usize,
}

impl<'a> ComponentDownloader<'a> {
    pub fn new(lookup: &'a dyn MetadataLookup, fetcher: &'a dyn ArtifactFetcher) -> Self {
        Self {
            lookup,
            fetcher,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    /// Resolve every reference, one at a time. Any lookup failure is fatal.
    pub async fn resolve_urls(
        &self,
        components: &[ComponentReference],
    ) -> StarterResult<Vec<String>> {
        let mut urls = Vec::with_capacity(components.len());
        for component in components {
            let url = self
                .lookup
                .lookup_download_url(component.component_id, component.artifact_id)
                .await?;
            urls.push(url);
        }
        Ok(urls)
    }

    /// Turn resolved URLs into download jobs, dropping ignored file names.
    pub fn plan(
        &self,
        urls: &[String],
        ignore: &IgnorePatterns,
        install_root: &Path,
    ) -> (Vec<DownloadEntry>, Vec<String>) {
        let dest_dir = install_root.join(COMPONENTS_DIR);
        let total = urls.len();
        let mut jobs = Vec::new();
        let mut skipped = Vec::new();

        for (i, url) in urls.iter().enumerate() {
            let file_name = file_name_from_url(url);
            if ignore.ignores_component(&file_name) {
                info!("({}/{}) Skipped ignored mod: {}", i + 1, total, file_name);
                skipped.push(file_name);
                continue;
            }

            info!("({}/{}) Loading mod {}", i + 1, total, file_name);
            jobs.push(DownloadEntry {
                url: url.clone(),
                dest: dest_dir.join(&file_name),
            });
        }

        (jobs, skipped)
    }

    /// Resolve, filter and download all components.
    ///
    /// Returns once every dispatched download has finished. Individual
    /// download failures are collected in the report, not returned as `Err`.
    pub async fn download_all(
        &self,
        components: &[ComponentReference],
        ignore: &IgnorePatterns,
        install_root: &Path,
    ) -> StarterResult<ComponentReport> {
        let dest_dir = install_root.join(COMPONENTS_DIR);
        tokio::fs::create_dir_all(&dest_dir)
            .await
            .map_err(|e| StarterError::io(&dest_dir, e))?;

        let urls = self.resolve_urls(components).await?;
        let (jobs, skipped) = self.plan(&urls, ignore, install_root);

        let names: Vec<String> = jobs
            .iter()
            .filter_map(|job| job.dest.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect();

        let failed = download_batch(self.fetcher, jobs, self.concurrency).await;

        let downloaded = names
            .into_iter()
            .filter(|name| {
                !failed
                    .iter()
                    .any(|(entry, _)| entry.dest.file_name().is_some_and(|n| n == name.as_str()))
            })
            .collect();

        Ok(ComponentReport {
            downloaded,
            skipped,
            failed,
        })
    }
}

/// Last path segment of `url`, without query or fragment.
pub fn file_name_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(last) = parsed.path_segments().and_then(|mut s| s.next_back()) {
            return last.to_string();
        }
    }

    let trimmed = url.split(['?', '#']).next().unwrap_or(url);
    trimmed.rsplit('/').next().unwrap_or(trimmed).to_string()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;

    pub struct MapLookup(pub HashMap<(u64, u64), String>);

    #[async_trait]
    impl MetadataLookup for MapLookup {
        async fn lookup_download_url(
            &self,
            component_id: u64,
            artifact_id: u64,
        ) -> StarterResult<String> {
            self.0
                .get(&(component_id, artifact_id))
                .cloned()
                .ok_or(StarterError::Lookup {
                    component_id,
                    artifact_id,
                    reason: "unknown".into(),
                })
        }
    }

    /// Component `id` with artifact `id * 10` resolves to `mod-<id>.jar`.
    pub fn lookup_for(ids: &[u64]) -> MapLookup {
        MapLookup(
            ids.iter()
                .map(|&id| {
                    let url = format!("https://edge.example.com/files/{id}/mod-{id}.jar");
                    ((id, id * 10), url)
                })
                .collect(),
        )
    }
}
