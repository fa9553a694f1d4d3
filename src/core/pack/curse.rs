use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::backup::backup_old_files;
use super::components::{ComponentDownloader, MetadataLookup, DEFAULT_CONCURRENCY};
use super::ignore::IgnorePatterns;
use super::manifest::{resolve_manifest, ResolvedManifest};
use super::overrides::{merge_overrides, overrides_dir};
use super::{PackageType, PackInstallReport};
use crate::core::config::AdditionalFile;
use crate::core::downloader::{download_batch, ArtifactFetcher, DownloadEntry};
use crate::core::error::{StarterError, StarterResult};

const ARCHIVE_NAME: &str = "modpack-download.zip";
const MANIFEST_NAME: &str = "manifest.json";

/// Curse-style pack: a zip with `manifest.json` listing remote components
/// and an `overrides/` tree merged verbatim onto the install root.
pub struct CursePack {
    source_url: String,
    ignore: IgnorePatterns,
    ignored_components: HashSet<u64>,
    additional_files: Vec<AdditionalFile>,
    fetcher: Arc<dyn ArtifactFetcher>,
    lookup: Arc<dyn MetadataLookup>,
    concurrency: usize,
}

impl CursePack {
    pub fn new(
        source_url: impl Into<String>,
        ignore: IgnorePatterns,
        fetcher: Arc<dyn ArtifactFetcher>,
        lookup: Arc<dyn MetadataLookup>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            ignore,
            ignored_components: HashSet::new(),
            additional_files: Vec::new(),
            fetcher,
            lookup,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_ignored_components(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.ignored_components = ids.into_iter().collect();
        self
    }

    pub fn with_additional_files(mut self, files: Vec<AdditionalFile>) -> Self {
        self.additional_files = files;
        self
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    async fn download_additional_files(&self, install_root: &Path) -> usize {
        if self.additional_files.is_empty() {
            return 0;
        }

        info!("Downloading {} additional files", self.additional_files.len());
        let entries = self
            .additional_files
            .iter()
            .map(|file| DownloadEntry {
                url: file.url.clone(),
                dest: install_root.join(&file.destination),
            })
            .collect();

        download_batch(self.fetcher.as_ref(), entries, self.concurrency)
            .await
            .len()
    }
}

#[async_trait]
impl PackageType for CursePack {
    fn source_url(&self) -> &str {
        &self.source_url
    }

    async fn fetch_package(&self, install_root: &Path) -> StarterResult<()> {
        let root = install_root.to_path_buf();
        tokio::task::spawn_blocking(move || backup_old_files(&root))
            .await
            .map_err(|e| StarterError::Other(format!("backup task failed: {e}")))??;

        info!("Attempting to download modpack Zip from {}.", self.source_url);
        let archive = install_root.join(ARCHIVE_NAME);
        self.fetcher.download(&self.source_url, &archive).await?;

        info!("Unpacking modpack to {:?}", install_root);
        self.fetcher.extract(&archive, install_root).await?;

        if let Err(e) = tokio::fs::remove_file(&archive).await {
            error!("Cannot remove {:?}: {}", archive, e);
        }
        Ok(())
    }

    async fn resolve_manifest(&self, install_root: &Path) -> StarterResult<ResolvedManifest> {
        let manifest_path = install_root.join(MANIFEST_NAME);
        info!("Reading manifest file: {:?}", manifest_path);

        let raw = tokio::fs::read(&manifest_path)
            .await
            .map_err(|e| StarterError::io(&manifest_path, e))?;

        resolve_manifest(&raw, &self.ignored_components)
    }

    async fn install_components(
        &self,
        install_root: &Path,
        manifest: &ResolvedManifest,
    ) -> StarterResult<PackInstallReport> {
        let overrides = {
            let overrides_root = overrides_dir(install_root);
            let install_root = install_root.to_path_buf();
            let ignore = self.ignore.clone();
            tokio::task::spawn_blocking(move || {
                merge_overrides(&overrides_root, &install_root, &ignore)
            })
            .await
            .map_err(|e| StarterError::Other(format!("override merge task failed: {e}")))??
        };

        info!("Downloading mods");
        let components = ComponentDownloader::new(self.lookup.as_ref(), self.fetcher.as_ref())
            .with_concurrency(self.concurrency)
            .download_all(&manifest.components, &self.ignore, install_root)
            .await?;

        let failed_additional_files = self.download_additional_files(install_root).await;

        Ok(PackInstallReport {
            overrides,
            components,
            failed_additional_files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::client::testing::RecordingFetcher;
    use crate::core::pack::components::testing::lookup_for;

    const MANIFEST: &str = r#"{
        "minecraft": { "version": "1.16.5", "modLoaders": [{ "id": "forge-36.2.0" }] },
        "files": [
            { "projectID": 1, "fileID": 10, "required": true },
            { "projectID": 2, "fileID": 20, "required": true }
        ]
    }"#;

    fn pack(fetcher: Arc<RecordingFetcher>, ignore: &[&str]) -> CursePack {
        CursePack::new(
            "https://example.com/pack.zip",
            IgnorePatterns::parse(ignore).unwrap(),
            fetcher,
            Arc::new(lookup_for(&[1, 2])),
        )
    }

    #[tokio::test]
    async fn resolves_manifest_with_ignored_projects() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_NAME), MANIFEST).unwrap();

        let pack = pack(Arc::new(RecordingFetcher::default()), &[]).with_ignored_components([2]);
        let manifest = pack.resolve_manifest(dir.path()).await.unwrap();

        assert_eq!(manifest.loader_version, "36.2.0");
        assert_eq!(manifest.components.len(), 1);
        assert_eq!(manifest.components[0].component_id, 1);
    }

    #[tokio::test]
    async fn missing_manifest_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let pack = pack(Arc::new(RecordingFetcher::default()), &[]);
        let err = pack.resolve_manifest(dir.path()).await.unwrap_err();
        assert!(matches!(err, StarterError::Io { .. }));
    }

    #[tokio::test]
    async fn fetch_backs_up_and_downloads_archive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("mods")).unwrap();
        let fetcher = Arc::new(RecordingFetcher::default());

        pack(fetcher.clone(), &[])
            .fetch_package(dir.path())
            .await
            .unwrap();

        assert_eq!(fetcher.urls(), vec!["https://example.com/pack.zip"]);
        assert!(dir.path().join("OLD_FILES_TO_DELETE/mods").exists());
        assert!(!dir.path().join(ARCHIVE_NAME).exists());
    }

    #[tokio::test]
    async fn installs_overrides_components_and_additional_files() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = dir.path().join("overrides");
        std::fs::create_dir_all(overrides.join("config")).unwrap();
        std::fs::write(overrides.join("config/a.cfg"), "a").unwrap();
        std::fs::write(overrides.join("local.txt"), "l").unwrap();
        std::fs::write(dir.path().join(MANIFEST_NAME), MANIFEST).unwrap();

        let fetcher = Arc::new(RecordingFetcher::default());
        let pack = pack(fetcher.clone(), &["local.txt", "mods/mod-2.jar"]).with_additional_files(
            vec![AdditionalFile {
                url: "https://example.com/extra.jar".into(),
                destination: "plugins/extra.jar".into(),
            }],
        );

        let manifest = pack.resolve_manifest(dir.path()).await.unwrap();
        let report = pack
            .install_components(dir.path(), &manifest)
            .await
            .unwrap();

        assert_eq!(report.overrides.moved, vec!["config/a.cfg"]);
        assert_eq!(report.overrides.skipped, vec!["local.txt"]);
        assert_eq!(report.components.downloaded, vec!["mod-1.jar"]);
        assert_eq!(report.components.skipped, vec!["mod-2.jar"]);
        assert_eq!(report.failed_additional_files, 0);
        assert!(dir.path().join("config/a.cfg").exists());
        assert!(!dir.path().join("local.txt").exists());
        assert!(dir.path().join("mods/mod-1.jar").exists());
        assert!(dir.path().join("plugins/extra.jar").exists());
        assert!(!overrides.exists());
    }
}
