pub mod backup;
pub mod components;
pub mod curse;
pub mod ignore;
pub mod manifest;
pub mod overrides;

use std::path::Path;

use async_trait::async_trait;

use crate::core::error::StarterResult;

pub use components::{
    ComponentDownloader, ComponentReport, CurseMetaLookup, MetadataLookup, DEFAULT_CONCURRENCY,
};
pub use curse::CursePack;
pub use ignore::IgnorePatterns;
pub use manifest::{resolve_manifest, ComponentReference, ResolvedManifest};
pub use overrides::{merge_overrides, MergeReport};

/// What an install of the pack contents produced.
#[derive(Debug, Default)]
pub struct PackInstallReport {
    pub overrides: MergeReport,
    pub components: ComponentReport,
    pub failed_additional_files: usize,
}

/// A pack format the reconciler can install.
#[async_trait]
pub trait PackageType: Send + Sync {
    /// Where the pack comes from, recorded in the install state.
    fn source_url(&self) -> &str;

    /// Stage the pack archive and unpack it into `install_root`.
    async fn fetch_package(&self, install_root: &Path) -> StarterResult<()>;

    /// Read the unpacked manifest.
    async fn resolve_manifest(&self, install_root: &Path) -> StarterResult<ResolvedManifest>;

    /// Merge overrides and download everything the manifest references.
    async fn install_components(
        &self,
        install_root: &Path,
        manifest: &ResolvedManifest,
    ) -> StarterResult<PackInstallReport>;
}
