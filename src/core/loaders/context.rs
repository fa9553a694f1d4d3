use std::path::Path;

use crate::core::downloader::ArtifactFetcher;

/// Everything a loader installer needs for one run.
pub struct InstallContext<'a> {
    pub minecraft_version: &'a str,
    pub loader_version: &'a str,
    pub install_dir: &'a Path,
    pub installer_arguments: &'a [String],
    pub fetcher: &'a dyn ArtifactFetcher,
}
