// ─── Installation Reconciler ───
// Brings the install root in line with the persisted install state:
// pack stage first, loader stage second, each persisted on success.

use std::path::Path;

use tracing::{info, warn};

use crate::core::downloader::ArtifactFetcher;
use crate::core::error::{StarterError, StarterResult};
use crate::core::loaders::{InstallContext, LoaderInstaller};
use crate::core::pack::{PackInstallReport, PackageType};
use crate::core::state::InstallState;

/// What a reconcile run did.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// Both stages were already recorded; nothing was touched.
    AlreadyInstalled,
    Installed {
        pack: Option<PackInstallReport>,
        loader_installed: bool,
    },
}

/// Versions pinned by the setup config. Empty strings mean "use the
/// manifest's value".
#[derive(Debug, Clone, Copy, Default)]
pub struct PinnedVersions<'a> {
    pub mc_version: &'a str,
    pub loader_version: &'a str,
}

pub struct Reconciler<'a> {
    base_path: &'a Path,
    pinned: PinnedVersions<'a>,
    package: Option<&'a dyn PackageType>,
    loader: Option<&'a dyn LoaderInstaller>,
    installer_arguments: &'a [String],
    fetcher: &'a dyn ArtifactFetcher,
}

impl<'a> Reconciler<'a> {
    pub fn new(base_path: &'a Path, fetcher: &'a dyn ArtifactFetcher) -> Self {
        Self {
            base_path,
            pinned: PinnedVersions::default(),
            package: None,
            loader: None,
            installer_arguments: &[],
            fetcher,
        }
    }

    pub fn with_pinned_versions(mut self, pinned: PinnedVersions<'a>) -> Self {
        self.pinned = pinned;
        self
    }

    /// Pack to install. Without one the pack stage only records the pinned
    /// versions.
    pub fn with_package(mut self, package: &'a dyn PackageType) -> Self {
        self.package = Some(package);
        self
    }

    /// Loader installer to run after the pack stage. Without one the loader
    /// stage is skipped.
    pub fn with_loader(mut self, loader: &'a dyn LoaderInstaller, arguments: &'a [String]) -> Self {
        self.loader = Some(loader);
        self.installer_arguments = arguments;
        self
    }

    /// Run every outstanding stage, persisting `state` after each one.
    ///
    /// Returns immediately, without touching disk or network, when `state`
    /// says both stages are done. Any error leaves the failing stage's flag
    /// unset so the next run retries it.
    pub async fn reconcile(&self, state: &mut InstallState) -> StarterResult<ReconcileOutcome> {
        if !state.should_install() {
            info!(
                "Server is already installed to correct version, to force install delete the serverstarter.lock File."
            );
            return Ok(ReconcileOutcome::AlreadyInstalled);
        }

        tokio::fs::create_dir_all(self.base_path)
            .await
            .map_err(|e| StarterError::io(self.base_path, e))?;

        let pack = if state.pack_installed {
            info!("Pack already installed, skipping pack stage");
            None
        } else {
            Some(self.install_pack(state).await?)
        };

        let loader_installed = match self.loader {
            Some(loader) if !state.loader_installed => {
                self.install_loader(loader, state).await?;
                true
            }
            Some(_) => false,
            None => {
                info!("Loader installation not requested");
                false
            }
        };

        Ok(ReconcileOutcome::Installed {
            pack: pack.flatten(),
            loader_installed,
        })
    }

    async fn install_pack(
        &self,
        state: &mut InstallState,
    ) -> StarterResult<Option<PackInstallReport>> {
        let (runtime_version, loader_version, report, source_url) = match self.package {
            Some(package) => {
                package.fetch_package(self.base_path).await?;

                info!("Processing manifest");
                let manifest = package.resolve_manifest(self.base_path).await?;

                info!("Processing Modpack");
                let report = package
                    .install_components(self.base_path, &manifest)
                    .await?;

                if !report.components.failed.is_empty() {
                    warn!(
                        "{} component downloads failed, the server may be incomplete",
                        report.components.failed.len()
                    );
                }

                (
                    pick(self.pinned.mc_version, &manifest.runtime_version),
                    pick(self.pinned.loader_version, &manifest.loader_version),
                    Some(report),
                    package.source_url().to_string(),
                )
            }
            None => {
                info!("No modpack configured, recording pinned versions only");
                (
                    self.pinned.mc_version.to_string(),
                    self.pinned.loader_version.to_string(),
                    None,
                    String::new(),
                )
            }
        };

        state.pack_installed = true;
        state.pack_source_url = source_url;
        state.runtime_version = runtime_version;
        state.loader_version = loader_version;
        state.save(self.base_path).await?;

        Ok(report)
    }

    async fn install_loader(
        &self,
        loader: &dyn LoaderInstaller,
        state: &mut InstallState,
    ) -> StarterResult<()> {
        let result = loader
            .install(InstallContext {
                minecraft_version: &state.runtime_version,
                loader_version: &state.loader_version,
                install_dir: self.base_path,
                installer_arguments: self.installer_arguments,
                fetcher: self.fetcher,
            })
            .await?;

        state.loader_installed = true;
        state.runtime_version = result.minecraft_version;
        state.loader_version = result.loader_version;
        state.save(self.base_path).await
    }
}

fn pick(pinned: &str, resolved: &str) -> String {
    if pinned.is_empty() {
        resolved.to_string()
    } else {
        pinned.to_string()
    }
}
