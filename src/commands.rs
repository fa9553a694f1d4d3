// ─── Startup Flow ───
// Config → install reconcile → license gate → supervised server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info, warn};

use crate::core::config::{InstallConfig, LicensePolicy, StarterConfig};
use crate::core::downloader::{ArtifactFetcher, Downloader};
use crate::core::error::{StarterError, StarterResult};
use crate::core::http::{build_http_client, check_connection};
use crate::core::install::{PinnedVersions, ReconcileOutcome, Reconciler};
use crate::core::launch::{
    build_launch_plan, listen_for_shutdown, Supervisor, SupervisorExit, SystemLauncher,
};
use crate::core::license::{EnvAffirmation, LicenseGate, LicenseStatus, StdinPrompt};
use crate::core::loaders::ForgeInstaller;
use crate::core::pack::{CurseMetaLookup, CursePack, IgnorePatterns, MetadataLookup};
use crate::core::state::InstallState;

pub const DEFAULT_CONFIG_FILE: &str = "server-setup-config.toml";

const CURSE_FORMAT: &str = "curse";

#[derive(Debug, Parser)]
#[command(
    name = "server-starter",
    version,
    about = "Installs a modpack server from a setup config and keeps it running"
)]
pub struct Args {
    /// Path to the setup config.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

/// Run the whole startup flow for `args`.
pub async fn start(args: Args) -> StarterResult<SupervisorExit> {
    let config = StarterConfig::read(&args.config)?;
    greet(&config, &args.config);

    let base_path = config.base_path().to_path_buf();

    if config.launch.check_offline {
        ensure_online().await?;
    }

    let mut state = InstallState::load(&base_path).await?;
    install(&config, &base_path, &mut state).await?;
    check_license(config.launch.license_policy, &base_path).await?;
    supervise(&config, &state, &base_path).await
}

fn greet(config: &StarterConfig, config_path: &Path) {
    info!("ConfigFile: {:?}", config_path);
    if config.modpack.name.is_empty() {
        info!("Starting server setup");
    } else {
        info!("Modpack: {}", config.modpack.name);
    }
    if !config.modpack.description.is_empty() {
        info!("{}", config.modpack.description);
    }
    debug!("Install root: {:?}", config.base_path());
}

async fn ensure_online() -> StarterResult<()> {
    info!("Checking internet connection...");
    let client = build_http_client()?;
    if check_connection(&client).await {
        debug!("Internet connection available");
        Ok(())
    } else {
        Err(StarterError::Config(
            "no internet connection, disable launch.check_offline to start anyway".into(),
        ))
    }
}

async fn install(
    config: &StarterConfig,
    base_path: &Path,
    state: &mut InstallState,
) -> StarterResult<()> {
    let downloader = Arc::new(Downloader::new()?);
    let lookup = Arc::new(CurseMetaLookup::new()?);
    let package = build_package(&config.install, downloader.clone(), lookup)?;
    let loader = ForgeInstaller::new(
        &config.install.installer_url,
        &config.launch.forced_java_path,
    );

    let mut reconciler = Reconciler::new(base_path, downloader.as_ref()).with_pinned_versions(
        PinnedVersions {
            mc_version: &config.install.mc_version,
            loader_version: &config.install.loader_version,
        },
    );
    if let Some(package) = &package {
        reconciler = reconciler.with_package(package);
    }
    if config.install.install_loader {
        reconciler = reconciler.with_loader(&loader, &config.install.installer_arguments);
    }

    match reconciler.reconcile(state).await? {
        ReconcileOutcome::AlreadyInstalled => {}
        ReconcileOutcome::Installed {
            pack,
            loader_installed,
        } => {
            if let Some(report) = pack {
                info!(
                    "Pack installed: {} overrides, {} components downloaded, {} skipped, {} failed",
                    report.overrides.moved.len(),
                    report.components.downloaded.len(),
                    report.components.skipped.len(),
                    report.components.failed.len()
                );
                if report.failed_additional_files > 0 {
                    warn!(
                        "{} additional files could not be downloaded",
                        report.failed_additional_files
                    );
                }
            }
            if loader_installed {
                info!("Loader {} installed", state.loader_version);
            }
        }
    }
    Ok(())
}

fn build_package(
    install: &InstallConfig,
    fetcher: Arc<dyn ArtifactFetcher>,
    lookup: Arc<dyn MetadataLookup>,
) -> StarterResult<Option<CursePack>> {
    if install.modpack_url.trim().is_empty() {
        return Ok(None);
    }
    if !install.modpack_format.eq_ignore_ascii_case(CURSE_FORMAT) {
        return Err(StarterError::Config(format!(
            "unsupported modpack_format {:?}, only \"{}\" is supported",
            install.modpack_format, CURSE_FORMAT
        )));
    }

    let ignore = IgnorePatterns::parse(&install.ignore_files)?;
    let pack = CursePack::new(install.modpack_url.clone(), ignore, fetcher, lookup)
        .with_ignored_components(install.format_specific.ignore_project.iter().copied())
        .with_additional_files(install.additional_files.clone());
    Ok(Some(pack))
}

async fn check_license(policy: LicensePolicy, base_path: &Path) -> StarterResult<()> {
    let gate = LicenseGate::new(base_path);
    let path = gate.path().to_path_buf();

    let status = tokio::task::spawn_blocking(move || gate.check(&EnvAffirmation, &mut StdinPrompt))
        .await
        .map_err(|e| StarterError::Other(format!("license prompt task failed: {e}")))??;

    apply_license_policy(status, policy, path)
}

fn apply_license_policy(
    status: LicenseStatus,
    policy: LicensePolicy,
    path: PathBuf,
) -> StarterResult<()> {
    match (status, policy) {
        (LicenseStatus::Affirmed, _) => Ok(()),
        (LicenseStatus::NotAffirmed, LicensePolicy::Enforce) => {
            Err(StarterError::LicenseNotAccepted(path))
        }
        (LicenseStatus::NotAffirmed, LicensePolicy::Warn) => {
            warn!(
                "License in {:?} is not accepted, starting anyway because license_policy is warn",
                path
            );
            Ok(())
        }
    }
}

async fn supervise(
    config: &StarterConfig,
    state: &InstallState,
    base_path: &Path,
) -> StarterResult<SupervisorExit> {
    let plan = build_launch_plan(&config.launch, state, base_path)?;
    let crash_window = config.launch.crash_window()?;
    let launcher = SystemLauncher;
    let shutdown = listen_for_shutdown();

    let mut supervisor = Supervisor::new(
        plan,
        &launcher,
        config.launch.auto_restart,
        config.launch.crash_limit,
        crash_window,
    );
    supervisor.run(shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::client::testing::RecordingFetcher;
    use crate::core::pack::components::testing::lookup_for;

    fn install_config(url: &str, format: &str) -> InstallConfig {
        let raw = format!(
            r#"
            base_install_path = "/srv/pack"
            modpack_url = "{url}"
            modpack_format = "{format}"
            ignore_files = ["mods/optifine*.jar", "config/client/*"]
            "#
        );
        toml::from_str(&raw).unwrap()
    }

    #[test]
    fn parses_config_flag() {
        let args = Args::parse_from(["server-starter", "-c", "/tmp/custom.toml"]);
        assert_eq!(args.config, PathBuf::from("/tmp/custom.toml"));

        let args = Args::parse_from(["server-starter"]);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn empty_modpack_url_means_no_package() {
        let package = build_package(
            &install_config("", "curse"),
            Arc::new(RecordingFetcher::default()),
            Arc::new(lookup_for(&[])),
        )
        .unwrap();
        assert!(package.is_none());
    }

    #[test]
    fn curse_format_builds_package() {
        let package = build_package(
            &install_config("https://example.com/pack.zip", "Curse"),
            Arc::new(RecordingFetcher::default()),
            Arc::new(lookup_for(&[])),
        )
        .unwrap();
        assert!(package.is_some());
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = build_package(
            &install_config("https://example.com/pack.zip", "technic"),
            Arc::new(RecordingFetcher::default()),
            Arc::new(lookup_for(&[])),
        )
        .err()
        .unwrap();
        assert!(matches!(err, StarterError::Config(_)));
    }

    #[test]
    fn enforce_policy_blocks_unaccepted_license() {
        let path = PathBuf::from("/srv/pack/eula.txt");

        let err = apply_license_policy(
            LicenseStatus::NotAffirmed,
            LicensePolicy::Enforce,
            path.clone(),
        )
        .unwrap_err();
        assert!(matches!(err, StarterError::LicenseNotAccepted(p) if p == path));

        apply_license_policy(LicenseStatus::NotAffirmed, LicensePolicy::Warn, path.clone())
            .unwrap();
        apply_license_policy(LicenseStatus::Affirmed, LicensePolicy::Enforce, path).unwrap();
    }

    #[tokio::test]
    async fn affirmed_license_file_passes_without_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("eula.txt"), "#a\n#b\neula=true\n").unwrap();

        check_license(LicensePolicy::Enforce, dir.path())
            .await
            .unwrap();
    }
}
