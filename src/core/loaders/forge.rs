use std::path::Path;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::context::InstallContext;
use super::installer::{LoaderInstallResult, LoaderInstaller};
use crate::core::error::{StarterError, StarterResult};
use crate::core::launch::template::{substitute, Versions};

/// Forge maven location of the official installer JAR.
pub const FORGE_INSTALLER_URL: &str = "https://maven.minecraftforge.net/net/minecraftforge/forge/{{@mcversion@}}-{{@loaderversion@}}/forge-{{@mcversion@}}-{{@loaderversion@}}-installer.jar";

const INSTALLER_FILE_NAME: &str = "installer.jar";

/// Installs Forge by downloading and executing the official installer JAR.
pub struct ForgeInstaller {
    url_template: String,
    java_binary: String,
}

impl Default for ForgeInstaller {
    fn default() -> Self {
        Self {
            url_template: FORGE_INSTALLER_URL.to_string(),
            java_binary: "java".to_string(),
        }
    }
}

impl ForgeInstaller {
    /// Empty values keep the defaults.
    pub fn new(url_template: &str, java_binary: &str) -> Self {
        let mut installer = Self::default();
        if !url_template.trim().is_empty() {
            installer.url_template = url_template.to_string();
        }
        if !java_binary.trim().is_empty() {
            installer.java_binary = java_binary.to_string();
        }
        installer
    }

    pub fn installer_url(&self, minecraft_version: &str, loader_version: &str) -> String {
        substitute(
            &self.url_template,
            Versions {
                mc_version: minecraft_version,
                loader_version,
            },
        )
    }
}

#[async_trait]
impl LoaderInstaller for ForgeInstaller {
    async fn install(&self, ctx: InstallContext<'_>) -> StarterResult<LoaderInstallResult> {
        if ctx.loader_version.is_empty() || ctx.minecraft_version.is_empty() {
            return Err(StarterError::Loader(format!(
                "cannot install loader without versions (minecraft {:?}, loader {:?})",
                ctx.minecraft_version, ctx.loader_version
            )));
        }

        info!(
            "Installing Forge {} for MC {}",
            ctx.loader_version, ctx.minecraft_version
        );

        let url = self.installer_url(ctx.minecraft_version, ctx.loader_version);
        let installer_path = ctx.install_dir.join(INSTALLER_FILE_NAME);

        info!("Attempting to download installer from {}", url);
        ctx.fetcher.download(&url, &installer_path).await?;

        let installer_path = tokio::fs::canonicalize(&installer_path)
            .await
            .map_err(|e| StarterError::io(&installer_path, e))?;

        info!("Starting installation of Loader, installer output incoming");
        info!("Check log for installer for more information");

        let mut cmd = Command::new(&self.java_binary);
        cmd.arg("-jar")
            .arg(&installer_path)
            .args(ctx.installer_arguments)
            .current_dir(ctx.install_dir);

        let (status, output) = run_mirrored(cmd).await.map_err(|e| match e {
            StarterError::Process(msg) => StarterError::Loader(msg),
            other => other,
        })?;
        debug!("Installer output:\n{}", output);

        if !status.success() {
            return Err(StarterError::Loader(format!(
                "Forge installer failed (code {:?})\n{}",
                status.code(),
                tail(&output, 20)
            )));
        }

        info!("Done installing loader, deleting installer!");
        remove_installer(&installer_path).await;

        Ok(LoaderInstallResult {
            minecraft_version: ctx.minecraft_version.to_string(),
            loader_version: ctx.loader_version.to_string(),
            output,
        })
    }
}

async fn remove_installer(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Cannot delete installer {:?}: {}", path, e);
    }
}

/// Run `cmd`, echoing stdout/stderr to the console while collecting both
/// into one buffer in arrival order.
async fn run_mirrored(mut cmd: Command) -> StarterResult<(ExitStatus, String)> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| StarterError::Process(format!("cannot start installer: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| StarterError::Process("installer stdout not captured".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| StarterError::Process("installer stderr not captured".into()))?;

    let mut out_lines = BufReader::new(stdout).lines();
    let mut err_lines = BufReader::new(stderr).lines();
    let mut buffer = String::new();
    let (mut out_done, mut err_done) = (false, false);

    while !(out_done && err_done) {
        tokio::select! {
            line = out_lines.next_line(), if !out_done => match line? {
                Some(line) => {
                    println!("{line}");
                    buffer.push_str(&line);
                    buffer.push('\n');
                }
                None => out_done = true,
            },
            line = err_lines.next_line(), if !err_done => match line? {
                Some(line) => {
                    eprintln!("{line}");
                    buffer.push_str(&line);
                    buffer.push('\n');
                }
                None => err_done = true,
            },
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| StarterError::Process(format!("cannot wait for installer: {e}")))?;

    Ok((status, buffer))
}

fn tail(output: &str, lines: usize) -> String {
    let all: Vec<&str> = output.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
