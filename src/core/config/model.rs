// ─── Setup Config ───
// Declarative description of the pack to install and how to launch it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::duration::parse_duration;
use crate::core::error::{StarterError, StarterResult};

/// Oldest config layout this build understands.
pub const CURRENT_SPEC: i64 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarterConfig {
    #[serde(rename = "_specver")]
    pub spec_ver: i64,
    #[serde(default)]
    pub modpack: ModpackConfig,
    pub install: InstallConfig,
    #[serde(default)]
    pub launch: LaunchConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModpackConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    #[serde(default)]
    pub mc_version: String,
    #[serde(default)]
    pub loader_version: String,
    #[serde(default)]
    pub installer_url: String,
    #[serde(default)]
    pub installer_arguments: Vec<String>,
    #[serde(default)]
    pub modpack_url: String,
    #[serde(default = "default_modpack_format")]
    pub modpack_format: String,
    #[serde(default)]
    pub format_specific: FormatSpecific,
    pub base_install_path: PathBuf,
    #[serde(default)]
    pub ignore_files: Vec<String>,
    #[serde(default)]
    pub additional_files: Vec<AdditionalFile>,
    #[serde(default)]
    pub install_loader: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormatSpecific {
    /// Component (project) ids that are never downloaded.
    #[serde(default)]
    pub ignore_project: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalFile {
    pub url: String,
    pub destination: String,
}

/// What to do when the license marker is not affirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicensePolicy {
    /// Refuse to launch the server.
    #[default]
    Enforce,
    /// Log a warning and launch anyway.
    Warn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    #[serde(default)]
    pub spongefix: bool,
    #[serde(default)]
    pub check_offline: bool,
    #[serde(default)]
    pub max_ram: String,
    #[serde(default = "default_true")]
    pub auto_restart: bool,
    #[serde(default = "default_crash_limit")]
    pub crash_limit: usize,
    #[serde(default = "default_crash_timer")]
    pub crash_timer: String,
    #[serde(default)]
    pub start_file: String,
    #[serde(default)]
    pub forced_java_path: String,
    #[serde(default)]
    pub java_args: Vec<String>,
    #[serde(default)]
    pub license_policy: LicensePolicy,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            spongefix: false,
            check_offline: false,
            max_ram: String::new(),
            auto_restart: true,
            crash_limit: default_crash_limit(),
            crash_timer: default_crash_timer(),
            start_file: String::new(),
            forced_java_path: String::new(),
            java_args: Vec::new(),
            license_policy: LicensePolicy::Enforce,
        }
    }
}

impl LaunchConfig {
    /// Parsed `crash_timer`.
    pub fn crash_window(&self) -> StarterResult<Duration> {
        parse_duration(&self.crash_timer)
    }
}

fn default_modpack_format() -> String {
    "curse".into()
}

fn default_true() -> bool {
    true
}

fn default_crash_limit() -> usize {
    10
}

fn default_crash_timer() -> String {
    "60m".into()
}

impl StarterConfig {
    /// Read and validate the setup file at `path`.
    pub fn read(path: &Path) -> StarterResult<Self> {
        info!("ConfigFile: {:?}", path);
        let raw = std::fs::read_to_string(path).map_err(|e| StarterError::io(path, e))?;
        let config = Self::parse(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(raw: &str) -> StarterResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Checks that do not need the network or the filesystem.
    pub fn validate(&self) -> StarterResult<()> {
        if self.spec_ver < CURRENT_SPEC {
            return Err(StarterError::Config(format!(
                "config uses specification version {}, at least {} is required",
                self.spec_ver, CURRENT_SPEC
            )));
        }

        if self.install.base_install_path.as_os_str().is_empty() {
            return Err(StarterError::Config(
                "install.base_install_path must not be empty".into(),
            ));
        }

        if self.launch.crash_limit == 0 {
            return Err(StarterError::Config(
                "launch.crash_limit must be at least 1".into(),
            ));
        }

        self.launch.crash_window()?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.install.base_install_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        _specver = 2

        [modpack]
        name = "ATM6 to the Sky"

        [install]
        mc_version = "1.16.5"
        modpack_url = "https://example.com/pack.zip"
        base_install_path = "server"
        ignore_files = ["mods/optifine*.jar", "config/local/*"]
        install_loader = true

        [install.format_specific]
        ignore_project = [123, 456]

        [[install.additional_files]]
        url = "https://example.com/extra.jar"
        destination = "mods/extra.jar"

        [launch]
        crash_limit = 3
        crash_timer = "1m"
        start_file = "forge-{{@mcversion@}}-{{@loaderversion@}}.jar"
        java_args = ["-XX:+UseG1GC"]
        license_policy = "warn"
    "#;

    #[test]
    fn parses_full_config() {
        let config = StarterConfig::parse(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.modpack.name, "ATM6 to the Sky");
        assert_eq!(config.install.modpack_format, "curse");
        assert_eq!(config.install.format_specific.ignore_project, vec![123, 456]);
        assert_eq!(config.install.additional_files.len(), 1);
        assert!(config.launch.auto_restart);
        assert_eq!(config.launch.crash_limit, 3);
        assert_eq!(config.launch.crash_window().unwrap(), Duration::from_secs(60));
        assert_eq!(config.launch.license_policy, LicensePolicy::Warn);
    }

    #[test]
    fn rejects_old_spec_version() {
        let raw = SAMPLE.replace("_specver = 2", "_specver = 1");
        let config = StarterConfig::parse(&raw).unwrap();
        assert!(matches!(config.validate(), Err(StarterError::Config(_))));
    }

    #[test]
    fn rejects_bad_crash_timer() {
        let raw = SAMPLE.replace("crash_timer = \"1m\"", "crash_timer = \"soon\"");
        let config = StarterConfig::parse(&raw).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_install_section_is_a_parse_error() {
        assert!(StarterConfig::parse("_specver = 2").is_err());
    }
}
