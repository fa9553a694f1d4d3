use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::{StarterError, StarterResult};

pub const LOCK_FILE_NAME: &str = "serverstarter.lock";

/// Persisted install progress, stored as `serverstarter.lock` in the
/// install root.
///
/// A missing file is equivalent to `InstallState::default()`. The state is
/// written after every stage that flips one of the flags, so an interrupted
/// run resumes from the last completed stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallState {
    #[serde(default)]
    pub loader_installed: bool,
    #[serde(default)]
    pub pack_installed: bool,
    #[serde(default)]
    pub loader_version: String,
    #[serde(default, rename = "mcVersion")]
    pub runtime_version: String,
    #[serde(default, rename = "packUrl")]
    pub pack_source_url: String,
}

impl InstallState {
    /// Whether any install stage is still outstanding.
    pub fn should_install(&self) -> bool {
        !self.loader_installed || !self.pack_installed
    }

    pub fn path_in(base_path: &Path) -> PathBuf {
        base_path.join(LOCK_FILE_NAME)
    }

    /// Load the state from `base_path`, falling back to defaults when the
    /// lock file does not exist yet.
    pub async fn load(base_path: &Path) -> StarterResult<Self> {
        let path = Self::path_in(base_path);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No lock file at {:?}, starting from scratch", path);
                return Ok(Self::default());
            }
            Err(e) => return Err(StarterError::io(path, e)),
        };

        let state: InstallState = serde_json::from_str(&raw)?;
        Ok(state)
    }

    /// Persist the state to `base_path`, creating the directory if needed.
    pub async fn save(&self, base_path: &Path) -> StarterResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        let path = Self::path_in(base_path);

        tokio::fs::create_dir_all(base_path)
            .await
            .map_err(|e| StarterError::io(base_path, e))?;

        tokio::fs::write(&path, json)
            .await
            .map_err(|e| StarterError::io(&path, e))?;

        info!(
            "Lock file updated (pack installed: {}, loader installed: {})",
            self.pack_installed, self.loader_installed
        );
        Ok(())
    }
}
