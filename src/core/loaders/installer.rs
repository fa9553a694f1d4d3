use async_trait::async_trait;

use crate::core::error::StarterResult;

use super::context::InstallContext;

/// Result of a successful loader install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderInstallResult {
    pub minecraft_version: String,
    pub loader_version: String,
    /// Combined stdout/stderr of the installer.
    pub output: String,
}

#[async_trait]
pub trait LoaderInstaller: Send + Sync {
    async fn install(&self, ctx: InstallContext<'_>) -> StarterResult<LoaderInstallResult>;
}
