// ─── Pack Manifest ───
// Parses the curse-style `manifest.json` shipped inside a pack archive.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, info};

use crate::core::error::{StarterError, StarterResult};

/// Prefix of the mod-loader id for Forge packs (`forge-36.2.0`).
pub const FORGE_LOADER_PREFIX: &str = "forge-";

/// Top-level pack manifest.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackManifest {
    pub minecraft: MinecraftSection,
    #[serde(default)]
    pub manifest_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub files: Vec<ComponentReference>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinecraftSection {
    pub version: String,
    #[serde(default)]
    pub mod_loaders: Vec<ModLoaderEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ModLoaderEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

/// One downloadable file of a pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct ComponentReference {
    #[serde(rename = "projectID")]
    pub component_id: u64,
    #[serde(rename = "fileID")]
    pub artifact_id: u64,
    #[serde(default)]
    pub required: bool,
}

/// What the rest of the install needs out of a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedManifest {
    pub runtime_version: String,
    /// Empty when the manifest lists no mod loader.
    pub loader_version: String,
    pub components: Vec<ComponentReference>,
}

impl PackManifest {
    pub fn from_slice(raw: &[u8]) -> StarterResult<Self> {
        serde_json::from_slice(raw).map_err(|e| StarterError::Manifest(e.to_string()))
    }

    /// Version of the first mod loader that carries an id, if any.
    pub fn loader_version(&self) -> String {
        self.minecraft
            .mod_loaders
            .iter()
            .find_map(|loader| loader.id.as_deref())
            .map(loader_version_from_id)
            .unwrap_or_default()
    }
}

/// `forge-36.2.0` -> `36.2.0`. Other vendors drop everything up to the
/// first `-`; an id without a vendor prefix is returned as-is.
pub fn loader_version_from_id(id: &str) -> String {
    if let Some(version) = id.strip_prefix(FORGE_LOADER_PREFIX) {
        return version.to_string();
    }

    match id.split_once('-') {
        Some((_, version)) => version.to_string(),
        None => id.to_string(),
    }
}

/// Parse `raw` and drop every component whose id is in `ignored`.
pub fn resolve_manifest(raw: &[u8], ignored: &HashSet<u64>) -> StarterResult<ResolvedManifest> {
    let manifest = PackManifest::from_slice(raw)?;
    let loader_version = manifest.loader_version();

    let components = manifest
        .files
        .into_iter()
        .filter(|file| {
            if ignored.contains(&file.component_id) {
                info!(
                    "Skipping project {} - file {}",
                    file.component_id, file.artifact_id
                );
                false
            } else {
                debug!(
                    "Adding project {} - file {} to file list",
                    file.component_id, file.artifact_id
                );
                true
            }
        })
        .collect();

    Ok(ResolvedManifest {
        runtime_version: manifest.minecraft.version,
        loader_version,
        components,
    })
}
