// ─── Override Merger ───
// Moves the staged `overrides/` tree of a pack onto the install root.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::ignore::IgnorePatterns;
use crate::core::error::{StarterError, StarterResult};

/// Outcome of a merge, paths relative to the install root.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub moved: Vec<String>,
    pub skipped: Vec<String>,
}

/// Move every regular file under `overrides_root` to the same relative
/// location under `install_root`, overwriting existing files, then delete
/// `overrides_root`.
///
/// Ignored files are not moved and are deleted together with the staging
/// tree. A traversal or move error aborts the merge; files moved before the
/// error stay where they are and the staging tree is left in place.
pub fn merge_overrides(
    overrides_root: &Path,
    install_root: &Path,
    ignore: &IgnorePatterns,
) -> StarterResult<MergeReport> {
    let mut report = MergeReport::default();

    if !overrides_root.is_dir() {
        debug!("No overrides directory at {:?}", overrides_root);
        return Ok(report);
    }

    info!("Processing overrides");
    walk(overrides_root, overrides_root, install_root, ignore, &mut report)?;

    info!("Remove override directory");
    std::fs::remove_dir_all(overrides_root).map_err(|e| StarterError::io(overrides_root, e))?;

    Ok(report)
}

fn walk(
    dir: &Path,
    overrides_root: &Path,
    install_root: &Path,
    ignore: &IgnorePatterns,
    report: &mut MergeReport,
) -> StarterResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| StarterError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| StarterError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| StarterError::io(&path, e))?;

        if file_type.is_dir() {
            walk(&path, overrides_root, install_root, ignore, report)?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let relative = relative_key(&path, overrides_root)?;
        if ignore.ignores_override(&relative) {
            info!("Skipping file: {}", relative);
            report.skipped.push(relative);
            continue;
        }

        info!("Moving file: {}", relative);
        let dest = install_root.join(&relative);
        move_file(&path, &dest)?;
        report.moved.push(relative);
    }

    Ok(())
}

/// `/`-joined path of `path` relative to `root`.
fn relative_key(path: &Path, root: &Path) -> StarterResult<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| StarterError::Other(format!("{path:?} is outside {root:?}")))?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

fn move_file(source: &Path, dest: &Path) -> StarterResult<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StarterError::io(parent, e))?;
    }

    if dest.is_file() {
        std::fs::remove_file(dest).map_err(|e| StarterError::io(dest, e))?;
    }

    if std::fs::rename(source, dest).is_ok() {
        return Ok(());
    }

    // Rename fails across filesystems; fall back to copy + delete.
    std::fs::copy(source, dest).map_err(|e| StarterError::io(dest, e))?;
    std::fs::remove_file(source).map_err(|e| StarterError::io(source, e))?;
    Ok(())
}

pub(crate) fn overrides_dir(install_root: &Path) -> PathBuf {
    install_root.join("overrides")
}
