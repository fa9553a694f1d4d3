use std::path::Path;

use tracing::{debug, info};

use crate::core::error::{StarterError, StarterResult};

/// Directory that receives the previous install's pack-managed folders.
pub const BACKUP_DIR: &str = "OLD_FILES_TO_DELETE";

/// Folders owned by the pack, replaced on every fresh install.
const PACK_MANAGED_DIRS: [&str; 3] = ["mods", "config", "kubejs"];

/// Move the pack-managed folders of a previous install into
/// [`BACKUP_DIR`], clearing any older backup first.
///
/// Folders that do not exist are skipped.
pub fn backup_old_files(install_root: &Path) -> StarterResult<()> {
    info!("Backup old files");
    let backup_root = install_root.join(BACKUP_DIR);

    if backup_root.exists() {
        std::fs::remove_dir_all(&backup_root).map_err(|e| StarterError::io(&backup_root, e))?;
    }
    std::fs::create_dir_all(&backup_root).map_err(|e| StarterError::io(&backup_root, e))?;

    for name in PACK_MANAGED_DIRS {
        let source = install_root.join(name);
        if !source.exists() {
            debug!("Nothing to back up at {:?}", source);
            continue;
        }

        let target = backup_root.join(name);
        std::fs::rename(&source, &target).map_err(|e| StarterError::io(&source, e))?;
        debug!("Moved {:?} -> {:?}", source, target);
    }

    Ok(())
}
