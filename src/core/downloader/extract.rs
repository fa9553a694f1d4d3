use std::path::Path;

use tracing::{debug, info};

use crate::core::error::{StarterError, StarterResult};

/// Expand `zip_path` into `dest_dir`, keeping the archive layout.
///
/// Entries whose names would escape `dest_dir` are skipped.
pub fn extract_zip(zip_path: &Path, dest_dir: &Path) -> StarterResult<()> {
    let zip_file = std::fs::File::open(zip_path).map_err(|e| StarterError::io(zip_path, e))?;
    let mut archive = zip::ZipArchive::new(zip_file)?;

    std::fs::create_dir_all(dest_dir).map_err(|e| StarterError::io(dest_dir, e))?;

    info!("Unpacking {:?} to {:?}", zip_path, dest_dir);

    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;

        let Some(rel_path) = zipped.enclosed_name() else {
            debug!("Skipping unsafe zip entry {}", zipped.name());
            continue;
        };
        let out_path = dest_dir.join(rel_path);

        if zipped.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| StarterError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StarterError::io(parent, e))?;
        }

        let mut out = std::fs::File::create(&out_path).map_err(|e| StarterError::io(&out_path, e))?;
        std::io::copy(&mut zipped, &mut out).map_err(|e| StarterError::io(&out_path, e))?;
    }

    Ok(())
}
