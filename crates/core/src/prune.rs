//! Obsolete-content pruning: replica entries without a source counterpart are removed

use std::path::Path;

use color_eyre::Result;
use color_eyre::eyre::WrapErr as _;
use tracing::{debug, info};

use crate::config::NameMatching;
use crate::entry::{Listing, remove_file_like};
use crate::mirror::SyncStats;

/// Delete everything under `target_dir` that has no same-named counterpart of
/// the same kind in `source_dir`, recursing into directories present on both
/// sides.
///
/// Both directories must exist. The first I/O error aborts the walk.
///
/// # Errors
/// Returns an error if a listing or a deletion fails
pub fn delete_obsolete(
    source_dir: &Path,
    target_dir: &Path,
    matching: NameMatching,
    stats: &mut SyncStats,
) -> Result<()> {
    debug!("Pruning {}", target_dir.display());

    let source = Listing::read(source_dir, matching)?;
    let target = Listing::read(target_dir, matching)?;

    for entry in target.files() {
        if target.is_shadowed(entry) || source.find_file(&entry.name).is_none() {
            remove_file_like(&entry.path)
                .wrap_err_with(|| format!("failed to delete file {}", entry.path.display()))?;
            info!("Deleted file: {}", entry.path.display());
            stats.files_deleted += 1;
        }
    }

    for entry in target.directories() {
        match source.find_directory(&entry.name) {
            Some(source_sub) if !target.is_shadowed(entry) => {
                delete_obsolete(&source_sub.path, &entry.path, matching, stats)?;
            }
            _ => {
                std::fs::remove_dir_all(&entry.path).wrap_err_with(|| {
                    format!("failed to delete directory {}", entry.path.display())
                })?;
                info!("Deleted directory: {}", entry.path.display());
                stats.directories_deleted += 1;
            }
        }
    }

    Ok(())
}
