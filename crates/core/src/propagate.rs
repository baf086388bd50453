//! New/changed-content propagation: source entries are copied, linked or
//! created in the replica

use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::{WrapErr as _, eyre};
use tracing::{debug, info, warn};

use crate::config::NameMatching;
use crate::entry::{Entry, EntryKind, Listing, remove_file_like};
use crate::hash::files_are_equal;
use crate::mirror::SyncStats;

/// Bring `target_dir` up to date with `source_dir`: copy new or changed files,
/// replicate symbolic links, create missing directories and recurse into
/// every source subdirectory.
///
/// Both directories must exist. The first I/O error aborts the walk.
///
/// # Errors
/// Returns an error if a listing, hash, copy, link or directory creation fails
pub fn copy_new(
    source_dir: &Path,
    target_dir: &Path,
    matching: NameMatching,
    stats: &mut SyncStats,
) -> Result<()> {
    debug!("Propagating {}", source_dir.display());

    let source = Listing::read(source_dir, matching)?;
    let target = Listing::read(target_dir, matching)?;

    for entry in source.entries().filter(|e| source.is_shadowed(e)) {
        warn!(
            "Skipped {} because its name collides with another entry.",
            entry.path.display()
        );
        stats.skipped += 1;
    }

    for entry in source.files().filter(|e| !source.is_shadowed(e)) {
        let existing = target.find_file(&entry.name);
        // Write to the replica's own spelling of the name when one matches.
        let target_path = existing.map_or_else(|| target_dir.join(&entry.name), |e| e.path.clone());

        match entry.kind {
            EntryKind::File => sync_file(entry, existing, &target_path, stats)?,
            EntryKind::Symlink => sync_symlink(entry, existing, &target_path, stats)?,
            EntryKind::Other => {
                warn!(
                    "Skipped {} because it is not a regular file, directory or symbolic link.",
                    entry.path.display()
                );
                stats.skipped += 1;
            }
            EntryKind::Directory => {}
        }
    }

    for entry in source.directories().filter(|e| !source.is_shadowed(e)) {
        let target_sub = match target.find_directory(&entry.name) {
            Some(existing) => existing.path.clone(),
            None => {
                let path = target_dir.join(&entry.name);
                std::fs::create_dir(&path)
                    .wrap_err_with(|| format!("failed to create directory {}", path.display()))?;
                info!("Created directory: {}", path.display());
                stats.directories_created += 1;
                path
            }
        };

        copy_new(&entry.path, &target_sub, matching, stats)?;
    }

    Ok(())
}

fn sync_file(
    entry: &Entry,
    existing: Option<&Entry>,
    target_path: &Path,
    stats: &mut SyncStats,
) -> Result<()> {
    if let Some(existing) = existing {
        if existing.kind == EntryKind::File && files_are_equal(&entry.path, &existing.path)? {
            stats.unchanged += 1;
            return Ok(());
        }
    }

    copy_file(&entry.path, target_path)?;
    info!(
        "Copied file: {} to {}",
        entry.path.display(),
        target_path.display()
    );
    stats.files_copied += 1;
    Ok(())
}

/// Copy a file through a temporary sibling that is renamed over the
/// destination, so readers never observe a half-written file and an existing
/// link at the destination is replaced rather than written through.
fn copy_file(source: &Path, target: &Path) -> Result<()> {
    let parent = target
        .parent()
        .ok_or_else(|| eyre!("{} has no parent directory", target.display()))?;

    let mut reader = std::fs::File::open(source)
        .wrap_err_with(|| format!("failed to open {}", source.display()))?;
    let permissions = reader
        .metadata()
        .wrap_err_with(|| format!("failed to stat {}", source.display()))?
        .permissions();

    let mut temp = tempfile::Builder::new()
        .prefix(".treemirror-")
        .tempfile_in(parent)
        .wrap_err_with(|| format!("failed to create temporary file in {}", parent.display()))?;
    std::io::copy(&mut reader, temp.as_file_mut())
        .wrap_err_with(|| format!("failed to copy {}", source.display()))?;
    temp.as_file()
        .set_permissions(permissions)
        .wrap_err_with(|| format!("failed to set permissions on {}", target.display()))?;

    temp.persist(target)
        .map_err(|e| e.error)
        .wrap_err_with(|| format!("failed to replace {}", target.display()))?;
    Ok(())
}

fn sync_symlink(
    entry: &Entry,
    existing: Option<&Entry>,
    target_path: &Path,
    stats: &mut SyncStats,
) -> Result<()> {
    let link_target = std::fs::read_link(&entry.path)
        .wrap_err_with(|| format!("failed to read link {}", entry.path.display()))?;

    if link_target.as_os_str().is_empty() {
        warn!(
            "Could not create symbolic link because {} doesn't have a link target path.",
            entry.path.display()
        );
        return skip_link(existing, stats);
    }

    let resolved = resolve_link_target(&entry.path, &link_target);
    if !resolved.exists() {
        warn!(
            "Could not create symbolic link because the link target path {} does not exist.",
            link_target.display()
        );
        return skip_link(existing, stats);
    }

    if let Some(existing) = existing {
        if existing.kind == EntryKind::Symlink {
            let current = std::fs::read_link(&existing.path)
                .wrap_err_with(|| format!("failed to read link {}", existing.path.display()))?;
            if current == link_target {
                stats.unchanged += 1;
                return Ok(());
            }
        }

        remove_file_like(&existing.path)
            .wrap_err_with(|| format!("failed to delete {}", existing.path.display()))?;
    }

    create_symlink(&link_target, target_path, resolved.is_dir())
        .wrap_err_with(|| format!("failed to create symbolic link {}", target_path.display()))?;
    info!(
        "Created symbolic link at {} to {}",
        target_path.display(),
        link_target.display()
    );
    stats.links_created += 1;
    Ok(())
}

/// A link that cannot be replicated leaves nothing behind at its replica path.
fn skip_link(existing: Option<&Entry>, stats: &mut SyncStats) -> Result<()> {
    stats.skipped += 1;
    if let Some(existing) = existing {
        remove_file_like(&existing.path)
            .wrap_err_with(|| format!("failed to delete file {}", existing.path.display()))?;
        info!("Deleted file: {}", existing.path.display());
        stats.files_deleted += 1;
    }
    Ok(())
}

/// Relative link targets are interpreted against the directory holding the link.
fn resolve_link_target(link: &Path, link_target: &Path) -> PathBuf {
    match link.parent() {
        Some(parent) => parent.join(link_target),
        None => link_target.to_path_buf(),
    }
}

#[cfg(unix)]
fn create_symlink(link_target: &Path, at: &Path, _is_dir: bool) -> std::io::Result<()> {
    std::os::unix::fs::symlink(link_target, at)
}

#[cfg(windows)]
fn create_symlink(link_target: &Path, at: &Path, is_dir: bool) -> std::io::Result<()> {
    if is_dir {
        std::os::windows::fs::symlink_dir(link_target, at)
    } else {
        std::os::windows::fs::symlink_file(link_target, at)
    }
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_link_target: &Path, _at: &Path, _is_dir: bool) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ))
}
