//! Tree installation: purge, overlay, discard.
//!
//! Once a fresh clone sits in the scratch directory, [`install`] turns it into
//! the new application tree in three steps:
//!
//! 1. **Purge** every ignore-list entry from the scratch tree. Directories are
//!    removed recursively, files and symlinks are unlinked, absent entries are
//!    skipped. Entries that are absolute, climb out of the scratch directory
//!    or pass through a symlinked directory are refused with a warning.
//! 2. **Overlay** the remaining scratch tree onto the destination, creating
//!    directories as needed and overwriting files that already exist. Files
//!    that exist only in the destination are kept.
//! 3. **Discard** the scratch directory.
//!
//! There is no rollback: a failure during the overlay leaves the destination
//! partially updated.
//!
//! Because ignored paths are purged before the overlay, the fetched copies of
//! them never reach the destination. Local files at those paths (configuration,
//! data, the `.git` directory) survive an update untouched.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::utils::fs::{
    fs_error, is_safe_path, normalize_path, overlay_dir, remove_dir_all, remove_path,
};

/// What an [`install`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Ignore-list entries that existed in the scratch tree and were removed.
    pub purged: Vec<String>,
    /// Files and symlinks installed into the destination.
    pub files_copied: usize,
}

/// Purges `ignore_list` from `scratch_dir`, overlays it onto `destination_dir`
/// and removes `scratch_dir`.
///
/// # Errors
///
/// Returns [`crate::core::UpdateError::FileSystemError`] if any purge, copy or
/// remove step fails.
pub async fn install(
    scratch_dir: &Path,
    destination_dir: &Path,
    ignore_list: &[String],
) -> Result<InstallReport> {
    let purged = purge_ignored(scratch_dir, ignore_list).await?;
    let files_copied = install_tree(scratch_dir, destination_dir).await?;

    Ok(InstallReport {
        purged,
        files_copied,
    })
}

/// Removes every ignore-list entry from the scratch tree.
///
/// Returns the entries that existed and were removed, in ignore-list order.
pub async fn purge_ignored(scratch_dir: &Path, ignore_list: &[String]) -> Result<Vec<String>> {
    let scratch_dir = scratch_dir.to_path_buf();
    let ignore_list = ignore_list.to_vec();

    tokio::task::spawn_blocking(move || purge_blocking(&scratch_dir, &ignore_list))
        .await
        .context("spawn_blocking panicked")?
}

/// Overlays the scratch tree onto `destination_dir`, then removes the scratch
/// directory. Returns the number of files copied.
pub async fn install_tree(scratch_dir: &Path, destination_dir: &Path) -> Result<usize> {
    let scratch_dir = scratch_dir.to_path_buf();
    let destination_dir = destination_dir.to_path_buf();

    tokio::task::spawn_blocking(move || install_tree_blocking(&scratch_dir, &destination_dir))
        .await
        .context("spawn_blocking panicked")?
}

fn ensure_scratch(scratch_dir: &Path) -> Result<()> {
    if scratch_dir.is_dir() {
        Ok(())
    } else {
        Err(fs_error("install from", scratch_dir, "scratch directory does not exist"))
    }
}

fn install_tree_blocking(scratch_dir: &Path, destination_dir: &Path) -> Result<usize> {
    ensure_scratch(scratch_dir)?;

    debug!("Overlaying {} onto {}", scratch_dir.display(), destination_dir.display());
    let files_copied = overlay_dir(scratch_dir, destination_dir)?;
    remove_dir_all(scratch_dir)?;

    info!("Installed {} files into {}", files_copied, destination_dir.display());
    Ok(files_copied)
}

fn purge_blocking(scratch_dir: &Path, ignore_list: &[String]) -> Result<Vec<String>> {
    ensure_scratch(scratch_dir)?;

    let root = normalize_path(scratch_dir);
    let mut purged = Vec::new();

    for entry in ignore_list {
        let Some(target) = resolve_entry(scratch_dir, &root, entry) else {
            warn!("Skipping ignore entry outside the fetched tree: {}", entry);
            continue;
        };

        if remove_path(&target)? {
            debug!("Purged {}", entry);
            purged.push(entry.clone());
        }
    }

    Ok(purged)
}

/// Resolves an ignore entry to a path strictly inside the scratch tree.
///
/// The check is lexical first, then every ancestor between the scratch root
/// and the entry must be a real directory: a link there would make the removal
/// land outside the tree.
fn resolve_entry(scratch_dir: &Path, root: &Path, entry: &str) -> Option<PathBuf> {
    let relative = Path::new(entry);
    if relative.is_absolute() || relative.has_root() || !is_safe_path(scratch_dir, relative) {
        return None;
    }

    let target = normalize_path(&scratch_dir.join(relative));
    if target == root {
        return None;
    }

    let inside = target.strip_prefix(root).ok()?;
    let mut ancestor = root.to_path_buf();
    for component in inside.parent().into_iter().flat_map(Path::components) {
        ancestor.push(component);
        match std::fs::symlink_metadata(&ancestor) {
            Ok(metadata) if metadata.file_type().is_symlink() => return None,
            Ok(_) => {}
            // Nothing below a missing ancestor can exist
            Err(_) => break,
        }
    }

    Some(target)
}
