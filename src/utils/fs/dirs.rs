//! Directory operations used by the fetch and install phases.
//!
//! Every failure is reported as [`UpdateError::FileSystemError`] so the update
//! cycle surfaces a single error kind for purge, copy and remove problems.

use anyhow::Result;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::core::UpdateError;

/// Build a [`UpdateError::FileSystemError`] for `operation` on `path`.
pub fn fs_error(operation: &str, path: &Path, source: impl std::fmt::Display) -> anyhow::Error {
    UpdateError::FileSystemError {
        operation: operation.to_string(),
        path: path.display().to_string(),
        reason: source.to_string(),
    }
    .into()
}

/// Ensures a directory exists, creating it and all parent directories if necessary.
///
/// # Returns
///
/// - `Ok(())` if the directory exists or was successfully created
/// - `Err` if the path exists but is not a directory, or creation fails
///
/// # Examples
///
/// ```rust,no_run
/// use git_autoupdate::utils::fs::ensure_dir;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// ensure_dir(Path::new("testing/nested"))?;
/// # Ok(())
/// # }
/// ```
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| fs_error("create directory", path, e))?;
    } else if !path.is_dir() {
        return Err(fs_error("create directory", path, "path exists but is not a directory"));
    }
    Ok(())
}

/// Ensures `path` is an existing, empty directory.
///
/// Creates the directory when missing. When it exists, every entry inside it is
/// removed recursively while the directory itself is kept.
pub fn empty_dir(path: &Path) -> Result<()> {
    ensure_dir(path)?;

    for entry in fs::read_dir(path).map_err(|e| fs_error("read directory", path, e))? {
        let entry = entry.map_err(|e| fs_error("read directory", path, e))?;
        remove_path(&entry.path())?;
    }

    Ok(())
}

/// Removes whatever is at `path`.
///
/// Directories are removed recursively; files and symlinks are unlinked (a
/// symlink to a directory is never followed). A missing path is not an error.
///
/// # Returns
///
/// `true` if something was removed, `false` if nothing existed at `path`.
pub fn remove_path(path: &Path) -> Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(fs_error("inspect", path, e)),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(|e| fs_error("remove directory", path, e))?;
    } else {
        fs::remove_file(path).map_err(|e| fs_error("remove file", path, e))?;
    }
    Ok(true)
}

/// Recursively removes a directory and all its contents.
///
/// Safe to call on a path that doesn't exist.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| fs_error("remove directory", path, e))?;
    }
    Ok(())
}

/// Copies the tree under `src` onto `dst`, overwriting files that already exist.
///
/// Files in `dst` that have no counterpart in `src` are left untouched, so this
/// is an overlay rather than a mirror. Directory structure is recreated as
/// needed. Symlinks are recreated with their original target and never
/// followed; anything already at a link's path is replaced, and a file never
/// overwrites through a link in `dst`. Special files (sockets, FIFOs) are
/// skipped.
///
/// # Returns
///
/// The number of regular files and symlinks installed.
///
/// # Examples
///
/// ```rust,no_run
/// use git_autoupdate::utils::fs::overlay_dir;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// let copied = overlay_dir(Path::new("temp-update"), Path::new("."))?;
/// println!("{copied} files updated");
/// # Ok(())
/// # }
/// ```
pub fn overlay_dir(src: &Path, dst: &Path) -> Result<usize> {
    ensure_dir(dst)?;
    let mut copied = 0;

    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| fs_error("walk directory", src, e))?;
        let relative =
            entry.path().strip_prefix(src).map_err(|e| fs_error("walk directory", entry.path(), e))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            // A local link to a directory is kept and filled through
            ensure_dir(&target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())
                .map_err(|e| fs_error("read symlink", entry.path(), e))?;
            remove_path(&target)?;
            create_symlink(&link, entry.path(), &target)?;
            copied += 1;
        } else if file_type.is_file() {
            // A directory or link in the way of a file is replaced, like any other conflict.
            if target.is_dir() || is_symlink(&target) {
                remove_path(&target)?;
            }
            fs::copy(entry.path(), &target).map_err(|e| fs_error("copy file", &target, e))?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

#[cfg(unix)]
fn create_symlink(link: &Path, _original: &Path, target: &Path) -> Result<()> {
    std::os::unix::fs::symlink(link, target).map_err(|e| fs_error("create symlink", target, e))
}

#[cfg(windows)]
fn create_symlink(link: &Path, original: &Path, target: &Path) -> Result<()> {
    // Windows distinguishes file and directory links; follow the source link to tell which
    let result = if original.is_dir() {
        std::os::windows::fs::symlink_dir(link, target)
    } else {
        std::os::windows::fs::symlink_file(link, target)
    };
    result.map_err(|e| fs_error("create symlink", target, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dir() {
        let temp = tempdir().unwrap();
        let test_dir = temp.path().join("a").join("b");

        assert!(!test_dir.exists());
        ensure_dir(&test_dir).unwrap();
        assert!(test_dir.is_dir());

        // Second call is a no-op
        ensure_dir(&test_dir).unwrap();
    }

    #[test]
    fn test_ensure_dir_on_file() {
        let temp = tempdir().unwrap();
        let file_path = temp.path().join("file.txt");
        std::fs::write(&file_path, "content").unwrap();

        let err = ensure_dir(&file_path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UpdateError>(),
            Some(UpdateError::FileSystemError { .. })
        ));
    }

    #[test]
    fn test_empty_dir_clears_contents_but_keeps_dir() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("scratch");
        std::fs::create_dir_all(dir.join("nested/deep")).unwrap();
        std::fs::write(dir.join("stale.txt"), "old").unwrap();
        std::fs::write(dir.join("nested/deep/file"), "old").unwrap();

        empty_dir(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_dir_creates_missing() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("missing");

        empty_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_remove_path_variants() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("file");
        let dir = temp.path().join("dir");
        std::fs::write(&file, "x").unwrap();
        std::fs::create_dir_all(dir.join("child")).unwrap();

        assert!(remove_path(&file).unwrap());
        assert!(remove_path(&dir).unwrap());
        assert!(!remove_path(&temp.path().join("absent")).unwrap());
        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_path_does_not_follow_symlink() {
        let temp = tempdir().unwrap();
        let real = temp.path().join("real");
        std::fs::create_dir(&real).unwrap();
        std::fs::write(real.join("keep"), "x").unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert!(remove_path(&link).unwrap());
        assert!(real.join("keep").exists());
    }

    #[test]
    fn test_overlay_dir_overwrites_and_preserves() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        std::fs::create_dir_all(src.join("lib")).unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        std::fs::write(src.join("index.js"), "new").unwrap();
        std::fs::write(src.join("lib/util.js"), "util").unwrap();
        std::fs::write(dst.join("index.js"), "old").unwrap();
        std::fs::write(dst.join("local.db"), "data").unwrap();

        let copied = overlay_dir(&src, &dst).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(std::fs::read_to_string(dst.join("index.js")).unwrap(), "new");
        assert_eq!(std::fs::read_to_string(dst.join("lib/util.js")).unwrap(), "util");
        assert_eq!(std::fs::read_to_string(dst.join("local.db")).unwrap(), "data");
    }

    #[cfg(unix)]
    #[test]
    fn test_overlay_dir_recreates_symlinks() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        std::fs::create_dir_all(src.join("docs")).unwrap();
        std::fs::write(src.join("docs/README.md"), "readme").unwrap();
        std::os::unix::fs::symlink("docs/README.md", src.join("README.md")).unwrap();
        std::os::unix::fs::symlink("docs", src.join("manual")).unwrap();
        // A stale file sits where the link goes
        std::fs::create_dir_all(&dst).unwrap();
        std::fs::write(dst.join("README.md"), "old").unwrap();

        let copied = overlay_dir(&src, &dst).unwrap();

        assert_eq!(copied, 3);
        assert_eq!(std::fs::read_link(dst.join("README.md")).unwrap(), Path::new("docs/README.md"));
        assert_eq!(std::fs::read_link(dst.join("manual")).unwrap(), Path::new("docs"));
        assert_eq!(std::fs::read_to_string(dst.join("README.md")).unwrap(), "readme");
    }

    #[cfg(unix)]
    #[test]
    fn test_overlay_dir_does_not_write_through_existing_link() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        let elsewhere = temp.path().join("elsewhere.txt");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        std::fs::write(src.join("index.js"), "new").unwrap();
        std::fs::write(&elsewhere, "untouched").unwrap();
        std::os::unix::fs::symlink(&elsewhere, dst.join("index.js")).unwrap();

        overlay_dir(&src, &dst).unwrap();

        assert_eq!(std::fs::read_to_string(&elsewhere).unwrap(), "untouched");
        assert!(!std::fs::symlink_metadata(dst.join("index.js")).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(dst.join("index.js")).unwrap(), "new");
    }

    #[test]
    fn test_overlay_dir_replaces_directory_with_file() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(dst.join("config")).unwrap();
        std::fs::write(src.join("config"), "now a file").unwrap();

        overlay_dir(&src, &dst).unwrap();
        assert!(dst.join("config").is_file());
    }
}
