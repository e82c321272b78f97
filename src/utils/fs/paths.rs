//! Path utilities for normalization and traversal checks.

use std::path::{Path, PathBuf};

/// Normalizes a path by resolving `.` and `..` components.
///
/// This is purely lexical: it does not touch the filesystem, resolve symbolic
/// links, or check that the path exists.
///
/// # Examples
///
/// ```rust,no_run
/// use git_autoupdate::utils::fs::normalize_path;
/// use std::path::{Path, PathBuf};
///
/// let path = Path::new("/foo/./bar/../baz");
/// assert_eq!(normalize_path(path), PathBuf::from("/foo/baz"));
/// ```
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                components.pop();
            }
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Checks that `path`, resolved against `base`, stays inside `base`.
///
/// Absolute paths are only safe when they already point inside `base`.
/// Used to keep ignore-list entries from reaching outside the scratch tree.
#[must_use]
pub fn is_safe_path(base: &Path, path: &Path) -> bool {
    let normalized_base = normalize_path(base);
    let normalized_path = if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    };

    normalized_path.starts_with(normalized_base)
}

/// Resolves `path` against `base` unless it is already absolute.
#[must_use]
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
