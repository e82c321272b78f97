//! File system utilities for the install pipeline
//!
//! Thin wrappers over `std::fs` and `walkdir` that report failures as
//! [`crate::core::UpdateError::FileSystemError`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use git_autoupdate::utils::fs::{empty_dir, overlay_dir, remove_dir_all};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! empty_dir(Path::new("temp-update"))?;
//! overlay_dir(Path::new("temp-update"), Path::new("testing"))?;
//! remove_dir_all(Path::new("temp-update"))?;
//! # Ok(())
//! # }
//! ```

pub mod dirs;
pub mod paths;

pub use dirs::{empty_dir, ensure_dir, fs_error, overlay_dir, remove_dir_all, remove_path};
pub use paths::{is_safe_path, normalize_path, resolve_against};
