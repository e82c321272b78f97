//! Cross-platform utilities
//!
//! - [`fs`] - directory operations for the purge/overlay/cleanup steps
//! - [`platform`] - executable lookup for git and the install command

pub mod fs;
pub mod platform;

pub use fs::{empty_dir, ensure_dir, normalize_path, overlay_dir, remove_dir_all};
pub use platform::{get_git_command, resolve_program};
