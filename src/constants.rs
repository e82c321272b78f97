//! Constants shared across the update pipeline.
//!
//! Defaults for configuration fields live here so the serde default functions,
//! the builder, and the tests all agree on one value.

use std::time::Duration;

/// Version-control metadata directory. Always part of the ignore list.
pub const VCS_METADATA_DIR: &str = ".git";

/// Branch updates are fetched from when none is configured.
pub const DEFAULT_BRANCH: &str = "main";

/// Scratch directory the repository is cloned into, relative to the app dir.
pub const DEFAULT_SCRATCH_PATH: &str = "./temp-update";

/// Manifest file name, locally and at the repository root.
pub const DEFAULT_MANIFEST_FILE: &str = "package.json";

/// Subdirectory of the app dir used as install destination in testing mode.
pub const TESTING_DESTINATION: &str = "testing";

/// Base of the raw-file endpoint used to read the remote manifest.
pub const DEFAULT_RAW_BASE_URL: &str = "https://raw.githubusercontent.com";

/// Command used to reinstall dependencies when no post-install command is set.
pub const DEFAULT_INSTALL_COMMAND: &str = "npm install";

/// Default timeout for the dependency install command (10 minutes).
pub const DEFAULT_INSTALL_TIMEOUT_SECS: u64 = 600;

/// Timeout for Git clone operations (5 minutes).
pub const GIT_CLONE_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for the remote manifest HTTP request (30 seconds).
pub const MANIFEST_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Directory under the system temp dir that holds scratch lock files.
pub const LOCKS_DIR_NAME: &str = "git-autoupdate-locks";
