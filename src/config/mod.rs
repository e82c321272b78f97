//! Update configuration
//!
//! [`UpdateConfig`] is built once by the host application and handed to
//! [`crate::updater::Updater`], which treats it as read-only from then on. It can
//! be assembled in code with the `with_*` setters or loaded from a TOML file:
//!
//! ```toml
//! repository = "https://github.com/acme/dashboard.git"
//! branch = "stable"
//! scratch_path = "./temp-update"
//! ignore_paths = ["config/local.json", "data"]
//! dev_mode_auto_detect = true
//! post_install_command = "npm ci --omit=dev"
//! install_timeout_secs = 900
//! ```
//!
//! Every field except `repository` has a default. The version-control metadata
//! directory (`.git`) is always part of `ignore_paths`, whether or not the file or
//! the caller lists it.
//!
//! # Relative paths
//!
//! `scratch_path` is resolved against `app_dir` when relative. `app_dir` itself
//! is used as given, so a relative `app_dir` follows the process working
//! directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{
    DEFAULT_BRANCH, DEFAULT_INSTALL_COMMAND, DEFAULT_INSTALL_TIMEOUT_SECS, DEFAULT_MANIFEST_FILE,
    DEFAULT_RAW_BASE_URL, DEFAULT_SCRATCH_PATH, TESTING_DESTINATION, VCS_METADATA_DIR,
};
use crate::core::UpdateError;
use crate::utils::fs::{normalize_path, resolve_against};

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_scratch_path() -> PathBuf {
    PathBuf::from(DEFAULT_SCRATCH_PATH)
}

fn default_ignore_paths() -> Vec<String> {
    vec![VCS_METADATA_DIR.to_string()]
}

fn default_app_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_manifest_file() -> String {
    DEFAULT_MANIFEST_FILE.to_string()
}

fn default_raw_base_url() -> String {
    DEFAULT_RAW_BASE_URL.to_string()
}

const fn default_install_timeout_secs() -> u64 {
    DEFAULT_INSTALL_TIMEOUT_SECS
}

/// Configuration for one [`crate::updater::Updater`].
///
/// # Examples
///
/// ```rust,no_run
/// use git_autoupdate::config::UpdateConfig;
///
/// let config = UpdateConfig::new("https://github.com/acme/dashboard.git")
///     .with_branch("stable")
///     .with_ignore_paths(["config/local.json"])
///     .with_dev_mode_auto_detect(true);
///
/// assert_eq!(config.ignore_paths, vec!["config/local.json", ".git"]);
/// ```
#[derive(Clone, Deserialize)]
pub struct UpdateConfig {
    /// Repository URL to clone and to derive the raw manifest URL from.
    pub repository: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    /// Scratch directory for the clone. Cleared before every download.
    #[serde(default = "default_scratch_path")]
    pub scratch_path: PathBuf,

    /// Paths, relative to the repository root, removed from the fetched tree
    /// before it is installed. Always contains `.git`.
    #[serde(default = "default_ignore_paths")]
    pub ignore_paths: Vec<String>,

    /// Install into `<app_dir>/testing` and skip the dependency step.
    #[serde(default)]
    pub testing: bool,

    /// Disable updates entirely.
    #[serde(default)]
    pub dev_mode: bool,

    /// Treat the application as being in development whenever `<app_dir>/.git`
    /// exists.
    #[serde(default)]
    pub dev_mode_auto_detect: bool,

    /// Token for private repositories. Used for the clone and the manifest
    /// request; never logged.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Command run instead of `npm install` when dependencies drifted.
    #[serde(default)]
    pub post_install_command: Option<String>,

    #[serde(default = "default_app_dir")]
    pub app_dir: PathBuf,

    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,

    #[serde(default = "default_raw_base_url")]
    pub raw_base_url: String,

    /// Dependency install timeout in seconds. `0` waits indefinitely.
    #[serde(default = "default_install_timeout_secs")]
    pub install_timeout_secs: u64,
}

impl UpdateConfig {
    /// Creates a configuration for `repository` with every other field defaulted.
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            branch: default_branch(),
            scratch_path: default_scratch_path(),
            ignore_paths: default_ignore_paths(),
            testing: false,
            dev_mode: false,
            dev_mode_auto_detect: false,
            access_token: None,
            post_install_command: None,
            app_dir: default_app_dir(),
            manifest_file: default_manifest_file(),
            raw_base_url: default_raw_base_url(),
            install_timeout_secs: default_install_timeout_secs(),
        }
    }

    /// Loads a configuration from a TOML file.
    ///
    /// The result is normalized and validated before it is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, and
    /// [`UpdateError::ConfigError`] if it is not valid TOML, lacks
    /// `repository`, or fails [`validate`](Self::validate).
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read update config from {}", path.display()))?;

        let config: Self = toml::from_str(&content).map_err(|e| UpdateError::ConfigError {
            message: format!("{}: {e}", path.display()),
        })?;

        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Re-establishes the ignore-list invariant: `.git` present exactly once,
    /// no duplicate or empty entries.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let mut seen = Vec::with_capacity(self.ignore_paths.len() + 1);
        for entry in self.ignore_paths.drain(..) {
            let entry = entry.trim().trim_end_matches('/').to_string();
            if !entry.is_empty() && !seen.contains(&entry) {
                seen.push(entry);
            }
        }
        if !seen.iter().any(|entry| entry == VCS_METADATA_DIR) {
            seen.push(VCS_METADATA_DIR.to_string());
        }
        self.ignore_paths = seen;
        self
    }

    /// Checks the fields that have no usable default.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ConfigError`] when `repository`, `branch` or
    /// `manifest_file` is empty, `post_install_command` is blank, or the scratch
    /// directory would contain the application directory.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("repository", self.repository.as_str()),
            ("branch", self.branch.as_str()),
            ("manifest_file", self.manifest_file.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(UpdateError::ConfigError {
                    message: format!("'{field}' must not be empty"),
                }
                .into());
            }
        }

        if self.post_install_command.as_deref().is_some_and(|cmd| cmd.trim().is_empty()) {
            return Err(UpdateError::ConfigError {
                message: "'post_install_command' must not be blank when set".to_string(),
            }
            .into());
        }

        // The scratch directory is emptied before every download and removed after
        // install, so it must not contain the tree being updated.
        let scratch = absolute_normalized(&self.scratch_dir());
        let destination = absolute_normalized(&self.destination_dir());
        let app_dir = absolute_normalized(&self.app_dir);
        if app_dir.starts_with(&scratch) || destination.starts_with(&scratch) {
            return Err(UpdateError::ConfigError {
                message: format!(
                    "scratch path '{}' must not contain the application directory",
                    self.scratch_path.display()
                ),
            }
            .into());
        }

        Ok(())
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_scratch_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_path = path.into();
        self
    }

    /// Replaces the ignore list. `.git` is appended when missing.
    pub fn with_ignore_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_paths = paths.into_iter().map(Into::into).collect();
        self.normalized()
    }

    pub fn with_testing(mut self, testing: bool) -> Self {
        self.testing = testing;
        self
    }

    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub fn with_dev_mode_auto_detect(mut self, enabled: bool) -> Self {
        self.dev_mode_auto_detect = enabled;
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_post_install_command(mut self, command: impl Into<String>) -> Self {
        self.post_install_command = Some(command.into());
        self
    }

    pub fn with_app_dir(mut self, app_dir: impl Into<PathBuf>) -> Self {
        self.app_dir = app_dir.into();
        self
    }

    pub fn with_manifest_file(mut self, manifest_file: impl Into<String>) -> Self {
        self.manifest_file = manifest_file.into();
        self
    }

    pub fn with_raw_base_url(mut self, url: impl Into<String>) -> Self {
        self.raw_base_url = url.into();
        self
    }

    pub fn with_install_timeout_secs(mut self, secs: u64) -> Self {
        self.install_timeout_secs = secs;
        self
    }

    /// Whether updates are disabled, explicitly or by auto-detection.
    #[must_use]
    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
            || (self.dev_mode_auto_detect && self.app_dir.join(VCS_METADATA_DIR).exists())
    }

    /// Scratch directory, resolved against `app_dir`.
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        resolve_against(&self.app_dir, &self.scratch_path)
    }

    /// Directory the fetched tree is installed into.
    #[must_use]
    pub fn destination_dir(&self) -> PathBuf {
        if self.testing {
            self.app_dir.join(TESTING_DESTINATION)
        } else {
            self.app_dir.clone()
        }
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.app_dir.join(&self.manifest_file)
    }

    /// Command line run when dependencies drifted.
    #[must_use]
    pub fn install_command(&self) -> &str {
        self.post_install_command.as_deref().unwrap_or(DEFAULT_INSTALL_COMMAND)
    }

    /// Install timeout, or `None` to wait indefinitely.
    #[must_use]
    pub const fn install_timeout(&self) -> Option<Duration> {
        match self.install_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn absolute_normalized(path: &Path) -> PathBuf {
    normalize_path(&std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()))
}

impl fmt::Debug for UpdateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateConfig")
            .field("repository", &self.repository)
            .field("branch", &self.branch)
            .field("scratch_path", &self.scratch_path)
            .field("ignore_paths", &self.ignore_paths)
            .field("testing", &self.testing)
            .field("dev_mode", &self.dev_mode)
            .field("dev_mode_auto_detect", &self.dev_mode_auto_detect)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("post_install_command", &self.post_install_command)
            .field("app_dir", &self.app_dir)
            .field("manifest_file", &self.manifest_file)
            .field("raw_base_url", &self.raw_base_url)
            .field("install_timeout_secs", &self.install_timeout_secs)
            .finish()
    }
}
