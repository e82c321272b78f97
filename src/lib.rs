//! git-autoupdate - self-update orchestrator for applications distributed
//! through a Git repository
//!
//! An application installed from a Git repository can use this crate to keep
//! itself current: it compares the `version` in its local manifest
//! (`package.json` by default) against the same file on the remote branch, and
//! when the remote is newer it clones the branch, installs the fetched tree over
//! its own directory and reinstalls dependencies if they changed.
//!
//! # Architecture Overview
//!
//! One update cycle runs through these phases:
//!
//! ```text
//! version check ─┬─ up to date ───────────────────────────────────────┐
//!                └─ download → purge → install → dependencies ────────┴─ end
//! ```
//!
//! Each phase is a separate module with a narrow interface, and the
//! [`updater::Updater`] sequences them and reports progress as
//! [`updater::UpdateEvent`]s.
//!
//! The network and process boundaries are traits, so the orchestration can be
//! exercised without either:
//! - [`remote::ManifestSource`] fetches the remote manifest
//!   ([`remote::RemoteManifestFetcher`] over HTTP)
//! - [`git::RepositoryFetcher`] clones the repository
//!   ([`git::GitFetcher`] through the system `git` command)
//! - [`deps::CommandRunner`] runs the dependency install command
//!   ([`deps::ProcessRunner`])
//!
//! # Core Modules
//!
//! - [`config`] - update configuration, TOML loading and validation
//! - [`manifest`] - manifest parsing and local manifest reading
//! - [`version`] - version and dependency comparison
//! - [`remote`] - remote manifest retrieval
//! - [`fetch`] - scratch directory preparation and clone URLs
//! - [`git`] - git CLI wrapper and repository URL parsing
//! - [`installer`] - purge of ignored paths and overlay onto the destination
//! - [`deps`] - dependency drift detection and reinstall
//! - [`lock`] - cross-process lock on the scratch directory
//! - [`updater`] - the orchestrator, its events and its state machine
//! - [`core`] - error types
//! - [`utils`] - filesystem and platform helpers
//!
//! # Configuration
//!
//! ```toml
//! repository = "https://github.com/acme/dashboard.git"
//! branch = "main"
//! scratch_path = "./temp-update"
//! ignore_paths = ["config/local.json", "data"]
//! dev_mode_auto_detect = true
//! post_install_command = "npm ci"
//! ```
//!
//! See [`config::UpdateConfig`] for every field and its default.
//!
//! # Example
//!
//! ```rust,no_run
//! use git_autoupdate::config::UpdateConfig;
//! use git_autoupdate::updater::Updater;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = UpdateConfig::load_from(Path::new("autoupdate.toml")).await?;
//! let updater = Updater::new(config)?;
//!
//! let outcome = updater.run_update().await?;
//! if outcome.is_updated() {
//!     println!("Update installed, restart to apply");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! Diagnostics go through `tracing`. Git invocations log under the `git`
//! target; everything else under the crate's module paths. The crate never
//! installs a subscriber itself.

pub mod config;
pub mod constants;
pub mod core;
pub mod deps;
pub mod fetch;
pub mod git;
pub mod installer;
pub mod lock;
pub mod manifest;
pub mod remote;
pub mod updater;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::UpdateConfig;
pub use core::UpdateError;
pub use updater::{UpdateEvent, UpdateOutcome, Updater};
