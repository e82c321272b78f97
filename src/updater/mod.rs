//! Update orchestration
//!
//! [`Updater`] sequences one update cycle and reports its progress as
//! [`UpdateEvent`]s:
//!
//! 1. **Version check**: read the local manifest, fetch the remote one and
//!    compare versions. Emits `up-to-date(local)` or `out-of-date(local, remote)`.
//! 2. **Download**: clear the scratch directory and clone the configured branch
//!    into it. Emits `download-start(repo)` and `download-end(repo)`.
//! 3. **Install**: purge ignored paths from the clone, overlay it onto the
//!    application directory (or `<app_dir>/testing`) and remove the scratch
//!    directory. Emits `update-start()`.
//! 4. **Dependencies**: compare the dependency maps of the pre-update local
//!    manifest and the remote manifest and run the install command on drift.
//!    Emits `modules-start()` and `modules-end(modules)`. Skipped in testing mode.
//! 5. Emits `end()`.
//!
//! An up-to-date application stops after step 1. In development mode the cycle
//! stops before step 1 and only `end()` is emitted.
//!
//! # Failure
//!
//! The first failing step aborts the cycle and its error is returned; `end()` is
//! not emitted. Nothing is retried and the destination is not rolled back. The
//! scratch directory is removed on a best-effort basis.
//!
//! # Concurrency
//!
//! [`run_update`](Updater::run_update) and [`force_update`](Updater::force_update)
//! hold a [`ScratchLock`] for their whole duration, so cycles sharing a scratch
//! directory run one after another, also across processes. The finer-grained
//! operations do not lock.
//!
//! # Examples
//!
//! ```rust,no_run
//! use git_autoupdate::config::UpdateConfig;
//! use git_autoupdate::updater::{UpdateOutcome, Updater};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = UpdateConfig::new("https://github.com/acme/dashboard.git")
//!     .with_ignore_paths(["config/local.json"])
//!     .with_dev_mode_auto_detect(true);
//!
//! let updater = Updater::new(config)?;
//! let mut events = updater.subscribe();
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         println!("{event}");
//!     }
//! });
//!
//! if let UpdateOutcome::Updated { to, .. } = updater.run_update().await? {
//!     println!("Updated to {to}, restart to apply");
//! }
//! # Ok(())
//! # }
//! ```

mod events;


pub use events::{UpdateEvent, UpdateOutcome, UpdatePhase};

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::UpdateConfig;
use crate::deps::{CommandRunner, DependencyInstaller, ProcessRunner};
use crate::fetch::download;
use crate::git::{GitFetcher, RepositoryFetcher, strip_auth_from_url};
use crate::installer::{InstallReport, install_tree, purge_ignored};
use crate::lock::ScratchLock;
use crate::manifest::{DependencyMap, Manifest, ManifestReader};
use crate::remote::{ManifestSource, RemoteManifestFetcher};
use crate::utils::fs::remove_dir_all;
use crate::version::{self, ModulesComparison, VersionComparison};

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Update orchestrator for one application.
///
/// The collaborators are generic so tests can substitute them; the defaults
/// are the production implementations.
pub struct Updater<M = RemoteManifestFetcher, F = GitFetcher, C = ProcessRunner> {
    config: UpdateConfig,
    reader: ManifestReader,
    source: M,
    fetcher: F,
    deps: DependencyInstaller<C>,
    /// Repository URL safe for logs and events.
    display_repo: String,
    phase: Mutex<UpdatePhase>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<UpdateEvent>>>,
}

impl Updater {
    /// Creates an updater with the HTTP manifest source, the git CLI fetcher and
    /// the process runner.
    ///
    /// # Errors
    ///
    /// Returns [`crate::core::UpdateError::ConfigError`] if the configuration is
    /// invalid, and [`crate::core::UpdateError::NetworkError`] if the HTTP client
    /// cannot be built.
    pub fn new(config: UpdateConfig) -> Result<Self> {
        let source = RemoteManifestFetcher::new(&config.raw_base_url, &config.manifest_file)?;
        Self::with_parts(config, source, GitFetcher::new(), ProcessRunner)
    }
}

impl<M, F, C> Updater<M, F, C>
where
    M: ManifestSource,
    F: RepositoryFetcher,
    C: CommandRunner,
{
    /// Creates an updater from explicit collaborators.
    ///
    /// The configuration is normalized and validated.
    pub fn with_parts(config: UpdateConfig, source: M, fetcher: F, runner: C) -> Result<Self> {
        let config = config.normalized();
        config.validate()?;

        let reader = ManifestReader::new(&config.app_dir, &config.manifest_file);
        let deps = DependencyInstaller::with_runner(
            runner,
            config.install_command(),
            config.app_dir.clone(),
        )
        .with_timeout(config.install_timeout());
        let display_repo = strip_auth_from_url(&config.repository)?;

        Ok(Self {
            config,
            reader,
            source,
            fetcher,
            deps,
            display_repo,
            phase: Mutex::new(UpdatePhase::Idle),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Current phase of the state machine.
    #[must_use]
    pub fn phase(&self) -> UpdatePhase {
        *lock_ignoring_poison(&self.phase)
    }

    /// Registers a new event receiver.
    ///
    /// Every subscriber receives every event emitted after it subscribed.
    /// Dropping the receiver unsubscribes it.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UpdateEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock_ignoring_poison(&self.subscribers).push(tx);
        rx
    }

    #[must_use]
    pub const fn source(&self) -> &M {
        &self.source
    }

    #[must_use]
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    #[must_use]
    pub const fn runner(&self) -> &C {
        self.deps.runner()
    }

    fn set_phase(&self, phase: UpdatePhase) {
        debug!("Update phase: {:?}", phase);
        *lock_ignoring_poison(&self.phase) = phase;
    }

    fn emit(&self, event: UpdateEvent) {
        debug!("Event: {}", event);
        lock_ignoring_poison(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }

    async fn fetch_remote(&self) -> Result<Manifest> {
        self.source
            .fetch(&self.config.repository, &self.config.branch, self.config.access_token.as_deref())
            .await
    }

    /// Reads both manifests and compares their versions, emitting the result.
    async fn check_versions(&self) -> Result<(VersionComparison, Manifest)> {
        self.set_phase(UpdatePhase::CheckingVersion);

        let local = self.reader.read().await?;
        let remote = self.fetch_remote().await?;
        let comparison = version::compare_versions(&local.version, &remote.version)?;

        if comparison.up_to_date {
            info!("Application is up to date ({})", local.version);
            self.set_phase(UpdatePhase::UpToDate);
            self.emit(UpdateEvent::UpToDate {
                local: local.version.clone(),
            });
        } else {
            info!("Update available: {} -> {}", local.version, remote.version);
            self.emit(UpdateEvent::OutOfDate {
                local: local.version.clone(),
                remote: remote.version,
            });
        }

        Ok((comparison, local))
    }

    /// Compares the local version against the remote version.
    ///
    /// Emits `up-to-date(local)` or `out-of-date(local, remote)`. Both manifests
    /// are read afresh.
    pub async fn compare_versions(&self) -> Result<VersionComparison> {
        Ok(self.check_versions().await?.0)
    }

    /// Compares the local dependencies against the remote dependencies.
    ///
    /// Both manifests are read afresh. Emits nothing.
    pub async fn compare_modules(&self) -> Result<ModulesComparison> {
        let local = self.reader.read().await?;
        let remote = self.fetch_remote().await?;
        Ok(version::compare_modules(&local.dependencies, &remote.dependencies))
    }

    /// Clears the scratch directory and clones the configured branch into it.
    ///
    /// Emits `download-start(repo)` and, on success, `download-end(repo)`.
    pub async fn download_update(&self) -> Result<()> {
        self.set_phase(UpdatePhase::Downloading);
        self.emit(UpdateEvent::DownloadStart {
            repo: self.display_repo.clone(),
        });

        download(
            &self.fetcher,
            &self.config.repository,
            &self.config.branch,
            &self.config.scratch_dir(),
            self.config.access_token.as_deref(),
        )
        .await
        .with_context(|| format!("Failed to download update from {}", self.display_repo))?;

        self.emit(UpdateEvent::DownloadEnd {
            repo: self.display_repo.clone(),
        });
        Ok(())
    }

    /// Purges ignored paths from the scratch tree and installs it.
    ///
    /// Emits `update-start()`.
    pub async fn install_update(&self) -> Result<InstallReport> {
        let scratch_dir = self.config.scratch_dir();

        self.set_phase(UpdatePhase::Purging);
        self.emit(UpdateEvent::UpdateStart);
        let purged = purge_ignored(&scratch_dir, &self.config.ignore_paths).await?;

        self.set_phase(UpdatePhase::Installing);
        let files_copied = install_tree(&scratch_dir, &self.config.destination_dir()).await?;

        Ok(InstallReport {
            purged,
            files_copied,
        })
    }

    /// Downloads and installs the remote tree regardless of versions.
    ///
    /// Holds the scratch lock and removes the scratch directory on failure.
    pub async fn force_update(&self) -> Result<InstallReport> {
        let _lock = ScratchLock::acquire(&self.config.scratch_dir()).await?;
        self.cleanup_on_failure(self.download_and_install()).await
    }

    async fn download_and_install(&self) -> Result<InstallReport> {
        self.download_update().await?;
        self.install_update().await
    }

    /// Reinstalls dependencies if the remote manifest added or upgraded any,
    /// comparing against the current local manifest.
    ///
    /// Returns `None` in testing mode, where nothing is checked or emitted.
    pub async fn update_modules(&self) -> Result<Option<ModulesComparison>> {
        if self.config.testing {
            return Ok(None);
        }
        let local = self.reader.read().await?;
        self.update_modules_against(&local.dependencies).await
    }

    /// Dependency step against a given local dependency map.
    async fn update_modules_against(
        &self,
        local: &DependencyMap,
    ) -> Result<Option<ModulesComparison>> {
        if self.config.testing {
            debug!("Testing mode: skipping dependency update");
            return Ok(None);
        }

        self.set_phase(UpdatePhase::CheckingModules);
        self.emit(UpdateEvent::ModulesStart);

        let remote = self.fetch_remote().await?;
        if !version::compare_modules(local, &remote.dependencies).up_to_date {
            self.set_phase(UpdatePhase::InstallingModules);
        }
        let comparison = self.deps.maybe_reinstall(local, &remote.dependencies, false).await?;

        if let Some(ref comparison) = comparison {
            if comparison.up_to_date {
                self.set_phase(UpdatePhase::ModulesUpToDate);
            }
            self.emit(UpdateEvent::ModulesEnd {
                modules: comparison.modules.clone(),
            });
        }
        Ok(comparison)
    }

    /// Runs a full update cycle.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing phase; see [`crate::core::UpdateError`]
    /// for the kinds.
    pub async fn run_update(&self) -> Result<UpdateOutcome> {
        if self.config.is_dev_mode() {
            info!("Development mode active, skipping update");
            self.set_phase(UpdatePhase::Done);
            self.emit(UpdateEvent::End);
            return Ok(UpdateOutcome::DevMode);
        }

        let _lock = ScratchLock::acquire(&self.config.scratch_dir()).await?;

        let (comparison, local) = self.check_versions().await?;
        let outcome = if comparison.up_to_date {
            UpdateOutcome::UpToDate {
                local: comparison.local,
            }
        } else {
            let modules = self
                .cleanup_on_failure(async {
                    self.download_and_install().await?;
                    self.update_modules_against(&local.dependencies).await
                })
                .await?;

            UpdateOutcome::Updated {
                from: comparison.local,
                to: comparison.remote.unwrap_or_default(),
                modules_reinstalled: modules.is_some_and(|m| !m.up_to_date),
            }
        };

        self.set_phase(UpdatePhase::Done);
        self.emit(UpdateEvent::End);
        Ok(outcome)
    }

    /// Awaits `work`; on error, removes the scratch directory before returning.
    async fn cleanup_on_failure<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        let result = work.await;
        if result.is_err() {
            let scratch_dir = self.config.scratch_dir();
            let dir = scratch_dir.clone();
            match tokio::task::spawn_blocking(move || remove_dir_all(&dir)).await {
                Ok(Ok(())) => debug!("Removed scratch directory {}", scratch_dir.display()),
                Ok(Err(e)) => warn!("Failed to remove scratch directory: {e:#}"),
                Err(e) => warn!("Failed to remove scratch directory: {e}"),
            }
        }
        result
    }
}
