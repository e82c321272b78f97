//! In-memory collaborators for driving an `Updater` without network or
//! processes.
//!
//! Each fake is cheaply cloneable and shares its state between clones, so a
//! test can keep a handle after moving one into the updater.

use anyhow::Result;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::UpdateError;
use crate::deps::CommandRunner;
use crate::git::{RepositoryFetcher, strip_auth_from_url};
use crate::manifest::{DependencyMap, Manifest};
use crate::remote::ManifestSource;

/// Manifest source returning a configured manifest or error.
///
/// Queued responses are served first, in order; after that every fetch returns
/// the default response.
#[derive(Clone)]
pub struct FakeManifestSource {
    state: Arc<Mutex<SourceState>>,
}

struct SourceState {
    default: std::result::Result<Manifest, UpdateError>,
    queued: VecDeque<std::result::Result<Manifest, UpdateError>>,
    calls: Vec<(String, String, Option<String>)>,
}

impl FakeManifestSource {
    pub fn new(manifest: Manifest) -> Self {
        Self::from_result(Ok(manifest))
    }

    /// A remote manifest with `version` and no dependencies.
    pub fn with_version(version: &str) -> Self {
        Self::new(Manifest {
            version: version.to_string(),
            dependencies: DependencyMap::new(),
        })
    }

    /// A source whose every fetch fails with `error`.
    pub fn failing(error: UpdateError) -> Self {
        Self::from_result(Err(error))
    }

    fn from_result(default: std::result::Result<Manifest, UpdateError>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SourceState {
                default,
                queued: VecDeque::new(),
                calls: Vec::new(),
            })),
        }
    }

    /// Serves `manifest` for the next fetch only.
    pub fn push(&self, manifest: Manifest) {
        self.state.lock().unwrap().queued.push_back(Ok(manifest));
    }

    /// Fails the next fetch only.
    pub fn push_error(&self, error: UpdateError) {
        self.state.lock().unwrap().queued.push_back(Err(error));
    }

    /// `(repo_url, branch, token)` of every fetch so far.
    pub fn calls(&self) -> Vec<(String, String, Option<String>)> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl ManifestSource for FakeManifestSource {
    async fn fetch(&self, repo_url: &str, branch: &str, token: Option<&str>) -> Result<Manifest> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((repo_url.to_string(), branch.to_string(), token.map(str::to_string)));
        let response = state.queued.pop_front().unwrap_or_else(|| state.default.clone());
        Ok(response?)
    }
}

/// Repository fetcher that writes a fixed file set instead of cloning.
///
/// A `.git/HEAD` file is always written alongside the configured files, the
/// way a real clone leaves version-control metadata behind.
#[derive(Clone, Default)]
pub struct FakeFetcher {
    files: Arc<Mutex<Vec<(String, String)>>>,
    failure: Option<String>,
    calls: Arc<Mutex<Vec<(String, String, PathBuf)>>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fetcher whose every clone fails with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Adds a file, relative to the repository root, to the fetched tree.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.files.lock().unwrap().push((path.to_string(), content.to_string()));
        self
    }

    /// `(url, branch, target)` of every clone so far.
    pub fn calls(&self) -> Vec<(String, String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

impl RepositoryFetcher for FakeFetcher {
    async fn clone_into(&self, url: &str, branch: &str, target: &Path) -> Result<()> {
        self.calls.lock().unwrap().push((url.to_string(), branch.to_string(), target.to_path_buf()));

        if let Some(ref reason) = self.failure {
            return Err(UpdateError::CloneFailed {
                url: strip_auth_from_url(url)?,
                reason: reason.clone(),
            }
            .into());
        }

        let files = self.files.lock().unwrap().clone();
        for (path, content) in files
            .iter()
            .map(|(p, c)| (p.as_str(), c.as_str()))
            .chain([(".git/HEAD", "ref: refs/heads/main\n")])
        {
            let path = target.join(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        Ok(())
    }
}

/// Command runner that records commands instead of running them.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    commands: Arc<Mutex<Vec<(String, PathBuf)>>>,
    timeouts: Arc<Mutex<Vec<Option<Duration>>>>,
    fail: bool,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner that records, then fails every command.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(command, dir)` of every run so far.
    pub fn commands(&self) -> Vec<(String, PathBuf)> {
        self.commands.lock().unwrap().clone()
    }

    pub fn timeouts(&self) -> Vec<Option<Duration>> {
        self.timeouts.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str, dir: &Path, timeout: Option<Duration>) -> Result<()> {
        self.commands.lock().unwrap().push((command.to_string(), dir.to_path_buf()));
        self.timeouts.lock().unwrap().push(timeout);

        if self.fail {
            return Err(UpdateError::InstallCommandFailed {
                command: command.to_string(),
                reason: "exit code 1".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
