//! Dependency reinstall after an update.
//!
//! After the new tree is installed, the dependency maps of the previous local
//! manifest and the remote manifest are compared. When the remote side added or
//! upgraded a dependency, the install command (`post_install_command`, or
//! `npm install` by default) runs in the application directory and the update
//! waits for it.
//!
//! The command line is split on whitespace and executed directly, without a
//! shell. The program is resolved on `PATH` unless it contains a path
//! separator.

use anyhow::Result;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::core::UpdateError;
use crate::manifest::DependencyMap;
use crate::utils::platform::resolve_program;
use crate::version::{ModulesComparison, compare_modules};

/// Runs an external command to completion.
pub trait CommandRunner: Send + Sync {
    /// Runs `command` in `dir`, waiting at most `timeout` (None waits indefinitely).
    ///
    /// Every failure, including a missing executable and a timeout, must be
    /// reported as [`UpdateError::InstallCommandFailed`].
    fn run(
        &self,
        command: &str,
        dir: &Path,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// [`CommandRunner`] that spawns a child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &str, dir: &Path, limit: Option<Duration>) -> Result<()> {
        let failed = |reason: String| UpdateError::InstallCommandFailed {
            command: command.to_string(),
            reason,
        };

        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| failed("empty command".to_string()))?;
        let executable = resolve_program(program)
            .ok_or_else(|| failed(format!("executable '{program}' not found on PATH")))?;

        debug!("Running `{}` in {}", command, dir.display());
        let mut cmd = Command::new(&executable);
        cmd.args(parts)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output_future = cmd.output();
        let output = match limit {
            Some(duration) => timeout(duration, output_future)
                .await
                .map_err(|_| failed(format!("timed out after {} seconds", duration.as_secs())))?,
            None => output_future.await,
        }
        .map_err(|e| failed(format!("failed to spawn {}: {e}", executable.display())))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("{}", stdout.trim());
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let status = output
                .status
                .code()
                .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"));
            return Err(failed(if stderr.trim().is_empty() {
                status
            } else {
                format!("{status}: {}", stderr.trim())
            })
            .into());
        }

        Ok(())
    }
}

/// Reinstalls dependencies when they drifted.
#[derive(Debug, Clone)]
pub struct DependencyInstaller<C = ProcessRunner> {
    runner: C,
    command: String,
    app_dir: PathBuf,
    timeout: Option<Duration>,
}

impl<C: CommandRunner> DependencyInstaller<C> {
    /// Creates an installer that runs commands through `runner`.
    pub fn with_runner(runner: C, command: impl Into<String>, app_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            command: command.into(),
            app_dir: app_dir.into(),
            timeout: None,
        }
    }

    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub const fn runner(&self) -> &C {
        &self.runner
    }

    /// Compares `local` against `remote` and runs the install command on drift.
    ///
    /// Returns `None` without comparing anything when `testing` is set.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InstallCommandFailed`] if the command fails.
    pub async fn maybe_reinstall(
        &self,
        local: &DependencyMap,
        remote: &DependencyMap,
        testing: bool,
    ) -> Result<Option<ModulesComparison>> {
        if testing {
            debug!("Testing mode: skipping dependency check");
            return Ok(None);
        }

        let comparison = compare_modules(local, remote);
        if comparison.up_to_date {
            debug!("Dependencies up to date");
            return Ok(Some(comparison));
        }

        info!("Dependencies changed, running `{}`", self.command);
        self.runner.run(&self.command, &self.app_dir, self.timeout).await?;
        Ok(Some(comparison))
    }
}
