//! Git command builder
//!
//! A fluent wrapper over `tokio::process::Command` for the system `git` binary
//! with timeout handling, `-C` directory selection and `target: "git"` logging.
//! Clone failures are reported as [`UpdateError::CloneFailed`] carrying the
//! credential-free URL.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::GIT_CLONE_TIMEOUT;
use crate::core::UpdateError;
use crate::git::strip_auth_from_url;
use crate::utils::platform::get_git_command;

/// Builder for a single invocation of the system `git` binary.
///
/// # Examples
///
/// ```rust,no_run
/// use git_autoupdate::git::command_builder::GitCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// GitCommand::clone("https://github.com/acme/app.git", "stable", "./temp-update")
///     .execute_success()
///     .await?;
///
/// let head = GitCommand::rev_parse("HEAD")
///     .current_dir("./temp-update")
///     .execute_stdout()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// New commands default to a 5 minute timeout, captured output and the
/// process working directory.
pub struct GitCommand {
    /// Arguments passed to git (e.g., ["clone", "url", "path"])
    args: Vec<String>,

    /// Directory passed through `-C`
    current_dir: Option<PathBuf>,

    /// Maximum duration to wait for completion (None = no timeout)
    timeout_duration: Option<Duration>,

    /// Optional context string for log messages
    context: Option<String>,

    /// For clone commands, the URL as given and its credential-free form
    clone_url: Option<(String, String)>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            timeout_duration: Some(GIT_CLONE_TIMEOUT),
            context: None,
            clone_url: None,
        }
    }
}

impl GitCommand {
    /// Runs the command in `dir` via `git -C <dir>`.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set a custom timeout for the command (None for no timeout)
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Set a context for log messages (e.g., the repository being updated)
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Arguments as they may appear in logs and errors.
    fn display_args(&self) -> String {
        let mut shown = Vec::with_capacity(self.args.len() + 2);
        if let Some(ref dir) = self.current_dir {
            shown.push("-C".to_string());
            shown.push(dir.display().to_string());
        }
        for arg in &self.args {
            match &self.clone_url {
                Some((url, safe)) if arg == url => shown.push(safe.clone()),
                _ => shown.push(arg.clone()),
            }
        }
        shown.join(" ")
    }

    fn operation(&self) -> String {
        self.args.first().cloned().unwrap_or_else(|| "unknown".to_string())
    }

    fn failure(&self, reason: String) -> anyhow::Error {
        match &self.clone_url {
            Some((_, safe)) => UpdateError::CloneFailed {
                url: safe.clone(),
                reason,
            }
            .into(),
            None => anyhow::anyhow!("git {} failed: {}", self.operation(), reason),
        }
    }

    /// Execute the command and return its output
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let start = std::time::Instant::now();
        let git_command = get_git_command();
        let shown = self.display_args();
        let mut cmd = Command::new(git_command);

        if let Some(ref dir) = self.current_dir {
            // -C keeps git independent of the process working directory
            cmd.arg("-C").arg(dir);
        }
        cmd.args(&self.args);

        match self.context {
            Some(ref ctx) => {
                tracing::debug!(target: "git", "({}) Executing command: {} {}", ctx, git_command, shown);
            }
            None => tracing::debug!(target: "git", "Executing command: {} {}", git_command, shown),
        }

        // Never wait on a credential prompt
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let output_future = cmd.output();
        let output = match self.timeout_duration {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        target: "git",
                        "Command timed out after {} seconds: git {}",
                        duration.as_secs(),
                        shown
                    );
                    return Err(self.failure(format!(
                        "git {} timed out after {} seconds",
                        self.operation(),
                        duration.as_secs()
                    )));
                }
            },
            None => output_future.await,
        };

        let output = match output {
            Ok(output) => output,
            Err(e) if self.clone_url.is_some() => {
                return Err(self.failure(format!("failed to run {git_command}: {e}")));
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("Failed to execute git {shown}")));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "git",
                "Command failed with exit code: {:?}",
                output.status.code()
            );
            let reason = if stderr.trim().is_empty() {
                format!("exit status {:?}: {}", output.status.code(), stdout.trim())
            } else {
                stderr.trim().to_string()
            };
            if !reason.is_empty() {
                tracing::debug!(target: "git", "Error: {}", reason);
            }
            return Err(self.failure(reason));
        }

        if !stderr.trim().is_empty() {
            tracing::trace!(target: "git", "{}", stderr.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(
                target: "git::perf",
                "Git {} took {:.2}s",
                self.operation(),
                elapsed.as_secs_f64()
            );
        }

        Ok(GitCommandOutput {
            stdout,
            stderr,
        })
    }

    /// Execute the command and return only stdout as a trimmed string
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Execute the command and check for success
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }
}

/// Output from a Git command
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl GitCommand {
    /// Shallow, single-branch clone of `branch` into `target`.
    ///
    /// The branch is passed straight to `git clone --branch`; a missing branch
    /// surfaces as a clone failure.
    pub fn clone(url: &str, branch: &str, target: impl AsRef<Path>) -> Self {
        let mut cmd = Self::default().args([
            "clone",
            "--depth",
            "1",
            "--single-branch",
            "--no-tags",
            "--branch",
            branch,
        ]);
        cmd.args.push(url.to_string());
        cmd.args.push(target.as_ref().display().to_string());

        let safe = strip_auth_from_url(url).unwrap_or_else(|_| "<repository>".to_string());
        cmd.clone_url = Some((url.to_string(), safe));
        cmd
    }

    /// Resolve a reference to a commit hash
    pub fn rev_parse(ref_name: &str) -> Self {
        Self::default().args(["rev-parse", ref_name])
    }
}
