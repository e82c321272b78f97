//! Download phase: prepare the scratch directory and clone into it.

use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

use crate::git::{RepositoryFetcher, parse_repo_url, strip_auth_from_url};
use crate::utils::fs::empty_dir;

/// Builds the URL handed to the fetcher.
///
/// With a token, remote repositories are cloned over
/// `https://{owner}:{token}@{host}/{path}`. Local repositories have no
/// host to authenticate against and keep their URL, as does every URL when no
/// token is configured.
///
/// # Errors
///
/// Returns [`crate::core::UpdateError::ConfigError`] when a token is set and the
/// owner and name cannot be derived from `repo_url`.
pub fn authenticated_clone_url(repo_url: &str, token: Option<&str>) -> Result<String> {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return Ok(repo_url.to_string());
    };

    let repo = parse_repo_url(repo_url)?;
    if repo.host.is_empty() {
        debug!("Ignoring access token for local repository {}", repo_url);
        return Ok(repo_url.to_string());
    }

    Ok(format!(
        "https://{owner}:{token}@{host}/{path}",
        owner = repo.owner,
        host = repo.host,
        path = repo.path
    ))
}

/// Replaces the contents of `scratch_dir` with a fresh clone of `repo_url` at
/// `branch`.
///
/// Anything left in the scratch directory by an earlier run is deleted before
/// cloning. On failure the scratch directory may hold a partial clone.
///
/// # Errors
///
/// - [`crate::core::UpdateError::FileSystemError`] if the scratch directory
///   cannot be prepared
/// - [`crate::core::UpdateError::CloneFailed`] for any clone failure
pub async fn download<F: RepositoryFetcher>(
    fetcher: &F,
    repo_url: &str,
    branch: &str,
    scratch_dir: &Path,
    token: Option<&str>,
) -> Result<()> {
    let clone_url = authenticated_clone_url(repo_url, token)?;

    let dir = scratch_dir.to_path_buf();
    tokio::task::spawn_blocking(move || empty_dir(&dir)).await??;

    info!(
        "Cloning {} ({}) into {}",
        strip_auth_from_url(repo_url)?,
        branch,
        scratch_dir.display()
    );
    fetcher.clone_into(&clone_url, branch, scratch_dir).await
}
