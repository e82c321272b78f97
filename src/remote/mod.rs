//! Remote manifest retrieval
//!
//! The remote manifest is read straight from the repository's raw-file
//! endpoint rather than from a clone, so the version check costs one small
//! HTTP request. For a repository `https://github.com/acme/dashboard.git` on
//! branch `main` the request goes to:
//!
//! ```text
//! https://raw.githubusercontent.com/acme/dashboard/main/package.json
//! ```
//!
//! The base URL and manifest file name come from
//! [`UpdateConfig`](crate::config::UpdateConfig). With an access token the
//! request carries `Authorization: token <token>`.
//!
//! [`ManifestSource`] is the seam the updater depends on;
//! [`RemoteManifestFetcher`] is the HTTP implementation.

use anyhow::Result;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use std::future::Future;
use tracing::debug;

use crate::constants::MANIFEST_FETCH_TIMEOUT;
use crate::core::UpdateError;
use crate::git::parse_repo_url;
use crate::manifest::Manifest;

/// Source of the remote manifest for a repository branch.
pub trait ManifestSource: Send + Sync {
    /// Fetches and parses the manifest of `repo_url` at `branch`.
    ///
    /// Every call fetches afresh.
    fn fetch(
        &self,
        repo_url: &str,
        branch: &str,
        token: Option<&str>,
    ) -> impl Future<Output = Result<Manifest>> + Send;
}

/// [`ManifestSource`] that reads the manifest over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteManifestFetcher {
    client: reqwest::Client,
    raw_base_url: String,
    manifest_file: String,
}

impl RemoteManifestFetcher {
    /// Creates a fetcher for `<raw_base_url>/<repository path>/<branch>/<manifest_file>`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::NetworkError`] if the HTTP client cannot be built.
    pub fn new(raw_base_url: impl Into<String>, manifest_file: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(MANIFEST_FETCH_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpdateError::NetworkError {
                operation: "build HTTP client".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            raw_base_url: raw_base_url.into(),
            manifest_file: manifest_file.into(),
        })
    }

    /// Raw-file URL of the manifest for `repo_url` at `branch`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ConfigError`] if owner and name cannot be derived
    /// from `repo_url`.
    pub fn raw_manifest_url(&self, repo_url: &str, branch: &str) -> Result<String> {
        let repo = parse_repo_url(repo_url)?;
        Ok(format!(
            "{}/{}/{}/{}",
            self.raw_base_url.trim_end_matches('/'),
            repo.path,
            branch,
            self.manifest_file.trim_start_matches('/')
        ))
    }
}

impl ManifestSource for RemoteManifestFetcher {
    async fn fetch(&self, repo_url: &str, branch: &str, token: Option<&str>) -> Result<Manifest> {
        let url = self.raw_manifest_url(repo_url, branch)?;
        debug!("Fetching remote manifest from {}", url);

        let network_error = |reason: String| UpdateError::NetworkError {
            operation: format!("fetch {url}"),
            reason,
        };

        let mut request = self.client.get(&url);
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("token {token}"))
                .map_err(|_| network_error("access token is not a valid header value".to_string()))?;
            value.set_sensitive(true);
            request = request.header(AUTHORIZATION, value);
        }

        let response = request.send().await.map_err(|e| network_error(e.without_url().to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(UpdateError::RemoteNotFound {
                url: url.clone(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(network_error(format!("unexpected HTTP status {status}")).into());
        }

        let body = response.text().await.map_err(|e| network_error(e.without_url().to_string()))?;
        Manifest::parse(&body, &url)
    }
}
