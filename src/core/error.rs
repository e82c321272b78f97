//! Error handling for git-autoupdate
//!
//! This module provides the error kinds an update cycle can fail with and a
//! user-friendly wrapper for reporting them. The error system is built around
//! two principles:
//! 1. **Strongly-typed errors** so a host application can react to a specific
//!    failure (e.g. retry on [`UpdateError::NetworkError`], alert on
//!    [`UpdateError::InstallCommandFailed`])
//! 2. **Actionable messages** with suggestions when the error reaches a human
//!
//! # Propagation
//!
//! Every operation in this crate returns [`anyhow::Result`]. The root cause of a
//! failure is always an [`UpdateError`], so callers can recover the kind with
//! [`anyhow::Error::downcast_ref`] even after context has been attached:
//!
//! ```rust,no_run
//! use git_autoupdate::core::UpdateError;
//!
//! fn classify(err: &anyhow::Error) -> &'static str {
//!     match err.downcast_ref::<UpdateError>() {
//!         Some(UpdateError::NetworkError { .. }) => "transient",
//!         Some(UpdateError::CloneFailed { .. }) => "transient",
//!         Some(_) => "permanent",
//!         None => "unknown",
//!     }
//! }
//! ```
//!
//! There is no internal recovery or retry anywhere in the update cycle. A failed
//! cycle leaves the destination tree in whatever state the failing phase left it.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The error kinds produced by an update cycle.
///
/// # Error Categories
///
/// ## Local manifest
/// - [`ManifestNotFound`] - the application manifest does not exist
/// - [`ManifestMalformed`] - the manifest is not a JSON object or has bad field types
/// - [`ManifestFieldMissing`] - a required field (`version`) is absent
///
/// ## Remote
/// - [`NetworkError`] - transport failure or unexpected HTTP status
/// - [`RemoteNotFound`] - the raw manifest URL answered 404
/// - [`CloneFailed`] - cloning the repository failed (transport, auth and
///   missing branch are not distinguished)
///
/// ## Installation
/// - [`FileSystemError`] - purge, copy or remove failed
/// - [`InstallCommandFailed`] - the dependency install command did not succeed
///
/// ## Configuration
/// - [`ConfigError`] - the update configuration is unusable
///
/// [`ManifestNotFound`]: UpdateError::ManifestNotFound
/// [`ManifestMalformed`]: UpdateError::ManifestMalformed
/// [`ManifestFieldMissing`]: UpdateError::ManifestFieldMissing
/// [`NetworkError`]: UpdateError::NetworkError
/// [`RemoteNotFound`]: UpdateError::RemoteNotFound
/// [`CloneFailed`]: UpdateError::CloneFailed
/// [`FileSystemError`]: UpdateError::FileSystemError
/// [`InstallCommandFailed`]: UpdateError::InstallCommandFailed
/// [`ConfigError`]: UpdateError::ConfigError
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// The manifest file does not exist at the expected location.
    #[error("Manifest file not found: {path}")]
    ManifestNotFound {
        /// Path that was looked up
        path: String,
    },

    /// The manifest could not be parsed as structured key-value data.
    #[error("Invalid manifest in {origin}: {reason}")]
    ManifestMalformed {
        /// Where the manifest came from (file path or URL)
        origin: String,
        /// Parser message
        reason: String,
    },

    /// A required manifest field is absent.
    #[error("Manifest {origin} is missing required field '{field}'")]
    ManifestFieldMissing {
        /// Where the manifest came from (file path or URL)
        origin: String,
        /// Name of the missing field
        field: String,
    },

    /// Transport failure or an unexpected HTTP response.
    #[error("Network error during {operation}: {reason}")]
    NetworkError {
        /// The network operation that failed
        operation: String,
        /// Reason for the network failure
        reason: String,
    },

    /// The remote manifest URL answered with 404.
    #[error("Remote manifest not found: {url}")]
    RemoteNotFound {
        /// URL that was requested (never contains credentials)
        url: String,
    },

    /// Repository clone failed.
    #[error("Failed to clone repository: {url}")]
    CloneFailed {
        /// The repository URL that failed to clone (never contains credentials)
        url: String,
        /// The reason for the clone failure
        reason: String,
    },

    /// A purge, copy or remove step failed.
    #[error("File system error during {operation} of {path}: {reason}")]
    FileSystemError {
        /// The file system operation that failed
        operation: String,
        /// Path where the file system error occurred
        path: String,
        /// Underlying I/O error message
        reason: String,
    },

    /// The dependency install command could not be run or exited non-zero.
    #[error("Dependency install command '{command}' failed: {reason}")]
    InstallCommandFailed {
        /// The command line that was run
        command: String,
        /// Exit status, timeout, or spawn failure description
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },
}

/// Error wrapper with an optional suggestion and details for display.
///
/// # Examples
///
/// ```rust,no_run
/// use git_autoupdate::core::{ErrorContext, UpdateError};
///
/// let context = ErrorContext::new(UpdateError::RemoteNotFound {
///     url: "https://raw.githubusercontent.com/owner/app/main/package.json".to_string(),
/// })
/// .with_suggestion("Check the branch name and that package.json is committed");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying update error
    pub error: UpdateError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: UpdateError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error from an update cycle into an [`ErrorContext`].
///
/// The root [`UpdateError`] is found even when context has been attached with
/// [`anyhow::Context`]. I/O errors that escaped without a typed wrapper are
/// reported as [`UpdateError::FileSystemError`]; anything else becomes a
/// [`UpdateError::ConfigError`] carrying the full error chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(update_error) = error.downcast_ref::<UpdateError>() {
        return create_error_context(update_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        return ErrorContext::new(UpdateError::FileSystemError {
            operation: "file access".to_string(),
            path: "unknown".to_string(),
            reason: io_error.kind().to_string(),
        })
        .with_details(io_error.to_string())
        .with_suggestion("Check that the application directory is writable");
    }

    ErrorContext::new(UpdateError::ConfigError {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: UpdateError) -> ErrorContext {
    match &error {
        UpdateError::ManifestNotFound {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Run the updater from the application root or set app_dir in the update configuration",
        ),
        UpdateError::ManifestMalformed {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("The manifest must be a JSON object with a string 'version' field"),
        UpdateError::ManifestFieldMissing {
            field,
            ..
        } => {
            let suggestion = format!("Add a \"{field}\" entry to the manifest");
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        UpdateError::NetworkError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check your internet connection and try again")
            .with_details("The update cycle does not retry; start a fresh cycle to try again"),
        UpdateError::RemoteNotFound {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Check the repository URL and branch, or set access_token for a private repository",
        ),
        UpdateError::CloneFailed {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Verify that the branch exists and that git can reach the repository")
            .with_details("Authentication, network and missing-branch failures are reported alike"),
        UpdateError::FileSystemError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check permissions on the application and scratch directories")
            .with_details("The destination tree may be partially overwritten"),
        UpdateError::InstallCommandFailed {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Run the install command manually in the application directory to see its output",
        ),
        UpdateError::ConfigError {
            ..
        } => ErrorContext::new(error),
    }
}
