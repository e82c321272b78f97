//! Test utilities for git-autoupdate
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite.
//!
//! - [`init_test_logging`] - one-time tracing setup
//! - [`FakeManifestSource`], [`FakeFetcher`], [`RecordingRunner`] - in-memory
//!   collaborators for [`crate::updater::Updater::with_parts`]
//! - [`HttpStub`] - a local HTTP server for the raw manifest endpoint
//! - [`TestGit`] - runs git commands against a fixture repository
//!
//! # Example
//!
//! ```rust,no_run
//! use git_autoupdate::config::UpdateConfig;
//! use git_autoupdate::test_utils::{FakeFetcher, FakeManifestSource, RecordingRunner};
//! use git_autoupdate::updater::Updater;
//!
//! # fn example() -> anyhow::Result<()> {
//! let updater = Updater::with_parts(
//!     UpdateConfig::new("https://github.com/acme/app"),
//!     FakeManifestSource::with_version("1.2.0"),
//!     FakeFetcher::new().with_file("package.json", r#"{"version": "1.2.0"}"#),
//!     RecordingRunner::new(),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod fakes;
pub mod git_helper;
pub mod http_stub;

pub use fakes::{FakeFetcher, FakeManifestSource, RecordingRunner};
pub use git_helper::TestGit;
pub use http_stub::{HttpStub, RecordedRequest};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Installs a tracing subscriber once per process. Uses `level` when given,
/// otherwise `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=git=debug,git_autoupdate=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true) // Show module targets like "git"
            .with_thread_ids(false)
            .try_init();
    });
}
