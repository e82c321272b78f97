//! Version and dependency comparison
//!
//! Decides whether the installed application is current with respect to the
//! remote manifest. Two questions are asked during an update cycle:
//!
//! 1. **Is the application version current?** [`compare_versions`] orders the
//!    local and remote `version` fields by SemVer precedence. The local side is
//!    current when it is equal to or newer than the remote side.
//! 2. **Did the dependency set drift?** [`compare_modules`] walks the remote
//!    dependency map in document order and stops at the first entry that is
//!    missing locally or whose remote constraint is newer than the local one.
//!
//! Both functions are pure; reading the manifests is the caller's job.
//!
//! # Examples
//!
//! ```rust,no_run
//! use git_autoupdate::manifest::DependencyMap;
//! use git_autoupdate::version::{compare_modules, compare_versions};
//!
//! # fn example() -> anyhow::Result<()> {
//! let result = compare_versions("1.0.0", "1.2.0")?;
//! assert!(!result.up_to_date);
//!
//! let local = DependencyMap::from([("express", "^4.17.0")]);
//! let remote = DependencyMap::from([("express", "^4.18.2")]);
//! assert!(!compare_modules(&local, &remote).up_to_date);
//! # Ok(())
//! # }
//! ```

pub mod comparison;

use anyhow::Result;
use serde::Serialize;

use crate::core::UpdateError;
use crate::manifest::DependencyMap;

pub use comparison::VersionComparator;

/// Result of comparing the local application version against the remote one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionComparison {
    pub up_to_date: bool,
    pub local: String,
    /// Present whenever a remote manifest was consulted.
    pub remote: Option<String>,
}

/// Result of comparing dependency maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModulesComparison {
    pub up_to_date: bool,
    /// The full remote dependency map, regardless of the outcome.
    pub modules: DependencyMap,
}

/// Compares the local version against the remote version.
///
/// # Errors
///
/// Returns [`UpdateError::ManifestMalformed`] if either version is not a
/// semantic version, even after lenient parsing.
pub fn compare_versions(local: &str, remote: &str) -> Result<VersionComparison> {
    for (side, version) in [("local", local), ("remote", remote)] {
        if let Err(e) = VersionComparator::parse_version(version) {
            return Err(UpdateError::ManifestMalformed {
                origin: format!("{side} manifest"),
                reason: format!("invalid version '{version}': {e}"),
            }
            .into());
        }
    }

    Ok(VersionComparison {
        up_to_date: VersionComparator::is_at_least(local, remote)?,
        local: local.to_string(),
        remote: Some(remote.to_string()),
    })
}

/// Compares local dependencies against remote dependencies.
///
/// Entries present only locally are ignored; only additions and upgrades on
/// the remote side count as drift.
#[must_use]
pub fn compare_modules(local: &DependencyMap, remote: &DependencyMap) -> ModulesComparison {
    let drifted = remote.iter().any(|(name, remote_constraint)| match local.get(name) {
        None => true,
        Some(local_constraint) => VersionComparator::is_newer(local_constraint, remote_constraint),
    });

    ModulesComparison {
        up_to_date: !drifted,
        modules: remote.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_versions_outdated() {
        let result = compare_versions("1.0.0", "1.2.0").unwrap();
        assert_eq!(
            result,
            VersionComparison {
                up_to_date: false,
                local: "1.0.0".to_string(),
                remote: Some("1.2.0".to_string()),
            }
        );
    }

    #[test]
    fn test_compare_versions_current_or_ahead() {
        assert!(compare_versions("1.2.0", "1.2.0").unwrap().up_to_date);
        assert!(compare_versions("2.0.0", "1.9.0").unwrap().up_to_date);
        assert!(compare_versions("v1.2", "1.2.0").unwrap().up_to_date);
    }

    #[test]
    fn test_compare_versions_is_not_self_comparison() {
        // A self-comparison would report every pair as current.
        assert!(!compare_versions("0.0.1", "9.9.9").unwrap().up_to_date);
    }

    #[test]
    fn test_compare_versions_malformed() {
        let err = compare_versions("1.0.0", "not-a-version").unwrap_err();
        match err.downcast_ref::<UpdateError>() {
            Some(UpdateError::ManifestMalformed { origin, .. }) => {
                assert_eq!(origin, "remote manifest");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_compare_modules_up_to_date() {
        let local = DependencyMap::from([("a", "^1.2.0"), ("b", "~2.0.0"), ("extra", "1.0.0")]);
        let remote = DependencyMap::from([("a", "^1.1.0"), ("b", "^2.0.0")]);

        let result = compare_modules(&local, &remote);
        assert!(result.up_to_date);
        assert_eq!(result.modules, remote);
    }

    #[test]
    fn test_compare_modules_missing_locally() {
        let local = DependencyMap::from([("a", "^1.0.0")]);
        let remote = DependencyMap::from([("a", "^1.0.0"), ("b", "^0.1.0")]);

        let result = compare_modules(&local, &remote);
        assert!(!result.up_to_date);
        assert_eq!(result.modules, remote);
    }

    #[test]
    fn test_compare_modules_remote_newer() {
        let local = DependencyMap::from([("a", "^1.0.0")]);
        let remote = DependencyMap::from([("a", "^1.0.1")]);
        assert!(!compare_modules(&local, &remote).up_to_date);
    }

    #[test]
    fn test_compare_modules_empty_remote() {
        let local = DependencyMap::from([("a", "^1.0.0")]);
        let result = compare_modules(&local, &DependencyMap::new());
        assert!(result.up_to_date);
        assert!(result.modules.is_empty());
    }

    #[test]
    fn test_compare_versions_ordering_grid() {
        let ordered = ["0.9.0", "1.0.0-alpha", "1.0.0-beta", "1.0.0", "1.0.1", "1.1.0", "2.0.0"];
        for (i, local) in ordered.iter().enumerate() {
            for (j, remote) in ordered.iter().enumerate() {
                let result = compare_versions(local, remote).unwrap();
                assert_eq!(result.up_to_date, i >= j, "local={local} remote={remote}");
            }
        }
    }
}
