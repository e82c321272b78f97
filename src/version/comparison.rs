//! Lenient semantic-version parsing and ordering.
//!
//! Manifest versions in the wild are not always strict SemVer. The parser here
//! accepts the forms commonly found in application manifests:
//!
//! - `1.2.3` (no change)
//! - `v1.2.3`, `version-1.2.3`, `release-1.2.3` (prefix stripped)
//! - `1.2` and `1` (missing components default to `0`)
//! - `1.2-beta.1` (pre-release and build metadata kept after padding)
//!
//! # Examples
//!
//! ```rust,no_run
//! use git_autoupdate::version::comparison::VersionComparator;
//!
//! # fn example() -> anyhow::Result<()> {
//! assert!(VersionComparator::is_at_least("v1.2", "1.2.0")?);
//! assert!(!VersionComparator::is_at_least("1.0.0", "1.0.1")?);
//! assert!(!VersionComparator::is_newer("^2.1.0", "~2.1.0"));
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use semver::Version;
use std::cmp::Ordering;

/// Version comparison utilities for manifest and dependency versions.
pub struct VersionComparator;

impl VersionComparator {
    /// Returns `true` when `local` is equal to or newer than `remote`.
    ///
    /// # Errors
    ///
    /// Returns an error if either version cannot be parsed, even leniently.
    pub fn is_at_least(local: &str, remote: &str) -> Result<bool> {
        let local = Self::parse_version(local)?;
        let remote = Self::parse_version(remote)?;
        Ok(local.cmp_precedence(&remote) != Ordering::Less)
    }

    /// Decides whether a remote dependency constraint is newer than the local one.
    ///
    /// A single leading range operator (`^`, `~`, ...) is dropped from each side
    /// before parsing. If either side still fails to parse, the raw strings are
    /// compared instead and any difference counts as newer.
    #[must_use]
    pub fn is_newer(local: &str, remote: &str) -> bool {
        match (
            Self::parse_version(Self::strip_operator(local)),
            Self::parse_version(Self::strip_operator(remote)),
        ) {
            (Ok(local), Ok(remote)) => remote.cmp_precedence(&local) == Ordering::Greater,
            _ => local != remote,
        }
    }

    /// Parses a version string, handling common prefixes and short forms.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a semantic version after prefix
    /// removal and padding.
    pub fn parse_version(version_str: &str) -> Result<Version> {
        let trimmed = version_str.trim();
        let clean_version = if let Some(stripped) = trimmed.strip_prefix("version-") {
            stripped
        } else if let Some(stripped) = trimmed.strip_prefix("release-") {
            stripped
        } else if let Some(stripped) = trimmed.strip_prefix(['v', 'V']) {
            stripped
        } else {
            trimmed
        };

        Ok(Version::parse(&Self::pad_components(clean_version))?)
    }

    /// Fills in missing minor/patch components: `1.2-rc.1` becomes `1.2.0-rc.1`.
    fn pad_components(version: &str) -> String {
        let split_at = version.find(['-', '+']).unwrap_or(version.len());
        let (core, rest) = version.split_at(split_at);

        let mut padded = core.to_string();
        for _ in core.split('.').count()..3 {
            padded.push_str(".0");
        }
        padded.push_str(rest);
        padded
    }

    fn strip_operator(constraint: &str) -> &str {
        let constraint = constraint.trim();
        match constraint.chars().next() {
            Some(first) if !first.is_ascii_digit() => &constraint[first.len_utf8()..],
            _ => constraint,
        }
    }
}
