//! Application manifest parsing
//!
//! The manifest is the JSON document (by default `package.json`) that records
//! the installed application's version and its dependency constraints. Only two
//! fields are interpreted:
//!
//! ```json
//! {
//!   "version": "1.4.2",
//!   "dependencies": {
//!     "express": "^4.18.2",
//!     "dotenv": "~16.0.3"
//!   }
//! }
//! ```
//!
//! Everything else in the document is ignored. `version` is required and must
//! be a string; `dependencies` is optional and, when present, must map names to
//! constraint strings. The order of `dependencies` in the source document is
//! preserved because dependency comparison short-circuits in that order.
//!
//! Two manifests exist during an update cycle: the *local* one, read by
//! [`ManifestReader`] from the application directory, and the *remote* one,
//! fetched by [`crate::remote::RemoteManifestFetcher`]. Both go through
//! [`Manifest::parse`], so they fail the same way on the same input.

use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::UpdateError;

/// Ordered mapping of dependency name to version constraint.
///
/// Backed by the JSON object itself; every value is a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyMap(Map<String, Value>);

impl DependencyMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Looks up the constraint recorded for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Iterates `(name, constraint)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().filter_map(|(n, c)| Some((n.as_str(), c.as_str()?)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Inserts or replaces `name`, keeping its original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, constraint: impl Into<String>) {
        self.0.insert(name.into(), Value::String(constraint.into()));
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DependencyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, constraint) in iter {
            map.insert(name, constraint);
        }
        map
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for DependencyMap {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// Immutable snapshot of an application manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Application version, as written in the manifest.
    pub version: String,
    /// Dependency constraints in document order.
    pub dependencies: DependencyMap,
}

impl Manifest {
    /// Parses manifest JSON.
    ///
    /// `origin` names where the text came from (a path or URL) and is carried
    /// in every error.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::ManifestMalformed`] if the text is not a JSON object, or
    ///   `version`/`dependencies` have the wrong type
    /// - [`UpdateError::ManifestFieldMissing`] if `version` is absent or null
    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let malformed = |reason: String| UpdateError::ManifestMalformed {
            origin: origin.to_string(),
            reason,
        };

        let value: Value = serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;
        let Value::Object(mut object) = value else {
            return Err(malformed("expected a JSON object at the top level".to_string()).into());
        };

        let version = match object.remove("version") {
            None | Some(Value::Null) => {
                return Err(UpdateError::ManifestFieldMissing {
                    origin: origin.to_string(),
                    field: "version".to_string(),
                }
                .into());
            }
            Some(Value::String(version)) => version,
            Some(other) => {
                return Err(malformed(format!("'version' must be a string, found {other}")).into());
            }
        };

        let dependencies = match object.remove("dependencies") {
            None | Some(Value::Null) => DependencyMap::new(),
            Some(Value::Object(entries)) => {
                if let Some((name, other)) = entries.iter().find(|(_, c)| !c.is_string()) {
                    return Err(malformed(format!(
                        "dependency '{name}' must be a string, found {other}"
                    ))
                    .into());
                }
                DependencyMap(entries)
            }
            Some(other) => {
                return Err(malformed(format!("'dependencies' must be an object, found {other}"))
                    .into());
            }
        };

        Ok(Self {
            version,
            dependencies,
        })
    }
}

/// Reads the local manifest from the application directory.
#[derive(Debug, Clone)]
pub struct ManifestReader {
    path: PathBuf,
}

impl ManifestReader {
    /// Creates a reader for `<app_dir>/<manifest_file>`.
    pub fn new(app_dir: impl AsRef<Path>, manifest_file: impl AsRef<Path>) -> Self {
        Self {
            path: app_dir.as_ref().join(manifest_file),
        }
    }

    /// Path the manifest is read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the manifest. Nothing is cached; each call re-reads the file.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::ManifestNotFound`] if the file does not exist
    /// - [`UpdateError::FileSystemError`] if it exists but cannot be read
    /// - any error from [`Manifest::parse`]
    pub async fn read(&self) -> Result<Manifest> {
        debug!("Reading local manifest from {}", self.path.display());

        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UpdateError::ManifestNotFound {
                    path: self.path.display().to_string(),
                }
                .into());
            }
            Err(e) => return Err(crate::utils::fs::fs_error("read manifest", &self.path, e)),
        };

        Manifest::parse(&text, &self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn kind(err: &anyhow::Error) -> &UpdateError {
        err.downcast_ref::<UpdateError>().expect("root cause should be an UpdateError")
    }

    #[test]
    fn test_parse_full_manifest() {
        let manifest = Manifest::parse(
            r#"{
                "name": "app",
                "version": "1.2.3",
                "dependencies": { "zeta": "^1.0.0", "alpha": "~2.1.0" },
                "scripts": { "start": "node index.js" }
            }"#,
            "package.json",
        )
        .unwrap();

        assert_eq!(manifest.version, "1.2.3");
        let names: Vec<_> = manifest.dependencies.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(manifest.dependencies.get("alpha"), Some("~2.1.0"));
    }

    #[test]
    fn test_parse_without_dependencies() {
        let manifest = Manifest::parse(r#"{"version": "0.1.0"}"#, "package.json").unwrap();
        assert!(manifest.dependencies.is_empty());

        let manifest =
            Manifest::parse(r#"{"version": "0.1.0", "dependencies": null}"#, "package.json")
                .unwrap();
        assert!(manifest.dependencies.is_empty());
    }

    #[test]
    fn test_parse_missing_version() {
        let err = Manifest::parse(r#"{"dependencies": {}}"#, "package.json").unwrap_err();
        assert_eq!(
            kind(&err),
            &UpdateError::ManifestFieldMissing {
                origin: "package.json".to_string(),
                field: "version".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_malformed_inputs() {
        for text in [
            "not json",
            "[1, 2, 3]",
            r#"{"version": 3}"#,
            r#"{"version": "1.0.0", "dependencies": ["a"]}"#,
            r#"{"version": "1.0.0", "dependencies": {"a": 1}}"#,
        ] {
            let err = Manifest::parse(text, "remote").unwrap_err();
            assert!(
                matches!(kind(&err), UpdateError::ManifestMalformed { .. }),
                "expected malformed for {text}"
            );
        }
    }

    #[tokio::test]
    async fn test_reader_not_found() {
        let temp = TempDir::new().unwrap();
        let reader = ManifestReader::new(temp.path(), "package.json");

        let err = reader.read().await.unwrap_err();
        assert!(matches!(kind(&err), UpdateError::ManifestNotFound { .. }));
    }

    #[tokio::test]
    async fn test_reader_reads_fresh_each_time() {
        let temp = TempDir::new().unwrap();
        let reader = ManifestReader::new(temp.path(), "package.json");

        std::fs::write(temp.path().join("package.json"), r#"{"version": "1.0.0"}"#).unwrap();
        assert_eq!(reader.read().await.unwrap().version, "1.0.0");

        std::fs::write(temp.path().join("package.json"), r#"{"version": "1.1.0"}"#).unwrap();
        assert_eq!(reader.read().await.unwrap().version, "1.1.0");
    }

    #[test]
    fn test_dependency_map_insert_keeps_position() {
        let mut map = DependencyMap::from([("a", "^1.0.0"), ("b", "^2.0.0")]);
        map.insert("a", "^1.5.0");

        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, vec![("a", "^1.5.0"), ("b", "^2.0.0")]);
    }

    #[test]
    fn test_dependency_map_serializes_as_object() {
        let map = DependencyMap::from([("b", "1"), ("a", "2")]);
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"b":"1","a":"2"}"#);

        let parsed =
            Manifest::parse(r#"{"version": "1.0.0", "dependencies": {"z": "^1", "m": "^2"}}"#, "x")
                .unwrap();
        assert_eq!(serde_json::to_string(&parsed.dependencies).unwrap(), r#"{"z":"^1","m":"^2"}"#);
    }
}
