//! Package descriptor (`package.json`) cache.
//!
//! Descriptors are read lazily, parsed once per absolute path and kept for
//! the life of the store. A missing file is cached as absent so repeated
//! ancestor walks do not touch the filesystem again.

use crate::error::ResolveError;
use crate::paths::NODE_MODULES;
use dashmap::DashMap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Package descriptor file name.
pub const PACKAGE_JSON: &str = "package.json";

/// Module semantics declared by a package's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageType {
    /// `"type": "module"`.
    Module,
    /// Anything else, including no `type` field.
    #[default]
    CommonJs,
}

impl PackageType {
    fn from_descriptor(raw: &Value) -> Self {
        match raw.get("type").and_then(Value::as_str) {
            Some("module") => Self::Module,
            _ => Self::CommonJs,
        }
    }
}

/// A parsed `package.json`.
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    /// Absolute path of the `package.json` file.
    pub path: PathBuf,
    pub package_type: PackageType,
    /// The full document, for `exports`/`imports`/`main` lookups.
    pub raw: Value,
}

impl PackageDescriptor {
    /// Directory containing the descriptor.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }
}

/// Process-scoped cache of package descriptors keyed by absolute path.
#[derive(Debug, Default)]
pub struct MetadataStore {
    descriptors: DashMap<PathBuf, Option<Arc<PackageDescriptor>>>,
    parse_count: AtomicUsize,
}

impl MetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the descriptor at `path`, consulting the cache first.
    ///
    /// Returns `Ok(None)` (and caches that) when the file does not exist.
    /// A file that exists but is not valid JSON is a fatal
    /// [`ResolveError::MalformedMetadata`].
    pub fn read_descriptor(
        &self,
        path: &Path,
    ) -> Result<Option<Arc<PackageDescriptor>>, ResolveError> {
        if let Some(cached) = self.descriptors.get(path) {
            return Ok(cached.value().clone());
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound || !path.is_file() => {
                self.descriptors.insert(path.to_path_buf(), None);
                return Ok(None);
            }
            Err(source) => {
                return Err(ResolveError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        self.parse_count.fetch_add(1, Ordering::Relaxed);
        let raw: Value =
            serde_json::from_str(&content).map_err(|source| ResolveError::MalformedMetadata {
                path: path.to_path_buf(),
                source,
            })?;

        let descriptor = Arc::new(PackageDescriptor {
            path: path.to_path_buf(),
            package_type: PackageType::from_descriptor(&raw),
            raw,
        });
        tracing::trace!(path = %path.display(), "parsed package descriptor");
        self.descriptors
            .insert(path.to_path_buf(), Some(Arc::clone(&descriptor)));
        Ok(Some(descriptor))
    }

    /// Find the nearest `package.json` above `location` (a file path).
    ///
    /// The walk stops without success at a `node_modules/package.json`
    /// candidate or at the filesystem root.
    pub fn find_package_descriptor(
        &self,
        location: &Path,
    ) -> Result<Option<Arc<PackageDescriptor>>, ResolveError> {
        let mut dir = location.parent();
        while let Some(current) = dir {
            if current.file_name().is_some_and(|name| name == NODE_MODULES) {
                break;
            }
            if let Some(descriptor) = self.read_descriptor(&current.join(PACKAGE_JSON))? {
                return Ok(Some(descriptor));
            }
            dir = current.parent();
        }
        Ok(None)
    }

    /// Module type declared by the nearest ancestor descriptor.
    pub fn module_type_hint(&self, location: &Path) -> Result<PackageType, ResolveError> {
        Ok(self
            .find_package_descriptor(location)?
            .map(|d| d.package_type)
            .unwrap_or_default())
    }

    /// Number of descriptor documents parsed so far.
    #[must_use]
    pub fn parse_count(&self) -> usize {
        self.parse_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_module_type_from_nearest_descriptor() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("package.json"), r#"{"type": "module"}"#).unwrap();
        fs::create_dir_all(root.join("src/nested")).unwrap();

        let store = MetadataStore::new();
        let hint = store
            .module_type_hint(&root.join("src/nested/main.ts"))
            .unwrap();
        assert_eq!(hint, PackageType::Module);
    }

    #[test]
    fn test_missing_type_defaults_to_commonjs() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "app"}"#).unwrap();

        let store = MetadataStore::new();
        let hint = store.module_type_hint(&dir.path().join("main.ts")).unwrap();
        assert_eq!(hint, PackageType::CommonJs);
    }

    #[test]
    fn test_descriptor_parsed_once() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"type": "module"}"#).unwrap();

        let store = MetadataStore::new();
        store.module_type_hint(&dir.path().join("a.ts")).unwrap();
        store.module_type_hint(&dir.path().join("b.ts")).unwrap();
        assert_eq!(store.parse_count(), 1);
    }

    #[test]
    fn test_absent_descriptor_is_cached() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("package.json");

        let store = MetadataStore::new();
        assert!(store.read_descriptor(&path).unwrap().is_none());

        // Created after the first lookup; the cached absence still wins.
        fs::write(&path, "{}").unwrap();
        assert!(store.read_descriptor(&path).unwrap().is_none());
        assert_eq!(store.parse_count(), 0);
    }

    #[test]
    fn test_malformed_descriptor_is_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{ not json").unwrap();

        let store = MetadataStore::new();
        let err = store
            .module_type_hint(&dir.path().join("main.ts"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::MalformedMetadata { .. }));
        assert!(err.is_fatal());
        assert!(err.to_string().starts_with("Error parsing: "));
    }

    #[test]
    fn test_walk_stops_at_node_modules() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("package.json"), r#"{"type": "module"}"#).unwrap();
        fs::create_dir_all(root.join("node_modules")).unwrap();

        let store = MetadataStore::new();
        let found = store
            .find_package_descriptor(&root.join("node_modules/stray.js"))
            .unwrap();
        assert!(found.is_none());
    }
}
