//! Project configuration (`tsconfig.json`) discovery and caching.
//!
//! Two caches back discovery: requesting path → config path, and config
//! path → parsed [`ProjectConfig`]. Files governed by one config share one
//! parsed document and one pair of matchers.

mod files;
mod jsonc;
mod parse;
mod paths;

pub use files::{FilesMatcher, FilesSpec, ScopedPattern};
pub use parse::{find_tsconfig, TSCONFIG_JSON};
pub use paths::PathsMatcher;

use crate::error::ResolveError;
use dashmap::DashMap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A resolved `tsconfig.json` with its matchers.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Absolute path of the config file.
    pub path: PathBuf,
    /// The merged document (with `extends` applied).
    pub raw: Value,
    files: FilesMatcher,
    paths: Option<PathsMatcher>,
}

impl ProjectConfig {
    /// Parse the config at `path`, following `extends`.
    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let layers = parse::read_config(path)?;
        let dir = path.parent().unwrap_or(Path::new("/"));

        let paths = match &layers.paths {
            Some((map, declared_in)) => PathsMatcher::new(
                Some(map),
                layers.base_url.clone().unwrap_or_else(|| declared_in.clone()),
                layers.base_url.clone(),
            ),
            None => PathsMatcher::new(None, dir.to_path_buf(), layers.base_url.clone()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            raw: layers.to_raw(),
            files: FilesMatcher::new(layers.files_spec(dir)),
            paths,
        })
    }

    /// Whether this config governs the source file at `path`.
    #[must_use]
    pub fn governs(&self, path: &Path) -> bool {
        self.files.governs(path)
    }

    /// The raw document when this config governs `path`.
    #[must_use]
    pub fn raw_for(&self, path: &Path) -> Option<&Value> {
        self.governs(path).then_some(&self.raw)
    }

    /// Whether alias matching can produce anything.
    #[must_use]
    pub fn has_aliases(&self) -> bool {
        self.paths.as_ref().is_some_and(PathsMatcher::has_rules)
    }

    /// Candidate paths for an aliased specifier, in declared order.
    #[must_use]
    pub fn match_aliases(&self, specifier: &str) -> Vec<PathBuf> {
        self.paths
            .as_ref()
            .map(|m| m.candidates(specifier))
            .unwrap_or_default()
    }
}

/// Process-scoped project config cache.
#[derive(Debug, Default)]
pub struct ConfigStore {
    override_path: Option<PathBuf>,
    /// Requesting path → discovered config path (or none).
    requesters: DashMap<PathBuf, Option<PathBuf>>,
    /// Config path → parsed config.
    configs: DashMap<PathBuf, Arc<ProjectConfig>>,
    parse_count: AtomicUsize,
}

impl ConfigStore {
    /// Create a store. With an override every lookup returns that config.
    #[must_use]
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self {
            override_path,
            ..Default::default()
        }
    }

    /// The project config that applies to `reference` (a file or directory).
    pub fn load_project_config(
        &self,
        reference: &Path,
    ) -> Result<Option<Arc<ProjectConfig>>, ResolveError> {
        if let Some(override_path) = &self.override_path {
            return self.load(override_path).map(Some);
        }

        if let Some(cached) = self.requesters.get(reference) {
            let Some(config_path) = cached.value().clone() else {
                return Ok(None);
            };
            drop(cached);
            return match self.configs.get(&config_path) {
                Some(config) => Ok(Some(Arc::clone(config.value()))),
                None => Err(ResolveError::InternalCacheInconsistency {
                    requester: reference.to_path_buf(),
                    config_path,
                }),
            };
        }

        let start = if reference.is_dir() {
            reference
        } else {
            reference.parent().unwrap_or(reference)
        };
        let Some(config_path) = find_tsconfig(start) else {
            tracing::trace!(reference = %reference.display(), "no tsconfig found");
            self.requesters.insert(reference.to_path_buf(), None);
            return Ok(None);
        };

        let config = self.load(&config_path)?;
        self.requesters
            .insert(reference.to_path_buf(), Some(config_path));
        Ok(Some(config))
    }

    /// Load the config at `path` through the document cache.
    pub fn load(&self, path: &Path) -> Result<Arc<ProjectConfig>, ResolveError> {
        if let Some(config) = self.configs.get(path) {
            return Ok(Arc::clone(config.value()));
        }

        self.parse_count.fetch_add(1, Ordering::Relaxed);
        let config = Arc::new(ProjectConfig::load(path)?);
        tracing::debug!(path = %path.display(), "loaded tsconfig");
        self.configs.insert(path.to_path_buf(), Arc::clone(&config));
        Ok(config)
    }

    /// Number of config files parsed so far.
    #[must_use]
    pub fn parse_count(&self) -> usize {
        self.parse_count.load(Ordering::Relaxed)
    }

    /// Forget the document for `path` while keeping requester entries.
    #[cfg(test)]
    fn evict_document(&self, path: &Path) {
        self.configs.remove(path);
    }
}
