//! Module resolution.
//!
//! [`Resolver`] runs the ordered fallback chain (alias rewriting, source
//! extension rewriting, baseline resolution with probing retries) on top of
//! a [`BaselineResolver`]. [`NodeEsmResolver`] is the strict Node ESM
//! baseline shipped with the crate.

mod baseline;
mod exports;
mod orchestrator;
mod probe;
mod rewrite;

pub use baseline::{is_builtin, BaselineResolver, NodeEsmResolver, BUILTIN_MODULES};
pub use exports::{resolve_exports, resolve_imports, ESM_CONDITIONS};
pub use orchestrator::Resolver;
pub use probe::PROBE_EXTENSIONS;
pub use rewrite::source_rewrite;

use crate::format::ModuleFormat;
use std::collections::BTreeMap;
use url::Url;

/// Import attributes (`with { type: "json" }`).
pub type ImportAttributes = BTreeMap<String, String>;

/// Calling context of one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveContext {
    /// URL of the importing module; `None` for entry points.
    pub parent_url: Option<Url>,
    pub import_attributes: ImportAttributes,
}

impl ResolveContext {
    #[must_use]
    pub fn with_parent(parent_url: Url) -> Self {
        Self {
            parent_url: Some(parent_url),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.import_attributes.insert(key.into(), value.into());
        self
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub url: Url,
    pub format: Option<ModuleFormat>,
}

impl ResolvedModule {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self { url, format: None }
    }

    #[must_use]
    pub fn with_format(mut self, format: Option<ModuleFormat>) -> Self {
        self.format = format;
        self
    }
}
