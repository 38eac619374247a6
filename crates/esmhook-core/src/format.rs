//! Module format inference.

use crate::error::ResolveError;
use crate::metadata::{MetadataStore, PackageType};
use crate::paths::is_governed_source;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Format tag attached to a resolved or loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    Module,
    CommonJs,
    Json,
    Builtin,
}

impl ModuleFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::CommonJs => "commonjs",
            Self::Json => "json",
            Self::Builtin => "builtin",
        }
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PackageType> for ModuleFormat {
    fn from(value: PackageType) -> Self {
        match value {
            PackageType::Module => Self::Module,
            PackageType::CommonJs => Self::CommonJs,
        }
    }
}

/// Format implied by the extension alone.
#[must_use]
pub fn format_from_extension(path: &str) -> Option<ModuleFormat> {
    let ext = Path::new(path).extension()?.to_str()?;
    match ext {
        "json" => Some(ModuleFormat::Json),
        "mjs" | "mts" => Some(ModuleFormat::Module),
        "cjs" | "cts" => Some(ModuleFormat::CommonJs),
        _ => None,
    }
}

/// Maps a resolved file location to a format tag.
#[derive(Debug, Clone)]
pub struct FormatResolver {
    metadata: Arc<MetadataStore>,
}

impl FormatResolver {
    #[must_use]
    pub fn new(metadata: Arc<MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Extension rules first, then the package `type` hint for governed
    /// sources. Plain `.js` and unknown extensions yield `None`.
    pub fn resolve_format(&self, path: &Path) -> Result<Option<ModuleFormat>, ResolveError> {
        let text = path.to_string_lossy();
        if let Some(format) = format_from_extension(&text) {
            return Ok(Some(format));
        }
        if is_governed_source(&text) {
            let hint = self.metadata.module_type_hint(path)?;
            return Ok(Some(hint.into()));
        }
        Ok(None)
    }

    /// Package `type` hint for any location.
    pub fn package_format(&self, path: &Path) -> Result<ModuleFormat, ResolveError> {
        Ok(self.metadata.module_type_hint(path)?.into())
    }
}
