//! Error taxonomy for resolution and loading.
//!
//! Every variant carries a stable Node-compatible code (see [`codes`]). The
//! resolver decides between "try the next fallback" and "stop now" by
//! matching on the variant, never on message text.

use crate::transform::TransformError;
use std::path::{PathBuf, MAIN_SEPARATOR_STR};
use thiserror::Error;

/// Stable error codes.
pub mod codes {
    pub const MODULE_NOT_FOUND: &str = "ERR_MODULE_NOT_FOUND";
    pub const PACKAGE_PATH_NOT_EXPORTED: &str = "ERR_PACKAGE_PATH_NOT_EXPORTED";
    pub const UNSUPPORTED_DIR_IMPORT: &str = "ERR_UNSUPPORTED_DIR_IMPORT";
    pub const PACKAGE_IMPORT_NOT_DEFINED: &str = "ERR_PACKAGE_IMPORT_NOT_DEFINED";
    pub const UNSUPPORTED_ESM_URL_SCHEME: &str = "ERR_UNSUPPORTED_ESM_URL_SCHEME";
    pub const INVALID_MODULE_SPECIFIER: &str = "ERR_INVALID_MODULE_SPECIFIER";
    pub const MALFORMED_METADATA: &str = "ERR_MALFORMED_METADATA";
    pub const INTERNAL_CACHE_INCONSISTENCY: &str = "ERR_INTERNAL_CACHE_INCONSISTENCY";
    pub const IO: &str = "ERR_IO";
    pub const UNKNOWN_FILE_EXTENSION: &str = "ERR_UNKNOWN_FILE_EXTENSION";
    pub const IMPORT_ATTRIBUTE_MISSING: &str = "ERR_IMPORT_ATTRIBUTE_MISSING";
    pub const UNSUPPORTED_LOAD_URL: &str = "ERR_UNSUPPORTED_LOAD_URL";
    pub const TRANSFORM_FAILED: &str = "ERR_TRANSFORM_FAILED";
}

fn imported_from(parent: &Option<String>) -> String {
    parent
        .as_ref()
        .map(|p| format!(" imported from {p}"))
        .unwrap_or_default()
}

fn in_package(package_json: &Option<PathBuf>) -> String {
    package_json
        .as_ref()
        .map(|p| format!(" in package {}", p.display()))
        .unwrap_or_default()
}

/// Resolution failure.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Cannot find module '{request}'{}", imported_from(.parent))]
    NotFound {
        /// What was looked for: an absolute path for path-like specifiers,
        /// the specifier itself for packages.
        request: String,
        parent: Option<String>,
    },

    #[error(
        "Package subpath '{subpath}' is not defined by \"exports\" in {}{}",
        .package_json.display(),
        imported_from(.parent)
    )]
    PathNotExported {
        subpath: String,
        package_json: PathBuf,
        parent: Option<String>,
    },

    #[error("Directory import '{request}' is not supported resolving ES modules{}", imported_from(.parent))]
    UnsupportedDirectoryImport {
        request: String,
        parent: Option<String>,
    },

    #[error(
        "Package import specifier \"{specifier}\" is not defined{}{}",
        in_package(.package_json),
        imported_from(.parent)
    )]
    PackageImportNotDefined {
        specifier: String,
        package_json: Option<PathBuf>,
        parent: Option<String>,
    },

    #[error("Only file, data and node URLs are supported. Received protocol '{scheme}'")]
    UnsupportedScheme { scheme: String },

    #[error("Invalid module specifier '{specifier}': {reason}")]
    InvalidSpecifier { specifier: String, reason: String },

    #[error("Error parsing: {}", .path.display())]
    MalformedMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "Project config {} cached for {} is missing from the config cache",
        .config_path.display(),
        .requester.display()
    )]
    InternalCacheInconsistency {
        requester: PathBuf,
        config_path: PathBuf,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResolveError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => codes::MODULE_NOT_FOUND,
            Self::PathNotExported { .. } => codes::PACKAGE_PATH_NOT_EXPORTED,
            Self::UnsupportedDirectoryImport { .. } => codes::UNSUPPORTED_DIR_IMPORT,
            Self::PackageImportNotDefined { .. } => codes::PACKAGE_IMPORT_NOT_DEFINED,
            Self::UnsupportedScheme { .. } => codes::UNSUPPORTED_ESM_URL_SCHEME,
            Self::InvalidSpecifier { .. } => codes::INVALID_MODULE_SPECIFIER,
            Self::MalformedMetadata { .. } => codes::MALFORMED_METADATA,
            Self::InternalCacheInconsistency { .. } => codes::INTERNAL_CACHE_INCONSISTENCY,
            Self::Io { .. } => codes::IO,
        }
    }

    /// Whether this failure must abort resolution even inside an optional
    /// fallback branch.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::NotFound { .. }
            | Self::PathNotExported { .. }
            | Self::UnsupportedDirectoryImport { .. }
            | Self::PackageImportNotDefined { .. }
            | Self::UnsupportedScheme { .. }
            | Self::InvalidSpecifier { .. } => false,
            Self::MalformedMetadata { .. }
            | Self::InternalCacheInconsistency { .. }
            | Self::Io { .. } => true,
        }
    }

    /// Remove a suffix the prober appended, so the message names what the
    /// user wrote instead of an internal retry candidate.
    #[must_use]
    pub fn strip_probe_suffix(mut self, suffix: &str) -> Self {
        let text = match &mut self {
            Self::NotFound { request, .. } | Self::UnsupportedDirectoryImport { request, .. } => {
                request
            }
            Self::PathNotExported { subpath, .. } => subpath,
            Self::PackageImportNotDefined { specifier, .. }
            | Self::InvalidSpecifier { specifier, .. } => specifier,
            Self::UnsupportedScheme { .. }
            | Self::MalformedMetadata { .. }
            | Self::InternalCacheInconsistency { .. }
            | Self::Io { .. } => return self,
        };
        if let Some(stripped) = text.strip_suffix(suffix) {
            *text = stripped.to_string();
        }
        self
    }

    /// Strip the `/index` (or bare `index`) suffix added by directory probing.
    #[must_use]
    pub fn strip_index_suffix(self, explicit_directory: bool) -> Self {
        if explicit_directory {
            self.strip_probe_suffix("index")
        } else {
            self.strip_probe_suffix(&format!("{MAIN_SEPARATOR_STR}index"))
        }
    }
}

/// Load failure.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown file extension \"{extension}\" for {url}")]
    UnknownFileExtension { extension: String, url: String },

    #[error("Module \"{url}\" needs an import attribute of \"type: json\"")]
    ImportAttributeMissing { url: String },

    #[error("Cannot load {url}: unsupported URL")]
    UnsupportedUrl { url: String },
}

impl LoadError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Resolve(e) => e.code(),
            Self::Transform(_) => codes::TRANSFORM_FAILED,
            Self::Io { .. } => codes::IO,
            Self::UnknownFileExtension { .. } => codes::UNKNOWN_FILE_EXTENSION,
            Self::ImportAttributeMissing { .. } => codes::IMPORT_ATTRIBUTE_MISSING,
            Self::UnsupportedUrl { .. } => codes::UNSUPPORTED_LOAD_URL,
        }
    }
}
