//! Extension and directory-index probing.

use super::orchestrator::Resolver;
use super::{ResolveContext, ResolvedModule};
use crate::error::ResolveError;

/// Extensions appended to extension-less specifiers, in order.
pub const PROBE_EXTENSIONS: &[&str] = &[".js", ".json", ".ts", ".tsx", ".jsx"];

impl Resolver {
    /// Resolve `specifier` with each probe extension appended; first
    /// success wins. On total failure the first attempt's error is returned
    /// naming the specifier without the appended extension.
    pub(super) fn try_extensions(
        &self,
        specifier: &str,
        ctx: &ResolveContext,
    ) -> Result<ResolvedModule, ResolveError> {
        let mut first_error: Option<ResolveError> = None;
        for extension in PROBE_EXTENSIONS {
            let candidate = format!("{specifier}{extension}");
            match self.resolve_inner(&candidate, ctx, true) {
                Ok(resolved) => {
                    tracing::trace!(specifier, extension, "extension probe hit");
                    return Ok(resolved);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e.strip_probe_suffix(extension));
                    }
                }
            }
        }
        Err(first_error.unwrap_or_else(|| ResolveError::NotFound {
            request: specifier.to_string(),
            parent: None,
        }))
    }

    /// Resolve a directory specifier through its index file.
    ///
    /// An explicit directory (`./lib/`) only tries `./lib/index.*`. Otherwise
    /// `./lib/index.*` is tried first, then `./lib.*`.
    pub(super) fn try_directory(
        &self,
        specifier: &str,
        ctx: &ResolveContext,
    ) -> Result<ResolvedModule, ResolveError> {
        let explicit_directory = specifier.ends_with('/');
        let append = if explicit_directory { "index" } else { "/index" };

        let index_error = match self.try_extensions(&format!("{specifier}{append}"), ctx) {
            Ok(resolved) => return Ok(resolved),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => e,
        };

        if !explicit_directory {
            match self.try_extensions(specifier, ctx) {
                Ok(resolved) => return Ok(resolved),
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => {}
            }
        }

        tracing::trace!(specifier, "directory probe failed");
        Err(index_error.strip_index_suffix(explicit_directory))
    }
}
