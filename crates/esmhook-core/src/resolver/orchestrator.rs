//! The resolution fallback chain.

use super::baseline::BaselineResolver;
use super::rewrite::source_rewrite;
use super::{ResolveContext, ResolvedModule};
use crate::config::HostRuntime;
use crate::error::ResolveError;
use crate::format::FormatResolver;
use crate::paths::{
    file_url_to_path, is_governed_source, is_in_dependency_storage, is_path_specifier,
};
use crate::tsconfig::ConfigStore;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// One step of the chain. Stages run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// tsconfig `paths` aliases.
    Alias,
    /// `.js` → `.ts` style rewrites for imports from governed sources.
    SourceRewrite,
    /// The runtime's own resolution, retried through the probers.
    Baseline,
}

const STAGES: &[Stage] = &[Stage::Alias, Stage::SourceRewrite, Stage::Baseline];

impl Stage {
    /// Nested resolutions (probe candidates, rewrites) skip the optional
    /// stages.
    fn runs_when_recursive(self) -> bool {
        matches!(self, Self::Baseline)
    }
}

/// Resolves import specifiers to module URLs and formats.
pub struct Resolver {
    baseline: Arc<dyn BaselineResolver>,
    configs: Arc<ConfigStore>,
    formats: FormatResolver,
    host: HostRuntime,
    /// Config discovery starts here when there is no importing file.
    cwd: PathBuf,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("host", &self.host)
            .field("cwd", &self.cwd)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    #[must_use]
    pub fn new(
        baseline: Arc<dyn BaselineResolver>,
        configs: Arc<ConfigStore>,
        formats: FormatResolver,
        cwd: PathBuf,
    ) -> Self {
        Self {
            baseline,
            configs,
            formats,
            host: HostRuntime::default(),
            cwd,
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: HostRuntime) -> Self {
        self.host = host;
        self
    }

    /// Resolve `specifier` imported from `ctx.parent_url`.
    pub fn resolve(
        &self,
        specifier: &str,
        ctx: &ResolveContext,
    ) -> Result<ResolvedModule, ResolveError> {
        let resolved = self.resolve_inner(specifier, ctx, false)?;
        tracing::debug!(
            specifier,
            url = %resolved.url,
            format = ?resolved.format,
            "resolved"
        );
        Ok(resolved)
    }

    /// One pass of the chain. `recursive` marks nested calls, which skip
    /// the alias and rewrite stages and the baseline retries.
    pub(super) fn resolve_inner(
        &self,
        specifier: &str,
        ctx: &ResolveContext,
        recursive: bool,
    ) -> Result<ResolvedModule, ResolveError> {
        let specifier = match specifier.strip_prefix("node:") {
            Some(bare) if !self.host.supports_node_prefix() => bare,
            _ => specifier,
        };

        if specifier.ends_with('/') {
            return self.try_directory(specifier, ctx);
        }

        for &stage in STAGES {
            if recursive && !stage.runs_when_recursive() {
                continue;
            }
            let outcome = match stage {
                Stage::Alias => self.try_aliases(specifier, ctx)?,
                Stage::SourceRewrite => self.try_source_rewrite(specifier, ctx)?,
                Stage::Baseline => Some(self.resolve_baseline(specifier, ctx, recursive)?),
            };
            if let Some(resolved) = outcome {
                return Ok(resolved);
            }
        }

        Err(ResolveError::NotFound {
            request: specifier.to_string(),
            parent: ctx.parent_url.as_ref().map(ToString::to_string),
        })
    }

    fn try_aliases(
        &self,
        specifier: &str,
        ctx: &ResolveContext,
    ) -> Result<Option<ResolvedModule>, ResolveError> {
        if is_path_specifier(specifier) {
            return Ok(None);
        }
        if ctx
            .parent_url
            .as_ref()
            .is_some_and(|p| is_in_dependency_storage(p.as_str()))
        {
            return Ok(None);
        }

        let reference = ctx
            .parent_url
            .as_ref()
            .and_then(file_url_to_path)
            .unwrap_or_else(|| self.cwd.clone());
        let Some(config) = self.configs.load_project_config(&reference)? else {
            return Ok(None);
        };
        if !config.has_aliases() {
            return Ok(None);
        }

        let candidates = config.match_aliases(specifier);
        tracing::debug!(specifier, candidates = candidates.len(), "tsconfig paths");
        for candidate in candidates {
            let Ok(url) = Url::from_file_path(&candidate) else {
                continue;
            };
            match self.resolve_inner(url.as_str(), ctx, false) {
                Ok(resolved) => return Ok(Some(resolved)),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::trace!(candidate = %candidate.display(), error = %e, "alias candidate failed");
                }
            }
        }
        Ok(None)
    }

    fn try_source_rewrite(
        &self,
        specifier: &str,
        ctx: &ResolveContext,
    ) -> Result<Option<ResolvedModule>, ResolveError> {
        let from_governed = ctx
            .parent_url
            .as_ref()
            .is_some_and(|p| is_governed_source(p.as_str()));
        if !from_governed {
            return Ok(None);
        }
        let Some(rewritten) = source_rewrite(specifier) else {
            return Ok(None);
        };

        match self.resolve_inner(&rewritten, ctx, true) {
            Ok(resolved) => {
                tracing::debug!(specifier, rewritten = %rewritten, "prefer source extension");
                Ok(Some(resolved))
            }
            Err(ResolveError::NotFound { .. } | ResolveError::PathNotExported { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn resolve_baseline(
        &self,
        specifier: &str,
        ctx: &ResolveContext,
        recursive: bool,
    ) -> Result<ResolvedModule, ResolveError> {
        let error = match self.baseline.resolve(specifier, ctx) {
            Ok(resolved) => return self.assign_format(resolved),
            Err(e) => e,
        };
        if recursive {
            return Err(error);
        }

        match &error {
            ResolveError::UnsupportedDirectoryImport { .. } => {
                tracing::trace!(specifier, "baseline rejected directory import, probing index");
                match self.try_directory(specifier, ctx) {
                    Ok(resolved) => Ok(resolved),
                    Err(ResolveError::PackageImportNotDefined { .. }) => Err(error),
                    Err(e) => Err(e),
                }
            }
            ResolveError::NotFound { .. } => {
                tracing::trace!(specifier, "baseline found nothing, probing extensions");
                match self.try_extensions(specifier, ctx) {
                    Ok(resolved) => Ok(resolved),
                    Err(e) if e.is_fatal() => Err(e),
                    Err(_) => Err(error),
                }
            }
            _ => Err(error),
        }
    }

    /// Fill in a missing format for `file:` results.
    fn assign_format(&self, mut resolved: ResolvedModule) -> Result<ResolvedModule, ResolveError> {
        if resolved.format.is_none() && resolved.url.scheme() == "file" {
            if let Some(path) = file_url_to_path(&resolved.url) {
                resolved.format = self.formats.resolve_format(&path)?;
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ModuleFormat;
    use crate::metadata::MetadataStore;
    use crate::resolver::NodeEsmResolver;
    use semver::Version;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn resolver_at(root: &Path) -> Resolver {
        let metadata = Arc::new(MetadataStore::new());
        Resolver::new(
            Arc::new(NodeEsmResolver::new(Arc::clone(&metadata), root.to_path_buf())),
            Arc::new(ConfigStore::new(None)),
            FormatResolver::new(metadata),
            root.to_path_buf(),
        )
    }

    fn ctx_from(file: &Path) -> ResolveContext {
        ResolveContext::with_parent(Url::from_file_path(file).unwrap())
    }

    fn project() -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        fs::write(root.join("package.json"), r#"{"name": "app"}"#).unwrap();
        (dir, root)
    }

    #[test]
    fn test_extensionless_resolves_single_candidate() {
        let (_dir, root) = project();
        fs::write(root.join("util.ts"), "").unwrap();
        let r = resolver_at(&root);

        let m = r.resolve("./util", &ctx_from(&root.join("main.ts"))).unwrap();
        assert_eq!(m.url, Url::from_file_path(root.join("util.ts")).unwrap());
        assert_eq!(m.format, Some(ModuleFormat::CommonJs));
    }

    #[test]
    fn test_extensionless_not_found_names_specifier() {
        let (_dir, root) = project();
        let r = resolver_at(&root);

        let err = r.resolve("./missing", &ctx_from(&root.join("main.ts"))).unwrap_err();
        assert_eq!(err.code(), "ERR_MODULE_NOT_FOUND");
        let expected = format!("'{}'", root.join("missing").display());
        assert!(err.to_string().contains(&expected), "{err}");
    }

    #[test]
    fn test_probe_order_prefers_js() {
        let (_dir, root) = project();
        fs::write(root.join("dual.js"), "").unwrap();
        fs::write(root.join("dual.ts"), "").unwrap();
        let r = resolver_at(&root);

        let m = r.resolve("./dual", &ctx_from(&root.join("main.mjs"))).unwrap();
        assert!(m.url.path().ends_with("/dual.js"));
    }

    #[test]
    fn test_directory_index_preferred_over_sibling_file() {
        let (_dir, root) = project();
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(root.join("lib/index.ts"), "").unwrap();
        fs::write(root.join("lib.ts"), "").unwrap();
        let r = resolver_at(&root);

        let m = r.resolve("./lib", &ctx_from(&root.join("main.ts"))).unwrap();
        assert!(m.url.path().ends_with("/lib/index.ts"));
    }

    #[test]
    fn test_explicit_directory() {
        let (_dir, root) = project();
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(root.join("lib/index.js"), "").unwrap();
        let r = resolver_at(&root);

        let m = r.resolve("./lib/", &ctx_from(&root.join("main.ts"))).unwrap();
        assert!(m.url.path().ends_with("/lib/index.js"));
    }

    #[test]
    fn test_explicit_directory_without_index() {
        let (_dir, root) = project();
        fs::create_dir_all(root.join("empty")).unwrap();
        let r = resolver_at(&root);

        let err = r.resolve("./empty/", &ctx_from(&root.join("main.ts"))).unwrap_err();
        assert_eq!(err.code(), "ERR_MODULE_NOT_FOUND");
        let expected = format!("'{}/'", root.join("empty").display());
        assert!(err.to_string().contains(&expected), "{err}");
    }

    #[test]
    fn test_directory_without_index_names_directory() {
        let (_dir, root) = project();
        fs::create_dir_all(root.join("empty")).unwrap();
        let r = resolver_at(&root);

        let err = r.resolve("./empty", &ctx_from(&root.join("main.ts"))).unwrap_err();
        let expected = format!("'{}'", root.join("empty").display());
        assert!(err.to_string().contains(&expected), "{err}");
    }

    #[test]
    fn test_js_specifier_prefers_ts_source() {
        let (_dir, root) = project();
        fs::write(root.join("util.ts"), "").unwrap();
        let r = resolver_at(&root);

        let m = r.resolve("./util.js", &ctx_from(&root.join("main.ts"))).unwrap();
        assert!(m.url.path().ends_with("/util.ts"));
    }

    #[test]
    fn test_js_specifier_from_plain_js_is_not_rewritten() {
        let (_dir, root) = project();
        fs::write(root.join("util.ts"), "").unwrap();
        let r = resolver_at(&root);

        let err = r.resolve("./util.js", &ctx_from(&root.join("main.js"))).unwrap_err();
        assert_eq!(err.code(), "ERR_MODULE_NOT_FOUND");
    }

    #[test]
    fn test_rewrite_to_directory_is_not_masked() {
        let (_dir, root) = project();
        fs::write(root.join("x.js"), "").unwrap();
        fs::create_dir_all(root.join("x.ts")).unwrap();
        let r = resolver_at(&root);

        let err = r.resolve("./x.js", &ctx_from(&root.join("main.ts"))).unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedDirectoryImport { .. }), "{err}");
        assert_eq!(err.code(), "ERR_UNSUPPORTED_DIR_IMPORT");
    }

    #[test]
    fn test_directory_import_through_imports_map_keeps_original_error() {
        let (_dir, root) = project();
        fs::write(root.join("package.json"), r##"{"imports": {"#lib": "./lib"}}"##).unwrap();
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(root.join("lib/index.js"), "").unwrap();
        let r = resolver_at(&root);

        let err = r.resolve("#lib", &ctx_from(&root.join("main.js"))).unwrap_err();
        assert!(
            matches!(err, ResolveError::UnsupportedDirectoryImport { ref request, .. } if request.ends_with("lib")),
            "{err}"
        );
    }

    #[test]
    fn test_js_kept_when_no_ts_counterpart() {
        let (_dir, root) = project();
        fs::write(root.join("util.js"), "").unwrap();
        let r = resolver_at(&root);

        let m = r.resolve("./util.js", &ctx_from(&root.join("main.ts"))).unwrap();
        assert!(m.url.path().ends_with("/util.js"));
        assert_eq!(m.format, None);
    }

    #[test]
    fn test_alias_first_resolvable_candidate_wins() {
        let (_dir, root) = project();
        fs::write(
            root.join("tsconfig.json"),
            r#"{ "compilerOptions": { "paths": { "@/*": ["./first/*", "./second/*"] } } }"#,
        )
        .unwrap();
        fs::create_dir_all(root.join("second")).unwrap();
        fs::write(root.join("second/util.ts"), "").unwrap();
        let r = resolver_at(&root);

        let m = r.resolve("@/util", &ctx_from(&root.join("main.ts"))).unwrap();
        assert!(m.url.path().ends_with("/second/util.ts"));
    }

    #[test]
    fn test_alias_falls_back_to_baseline() {
        let (_dir, root) = project();
        fs::write(
            root.join("tsconfig.json"),
            r#"{ "compilerOptions": { "paths": { "*": ["./vendor/*"] } } }"#,
        )
        .unwrap();
        let pkg = root.join("node_modules/dep");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("package.json"), r#"{"main": "main.js"}"#).unwrap();
        fs::write(pkg.join("main.js"), "").unwrap();
        let r = resolver_at(&root);

        let m = r.resolve("dep", &ctx_from(&root.join("main.ts"))).unwrap();
        assert!(m.url.path().ends_with("/node_modules/dep/main.js"));
    }

    #[test]
    fn test_aliases_ignored_inside_node_modules() {
        let (_dir, root) = project();
        fs::write(
            root.join("tsconfig.json"),
            r#"{ "compilerOptions": { "paths": { "lib/*": ["./src/*"] } } }"#,
        )
        .unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/util.ts"), "").unwrap();
        let r = resolver_at(&root);

        let from_app = r.resolve("lib/util", &ctx_from(&root.join("main.ts"))).unwrap();
        assert!(from_app.url.path().ends_with("/src/util.ts"));

        let importer = root.join("node_modules/dep/index.js");
        let err = r.resolve("lib/util", &ctx_from(&importer)).unwrap_err();
        assert_eq!(err.code(), "ERR_MODULE_NOT_FOUND");
    }

    #[test]
    fn test_json_format() {
        let (_dir, root) = project();
        fs::write(root.join("data.json"), "{}").unwrap();
        let r = resolver_at(&root);

        let m = r.resolve("./data.json", &ctx_from(&root.join("main.ts"))).unwrap();
        assert_eq!(m.format, Some(ModuleFormat::Json));
    }

    #[test]
    fn test_malformed_package_json_is_fatal() {
        let (_dir, root) = project();
        fs::write(root.join("package.json"), "{ broken").unwrap();
        fs::write(root.join("util.ts"), "").unwrap();
        let r = resolver_at(&root);

        let err = r.resolve("./util", &ctx_from(&root.join("main.ts"))).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedMetadata { .. }));
    }

    #[test]
    fn test_node_prefix_stripped_on_old_hosts() {
        let (_dir, root) = project();
        let r = resolver_at(&root).with_host(HostRuntime::new(Version::new(12, 19, 0)));
        let m = r.resolve("node:fs", &ResolveContext::default()).unwrap();
        assert_eq!(m.url.as_str(), "node:fs");
    }

    /// Records every specifier the baseline sees.
    struct Recording {
        inner: NodeEsmResolver,
        seen: Mutex<Vec<String>>,
    }

    impl BaselineResolver for Recording {
        fn resolve(
            &self,
            specifier: &str,
            ctx: &ResolveContext,
        ) -> Result<ResolvedModule, ResolveError> {
            self.seen.lock().unwrap().push(specifier.to_string());
            self.inner.resolve(specifier, ctx)
        }
    }

    #[test]
    fn test_probe_sequence() {
        let (_dir, root) = project();
        let metadata = Arc::new(MetadataStore::new());
        let recording = Arc::new(Recording {
            inner: NodeEsmResolver::new(Arc::clone(&metadata), root.clone()),
            seen: Mutex::new(Vec::new()),
        });
        let r = Resolver::new(
            recording.clone(),
            Arc::new(ConfigStore::new(None)),
            FormatResolver::new(metadata),
            root.clone(),
        );

        r.resolve("./nothing", &ctx_from(&root.join("main.js")))
            .unwrap_err();
        let seen = recording.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                "./nothing",
                "./nothing.js",
                "./nothing.json",
                "./nothing.ts",
                "./nothing.tsx",
                "./nothing.jsx",
            ]
        );
    }
}
