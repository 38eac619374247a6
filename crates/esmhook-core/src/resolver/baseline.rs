//! Strict Node.js ESM resolution: the baseline the orchestrator falls back to.
//!
//! No extension probing and no directory indexes; those are the
//! orchestrator's job. A relative specifier resolves to exactly one file or
//! fails with the error code the runtime would produce.

use super::exports::{resolve_exports, resolve_imports, ESM_CONDITIONS};
use super::{ResolveContext, ResolvedModule};
use crate::error::ResolveError;
use crate::format::ModuleFormat;
use crate::metadata::{MetadataStore, PackageDescriptor, PACKAGE_JSON};
use crate::paths::{display_url, file_url_to_path, NODE_MODULES};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Node.js builtin module names (without the `node:` prefix).
pub const BUILTIN_MODULES: &[&str] = &[
    "assert",
    "assert/strict",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "dns/promises",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "path/posix",
    "path/win32",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "readline/promises",
    "repl",
    "stream",
    "stream/consumers",
    "stream/promises",
    "stream/web",
    "string_decoder",
    "sys",
    "timers",
    "timers/promises",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "util/types",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Legacy `main` fallbacks tried when a package has no `exports`.
const LEGACY_MAIN_SUFFIXES: &[&str] = &["", ".js", ".json", "/index.js", "/index.json"];
const LEGACY_INDEXES: &[&str] = &["index.js", "index.json"];

/// Whether `name` is a builtin module.
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_MODULES.contains(&name)
}

/// The runtime's own resolution step.
pub trait BaselineResolver: Send + Sync {
    fn resolve(
        &self,
        specifier: &str,
        ctx: &ResolveContext,
    ) -> Result<ResolvedModule, ResolveError>;
}

/// Strict Node ESM resolver over the real filesystem.
#[derive(Debug, Clone)]
pub struct NodeEsmResolver {
    metadata: Arc<MetadataStore>,
    /// Base for entry points (no importer).
    cwd: PathBuf,
}

impl NodeEsmResolver {
    #[must_use]
    pub fn new(metadata: Arc<MetadataStore>, cwd: PathBuf) -> Self {
        Self { metadata, cwd }
    }

    fn parent_url(&self, ctx: &ResolveContext) -> Result<Url, ResolveError> {
        if let Some(parent) = &ctx.parent_url {
            return Ok(parent.clone());
        }
        Url::from_directory_path(&self.cwd).map_err(|()| ResolveError::InvalidSpecifier {
            specifier: self.cwd.display().to_string(),
            reason: "working directory is not an absolute path".to_string(),
        })
    }

    /// A `file:` URL must name an existing file.
    fn resolve_file_url(
        &self,
        url: &Url,
        parent: Option<&String>,
    ) -> Result<ResolvedModule, ResolveError> {
        let path = file_url_to_path(url).ok_or_else(|| ResolveError::InvalidSpecifier {
            specifier: url.to_string(),
            reason: "not a valid file URL".to_string(),
        })?;

        if url.path().ends_with('/') || path.is_dir() {
            return Err(ResolveError::UnsupportedDirectoryImport {
                request: path.display().to_string(),
                parent: parent.cloned(),
            });
        }
        if !path.is_file() {
            return Err(ResolveError::NotFound {
                request: path.display().to_string(),
                parent: parent.cloned(),
            });
        }

        let canonical = dunce::canonicalize(&path).unwrap_or(path);
        let mut resolved =
            Url::from_file_path(&canonical).map_err(|()| ResolveError::InvalidSpecifier {
                specifier: canonical.display().to_string(),
                reason: "cannot be expressed as a file URL".to_string(),
            })?;
        resolved.set_query(url.query());
        resolved.set_fragment(url.fragment());
        Ok(ResolvedModule::new(resolved))
    }

    fn resolve_file_path(
        &self,
        path: &Path,
        parent: Option<&String>,
    ) -> Result<ResolvedModule, ResolveError> {
        let url = Url::from_file_path(path).map_err(|()| ResolveError::InvalidSpecifier {
            specifier: path.display().to_string(),
            reason: "cannot be expressed as a file URL".to_string(),
        })?;
        self.resolve_file_url(&url, parent)
    }

    /// `#name` through the nearest package's `imports` field.
    fn resolve_package_import(
        &self,
        specifier: &str,
        parent_url: &Url,
        parent: Option<&String>,
    ) -> Result<ResolvedModule, ResolveError> {
        let not_defined = |package_json: Option<PathBuf>| ResolveError::PackageImportNotDefined {
            specifier: specifier.to_string(),
            package_json,
            parent: parent.cloned(),
        };

        let Some(parent_path) = file_url_to_path(parent_url) else {
            return Err(not_defined(None));
        };
        let Some(descriptor) = self.metadata.find_package_descriptor(&parent_path)? else {
            return Err(not_defined(None));
        };
        let target = descriptor
            .raw
            .get("imports")
            .and_then(|imports| resolve_imports(imports, specifier, ESM_CONDITIONS));
        let Some(target) = target else {
            return Err(not_defined(Some(descriptor.path.clone())));
        };

        if let Some(relative) = target.strip_prefix("./") {
            return self.resolve_file_path(&descriptor.dir().join(relative), parent);
        }
        // Bare target: resolved as a dependency of the declaring package.
        self.resolve_package(&target, descriptor.dir(), parent)
    }

    /// Bare specifier through `node_modules`, starting at `from_dir`.
    fn resolve_package(
        &self,
        specifier: &str,
        from_dir: &Path,
        parent: Option<&String>,
    ) -> Result<ResolvedModule, ResolveError> {
        let (name, subpath) = parse_bare_specifier(specifier).ok_or_else(|| {
            ResolveError::InvalidSpecifier {
                specifier: specifier.to_string(),
                reason: "is not a valid package name".to_string(),
            }
        })?;

        let mut current = Some(from_dir);
        while let Some(dir) = current {
            if dir.file_name().is_some_and(|n| n == NODE_MODULES) {
                current = dir.parent();
                continue;
            }
            let package_dir = dir.join(NODE_MODULES).join(name);
            if package_dir.is_dir() {
                let descriptor = self.metadata.read_descriptor(&package_dir.join(PACKAGE_JSON))?;
                return self.resolve_in_package(
                    &package_dir,
                    descriptor.as_deref(),
                    &subpath,
                    parent,
                );
            }
            current = dir.parent();
        }

        Err(ResolveError::NotFound {
            request: specifier.to_string(),
            parent: parent.cloned(),
        })
    }

    fn resolve_in_package(
        &self,
        package_dir: &Path,
        descriptor: Option<&PackageDescriptor>,
        subpath: &str,
        parent: Option<&String>,
    ) -> Result<ResolvedModule, ResolveError> {
        if let Some(descriptor) = descriptor {
            if let Some(exports) = descriptor.raw.get("exports").filter(|e| !e.is_null()) {
                let Some(target) = resolve_exports(exports, subpath, ESM_CONDITIONS) else {
                    return Err(ResolveError::PathNotExported {
                        subpath: subpath.to_string(),
                        package_json: descriptor.path.clone(),
                        parent: parent.cloned(),
                    });
                };
                let relative = target.trim_start_matches("./");
                return self.resolve_file_path(&package_dir.join(relative), parent);
            }
        }

        if subpath != "." {
            let relative = subpath.trim_start_matches("./");
            return self.resolve_file_path(&package_dir.join(relative), parent);
        }

        self.resolve_legacy_main(package_dir, descriptor, parent)
    }

    fn resolve_legacy_main(
        &self,
        package_dir: &Path,
        descriptor: Option<&PackageDescriptor>,
        parent: Option<&String>,
    ) -> Result<ResolvedModule, ResolveError> {
        let main = descriptor
            .and_then(|d| d.raw.get("main"))
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty());

        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(main) = main {
            let base = package_dir.join(main.trim_start_matches("./"));
            for suffix in LEGACY_MAIN_SUFFIXES {
                let mut candidate = base.clone().into_os_string();
                candidate.push(suffix);
                candidates.push(PathBuf::from(candidate));
            }
        }
        candidates.extend(LEGACY_INDEXES.iter().map(|index| package_dir.join(index)));

        match candidates.into_iter().find(|c| c.is_file()) {
            Some(found) => self.resolve_file_path(&found, parent),
            None => Err(ResolveError::NotFound {
                request: format!("{}{}", package_dir.display(), std::path::MAIN_SEPARATOR),
                parent: parent.cloned(),
            }),
        }
    }
}

impl BaselineResolver for NodeEsmResolver {
    fn resolve(
        &self,
        specifier: &str,
        ctx: &ResolveContext,
    ) -> Result<ResolvedModule, ResolveError> {
        let parent_url = self.parent_url(ctx)?;
        let parent_display = ctx.parent_url.as_ref().map(display_url);
        let parent = parent_display.as_ref();

        if let Some(name) = specifier.strip_prefix("node:") {
            if is_builtin(name) {
                return builtin_module(name);
            }
            return Err(ResolveError::NotFound {
                request: specifier.to_string(),
                parent: parent.cloned(),
            });
        }
        if is_builtin(specifier) {
            return builtin_module(specifier);
        }

        if specifier.starts_with('/')
            || specifier.starts_with("./")
            || specifier.starts_with("../")
            || specifier == "."
            || specifier == ".."
        {
            let url = parent_url
                .join(specifier)
                .map_err(|e| ResolveError::InvalidSpecifier {
                    specifier: specifier.to_string(),
                    reason: e.to_string(),
                })?;
            return self.resolve_file_url(&url, parent);
        }

        if specifier.starts_with('#') {
            return self.resolve_package_import(specifier, &parent_url, parent);
        }

        if let Ok(url) = Url::parse(specifier) {
            return match url.scheme() {
                "file" => self.resolve_file_url(&url, parent),
                "data" => Ok(ResolvedModule::new(url)),
                "node" => builtin_module(url.path()),
                scheme => Err(ResolveError::UnsupportedScheme {
                    scheme: format!("{scheme}:"),
                }),
            };
        }

        let from_dir = file_url_to_path(&parent_url)
            .map(|p| {
                if parent_url.path().ends_with('/') {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| self.cwd.clone());
        self.resolve_package(specifier, &from_dir, parent)
    }
}

fn builtin_module(name: &str) -> Result<ResolvedModule, ResolveError> {
    let url = Url::parse(&format!("node:{name}")).map_err(|e| ResolveError::InvalidSpecifier {
        specifier: format!("node:{name}"),
        reason: e.to_string(),
    })?;
    Ok(ResolvedModule::new(url).with_format(Some(ModuleFormat::Builtin)))
}

/// Split a bare specifier into package name and `exports`-style subpath.
///
/// `"lodash"` → `("lodash", ".")`, `"@scope/pkg/sub"` → `("@scope/pkg", "./sub")`.
fn parse_bare_specifier(specifier: &str) -> Option<(&str, String)> {
    let split_at = if specifier.starts_with('@') {
        let first = specifier.find('/')?;
        specifier[first + 1..]
            .find('/')
            .map(|second| first + 1 + second)
    } else {
        specifier.find('/')
    };

    let (name, rest) = match split_at {
        Some(i) => (&specifier[..i], &specifier[i..]),
        None => (specifier, ""),
    };

    if name.is_empty()
        || name.starts_with('.')
        || name.contains('\\')
        || name.contains('%')
        || name.ends_with('/')
        || (name.starts_with('@') && !name.contains('/'))
    {
        return None;
    }

    let subpath = if rest.is_empty() {
        ".".to_string()
    } else {
        format!(".{rest}")
    };
    Some((name, subpath))
}
