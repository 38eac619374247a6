//! `files`/`include`/`exclude` matching.

use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};

const IMPLICIT_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".mts", ".cts"];
const IMPLICIT_JS_EXTENSIONS: &[&str] = &[".js", ".jsx", ".mjs", ".cjs"];
const DEFAULT_EXCLUDES: &[&str] = &["node_modules", "bower_components", "jspm_packages"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A glob declared relative to the directory of the config that declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedPattern {
    pub base: PathBuf,
    pub pattern: String,
}

impl ScopedPattern {
    #[must_use]
    pub fn new(base: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            pattern: pattern.into(),
        }
    }

    fn compile(&self, suffix: &str) -> Option<Pattern> {
        let base = Pattern::escape(&self.base.to_string_lossy());
        let rel = self.pattern.trim_start_matches("./").trim_end_matches('/');
        let joined = if rel.is_empty() || rel == "." {
            format!("{base}{suffix}")
        } else {
            format!("{base}/{rel}{suffix}")
        };
        match Pattern::new(&joined) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(pattern = %self.pattern, error = %e, "ignoring invalid tsconfig glob");
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
struct IncludeRule {
    pattern: Pattern,
    implicit_extensions: bool,
}

/// Decides which source files a project config governs.
#[derive(Debug, Clone, Default)]
pub struct FilesMatcher {
    files: Vec<PathBuf>,
    include: Vec<IncludeRule>,
    exclude: Vec<Pattern>,
    allow_js: bool,
}

/// Inputs to [`FilesMatcher::new`], already merged across `extends`.
#[derive(Debug, Clone, Default)]
pub struct FilesSpec {
    pub config_dir: PathBuf,
    pub files: Option<Vec<PathBuf>>,
    pub include: Option<Vec<ScopedPattern>>,
    pub exclude: Option<Vec<ScopedPattern>>,
    pub out_dir: Option<PathBuf>,
    pub allow_js: bool,
}

impl FilesMatcher {
    #[must_use]
    pub fn new(spec: FilesSpec) -> Self {
        let include_patterns = match (&spec.include, &spec.files) {
            (Some(include), _) => include.clone(),
            (None, Some(_)) => Vec::new(),
            (None, None) => vec![ScopedPattern::new(&spec.config_dir, "**/*")],
        };

        let include = include_patterns
            .iter()
            .filter_map(|scoped| {
                let last = scoped.pattern.rsplit('/').next().unwrap_or_default();
                let has_wildcard = last.contains('*') || last.contains('?');
                let (suffix, implicit_extensions) = if has_wildcard {
                    (String::new(), !last.contains('.'))
                } else if last.contains('.') {
                    (String::new(), false)
                } else {
                    // A bare directory includes everything below it.
                    ("/**/*".to_string(), true)
                };
                Some(IncludeRule {
                    pattern: scoped.compile(&suffix)?,
                    implicit_extensions,
                })
            })
            .collect();

        let exclude_patterns = spec.exclude.clone().unwrap_or_else(|| {
            let mut defaults: Vec<ScopedPattern> = DEFAULT_EXCLUDES
                .iter()
                .map(|name| ScopedPattern::new(&spec.config_dir, *name))
                .collect();
            if let Some(out_dir) = &spec.out_dir {
                defaults.push(ScopedPattern::new(out_dir, ""));
            }
            defaults
        });

        let exclude = exclude_patterns
            .iter()
            .flat_map(|scoped| [scoped.compile(""), scoped.compile("/**/*")])
            .flatten()
            .collect();

        Self {
            files: spec.files.unwrap_or_default(),
            include,
            exclude,
            allow_js: spec.allow_js,
        }
    }

    /// Whether `path` (absolute) belongs to the project.
    #[must_use]
    pub fn governs(&self, path: &Path) -> bool {
        if self.files.iter().any(|f| f == path) {
            return true;
        }

        let text = path.to_string_lossy();
        let included = self.include.iter().any(|rule| {
            rule.pattern.matches_with(&text, MATCH_OPTIONS)
                && (!rule.implicit_extensions || self.has_implicit_extension(&text))
        });
        if !included {
            return false;
        }

        !self
            .exclude
            .iter()
            .any(|p| p.matches_with(&text, MATCH_OPTIONS))
    }

    fn has_implicit_extension(&self, path: &str) -> bool {
        IMPLICIT_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
            || (self.allow_js && IMPLICIT_JS_EXTENSIONS.iter().any(|ext| path.ends_with(ext)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> FilesSpec {
        FilesSpec {
            config_dir: PathBuf::from("/app"),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_include_governs_typescript() {
        let m = FilesMatcher::new(spec());
        assert!(m.governs(Path::new("/app/src/main.ts")));
        assert!(m.governs(Path::new("/app/view.tsx")));
        assert!(m.governs(Path::new("/app/types.d.ts")));
        assert!(!m.governs(Path::new("/app/script.js")));
        assert!(!m.governs(Path::new("/other/main.ts")));
    }

    #[test]
    fn test_allow_js() {
        let m = FilesMatcher::new(FilesSpec {
            allow_js: true,
            ..spec()
        });
        assert!(m.governs(Path::new("/app/script.js")));
        assert!(m.governs(Path::new("/app/view.jsx")));
    }

    #[test]
    fn test_default_excludes() {
        let m = FilesMatcher::new(FilesSpec {
            out_dir: Some(PathBuf::from("/app/dist")),
            ..spec()
        });
        assert!(!m.governs(Path::new("/app/node_modules/pkg/index.ts")));
        assert!(!m.governs(Path::new("/app/dist/main.ts")));
        assert!(m.governs(Path::new("/app/src/main.ts")));
    }

    #[test]
    fn test_include_directory_and_explicit_glob() {
        let m = FilesMatcher::new(FilesSpec {
            include: Some(vec![
                ScopedPattern::new("/app", "src"),
                ScopedPattern::new("/app", "data/*.json"),
            ]),
            ..spec()
        });
        assert!(m.governs(Path::new("/app/src/deep/main.ts")));
        assert!(m.governs(Path::new("/app/data/config.json")));
        assert!(!m.governs(Path::new("/app/data/nested/config.json")));
        assert!(!m.governs(Path::new("/app/test/main.ts")));
    }

    #[test]
    fn test_explicit_exclude() {
        let m = FilesMatcher::new(FilesSpec {
            exclude: Some(vec![ScopedPattern::new("/app", "src/**/*.test.ts")]),
            ..spec()
        });
        assert!(!m.governs(Path::new("/app/src/util.test.ts")));
        assert!(m.governs(Path::new("/app/src/util.ts")));
        // An explicit exclude list replaces the defaults.
        assert!(m.governs(Path::new("/app/node_modules/pkg/index.ts")));
    }

    #[test]
    fn test_files_list_without_include() {
        let m = FilesMatcher::new(FilesSpec {
            files: Some(vec![PathBuf::from("/app/entry.ts")]),
            ..spec()
        });
        assert!(m.governs(Path::new("/app/entry.ts")));
        assert!(!m.governs(Path::new("/app/other.ts")));
    }

    #[test]
    fn test_base_with_glob_metacharacters() {
        let m = FilesMatcher::new(FilesSpec {
            config_dir: PathBuf::from("/work/[v2]"),
            ..Default::default()
        });
        assert!(m.governs(Path::new("/work/[v2]/main.ts")));
    }
}
