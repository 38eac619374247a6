//! Specifier classification and path/URL helpers.

use std::path::{Component, Path, PathBuf};
use url::Url;

/// Scheme prefix of file URLs.
pub const FILE_PROTOCOL: &str = "file://";

/// Directory name that marks dependency storage.
pub const NODE_MODULES: &str = "node_modules";

/// Extensions of sources that are transformed before execution.
const GOVERNED_SOURCE_EXTENSIONS: &[&str] = &[".ts", ".cts", ".mts", ".tsx", ".jsx"];

/// Whether a path or URL names a governed source file (`.ts`, `.cts`,
/// `.mts`, `.tsx`, `.jsx`).
#[must_use]
pub fn is_governed_source(path_or_url: &str) -> bool {
    GOVERNED_SOURCE_EXTENSIONS
        .iter()
        .any(|ext| path_or_url.ends_with(ext))
}

/// Whether a specifier is a path (`/`, `./`, `../`) or a `file://` URL.
///
/// Everything else is a candidate for tsconfig `paths` aliasing.
#[must_use]
pub fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with(FILE_PROTOCOL)
        || specifier.starts_with('/')
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Whether a specifier is relative to its importer (`./`, `../`, `.`, `..`).
#[must_use]
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Whether a module URL lives inside dependency storage.
///
/// This is a substring heuristic on the URL; it does not resolve symlinks.
#[must_use]
pub fn is_in_dependency_storage(url: &str) -> bool {
    url.contains("/node_modules/")
}

/// Normalize a path by removing `.` and resolving `..` components lexically.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other),
        }
    }
    result
}

/// Convert a `file:` URL into a filesystem path.
#[must_use]
pub fn file_url_to_path(url: &Url) -> Option<PathBuf> {
    if url.scheme() == "file" {
        url.to_file_path().ok()
    } else {
        None
    }
}

/// Human-readable form of an importer URL for error messages: the path for
/// `file:` URLs, the URL text otherwise.
#[must_use]
pub fn display_url(url: &Url) -> String {
    file_url_to_path(url).map_or_else(|| url.to_string(), |p| p.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_governed_source() {
        assert!(is_governed_source("file:///app/main.ts"));
        assert!(is_governed_source("/app/view.tsx"));
        assert!(is_governed_source("/app/view.jsx"));
        assert!(is_governed_source("/app/lib.mts"));
        assert!(is_governed_source("/app/lib.cts"));
        assert!(!is_governed_source("/app/lib.js"));
        assert!(!is_governed_source("/app/data.json"));
        assert!(!is_governed_source("/app/types.d.tsx.map"));
    }

    #[test]
    fn test_path_specifier() {
        assert!(is_path_specifier("./util"));
        assert!(is_path_specifier("../util"));
        assert!(is_path_specifier("/abs/util"));
        assert!(is_path_specifier("file:///abs/util"));
        assert!(!is_path_specifier("@/util"));
        assert!(!is_path_specifier("lodash"));
        assert!(!is_path_specifier("~/util"));
    }

    #[test]
    fn test_dependency_storage() {
        assert!(is_in_dependency_storage(
            "file:///app/node_modules/pkg/index.js"
        ));
        assert!(!is_in_dependency_storage("file:///app/src/index.ts"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/app/src/./lib/../util")),
            PathBuf::from("/app/src/util")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_file_url_round_trip() {
        let parsed = Url::from_file_path("/app/my file.ts").unwrap();
        assert_eq!(parsed.as_str(), "file:///app/my%20file.ts");
        assert_eq!(
            file_url_to_path(&parsed),
            Some(PathBuf::from("/app/my file.ts"))
        );
        assert_eq!(display_url(&parsed), "/app/my file.ts");
    }

    #[test]
    fn test_non_file_url_has_no_path() {
        let url = Url::parse("node:fs").unwrap();
        assert_eq!(file_url_to_path(&url), None);
        assert_eq!(display_url(&url), "node:fs");
    }
}
