//! Source-extension rewriting (`./util.js` → `./util.ts`).

/// Output extension → source extension.
const SOURCE_EXTENSIONS: &[(&str, &str)] = &[
    (".js", ".ts"),
    (".jsx", ".tsx"),
    (".mjs", ".mts"),
    (".cjs", ".cts"),
];

/// The specifier with its output extension swapped for the source one.
/// A query string is kept. `None` when the extension has no counterpart.
#[must_use]
pub fn source_rewrite(specifier: &str) -> Option<String> {
    let (path, query) = match specifier.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (specifier, None),
    };

    // Only the last path segment carries the extension.
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let dot = file_name.rfind('.')?;
    let extension = &file_name[dot..];
    let (_, replacement) = SOURCE_EXTENSIONS.iter().find(|(ext, _)| *ext == extension)?;

    let stem = &path[..path.len() - extension.len()];
    let mut rewritten = format!("{stem}{replacement}");
    if let Some(query) = query {
        rewritten.push('?');
        rewritten.push_str(query);
    }
    Some(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrites() {
        assert_eq!(source_rewrite("./util.js").as_deref(), Some("./util.ts"));
        assert_eq!(source_rewrite("./view.jsx").as_deref(), Some("./view.tsx"));
        assert_eq!(source_rewrite("./esm.mjs").as_deref(), Some("./esm.mts"));
        assert_eq!(source_rewrite("./cjs.cjs").as_deref(), Some("./cjs.cts"));
        assert_eq!(source_rewrite("pkg/lib.js").as_deref(), Some("pkg/lib.ts"));
    }

    #[test]
    fn test_keeps_query() {
        assert_eq!(
            source_rewrite("./util.js?v=1").as_deref(),
            Some("./util.ts?v=1")
        );
    }

    #[test]
    fn test_no_rewrite() {
        assert_eq!(source_rewrite("./util"), None);
        assert_eq!(source_rewrite("./util.ts"), None);
        assert_eq!(source_rewrite("./data.json"), None);
        assert_eq!(source_rewrite("./dir.js/file"), None);
    }
}
