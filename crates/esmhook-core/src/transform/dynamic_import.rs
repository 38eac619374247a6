//! Dynamic `import()` interop rewrite.
//!
//! Appends a `.then(...)` to each `import(...)` expression that unwraps a
//! module whose only export is a transpiled-CommonJS `default` carrying
//! `__esModule`.

use super::source_map::identity_map;
use super::TransformOutput;
use std::path::Path;

/// Suffix appended after the closing parenthesis of each dynamic import.
pub const INTEROP_SUFFIX: &str = ".then((mod)=>{const exports=Object.keys(mod);if(exports.length===1&&exports[0]==='default'&&mod.default&&mod.default.__esModule){return mod.default}return mod})";

/// Rewrite every dynamic import in `code`. `None` when there is none.
#[must_use]
pub fn rewrite(path: &Path, code: &str) -> Option<TransformOutput> {
    if !code.contains("import") {
        return None;
    }

    let ends = dynamic_import_ends(code.as_bytes());
    if ends.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(code.len() + ends.len() * INTEROP_SUFFIX.len());
    let mut last = 0;
    for end in ends {
        out.push_str(&code[last..end]);
        out.push_str(INTEROP_SUFFIX);
        last = end;
    }
    out.push_str(&code[last..]);

    let map = identity_map(&path.to_string_lossy(), code);
    Some(TransformOutput::new(out).with_source_map(map))
}

/// Byte offsets just past the `)` closing each `import(` call, ascending.
fn dynamic_import_ends(bytes: &[u8]) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => i = skip_string(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = skip_line_comment(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            b'i' => {
                if let Some(open) = import_call_paren(bytes, i) {
                    if let Some(close) = closing_paren(bytes, open) {
                        ends.push(close + 1);
                    }
                    // Arguments may contain another dynamic import.
                    i = open + 1;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    ends.sort_unstable();
    ends
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// If an `import(` call starts at `start`, the offset of its `(`.
fn import_call_paren(bytes: &[u8], start: usize) -> Option<usize> {
    const KEYWORD: &[u8] = b"import";
    if !bytes[start..].starts_with(KEYWORD) {
        return None;
    }
    if start > 0 {
        let prev = bytes[start - 1];
        if is_ident_byte(prev) || prev == b'.' {
            return None;
        }
    }
    let mut j = start + KEYWORD.len();
    while j < bytes.len() && bytes[j].is_ascii_whitespace() {
        j += 1;
    }
    (bytes.get(j) == Some(&b'(')).then_some(j)
}

fn closing_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut j = open;
    while j < bytes.len() {
        match bytes[j] {
            b'(' => {
                depth += 1;
                j += 1;
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
                j += 1;
            }
            b'\'' | b'"' | b'`' => j = skip_string(bytes, j),
            b'/' if bytes.get(j + 1) == Some(&b'/') => j = skip_line_comment(bytes, j),
            b'/' if bytes.get(j + 1) == Some(&b'*') => j = skip_block_comment(bytes, j),
            _ => j += 1,
        }
    }
    None
}

/// Offset just past the string literal starting at `start`. Template
/// literals are skipped whole, substitutions included.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b if b == quote => return j + 1,
            b'\n' if quote != b'`' => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| start + p + 1)
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |p| start + 2 + p + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(code: &str) -> Option<String> {
        rewrite(Path::new("/app/main.js"), code).map(|out| out.code)
    }

    #[test]
    fn test_rewrites_dynamic_import() {
        let out = run("const m = await import('./dep.js');").unwrap();
        assert_eq!(
            out,
            format!("const m = await import('./dep.js'){INTEROP_SUFFIX};")
        );
    }

    #[test]
    fn test_multiple_and_nested_parens() {
        let out = run("import(join(a, b)); import(`./${name}.js`)").unwrap();
        assert_eq!(
            out,
            format!("import(join(a, b)){INTEROP_SUFFIX}; import(`./${{name}}.js`){INTEROP_SUFFIX}")
        );
    }

    #[test]
    fn test_ignores_static_imports_and_meta() {
        assert_eq!(run("import a from './a.js';\nconsole.log(import.meta.url);"), None);
    }

    #[test]
    fn test_ignores_strings_and_comments() {
        assert_eq!(run("const s = \"import('x')\"; // import('y')\n/* import('z') */"), None);
    }

    #[test]
    fn test_ignores_member_calls() {
        assert_eq!(run("loader.import('x'); reimport('y');"), None);
    }

    #[test]
    fn test_whitespace_before_paren() {
        let out = run("import ('./a.js')").unwrap();
        assert!(out.ends_with(INTEROP_SUFFIX));
    }

    #[test]
    fn test_map_is_attached() {
        let out = rewrite(Path::new("/app/main.js"), "import('a')").unwrap();
        assert!(out.map.unwrap().contains("\"mappings\":\"AAAA\""));
    }
}
