//! Package.json `exports` and `imports` field evaluation.
//!
//! Implements the Node.js ESM rules used by the baseline resolver:
//! - Root exports (string, array or conditions sugar)
//! - Subpath exports, exact keys before `*` patterns
//! - Pattern exports (longest prefix wins)
//! - Conditional exports, matched in the package's own key order
//! - `imports` (`#` specifiers) with the same target rules

use serde_json::{Map, Value};

/// Conditions an ES module import satisfies, as the runtime sees them.
pub const ESM_CONDITIONS: &[&str] = &["node", "import", "default"];

/// Resolve `subpath` (`"."` or `"./feature"`) through an `exports` value.
///
/// Returns the package-relative target (starting with `"./"`), or `None`
/// when the subpath is not exported.
#[must_use]
pub fn resolve_exports(exports: &Value, subpath: &str, conditions: &[&str]) -> Option<String> {
    if is_conditions_sugar(exports) {
        return if subpath == "." {
            resolve_target(exports, None, conditions, false)
        } else {
            None
        };
    }
    let map = exports.as_object()?;
    resolve_in_map(map, subpath, conditions, false)
}

/// Resolve a `#` specifier through an `imports` value.
///
/// Targets may be package-relative (`"./src/x.js"`) or bare package
/// specifiers (`"lodash"`).
#[must_use]
pub fn resolve_imports(imports: &Value, specifier: &str, conditions: &[&str]) -> Option<String> {
    if !specifier.starts_with('#') || specifier == "#" || specifier.starts_with("#/") {
        return None;
    }
    let map = imports.as_object()?;
    resolve_in_map(map, specifier, conditions, true)
}

/// `exports` written without subpath keys applies to `"."` only.
fn is_conditions_sugar(exports: &Value) -> bool {
    match exports {
        Value::String(_) | Value::Array(_) => true,
        Value::Object(obj) => !obj.keys().any(|k| k.starts_with('.')),
        _ => false,
    }
}

fn resolve_in_map(
    map: &Map<String, Value>,
    key: &str,
    conditions: &[&str],
    allow_bare: bool,
) -> Option<String> {
    if !key.contains('*') {
        if let Some(target) = map.get(key) {
            return resolve_target(target, None, conditions, allow_bare);
        }
    }

    // Longest prefix first, then the longer key.
    let mut best: Option<(&str, &Value, &str)> = None;
    for (pattern, target) in map {
        let Some(captured) = match_pattern(pattern, key) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((current, _, _)) => pattern_key_compare(pattern, current),
        };
        if better {
            best = Some((pattern.as_str(), target, captured));
        }
    }

    let (_, target, captured) = best?;
    resolve_target(target, Some(captured), conditions, allow_bare)
}

/// Whether pattern key `a` is more specific than `b`.
fn pattern_key_compare(a: &str, b: &str) -> bool {
    let prefix_len = |k: &str| k.find('*').unwrap_or(k.len());
    let (pa, pb) = (prefix_len(a), prefix_len(b));
    if pa != pb {
        return pa > pb;
    }
    a.len() > b.len()
}

/// Match a single-`*` pattern key against `key`, returning the captured text.
fn match_pattern<'k>(pattern: &str, key: &'k str) -> Option<&'k str> {
    let (prefix, suffix) = pattern.split_once('*')?;
    if suffix.contains('*') {
        return None;
    }
    if key == prefix || key.len() < prefix.len() + suffix.len() {
        return None;
    }
    key.strip_prefix(prefix)?.strip_suffix(suffix)
}

/// Resolve a target: string, array of fallbacks, or conditions object.
fn resolve_target(
    target: &Value,
    captured: Option<&str>,
    conditions: &[&str],
    allow_bare: bool,
) -> Option<String> {
    match target {
        Value::String(s) => {
            let substituted = match captured {
                Some(text) => s.replace('*', text),
                None => s.clone(),
            };
            validate_target(&substituted, allow_bare).then_some(substituted)
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| resolve_target(item, captured, conditions, allow_bare)),
        Value::Object(obj) => obj
            .iter()
            .filter(|(condition, _)| conditions.contains(&condition.as_str()))
            .find_map(|(_, value)| resolve_target(value, captured, conditions, allow_bare)),
        _ => None,
    }
}

/// Package-relative targets must stay inside the package.
fn validate_target(target: &str, allow_bare: bool) -> bool {
    if let Some(rest) = target.strip_prefix("./") {
        return !rest
            .split('/')
            .any(|segment| segment == ".." || segment == "." || segment == "node_modules");
    }
    allow_bare && !target.starts_with('/') && !target.starts_with("../") && !target.contains("://")
}
