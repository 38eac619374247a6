//! `compilerOptions.paths` alias matching.

use crate::paths::{is_relative_specifier, normalize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
enum AliasPattern {
    Exact(String),
    Wildcard { prefix: String, suffix: String },
}

impl AliasPattern {
    fn parse(key: &str) -> Option<Self> {
        match key.matches('*').count() {
            0 => Some(Self::Exact(key.to_string())),
            1 => {
                let (prefix, rest) = key.split_once('*')?;
                Some(Self::Wildcard {
                    prefix: prefix.to_string(),
                    suffix: rest.to_string(),
                })
            }
            _ => None,
        }
    }

    /// Text captured by `*`, if the specifier matches.
    fn capture<'a>(&self, specifier: &'a str) -> Option<&'a str> {
        match self {
            Self::Exact(_) => None,
            Self::Wildcard { prefix, suffix } => {
                if specifier.len() < prefix.len() + suffix.len() {
                    return None;
                }
                specifier.strip_prefix(prefix.as_str())?.strip_suffix(suffix.as_str())
            }
        }
    }
}

#[derive(Debug, Clone)]
struct AliasRule {
    pattern: AliasPattern,
    targets: Vec<String>,
}

/// Translates an aliased specifier into candidate absolute paths.
#[derive(Debug, Clone)]
pub struct PathsMatcher {
    /// Directory `paths` targets are relative to.
    paths_base: PathBuf,
    base_url: Option<PathBuf>,
    rules: Vec<AliasRule>,
}

impl PathsMatcher {
    /// Build a matcher. Returns `None` when there is neither a `paths` map
    /// nor a `baseUrl`, i.e. nothing can ever match.
    #[must_use]
    pub fn new(
        paths: Option<&Map<String, Value>>,
        paths_base: PathBuf,
        base_url: Option<PathBuf>,
    ) -> Option<Self> {
        if paths.is_none() && base_url.is_none() {
            return None;
        }

        let mut rules = Vec::new();
        for (key, value) in paths.into_iter().flatten() {
            let Some(pattern) = AliasPattern::parse(key) else {
                tracing::warn!(pattern = %key, "ignoring paths pattern with more than one '*'");
                continue;
            };
            let targets = match value {
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                Value::String(s) => vec![s.clone()],
                _ => Vec::new(),
            };
            rules.push(AliasRule { pattern, targets });
        }

        Some(Self {
            paths_base,
            base_url,
            rules,
        })
    }

    /// Whether any alias rule or `baseUrl` lookup can apply.
    #[must_use]
    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty() || self.base_url.is_some()
    }

    /// Ordered candidate paths for `specifier`. Empty when nothing applies.
    #[must_use]
    pub fn candidates(&self, specifier: &str) -> Vec<PathBuf> {
        if is_relative_specifier(specifier) {
            return Vec::new();
        }

        if let Some(rule) = self
            .rules
            .iter()
            .find(|r| matches!(&r.pattern, AliasPattern::Exact(k) if k == specifier))
        {
            return self.expand(rule, None);
        }

        // Longest prefix wins; the first declared rule wins a tie.
        let mut best: Option<(usize, &AliasRule, &str)> = None;
        for rule in &self.rules {
            let AliasPattern::Wildcard { prefix, .. } = &rule.pattern else {
                continue;
            };
            let Some(captured) = rule.pattern.capture(specifier) else {
                continue;
            };
            if best.map_or(true, |(len, _, _)| prefix.len() > len) {
                best = Some((prefix.len(), rule, captured));
            }
        }

        if let Some((_, rule, captured)) = best {
            return self.expand(rule, Some(captured));
        }

        match &self.base_url {
            Some(base_url) => vec![join_normalized(base_url, specifier)],
            None => Vec::new(),
        }
    }

    fn expand(&self, rule: &AliasRule, captured: Option<&str>) -> Vec<PathBuf> {
        rule.targets
            .iter()
            .map(|target| {
                let substituted = match captured {
                    Some(text) => target.replacen('*', text, 1),
                    None => target.clone(),
                };
                join_normalized(&self.paths_base, &substituted)
            })
            .collect()
    }
}

fn join_normalized(base: &Path, relative: &str) -> PathBuf {
    normalize(&base.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matcher(paths: Value, base_url: Option<&str>) -> PathsMatcher {
        PathsMatcher::new(
            paths.as_object(),
            PathBuf::from("/app"),
            base_url.map(PathBuf::from),
        )
        .unwrap()
    }

    #[test]
    fn test_wildcard_candidates_in_declared_order() {
        let m = matcher(json!({"@/*": ["src/*", "lib/*"]}), None);
        assert_eq!(
            m.candidates("@/util"),
            vec![PathBuf::from("/app/src/util"), PathBuf::from("/app/lib/util")]
        );
    }

    #[test]
    fn test_exact_rule_beats_wildcard() {
        let m = matcher(
            json!({"@/*": ["src/*"], "@/config": ["config/index.ts"]}),
            None,
        );
        assert_eq!(
            m.candidates("@/config"),
            vec![PathBuf::from("/app/config/index.ts")]
        );
    }

    #[test]
    fn test_longest_prefix_wins() {
        let m = matcher(
            json!({"@/*": ["src/*"], "@/components/*": ["ui/components/*"]}),
            None,
        );
        assert_eq!(
            m.candidates("@/components/button"),
            vec![PathBuf::from("/app/ui/components/button")]
        );
    }

    #[test]
    fn test_suffix_pattern() {
        let m = matcher(json!({"*.css": ["styles/*.css"]}), None);
        assert_eq!(
            m.candidates("theme.css"),
            vec![PathBuf::from("/app/styles/theme.css")]
        );
        assert!(m.candidates("theme.scss").is_empty());
    }

    #[test]
    fn test_base_url_fallback() {
        let m = matcher(json!({"@/*": ["src/*"]}), Some("/app/src"));
        assert_eq!(
            m.candidates("utils/strings"),
            vec![PathBuf::from("/app/src/utils/strings")]
        );
    }

    #[test]
    fn test_no_match_without_base_url() {
        let m = matcher(json!({"@/*": ["src/*"]}), None);
        assert!(m.candidates("lodash").is_empty());
    }

    #[test]
    fn test_relative_specifiers_never_match() {
        let m = matcher(json!({"*": ["src/*"]}), Some("/app"));
        assert!(m.candidates("./local").is_empty());
        assert!(m.candidates("../up").is_empty());
    }

    #[test]
    fn test_nothing_to_match() {
        assert!(PathsMatcher::new(None, PathBuf::from("/app"), None).is_none());
    }

    #[test]
    fn test_invalid_pattern_skipped() {
        let m = matcher(json!({"*/*": ["src/*"], "~/*": ["src/*"]}), None);
        assert_eq!(m.candidates("~/a"), vec![PathBuf::from("/app/src/a")]);
    }
}
