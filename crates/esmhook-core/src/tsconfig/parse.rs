//! Reading a `tsconfig.json` and its `extends` chain into one document.

use super::files::{FilesSpec, ScopedPattern};
use super::jsonc;
use crate::error::ResolveError;
use crate::paths::{is_relative_specifier, normalize, NODE_MODULES};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Default config file name looked up during discovery.
pub const TSCONFIG_JSON: &str = "tsconfig.json";

/// One config file with everything inherited from its bases applied.
#[derive(Debug, Clone, Default)]
pub struct ResolvedLayers {
    pub compiler_options: Map<String, Value>,
    pub files: Option<Vec<PathBuf>>,
    pub include: Option<Vec<ScopedPattern>>,
    pub exclude: Option<Vec<ScopedPattern>>,
    pub base_url: Option<PathBuf>,
    /// The `paths` map and the directory of the config that declared it.
    pub paths: Option<(Map<String, Value>, PathBuf)>,
    pub out_dir: Option<PathBuf>,
}

impl ResolvedLayers {
    /// The merged document as handed to the transformer.
    #[must_use]
    pub fn to_raw(&self) -> Value {
        let mut compiler_options = self.compiler_options.clone();
        if let Some(base_url) = &self.base_url {
            compiler_options.insert("baseUrl".into(), path_value(base_url));
        }
        if let Some(out_dir) = &self.out_dir {
            compiler_options.insert("outDir".into(), path_value(out_dir));
        }

        let mut raw = Map::new();
        raw.insert("compilerOptions".into(), Value::Object(compiler_options));
        if let Some(files) = &self.files {
            raw.insert(
                "files".into(),
                Value::Array(files.iter().map(|f| path_value(f)).collect()),
            );
        }
        for (key, patterns) in [("include", &self.include), ("exclude", &self.exclude)] {
            if let Some(patterns) = patterns {
                let values = patterns
                    .iter()
                    .map(|p| path_value(&p.base.join(&p.pattern)))
                    .collect();
                raw.insert(key.into(), Value::Array(values));
            }
        }
        Value::Object(raw)
    }

    #[must_use]
    pub fn files_spec(&self, config_dir: &Path) -> FilesSpec {
        FilesSpec {
            config_dir: config_dir.to_path_buf(),
            files: self.files.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            out_dir: self.out_dir.clone(),
            allow_js: self
                .compiler_options
                .get("allowJs")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    /// Apply `child` on top of `self`: compiler options merge shallowly
    /// with the child winning, the rest is replaced when the child sets it.
    fn overlay(&mut self, child: Self) {
        self.compiler_options.extend(child.compiler_options);
        if child.files.is_some() {
            self.files = child.files;
        }
        if child.include.is_some() {
            self.include = child.include;
        }
        if child.exclude.is_some() {
            self.exclude = child.exclude;
        }
        if child.base_url.is_some() {
            self.base_url = child.base_url;
        }
        if child.paths.is_some() {
            self.paths = child.paths;
        }
        if child.out_dir.is_some() {
            self.out_dir = child.out_dir;
        }
    }
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

/// Read `path` and every config it extends.
pub fn read_config(path: &Path) -> Result<ResolvedLayers, ResolveError> {
    let mut chain = Vec::new();
    read_layers(path, &mut chain)
}

fn read_layers(path: &Path, chain: &mut Vec<PathBuf>) -> Result<ResolvedLayers, ResolveError> {
    let content = std::fs::read_to_string(path).map_err(|source| ResolveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc = jsonc::parse(&content).map_err(|source| ResolveError::MalformedMetadata {
        path: path.to_path_buf(),
        source,
    })?;
    let dir = path.parent().unwrap_or(Path::new("/")).to_path_buf();
    chain.push(path.to_path_buf());

    let mut merged = ResolvedLayers::default();
    let bases: Vec<&str> = match doc.get("extends") {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    for base in bases {
        let base_path = resolve_extends(base, &dir)?;
        if chain.contains(&base_path) {
            tracing::warn!(
                config = %path.display(),
                extends = %base_path.display(),
                "circular tsconfig extends, ignoring"
            );
            continue;
        }
        let layer = read_layers(&base_path, chain)?;
        merged.overlay(layer);
    }

    chain.pop();
    merged.overlay(own_layer(&doc, &dir));
    Ok(merged)
}

/// The settings a single document declares, with paths made absolute
/// against its own directory.
fn own_layer(doc: &Value, dir: &Path) -> ResolvedLayers {
    let mut compiler_options = doc
        .get("compilerOptions")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let base_url = compiler_options
        .remove("baseUrl")
        .and_then(|v| v.as_str().map(|s| normalize(&dir.join(s))));
    let out_dir = compiler_options
        .remove("outDir")
        .and_then(|v| v.as_str().map(|s| normalize(&dir.join(s))));
    let paths = compiler_options
        .remove("paths")
        .and_then(|v| v.as_object().cloned())
        .map(|map| (map, dir.to_path_buf()));

    let string_list = |key: &str| -> Option<Vec<String>> {
        doc.get(key).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    };
    let scoped = |key: &str| {
        string_list(key).map(|items| {
            items
                .into_iter()
                .map(|pattern| ScopedPattern::new(dir, pattern))
                .collect::<Vec<_>>()
        })
    };

    ResolvedLayers {
        compiler_options,
        files: string_list("files")
            .map(|items| items.iter().map(|f| normalize(&dir.join(f))).collect()),
        include: scoped("include"),
        exclude: scoped("exclude"),
        base_url,
        paths,
        out_dir,
    }
}

/// Locate the file an `extends` entry names.
fn resolve_extends(specifier: &str, dir: &Path) -> Result<PathBuf, ResolveError> {
    let not_found = || ResolveError::Io {
        path: dir.join(specifier),
        source: std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("tsconfig extends '{specifier}' not found"),
        ),
    };

    if is_relative_specifier(specifier) || Path::new(specifier).is_absolute() {
        let candidate = normalize(&dir.join(specifier));
        return with_json_fallback(&candidate).ok_or_else(not_found);
    }

    // Package reference: look in node_modules up the tree.
    let mut current = Some(dir);
    while let Some(d) = current {
        let candidate = d.join(NODE_MODULES).join(specifier);
        if candidate.is_dir() {
            let inside = candidate.join(TSCONFIG_JSON);
            if inside.is_file() {
                return Ok(inside);
            }
        }
        if let Some(found) = with_json_fallback(&candidate) {
            return Ok(found);
        }
        current = d.parent();
    }
    Err(not_found())
}

fn with_json_fallback(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    let mut with_ext = candidate.as_os_str().to_owned();
    with_ext.push(".json");
    let with_ext = PathBuf::from(with_ext);
    with_ext.is_file().then_some(with_ext)
}

/// Nearest `tsconfig.json` at or above `start` (a directory).
#[must_use]
pub fn find_tsconfig(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(TSCONFIG_JSON);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}
