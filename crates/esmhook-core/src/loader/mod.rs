//! Module loading.
//!
//! [`Loader`] wraps a [`BaselineLoader`]: it reports each URL to the
//! dependency observer, forces the JSON import attribute, and runs governed
//! sources and JSON through the [`SourceTransformer`].

mod notify;

pub use notify::{ChannelObserver, DependencyObserver, FrameObserver};

use crate::error::LoadError;
use crate::format::{FormatResolver, ModuleFormat};
use crate::paths::{file_url_to_path, is_governed_source};
use crate::resolver::ImportAttributes;
use crate::transform::source_map::attach;
use crate::transform::{SourceTransformer, TransformRequest};
use crate::tsconfig::ConfigStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Calling context of one load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadContext {
    /// Format hint from resolution.
    pub format: Option<ModuleFormat>,
    pub import_attributes: ImportAttributes,
}

impl LoadContext {
    #[must_use]
    pub fn new(format: Option<ModuleFormat>) -> Self {
        Self {
            format,
            import_attributes: ImportAttributes::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.import_attributes.insert(key.into(), value.into());
        self
    }

    fn has_json_type(&self) -> bool {
        self.import_attributes.get("type").map(String::as_str) == Some("json")
    }
}

/// A loaded module. Builtins carry no source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    pub format: ModuleFormat,
    pub source: Option<String>,
}

/// The runtime's own load step.
pub trait BaselineLoader: Send + Sync {
    fn load(&self, url: &Url, ctx: &LoadContext) -> Result<LoadedModule, LoadError>;
}

/// Reads modules from the filesystem.
#[derive(Debug, Clone)]
pub struct FsLoader {
    formats: FormatResolver,
}

impl FsLoader {
    #[must_use]
    pub fn new(formats: FormatResolver) -> Self {
        Self { formats }
    }

    fn file_format(&self, url: &Url, path: &Path) -> Result<ModuleFormat, LoadError> {
        if let Some(format) = self.formats.resolve_format(path)? {
            return Ok(format);
        }
        match path.extension().and_then(|e| e.to_str()) {
            None | Some("js") => Ok(self.formats.package_format(path)?),
            Some(extension) => Err(LoadError::UnknownFileExtension {
                extension: format!(".{extension}"),
                url: url.to_string(),
            }),
        }
    }
}

impl BaselineLoader for FsLoader {
    fn load(&self, url: &Url, ctx: &LoadContext) -> Result<LoadedModule, LoadError> {
        match url.scheme() {
            "node" => Ok(LoadedModule {
                format: ModuleFormat::Builtin,
                source: None,
            }),
            "file" => {
                let path = file_url_to_path(url).ok_or_else(|| LoadError::UnsupportedUrl {
                    url: url.to_string(),
                })?;
                let format = match ctx.format {
                    Some(format) => format,
                    None => self.file_format(url, &path)?,
                };
                if format == ModuleFormat::Json && !ctx.has_json_type() {
                    return Err(LoadError::ImportAttributeMissing {
                        url: url.to_string(),
                    });
                }
                let source =
                    std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
                        path: path.clone(),
                        source,
                    })?;
                Ok(LoadedModule {
                    format,
                    source: Some(source),
                })
            }
            _ => Err(LoadError::UnsupportedUrl {
                url: url.to_string(),
            }),
        }
    }
}

/// Load hook: baseline load plus transformation and notification.
pub struct Loader {
    baseline: Arc<dyn BaselineLoader>,
    transformer: Arc<dyn SourceTransformer>,
    configs: Arc<ConfigStore>,
    observer: Option<Arc<dyn DependencyObserver>>,
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("transformer", &self.transformer.name())
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl Loader {
    #[must_use]
    pub fn new(
        baseline: Arc<dyn BaselineLoader>,
        transformer: Arc<dyn SourceTransformer>,
        configs: Arc<ConfigStore>,
    ) -> Self {
        Self {
            baseline,
            transformer,
            configs,
            observer: None,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DependencyObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Load `url`. `ctx` may gain the `type: json` attribute.
    pub fn load(&self, url: &Url, ctx: &mut LoadContext) -> Result<LoadedModule, LoadError> {
        if let Some(observer) = &self.observer {
            observer.dependency(url);
        }

        if url.path().ends_with(".json") && !ctx.has_json_type() {
            tracing::trace!(url = %url, "forcing json import attribute");
            ctx.import_attributes
                .insert("type".to_string(), "json".to_string());
        }

        let LoadedModule { format, source } = self.baseline.load(url, ctx)?;
        let Some(source) = source else {
            return Ok(LoadedModule {
                format,
                source: None,
            });
        };

        let path = file_url_to_path(url).unwrap_or_else(|| PathBuf::from(url.path()));

        if format == ModuleFormat::Json || is_governed_source(url.path()) {
            let config = self.configs.load_project_config(&path)?;
            let tsconfig_raw = config.as_ref().and_then(|c| c.raw_for(&path));
            let request = TransformRequest::new(&source, &path).with_tsconfig(tsconfig_raw);
            let output = self.transformer.transform(&request)?;
            tracing::debug!(
                url = %url,
                transformer = self.transformer.name(),
                tsconfig = tsconfig_raw.is_some(),
                "transformed"
            );
            return Ok(LoadedModule {
                format: ModuleFormat::Module,
                source: Some(attach(output, url.as_str())),
            });
        }

        if format == ModuleFormat::Module {
            if let Some(output) = self.transformer.transform_dynamic_import(&path, &source) {
                tracing::debug!(url = %url, "rewrote dynamic imports");
                return Ok(LoadedModule {
                    format: ModuleFormat::Module,
                    source: Some(attach(output, url.as_str())),
                });
            }
        }

        Ok(LoadedModule {
            format,
            source: Some(source),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataStore;
    use crate::transform::{SwcTransformer, TransformError, TransformOutput};
    use esmhook_proto::SupervisorMessage;
    use std::fs;
    use std::sync::{mpsc, Mutex};
    use tempfile::tempdir;

    fn fs_loader() -> Arc<FsLoader> {
        Arc::new(FsLoader::new(FormatResolver::new(Arc::new(
            MetadataStore::new(),
        ))))
    }

    fn loader() -> Loader {
        Loader::new(
            fs_loader(),
            Arc::new(SwcTransformer::new()),
            Arc::new(ConfigStore::new(None)),
        )
    }

    fn url_of(path: &Path) -> Url {
        Url::from_file_path(path).unwrap()
    }

    #[test]
    fn test_fs_loader_builtin_has_no_source() {
        let loaded = fs_loader()
            .load(&Url::parse("node:fs").unwrap(), &LoadContext::default())
            .unwrap();
        assert_eq!(loaded.format, ModuleFormat::Builtin);
        assert_eq!(loaded.source, None);
    }

    #[test]
    fn test_fs_loader_json_needs_attribute() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "{}").unwrap();

        let err = fs_loader()
            .load(&url_of(&path), &LoadContext::default())
            .unwrap_err();
        assert_eq!(err.code(), "ERR_IMPORT_ATTRIBUTE_MISSING");

        let ctx = LoadContext::default().with_attribute("type", "json");
        let loaded = fs_loader().load(&url_of(&path), &ctx).unwrap();
        assert_eq!(loaded.format, ModuleFormat::Json);
    }

    #[test]
    fn test_fs_loader_js_uses_package_type() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"type": "module"}"#).unwrap();
        let path = dir.path().join("main.js");
        fs::write(&path, "export {};").unwrap();

        let loaded = fs_loader()
            .load(&url_of(&path), &LoadContext::default())
            .unwrap();
        assert_eq!(loaded.format, ModuleFormat::Module);
    }

    #[test]
    fn test_fs_loader_unknown_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("style.css");
        fs::write(&path, "body {}").unwrap();

        let err = fs_loader()
            .load(&url_of(&path), &LoadContext::default())
            .unwrap_err();
        assert_eq!(err.code(), "ERR_UNKNOWN_FILE_EXTENSION");
    }

    #[test]
    fn test_json_load_forces_attribute_and_exports_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, r#"{ "answer": 42 }"#).unwrap();

        let mut ctx = LoadContext::default();
        let loaded = loader().load(&url_of(&path), &mut ctx).unwrap();

        assert_eq!(ctx.import_attributes.get("type").map(String::as_str), Some("json"));
        assert_eq!(loaded.format, ModuleFormat::Module);
        let source = loaded.source.unwrap();
        assert!(source.starts_with(r#"export default { "answer": 42 };"#));
        assert!(source.contains("//# sourceMappingURL=data:application/json;base64,"));
    }

    #[test]
    fn test_typescript_is_transformed() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        let path = dir.path().join("util.ts");
        fs::write(&path, "export const n: number = 1;\n").unwrap();

        let mut ctx = LoadContext::new(Some(ModuleFormat::CommonJs));
        let loaded = loader().load(&url_of(&path), &mut ctx).unwrap();

        assert_eq!(loaded.format, ModuleFormat::Module);
        let source = loaded.source.unwrap();
        assert!(source.contains("export const n = 1;"), "{source}");
        assert!(source.contains("//# sourceMappingURL="));
    }

    #[test]
    fn test_plain_module_gets_dynamic_import_interop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.mjs");
        fs::write(&path, "const m = await import('./dep.js');\n").unwrap();

        let loaded = loader()
            .load(&url_of(&path), &mut LoadContext::default())
            .unwrap();
        let source = loaded.source.unwrap();
        assert!(source.contains("import('./dep.js').then((mod)=>"), "{source}");
    }

    #[test]
    fn test_commonjs_is_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.cjs");
        let code = "module.exports = import('./dep.js');\n";
        fs::write(&path, code).unwrap();

        let loaded = loader()
            .load(&url_of(&path), &mut LoadContext::default())
            .unwrap();
        assert_eq!(loaded.format, ModuleFormat::CommonJs);
        assert_eq!(loaded.source.as_deref(), Some(code));
    }

    #[test]
    fn test_observer_notified_before_failure() {
        let dir = tempdir().unwrap();
        let url = url_of(&dir.path().join("missing.ts"));
        let (tx, rx) = mpsc::channel();
        let loader = loader().with_observer(Arc::new(ChannelObserver::new(tx)));

        let err = loader.load(&url, &mut LoadContext::default()).unwrap_err();
        assert_eq!(err.code(), "ERR_IO");
        assert_eq!(
            rx.try_recv().unwrap(),
            SupervisorMessage::dependency(url.as_str())
        );
    }

    /// Records whether a tsconfig document reached the transformer.
    #[derive(Default)]
    struct Recording {
        saw_tsconfig: Mutex<Vec<bool>>,
    }

    impl SourceTransformer for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn transform(
            &self,
            request: &TransformRequest<'_>,
        ) -> Result<TransformOutput, TransformError> {
            self.saw_tsconfig
                .lock()
                .unwrap()
                .push(request.tsconfig_raw.is_some());
            Ok(TransformOutput::new(request.code))
        }
    }

    #[test]
    fn test_tsconfig_passed_only_to_governed_files() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("package.json"), "{}").unwrap();
        fs::write(root.join("tsconfig.json"), r#"{ "include": ["src"] }"#).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("scripts")).unwrap();
        fs::write(root.join("src/a.ts"), "").unwrap();
        fs::write(root.join("scripts/b.ts"), "").unwrap();

        let recording = Arc::new(Recording::default());
        let loader = Loader::new(
            fs_loader(),
            recording.clone(),
            Arc::new(ConfigStore::new(None)),
        );
        loader
            .load(&url_of(&root.join("src/a.ts")), &mut LoadContext::default())
            .unwrap();
        loader
            .load(&url_of(&root.join("scripts/b.ts")), &mut LoadContext::default())
            .unwrap();

        assert_eq!(*recording.saw_tsconfig.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_transform_failure_surfaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ nope").unwrap();

        let err = loader()
            .load(&url_of(&path), &mut LoadContext::default())
            .unwrap_err();
        assert_eq!(err.code(), "ERR_TRANSFORM_FAILED");
    }
}
