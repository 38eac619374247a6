//! The resolve/load hook pair wired from a [`Config`].

use crate::config::Config;
use crate::error::{LoadError, ResolveError};
use crate::format::FormatResolver;
use crate::loader::{DependencyObserver, FsLoader, LoadContext, LoadedModule, Loader};
use crate::metadata::MetadataStore;
use crate::resolver::{NodeEsmResolver, ResolveContext, ResolvedModule, Resolver};
use crate::transform::{SourceTransformer, SwcTransformer};
use crate::tsconfig::ConfigStore;
use std::sync::Arc;
use url::Url;

/// Resolver and loader sharing one set of caches.
#[derive(Debug)]
pub struct Hooks {
    config: Config,
    metadata: Arc<MetadataStore>,
    configs: Arc<ConfigStore>,
    resolver: Resolver,
    loader: Loader,
}

impl Hooks {
    /// Hooks over the real filesystem with the default transformer.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_transformer(config, Arc::new(SwcTransformer::new()))
    }

    #[must_use]
    pub fn with_transformer(config: Config, transformer: Arc<dyn SourceTransformer>) -> Self {
        let metadata = Arc::new(MetadataStore::new());
        let configs = Arc::new(ConfigStore::new(config.tsconfig_path()));

        let baseline = Arc::new(NodeEsmResolver::new(
            Arc::clone(&metadata),
            config.cwd.clone(),
        ));
        let resolver = Resolver::new(
            baseline,
            Arc::clone(&configs),
            FormatResolver::new(Arc::clone(&metadata)),
            config.cwd.clone(),
        )
        .with_host(config.host.clone());

        let loader = Loader::new(
            Arc::new(FsLoader::new(FormatResolver::new(Arc::clone(&metadata)))),
            transformer,
            Arc::clone(&configs),
        );

        tracing::debug!(
            cwd = %config.cwd.display(),
            tsconfig = ?config.tsconfig,
            host = %config.host.version,
            "hooks ready"
        );

        Self {
            config,
            metadata,
            configs,
            resolver,
            loader,
        }
    }

    /// Report every loaded URL to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DependencyObserver>) -> Self {
        self.loader = self.loader.with_observer(observer);
        self
    }

    /// Resolve hook.
    pub fn resolve(
        &self,
        specifier: &str,
        ctx: &ResolveContext,
    ) -> Result<ResolvedModule, ResolveError> {
        self.resolver.resolve(specifier, ctx)
    }

    /// Load hook.
    pub fn load(&self, url: &Url, ctx: &mut LoadContext) -> Result<LoadedModule, LoadError> {
        self.loader.load(url, ctx)
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    #[must_use]
    pub fn configs(&self) -> &ConfigStore {
        &self.configs
    }
}
