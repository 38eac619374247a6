#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Resolve and load hooks that sit between an ES module runtime and the
//! filesystem.
//!
//! The [`Resolver`] extends the runtime's strict ESM resolution with
//! extension-less and directory-index probing, tsconfig `paths` aliases,
//! `.js` → `.ts` rewriting and package-type format inference. The [`Loader`]
//! transforms TypeScript/JSX/JSON sources and reports every loaded URL to an
//! optional observer.

pub mod config;
pub mod error;
pub mod format;
pub mod hooks;
pub mod loader;
pub mod metadata;
pub mod paths;
pub mod resolver;
pub mod transform;
pub mod tsconfig;
pub mod version;

pub use config::{Config, HostRuntime};
pub use error::{LoadError, ResolveError};
pub use format::{FormatResolver, ModuleFormat};
pub use hooks::Hooks;
pub use loader::{
    BaselineLoader, ChannelObserver, DependencyObserver, FrameObserver, FsLoader, LoadContext,
    LoadedModule, Loader,
};
pub use metadata::{MetadataStore, PackageDescriptor, PackageType};
pub use resolver::{
    BaselineResolver, ImportAttributes, NodeEsmResolver, ResolveContext, ResolvedModule, Resolver,
};
pub use transform::{SourceTransformer, SwcTransformer, TransformError, TransformOutput};
pub use tsconfig::{ConfigStore, ProjectConfig};
pub use version::VERSION;
