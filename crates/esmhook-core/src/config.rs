use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming an explicit tsconfig file.
pub const TSCONFIG_OVERRIDE_ENV: &str = "ESBK_TSCONFIG_PATH";

/// Host runtime version assumed when none is configured.
pub const DEFAULT_HOST_VERSION: Version = Version::new(20, 11, 0);

/// Runtime configuration for the hooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory. Entry points resolve against it and
    /// tsconfig discovery starts from it when there is no importer.
    pub cwd: PathBuf,

    /// Explicit tsconfig path; disables per-file discovery.
    pub tsconfig: Option<PathBuf>,

    /// The runtime the hooks are installed into.
    pub host: HostRuntime,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            tsconfig: None,
            host: HostRuntime::default(),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Create a config for `cwd`, picking up the tsconfig override from
    /// `ESBK_TSCONFIG_PATH` when it is set and non-empty.
    #[must_use]
    pub fn from_env(cwd: PathBuf) -> Self {
        let tsconfig = std::env::var_os(TSCONFIG_OVERRIDE_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self {
            tsconfig,
            ..Self::new(cwd)
        }
    }

    /// Set the tsconfig override.
    #[must_use]
    pub fn with_tsconfig(mut self, tsconfig: Option<PathBuf>) -> Self {
        self.tsconfig = tsconfig;
        self
    }

    /// Set the host runtime version.
    #[must_use]
    pub fn with_host_version(mut self, version: Version) -> Self {
        self.host = HostRuntime::new(version);
        self
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// The tsconfig override as an absolute path.
    #[must_use]
    pub fn tsconfig_path(&self) -> Option<PathBuf> {
        self.tsconfig.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                crate::paths::normalize(&self.cwd.join(p))
            }
        })
    }
}

/// The module runtime the hooks are installed into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRuntime {
    pub version: Version,
}

impl Default for HostRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_HOST_VERSION)
    }
}

impl HostRuntime {
    #[must_use]
    pub fn new(version: Version) -> Self {
        Self { version }
    }

    /// Whether `node:`-prefixed builtin specifiers are understood.
    ///
    /// Landed in 14.13.1 and was backported to 12.20.0.
    #[must_use]
    pub fn supports_node_prefix(&self) -> bool {
        let v = &self.version;
        if v.major == 12 {
            return *v >= Version::new(12, 20, 0);
        }
        *v >= Version::new(14, 13, 1)
    }
}
