#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod logging;

use clap::Parser;
use esmhook_core::Config;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "esmhook")]
#[command(author, version, about = "Resolve and load ES modules the way the esmhook hooks do", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Use this tsconfig for every file instead of discovering one
    /// (defaults to `ESBK_TSCONFIG_PATH`)
    #[arg(long, global = true, value_name = "PATH")]
    tsconfig: Option<PathBuf>,

    /// Version of the host runtime the hooks run in
    #[arg(long, global = true, value_name = "X.Y.Z")]
    node_version: Option<semver::Version>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Resolve a specifier to a module URL and format
    Resolve {
        /// The import specifier
        specifier: String,

        /// Importing module (file URL or path); defaults to an entry point
        #[arg(long, value_name = "URL|PATH")]
        parent: Option<String>,
    },

    /// Resolve a specifier, then load it through the transform pipeline
    Load {
        /// The import specifier
        specifier: String,

        /// Importing module (file URL or path); defaults to an entry point
        #[arg(long, value_name = "URL|PATH")]
        parent: Option<String>,

        /// Write dependency notifications to this file as framed JSON
        #[arg(long, value_name = "PATH")]
        deps_out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let cwd = dunce::canonicalize(&cwd).unwrap_or(cwd);

    let mut config = Config::from_env(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);
    if let Some(tsconfig) = cli.tsconfig.filter(|p| !p.as_os_str().is_empty()) {
        config = config.with_tsconfig(Some(tsconfig));
    }
    if let Some(version) = cli.node_version {
        config = config.with_host_version(version);
    }

    let Some(command) = cli.command else {
        return commands::version::run();
    };
    if matches!(command, Commands::Version) {
        return commands::version::run();
    }

    logging::init(config.verbosity, config.json_logs);

    match command {
        Commands::Version => commands::version::run(),
        Commands::Resolve { specifier, parent } => {
            commands::resolve::run(config, &specifier, parent.as_deref(), cli.json)
        }
        Commands::Load {
            specifier,
            parent,
            deps_out,
        } => commands::load::run(
            config,
            &specifier,
            parent.as_deref(),
            deps_out.as_deref(),
            cli.json,
        ),
    }
}
