use super::{parent_context, EXIT_FAILED};
use esmhook_core::{Config, Hooks};
use esmhook_proto::{ErrorInfo, ResolveReport};
use miette::{IntoDiagnostic, Result};

/// Run the resolve command.
///
/// Prints the resolved URL (and format, when known). A failed resolution
/// prints the error code and message and exits with status 1.
pub fn run(config: Config, specifier: &str, parent: Option<&str>, json: bool) -> Result<()> {
    let ctx = parent_context(&config.cwd, parent)?;
    let parent_url = ctx.parent_url.as_ref().map(ToString::to_string);
    let hooks = Hooks::new(config);

    match hooks.resolve(specifier, &ctx) {
        Ok(resolved) => {
            let format = resolved.format.map(|f| f.as_str().to_string());
            if json {
                let report =
                    ResolveReport::resolved(specifier, parent_url, resolved.url.as_str(), format);
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            } else {
                println!("{}", resolved.url);
                if let Some(format) = format {
                    println!("format: {format}");
                }
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let report =
                    ResolveReport::failed(specifier, parent_url, ErrorInfo::new(e.code(), e.to_string()));
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            } else {
                eprintln!("error[{}]: {e}", e.code());
            }
            std::process::exit(EXIT_FAILED);
        }
    }
}
