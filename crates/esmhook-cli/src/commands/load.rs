use super::{parent_context, EXIT_FAILED};
use esmhook_core::{Config, FrameObserver, Hooks, LoadContext, LoadedModule};
use esmhook_proto::{ErrorInfo, LoadReport};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Run the load command: resolve `specifier`, then load the result.
pub fn run(
    config: Config,
    specifier: &str,
    parent: Option<&str>,
    deps_out: Option<&Path>,
    json: bool,
) -> Result<()> {
    let ctx = parent_context(&config.cwd, parent)?;
    let mut hooks = Hooks::new(config);
    if let Some(path) = deps_out {
        let file = File::create(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to create {}", path.display()))?;
        hooks = hooks.with_observer(Arc::new(FrameObserver::new(file)));
    }

    let resolved = match hooks.resolve(specifier, &ctx) {
        Ok(resolved) => resolved,
        Err(e) => fail(None, e.code(), &e.to_string(), json),
    };

    let mut load_ctx = LoadContext::new(resolved.format);
    load_ctx.import_attributes = ctx.import_attributes;
    match hooks.load(&resolved.url, &mut load_ctx) {
        Ok(loaded) => report(&resolved.url, &loaded, json),
        Err(e) => fail(Some(&resolved.url), e.code(), &e.to_string(), json),
    }
}

fn report(url: &Url, loaded: &LoadedModule, json: bool) -> Result<()> {
    if json {
        let report = LoadReport::loaded(url.as_str(), loaded.format.as_str(), loaded.source.clone());
        println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        return Ok(());
    }

    println!("url: {url}");
    println!("format: {}", loaded.format);
    if let Some(source) = &loaded.source {
        println!();
        print!("{source}");
        if !source.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

fn fail(url: Option<&Url>, code: &str, message: &str, json: bool) -> ! {
    if json {
        let report = LoadReport::failed(url.map(ToString::to_string), ErrorInfo::new(code, message));
        if let Ok(text) = serde_json::to_string_pretty(&report) {
            println!("{text}");
        }
    } else {
        eprintln!("error[{code}]: {message}");
    }
    std::process::exit(EXIT_FAILED);
}
