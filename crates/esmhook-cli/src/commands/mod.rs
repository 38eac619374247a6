pub mod load;
pub mod resolve;
pub mod version;

use esmhook_core::ResolveContext;
use miette::{miette, Result};
use std::path::Path;
use url::Url;

/// Exit code for a failed resolution or load.
pub const EXIT_FAILED: i32 = 1;

/// Build the resolve context for `--parent`, given as a URL or a path
/// relative to `cwd`.
pub fn parent_context(cwd: &Path, parent: Option<&str>) -> Result<ResolveContext> {
    let Some(parent) = parent else {
        return Ok(ResolveContext::default());
    };

    // Single-letter schemes are Windows drive letters.
    if let Ok(url) = Url::parse(parent) {
        if url.scheme().len() > 1 {
            return Ok(ResolveContext::with_parent(url));
        }
    }

    let path = cwd.join(parent);
    let url = Url::from_file_path(&path)
        .map_err(|()| miette!("--parent {} is not an absolute path", path.display()))?;
    Ok(ResolveContext::with_parent(url))
}
