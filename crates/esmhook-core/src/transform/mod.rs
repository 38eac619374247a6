//! Source transformation for governed extensions and JSON.
//!
//! The loader never calls a compiler directly; it goes through
//! [`SourceTransformer`], so the backend can be swapped (SWC with the `swc`
//! feature, a regex-based stripper without it, or a test double).

pub mod dynamic_import;
pub mod source_map;
pub mod swc;

pub use swc::{JsxRuntime, SwcTransformer};

use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Input to a transform.
#[derive(Debug, Clone, Copy)]
pub struct TransformRequest<'a> {
    pub code: &'a str,
    /// Absolute path of the module (or the URL text for non-file modules).
    pub path: &'a Path,
    /// Raw project config governing the file, if any.
    pub tsconfig_raw: Option<&'a Value>,
}

impl<'a> TransformRequest<'a> {
    #[must_use]
    pub fn new(code: &'a str, path: &'a Path) -> Self {
        Self {
            code,
            path,
            tsconfig_raw: None,
        }
    }

    #[must_use]
    pub fn with_tsconfig(mut self, raw: Option<&'a Value>) -> Self {
        self.tsconfig_raw = raw;
        self
    }
}

/// Transformed code and its source map (JSON text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub code: String,
    pub map: Option<String>,
}

impl TransformOutput {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }

    #[must_use]
    pub fn with_source_map(mut self, map: impl Into<String>) -> Self {
        self.map = Some(map.into());
        self
    }
}

/// Transform failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformError {
    /// Failure kind (`TRANSFORM_PARSE_ERROR`, ...).
    pub code: &'static str,
    pub message: String,
}

impl TransformError {
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new("TRANSFORM_PARSE_ERROR", message)
    }

    #[must_use]
    pub fn transform_error(message: impl Into<String>) -> Self {
        Self::new("TRANSFORM_ERROR", message)
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for TransformError {}

/// A source-to-source transformer.
///
/// Implementations are shared across threads; each call is independent.
pub trait SourceTransformer: Send + Sync {
    /// Backend name (e.g. "swc").
    fn name(&self) -> &'static str;

    /// Transform TypeScript, JSX or JSON into an ES module.
    fn transform(&self, request: &TransformRequest<'_>) -> Result<TransformOutput, TransformError>;

    /// Wrap every dynamic `import()` with the default-export interop.
    /// `None` when the code has no dynamic import.
    fn transform_dynamic_import(&self, path: &Path, code: &str) -> Option<TransformOutput> {
        dynamic_import::rewrite(path, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransformError::parse_error("Unexpected token");
        assert_eq!(err.to_string(), "TRANSFORM_PARSE_ERROR: Unexpected token");
    }

    #[test]
    fn test_output_builder() {
        let out = TransformOutput::new("x").with_source_map("{}");
        assert_eq!(out.code, "x");
        assert_eq!(out.map.as_deref(), Some("{}"));
    }
}
