//! Inline source-map helpers.

use super::TransformOutput;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};

const SOURCE_MAPPING_URL_PREFIX: &str = "//# sourceMappingURL=data:application/json;base64,";

/// A line-to-line map for output that keeps the input's line structure.
#[must_use]
pub fn identity_map(source: &str, code: &str) -> String {
    let lines = code.lines().count().max(1);
    let mut mappings = String::with_capacity(lines * 5);
    mappings.push_str("AAAA");
    for _ in 1..lines {
        mappings.push_str(";AACA");
    }
    json!({
        "version": 3,
        "sources": [source],
        "names": [],
        "mappings": mappings,
    })
    .to_string()
}

/// Append `output`'s map as an inline data URL, with `sources` pointing at
/// `url`. Output without a map is returned as is.
#[must_use]
pub fn attach(output: TransformOutput, url: &str) -> String {
    let Some(map) = output.map else {
        return output.code;
    };

    let map = match serde_json::from_str::<Value>(&map) {
        Ok(Value::Object(mut obj)) => {
            obj.insert("sources".into(), json!([url]));
            Value::Object(obj).to_string()
        }
        _ => {
            tracing::warn!(url, "transform produced an unreadable source map, dropping it");
            return output.code;
        }
    };

    let mut code = output.code;
    if !code.ends_with('\n') {
        code.push('\n');
    }
    code.push_str(SOURCE_MAPPING_URL_PREFIX);
    code.push_str(&BASE64.encode(map));
    code
}
