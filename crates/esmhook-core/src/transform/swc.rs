//! SWC-backed [`SourceTransformer`].
//!
//! With the `swc` feature, TypeScript is stripped and JSX compiled through
//! SWC. Without it, a regex-based stripper removes a narrow set of
//! annotations (declared variables, parameter lists, return types,
//! interfaces and type aliases) and rejects every other TypeScript-only
//! construct it recognizes with a [`TransformError`] instead of guessing.

#![allow(clippy::default_trait_access)]
#![allow(clippy::needless_raw_string_hashes)]

use super::source_map::identity_map;
use super::{SourceTransformer, TransformError, TransformOutput, TransformRequest};
use serde_json::Value;
use std::path::Path;

/// How JSX is compiled, from `compilerOptions.jsx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsxRuntime {
    /// `React.createElement` calls (`"react"`, or unset).
    #[default]
    Classic,
    /// `react/jsx-runtime` imports (`"react-jsx"`, `"react-jsxdev"`).
    Automatic,
    /// Leave JSX untouched (`"preserve"`, `"react-native"`).
    Preserve,
}

impl JsxRuntime {
    /// Read the runtime from a raw tsconfig document.
    #[must_use]
    pub fn from_tsconfig(raw: Option<&Value>) -> Self {
        let jsx = raw
            .and_then(|r| r.get("compilerOptions"))
            .and_then(|c| c.get("jsx"))
            .and_then(Value::as_str);
        match jsx.map(str::to_ascii_lowercase).as_deref() {
            Some("react-jsx" | "react-jsxdev") => Self::Automatic,
            Some("preserve" | "react-native") => Self::Preserve,
            _ => Self::Classic,
        }
    }
}

/// SWC-based transformer.
///
/// `SwcTransformer` is `Send + Sync`; each call is independent.
#[derive(Debug, Clone, Default)]
pub struct SwcTransformer {
    _private: (),
}

impl SwcTransformer {
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn is_typescript(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "ts" | "tsx" | "mts" | "cts"))
    }

    fn is_jsx(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "jsx" | "tsx"))
    }

    fn is_json(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "json")
    }
}

impl SourceTransformer for SwcTransformer {
    fn name(&self) -> &'static str {
        "swc"
    }

    fn transform(&self, request: &TransformRequest<'_>) -> Result<TransformOutput, TransformError> {
        let source_name = request.path.to_string_lossy();

        if Self::is_json(request.path) {
            return transform_json(request.code, &source_name);
        }
        if request.code.is_empty() {
            return Ok(TransformOutput::new("").with_source_map(identity_map(&source_name, "")));
        }

        let is_ts = Self::is_typescript(request.path);
        let is_jsx = Self::is_jsx(request.path);
        let runtime = JsxRuntime::from_tsconfig(request.tsconfig_raw);

        #[cfg(not(feature = "swc"))]
        {
            let mut code = request.code.to_string();
            if is_ts {
                code = strip_simple_types(&code).map_err(|construct| {
                    TransformError::transform_error(format!(
                        "{source_name}: {construct} requires the `swc` feature"
                    ))
                })?;
            }
            if is_jsx {
                code = transform_simple_jsx(&code, runtime);
            }
            let map = identity_map(&source_name, &code);
            Ok(TransformOutput::new(code).with_source_map(map))
        }

        #[cfg(feature = "swc")]
        {
            compile_with_swc(request.code, &source_name, is_ts, is_jsx, runtime)
        }
    }
}

/// JSON becomes a module whose default export is the document.
fn transform_json(code: &str, source_name: &str) -> Result<TransformOutput, TransformError> {
    let text = code.trim_start_matches('\u{feff}').trim();
    serde_json::from_str::<Value>(text)
        .map_err(|e| TransformError::parse_error(format!("{source_name}: {e}")))?;
    let out = format!("export default {text};\n");
    let map = identity_map(source_name, &out);
    Ok(TransformOutput::new(out).with_source_map(map))
}

/// TypeScript the fallback stripper refuses, with a label for the error.
#[cfg(not(feature = "swc"))]
const UNSUPPORTED_TYPESCRIPT: &[(&str, &str)] = &[
    (r"(?m)^\s*(export\s+)?(declare|enum|namespace|module|abstract)\s", "declaration"),
    (r"(?m)^\s*(export\s+)?const\s+enum\s", "const enum"),
    (r"(?m)^\s*(export\s+)?(interface|type)\s+\w", "type declaration"),
    (r"\bclass\s+\w+[^{]*\bimplements\b", "implements clause"),
    (r"\b(function\s*\*?\s*\w*|class\s+\w+)\s*<", "generic declaration"),
    (
        r"[\w)\]]\s+as\s+(const|any|unknown|never|string|number|boolean|[A-Z]\w*)\b",
        "type assertion",
    ),
    (r"\b(public|private|protected|readonly)\s+\w+\s*[:;=,)]", "member modifier"),
];

/// Control-flow keywords whose parenthesized heads are not parameter lists.
#[cfg(not(feature = "swc"))]
const CONTROL_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch", "with"];

/// Strip the annotations the fallback understands, or name the first
/// construct it cannot remove safely.
#[cfg(not(feature = "swc"))]
fn strip_simple_types(source: &str) -> Result<String, &'static str> {
    let mut result = source.to_string();

    for (pattern, replacement) in [
        (r"(?m)^(export\s+)?interface\s+\w+\s*\{[^{}]*\}[ \t]*\n?", ""),
        (r"(?m)^(export\s+)?type\s+\w+\s*=\s*[^;{}]+;[ \t]*\n?", ""),
        (r"(const|let|var)\s+(\w+)\s*:\s*\w+(\s*\[\s*\])?\s*=", "$1 $2 ="),
        (r"\)\s*:\s*\w+(\s*\[\s*\])?\s*\{", ") {"),
        (r"\)\s*:\s*\w+(\s*\[\s*\])?\s*=>", ") =>"),
    ] {
        if let Ok(re) = regex_lite::Regex::new(pattern) {
            result = re.replace_all(&result, replacement).into_owned();
        }
    }

    // Parameter lists of declarations, methods and arrows.
    let mut unsupported = None;
    for pattern in [r"(\w+)\s*\(([^()]*)\)(\s*\{)", r"()\(([^()]*)\)(\s*=>)"] {
        let Ok(re) = regex_lite::Regex::new(pattern) else {
            continue;
        };
        result = re
            .replace_all(&result, |caps: &regex_lite::Captures| {
                if CONTROL_KEYWORDS.contains(&&caps[1]) {
                    return caps[0].to_string();
                }
                match strip_parameter_types(&caps[2]) {
                    Some(params) => format!("{}({params}){}", &caps[1], &caps[3]),
                    None => {
                        unsupported = Some("parameter annotation");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned();
    }
    if let Some(construct) = unsupported {
        return Err(construct);
    }

    for (pattern, construct) in UNSUPPORTED_TYPESCRIPT {
        let Ok(re) = regex_lite::Regex::new(pattern) else {
            continue;
        };
        let found = result
            .lines()
            .filter(|line| !is_module_clause(line))
            .any(|line| re.is_match(line));
        if found {
            return Err(*construct);
        }
    }
    Ok(result)
}

/// `import`/`export ... from` lines use `as` for renames.
#[cfg(not(feature = "swc"))]
fn is_module_clause(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("import ")
        || line.starts_with("import{")
        || line.starts_with("export {")
        || line.starts_with("export{")
        || line.starts_with("export *")
}

/// Drop `name: Type` annotations from a parameter list. Lists that still
/// hold a `:` afterwards (destructuring, defaults, optional or union types)
/// are rejected.
#[cfg(not(feature = "swc"))]
fn strip_parameter_types(params: &str) -> Option<String> {
    if !params.contains(':') {
        return Some(params.to_string());
    }
    if params.contains(['{', '=', '?', '|', '&', '<']) {
        return None;
    }
    let re = regex_lite::Regex::new(r"(\w+)\s*:\s*\w+(\s*\[\s*\])?").ok()?;
    let stripped = re.replace_all(params, "$1").into_owned();
    (!stripped.contains(':')).then_some(stripped)
}

#[cfg(not(feature = "swc"))]
fn transform_simple_jsx(source: &str, runtime: JsxRuntime) -> String {
    let (element, self_closing): (fn(&str, &str) -> String, fn(&str) -> String) = match runtime {
        JsxRuntime::Preserve => return source.to_string(),
        JsxRuntime::Automatic => (
            |tag, content| format!("_jsx(\"{tag}\", {{ children: \"{content}\" }})"),
            |tag| format!("_jsx(\"{tag}\", {{}})"),
        ),
        JsxRuntime::Classic => (
            |tag, content| format!("React.createElement(\"{tag}\", null, \"{content}\")"),
            |tag| format!("React.createElement(\"{tag}\", null)"),
        ),
    };

    let mut result = source.to_string();
    if runtime == JsxRuntime::Automatic && !result.contains("jsx-runtime") {
        result = format!("import {{ jsx as _jsx }} from \"react/jsx-runtime\";\n{result}");
    }

    // <div>text</div>; regex-lite has no backreferences, so the closing tag
    // is checked in the replacer.
    if let Ok(re) = regex_lite::Regex::new(r"<(\w+)>([^<]*)</(\w+)>") {
        result = re
            .replace_all(&result, |caps: &regex_lite::Captures| {
                if caps[1] == caps[3] {
                    element(&caps[1], &caps[2])
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
    }
    if let Ok(re) = regex_lite::Regex::new(r"<(\w+)\s*/>") {
        result = re
            .replace_all(&result, |caps: &regex_lite::Captures| self_closing(&caps[1]))
            .into_owned();
    }
    result
}

#[cfg(feature = "swc")]
fn compile_with_swc(
    source: &str,
    source_name: &str,
    is_ts: bool,
    is_jsx: bool,
    runtime: JsxRuntime,
) -> Result<TransformOutput, TransformError> {
    use swc_common::{
        comments::SingleThreadedComments, errors::Handler, sync::Lrc, FileName, Globals, Mark,
        SourceMap, GLOBALS,
    };
    use swc_ecma_ast::{EsVersion, Program};
    use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
    use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};
    use swc_ecma_transforms_base::{fixer::fixer, hygiene::hygiene, resolver};
    use swc_ecma_transforms_react::{react, Options as ReactOptions, Runtime};
    use swc_ecma_transforms_typescript::strip;
    use swc_ecma_visit::FoldWith;

    let cm: Lrc<SourceMap> = Default::default();
    let handler = Handler::with_emitter_writer(Box::new(std::io::sink()), Some(cm.clone()));
    let fm = cm.new_source_file(
        Lrc::new(FileName::Custom(source_name.to_string())),
        source.to_string(),
    );

    let syntax = if is_ts {
        Syntax::Typescript(TsSyntax {
            tsx: is_jsx,
            decorators: true,
            ..Default::default()
        })
    } else {
        Syntax::Es(EsSyntax {
            jsx: is_jsx,
            decorators: true,
            ..Default::default()
        })
    };
    let target = EsVersion::EsNext;
    let comments = SingleThreadedComments::default();

    let lexer = Lexer::new(syntax, target, StringInput::from(&*fm), Some(&comments));
    let mut parser = Parser::new_from(lexer);
    let module = parser.parse_module().map_err(|e| {
        let kind = format!("{:?}", e.kind());
        e.into_diagnostic(&handler).emit();
        TransformError::parse_error(format!("Failed to parse {source_name}: {kind}"))
    })?;

    let errors: Vec<String> = parser
        .take_errors()
        .into_iter()
        .map(|e| format!("{:?}", e.kind()))
        .collect();
    if !errors.is_empty() {
        return Err(TransformError::parse_error(errors.join(", ")));
    }

    let output = GLOBALS.set(&Globals::default(), || {
        let unresolved_mark = Mark::new();
        let top_level_mark = Mark::new();

        let mut program = Program::Module(module);
        program = program.fold_with(&mut resolver(unresolved_mark, top_level_mark, is_ts));
        if is_ts {
            program = program.fold_with(&mut strip(unresolved_mark, top_level_mark));
        }

        let mut module = match program {
            Program::Module(m) => m,
            Program::Script(s) => swc_ecma_ast::Module {
                span: s.span,
                body: s
                    .body
                    .into_iter()
                    .map(swc_ecma_ast::ModuleItem::Stmt)
                    .collect(),
                shebang: s.shebang,
            },
        };

        if is_jsx && runtime != JsxRuntime::Preserve {
            let react_options = ReactOptions {
                runtime: Some(match runtime {
                    JsxRuntime::Automatic => Runtime::Automatic,
                    _ => Runtime::Classic,
                }),
                import_source: Some("react".to_string()),
                ..Default::default()
            };
            module = module.fold_with(&mut react(
                cm.clone(),
                Some(&comments),
                react_options,
                top_level_mark,
                unresolved_mark,
            ));
        }

        module = module.fold_with(&mut hygiene());
        module.fold_with(&mut fixer(Some(&comments)))
    });

    let mut buf = Vec::new();
    let mut src_map_buf = Vec::new();
    {
        let writer = JsWriter::new(cm.clone(), "\n", &mut buf, Some(&mut src_map_buf));
        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default().with_target(target),
            cm: cm.clone(),
            comments: Some(&comments),
            wr: writer,
        };
        emitter
            .emit_module(&output)
            .map_err(|e| TransformError::transform_error(format!("Failed to emit: {e}")))?;
    }

    let code = String::from_utf8(buf)
        .map_err(|e| TransformError::transform_error(format!("Invalid UTF-8 output: {e}")))?;

    let srcmap = cm.build_source_map(&src_map_buf);
    let mut map_buf = Vec::new();
    srcmap.to_writer(&mut map_buf).map_err(|e| {
        TransformError::transform_error(format!("Failed to write source map: {e}"))
    })?;
    let map = String::from_utf8(map_buf)
        .map_err(|e| TransformError::transform_error(format!("Invalid source map: {e}")))?;

    Ok(TransformOutput::new(code).with_source_map(map))
}
