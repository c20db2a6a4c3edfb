//! Pipeline facade: parse, analyze and generate within one arena.

use oxc_allocator::Allocator;
use serde::{Deserialize, Serialize};

use crate::analyze::{analyze, AnalysisSummary};
use crate::codegen::generate;
use crate::error::{CompilerError, PARSE_ERROR};
use crate::parse::parse;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Attribute prefix marking an event binding, as in `on:click={handler}`.
    pub event_prefix: String,
    /// Name of the lifecycle object; instrumented writes call `<hook_object>.update`.
    pub hook_object: String,
    /// Parameter of `create` that root nodes are appended to.
    pub root_target: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            event_prefix: "on:".to_string(),
            hook_object: "lifecycle".to_string(),
            root_target: "target".to_string(),
        }
    }
}

impl CompileOptions {
    /// Options from a JSON object; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, CompilerError> {
        serde_json::from_str(json).map_err(|e| {
            CompilerError::unpositioned(PARSE_ERROR, &format!("Invalid compile options: {}", e))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub js: String,
    /// Raw style block text, when the component has one.
    pub css: Option<String>,
    pub ast_json: String,
    pub analysis: AnalysisSummary,
}

pub fn compile(source: &str, options: &CompileOptions) -> Result<CompileResult, CompilerError> {
    let allocator = Allocator::default();
    let ast = parse(&allocator, source)?;
    let analysis = analyze(&ast)?;
    let js = generate(&allocator, &ast, &analysis, options)?;

    let ast_json = ast.to_json().map_err(|e| {
        CompilerError::unpositioned(PARSE_ERROR, &format!("AST serialization failed: {}", e))
    })?;

    Ok(CompileResult {
        js,
        css: ast.style.as_ref().map(|style| style.raw.clone()),
        ast_json,
        analysis: analysis.summary(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DUPLICATE_BLOCK, EXPRESSION_SYNTAX_ERROR};

    #[test]
    fn test_default_options() {
        let options = CompileOptions::default();
        assert_eq!(options.event_prefix, "on:");
        assert_eq!(options.hook_object, "lifecycle");
        assert_eq!(options.root_target, "target");
    }

    #[test]
    fn test_options_from_partial_json() {
        let options = CompileOptions::from_json(r#"{ "hookObject": "$$self" }"#).unwrap();
        assert_eq!(options.hook_object, "$$self");
        assert_eq!(options.event_prefix, "on:");

        let err = CompileOptions::from_json("{ nope").unwrap_err();
        assert!(err.message.starts_with("Invalid compile options"));
    }

    #[test]
    fn test_style_is_passed_through() {
        let result = compile(
            "<p>styled</p><style>\n  p { color: red; }\n</style>",
            &CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(result.css.as_deref(), Some("\n  p { color: red; }\n"));
        assert!(!result.js.contains("color"));
    }

    #[test]
    fn test_no_style_means_no_css() {
        let result = compile("<p>plain</p>", &CompileOptions::default()).unwrap();
        assert_eq!(result.css, None);
    }

    #[test]
    fn test_errors_abort_the_run() {
        let options = CompileOptions::default();
        assert!(compile("<p>{a +}</p>", &options)
            .unwrap_err()
            .is(EXPRESSION_SYNTAX_ERROR));
        assert!(compile("<script>let x = ;</script>", &options)
            .unwrap_err()
            .is(EXPRESSION_SYNTAX_ERROR));
        assert!(compile("<style></style><style></style>", &options)
            .unwrap_err()
            .is(DUPLICATE_BLOCK));
    }

    #[test]
    fn test_ast_json_is_valid() {
        let result = compile("<p>{x}</p>", &CompileOptions::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&result.ast_json).unwrap();
        assert_eq!(value["html"][0]["name"], "p");
        assert_eq!(value["script"], serde_json::Value::Null);
    }
}
