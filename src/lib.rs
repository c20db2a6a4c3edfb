//! # Reactive Component Compiler
//!
//! Compiles a single-file component (optional `<script>`, markup, optional
//! `<style>`) into one ES module whose default export builds a lifecycle object:
//!
//! ```text
//! create(target)   build the DOM subtree and attach it to `target`
//! update(changed)  refresh the text nodes bound to the changed variables
//! destroy()        remove listeners and detach the subtree
//! ```
//!
//! ## Pipeline
//!
//! 1. **parse**: component text into a [`ComponentAst`] (fragments, script, style)
//! 2. **analyze**: which top-level variables are declared, mutated and read by markup
//! 3. **generate**: fragment instructions, script instrumentation, module assembly
//!
//! Every failure is a [`CompilerError`] and aborts the run; no partial output
//! is produced.

#[cfg(feature = "napi")]
use napi_derive::napi;

pub mod analyze;
pub mod ast;
pub mod codegen;
pub mod compile;
pub mod error;
pub mod instrument;
pub mod parse;
pub mod scope;
pub mod visitor;

#[cfg(test)]
mod pipeline_tests;

pub use analyze::{analyze, AnalysisResult, AnalysisSummary};
pub use ast::ComponentAst;
pub use codegen::{generate, GeneratedCode, Instruction};
pub use compile::{compile, CompileOptions, CompileResult};
pub use error::CompilerError;
pub use parse::parse;

#[cfg(feature = "napi")]
#[napi(object)]
pub struct CompileOutput {
    pub js: String,
    pub css: Option<String>,
    pub ast_json: String,
}

/// Node entry point. `options_json` is a JSON object of [`CompileOptions`]
/// fields; missing fields keep their defaults.
#[cfg(feature = "napi")]
#[napi]
pub fn compile_component_native(
    source: String,
    options_json: Option<String>,
) -> napi::Result<CompileOutput> {
    let options = match options_json {
        Some(json) => CompileOptions::from_json(&json),
        None => Ok(CompileOptions::default()),
    }
    .map_err(|e| napi::Error::from_reason(e.to_string()))?;

    let result = compile(&source, &options).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    Ok(CompileOutput {
        js: result.js,
        css: result.css,
        ast_json: result.ast_json,
    })
}
