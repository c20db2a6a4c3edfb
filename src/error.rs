#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const PARSE_ERROR: &str = "PARSE_ERROR";
pub const EXPRESSION_SYNTAX_ERROR: &str = "EXPRESSION_SYNTAX_ERROR";
pub const MALFORMED_REACTIVE_SHAPE: &str = "MALFORMED_REACTIVE_SHAPE";
pub const INVALID_EVENT_HANDLER: &str = "INVALID_EVENT_HANDLER";
pub const DUPLICATE_BLOCK: &str = "DUPLICATE_BLOCK";
pub const UNSUPPORTED_EXPORT: &str = "UNSUPPORTED_EXPORT";
pub const RESERVED_NAME: &str = "RESERVED_NAME";

fn describe(code: &str) -> &'static str {
    match code {
        PARSE_ERROR => "The component text is missing an expected delimiter.",
        EXPRESSION_SYNTAX_ERROR => "Embedded script or expression text is not valid JavaScript.",
        MALFORMED_REACTIVE_SHAPE => {
            "Blocks must open with an assignment to a plain identifier or a non-assignment expression."
        }
        INVALID_EVENT_HANDLER => "Event bindings must name a handler with a bare identifier.",
        DUPLICATE_BLOCK => "A component holds at most one <script> and one <style> block.",
        UNSUPPORTED_EXPORT => {
            "Only `export` on a declaration is allowed; the script runs inside a factory function."
        }
        RESERVED_NAME => "The script declares a name the generated module uses itself.",
        _ => "Unknown error.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Terminal failure of a compilation run. Line and column are 1-based for
/// template positions and 0 when the failure has no template position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
    pub code: String,
    pub message: String,
    pub description: String,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, line: u32, column: u32) -> Self {
        Self::with_context(code, message, line, column, None)
    }

    pub fn with_context(
        code: &str,
        message: &str,
        line: u32,
        column: u32,
        context: Option<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            message: message.to_string(),
            description: describe(code).to_string(),
            line,
            column,
            context,
        }
    }

    /// Error raised after parsing, where no template position applies.
    pub fn unpositioned(code: &str, message: &str) -> Self {
        Self::new(code, message, 0, 0)
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(
                f,
                "[{}] {} ({}:{})",
                self.code, self.message, self.line, self.column
            )?;
        } else {
            write!(f, "[{}] {}", self.code, self.message)?;
        }
        if let Some(context) = &self.context {
            write!(f, "\n  near: {}", context)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompilerError {}
