//! Component AST
//!
//! Closed variant types for the markup tree plus the hoisted script and style
//! blocks. Embedded JavaScript is kept as an oxc tree next to its raw source
//! slice; only the source slice is serialized.

use oxc_ast::ast::{Expression, Program};
use serde::Serialize;

// ═══════════════════════════════════════════════════════════════════════════════
// FRAGMENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum Fragment<'a> {
    Element(Element<'a>),
    Text(Text),
    Expression(EmbeddedExpression<'a>),
}

#[derive(Debug, Serialize)]
pub struct Element<'a> {
    pub name: String,
    pub attributes: Vec<Attribute<'a>>,
    pub children: Vec<Fragment<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Text {
    pub value: String,
}

/// A `{...}` interpolation or the value of a `name={...}` attribute.
#[derive(Debug, Serialize)]
pub struct EmbeddedExpression<'a> {
    pub source: &'a str,
    #[serde(skip)]
    pub tree: Expression<'a>,
}

impl<'a> EmbeddedExpression<'a> {
    /// Name carried by the expression when it is a bare identifier.
    /// Compound expressions carry no name.
    pub fn identifier(&self) -> Option<&str> {
        match &self.tree {
            Expression::Identifier(ident) => Some(ident.name.as_str()),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct Attribute<'a> {
    pub name: String,
    pub value: AttributeValue<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum AttributeValue<'a> {
    /// `name="..."`
    Quoted(String),
    /// `name={expr}`
    Expression(EmbeddedExpression<'a>),
    /// `name={"..."}`, outer quotes stripped
    Literal(String),
    /// `name` with no value
    Bare,
}

impl<'a> AttributeValue<'a> {
    pub fn expression(&self) -> Option<&EmbeddedExpression<'a>> {
        match self {
            AttributeValue::Expression(expr) => Some(expr),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BLOCKS & ROOT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct ScriptBlock<'a> {
    pub source: &'a str,
    #[serde(skip)]
    pub program: Program<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleBlock {
    pub raw: String,
}

#[derive(Debug, Serialize)]
pub struct ComponentAst<'a> {
    pub script: Option<ScriptBlock<'a>>,
    pub html: Vec<Fragment<'a>>,
    pub style: Option<StyleBlock>,
}

impl<'a> ComponentAst<'a> {
    pub fn program(&self) -> Option<&Program<'a>> {
        self.script.as_ref().map(|script| &script.program)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
