//! Parse Module
//!
//! Recursive-descent scanner over raw component text. A single cursor walks the
//! input; markup becomes a fragment tree, the `<script>` body is handed to oxc
//! as a module program and the `<style>` body is kept verbatim.
//!
//! Block and expression bodies end at the FIRST occurrence of their closing
//! delimiter. `{a({})}` therefore ends at the first `}` and a script containing
//! the text `</script>` inside a string ends early.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{Expression, Program};
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;
use std::collections::HashSet;

use crate::ast::{
    Attribute, AttributeValue, ComponentAst, Element, EmbeddedExpression, Fragment, ScriptBlock,
    StyleBlock, Text,
};
use crate::error::{CompilerError, DUPLICATE_BLOCK, EXPRESSION_SYNTAX_ERROR, PARSE_ERROR};

const SCRIPT_OPEN: &str = "<script>";
const SCRIPT_CLOSE: &str = "</script>";
const STYLE_OPEN: &str = "<style>";
const STYLE_CLOSE: &str = "</style>";

lazy_static! {
    static ref TAG_NAME: Regex = Regex::new(r"^[a-z]+").unwrap();
    static ref ATTRIBUTE_NAME: Regex = Regex::new(r"^[^=\s>/]+").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"^\s+").unwrap();
    static ref TEXT_CONTENT: Regex = Regex::new(r"^[^<{]+").unwrap();

    /// Void elements: no children, no closing tag.
    static ref SELF_CLOSING_TAGS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("area");
        s.insert("base");
        s.insert("br");
        s.insert("col");
        s.insert("command");
        s.insert("embed");
        s.insert("hr");
        s.insert("img");
        s.insert("input");
        s.insert("keygen");
        s.insert("link");
        s.insert("meta");
        s.insert("param");
        s.insert("source");
        s.insert("track");
        s.insert("wbr");
        s
    };
}

pub fn is_self_closing_tag(tag_name: &str) -> bool {
    SELF_CLOSING_TAGS.contains(tag_name)
}

/// Parse a full component.
pub fn parse<'a>(allocator: &'a Allocator, source: &'a str) -> Result<ComponentAst<'a>, CompilerError> {
    TemplateParser::new(allocator, source).parse()
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSION SUB-PARSER
// ═══════════════════════════════════════════════════════════════════════════════

pub fn parse_program<'a>(allocator: &'a Allocator, code: &'a str) -> Result<Program<'a>, String> {
    let ret = Parser::new(allocator, code, SourceType::mjs()).parse();
    if let Some(error) = ret.errors.first() {
        return Err(error.to_string());
    }
    Ok(ret.program)
}

pub fn parse_expression<'a>(
    allocator: &'a Allocator,
    code: &'a str,
) -> Result<Expression<'a>, String> {
    Parser::new(allocator, code, SourceType::mjs())
        .parse_expression()
        .map_err(|errors| {
            errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "invalid expression".to_string())
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE PARSER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TemplateParser<'a> {
    allocator: &'a Allocator,
    source: &'a str,
    index: usize,
    script: Option<ScriptBlock<'a>>,
    style: Option<StyleBlock>,
}

impl<'a> TemplateParser<'a> {
    pub fn new(allocator: &'a Allocator, source: &'a str) -> Self {
        Self {
            allocator,
            source,
            index: 0,
            script: None,
            style: None,
        }
    }

    pub fn parse(mut self) -> Result<ComponentAst<'a>, CompilerError> {
        let html = self.parse_fragments(|p| !p.at_end())?;
        if !self.at_end() {
            return Err(self.error("Parse error: unexpected closing tag"));
        }
        Ok(ComponentAst {
            script: self.script,
            html,
            style: self.style,
        })
    }

    fn parse_fragments<F>(&mut self, condition: F) -> Result<Vec<Fragment<'a>>, CompilerError>
    where
        F: Fn(&Self) -> bool,
    {
        let mut fragments = Vec::new();
        while condition(self) {
            // End of input or a closing tag that the caller did not expect;
            // the caller reports what it was waiting for.
            if self.at_end() || self.match_str("</") {
                break;
            }
            if let Some(fragment) = self.parse_fragment()? {
                fragments.push(fragment);
            }
        }
        Ok(fragments)
    }

    /// First match wins: script, element, expression, text, style.
    fn parse_fragment(&mut self) -> Result<Option<Fragment<'a>>, CompilerError> {
        if self.parse_script()? {
            return Ok(None);
        }
        if let Some(element) = self.parse_element()? {
            return Ok(Some(element));
        }
        if let Some(expression) = self.parse_expression()? {
            return Ok(Some(expression));
        }
        if let Some(text) = self.parse_text_content() {
            return Ok(Some(text));
        }
        self.parse_style()?;
        Ok(None)
    }

    fn parse_element(&mut self) -> Result<Option<Fragment<'a>>, CompilerError> {
        if !self.match_str("<") || self.match_str(STYLE_OPEN) {
            return Ok(None);
        }
        self.advance("<")?;
        let name = self.read_while_matching(&TAG_NAME);
        if name.is_empty() {
            return Err(self.error("Parse error: expecting tag name"));
        }

        let attributes = self.parse_attribute_list()?;
        self.advance(">")?;

        let children = if is_self_closing_tag(name) {
            Vec::new()
        } else {
            let end_tag = format!("</{}>", name);
            let children = self.parse_fragments(|p| !p.match_str(&end_tag))?;
            self.advance(&end_tag)?;
            children
        };

        Ok(Some(Fragment::Element(Element {
            name: name.to_string(),
            attributes,
            children,
        })))
    }

    fn parse_script(&mut self) -> Result<bool, CompilerError> {
        if !self.match_str(SCRIPT_OPEN) {
            return Ok(false);
        }
        if self.script.is_some() {
            return Err(self.error_with_code(DUPLICATE_BLOCK, "Parse error: second <script> block"));
        }
        self.advance(SCRIPT_OPEN)?;
        let start = self.index;
        let end = self.find_from(SCRIPT_CLOSE)?;
        let code = &self.source[start..end];
        let program = parse_program(self.allocator, code)
            .map_err(|message| self.syntax_error(start, &message))?;
        self.index = end;
        self.advance(SCRIPT_CLOSE)?;

        self.script = Some(ScriptBlock {
            source: code,
            program,
        });
        Ok(true)
    }

    fn parse_style(&mut self) -> Result<bool, CompilerError> {
        if !self.match_str(STYLE_OPEN) {
            return Ok(false);
        }
        if self.style.is_some() {
            return Err(self.error_with_code(DUPLICATE_BLOCK, "Parse error: second <style> block"));
        }
        self.advance(STYLE_OPEN)?;
        let end = self.find_from(STYLE_CLOSE)?;
        let raw = self.source[self.index..end].to_string();
        self.index = end;
        self.advance(STYLE_CLOSE)?;

        self.style = Some(StyleBlock { raw });
        Ok(true)
    }

    fn parse_attribute_list(&mut self) -> Result<Vec<Attribute<'a>>, CompilerError> {
        let mut attributes = Vec::new();
        self.skip_whitespace();
        while !self.match_str(">") {
            if self.at_end() {
                return Err(self.error("Parse error: expecting >"));
            }
            // `<br />`: the slash only marks the tag as closed
            if self.match_str("/>") {
                self.advance("/")?;
                continue;
            }
            attributes.push(self.parse_attribute()?);
            self.skip_whitespace();
        }
        Ok(attributes)
    }

    fn parse_attribute(&mut self) -> Result<Attribute<'a>, CompilerError> {
        let name = self.read_while_matching(&ATTRIBUTE_NAME);
        if name.is_empty() {
            return Err(self.error("Parse error: expecting attribute name"));
        }

        let value = if let Some(value) = self.parse_quoted_attribute()? {
            AttributeValue::Quoted(value)
        } else if let Some(value) = self.parse_expression_attribute()? {
            value
        } else {
            AttributeValue::Bare
        };

        Ok(Attribute {
            name: name.to_string(),
            value,
        })
    }

    /// `="..."`, ending at the next `"`.
    fn parse_quoted_attribute(&mut self) -> Result<Option<String>, CompilerError> {
        if !self.match_str("=\"") {
            return Ok(None);
        }
        self.advance("=\"")?;
        let end = self.find_from("\"")?;
        let value = self.source[self.index..end].to_string();
        self.index = end;
        self.advance("\"")?;
        Ok(Some(value))
    }

    /// `={...}`, ending at the first `}`.
    fn parse_expression_attribute(&mut self) -> Result<Option<AttributeValue<'a>>, CompilerError> {
        if !self.match_str("=") {
            return Ok(None);
        }
        self.advance("={")?;
        let start = self.index;
        let end = self.find_from("}")?;
        let raw = &self.source[start..end];

        let value = if raw.starts_with('"') || raw.starts_with('\'') {
            AttributeValue::Literal(strip_quotes(raw).to_string())
        } else {
            let tree = parse_expression(self.allocator, raw)
                .map_err(|message| self.syntax_error(start, &message))?;
            AttributeValue::Expression(EmbeddedExpression { source: raw, tree })
        };

        self.index = end;
        self.advance("}")?;
        Ok(Some(value))
    }

    fn parse_expression(&mut self) -> Result<Option<Fragment<'a>>, CompilerError> {
        if !self.match_str("{") {
            return Ok(None);
        }
        self.advance("{")?;
        let start = self.index;
        let end = self.find_from("}")?;
        let source = &self.source[start..end];
        let tree = parse_expression(self.allocator, source)
            .map_err(|message| self.syntax_error(start, &message))?;
        self.index = end;
        self.advance("}")?;

        Ok(Some(Fragment::Expression(EmbeddedExpression { source, tree })))
    }

    fn parse_text_content(&mut self) -> Option<Fragment<'a>> {
        let text = self.read_while_matching(&TEXT_CONTENT);
        if text.trim().is_empty() {
            return None;
        }
        Some(Fragment::Text(Text {
            value: text.to_string(),
        }))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CURSOR HELPERS
    // ═══════════════════════════════════════════════════════════════════════════

    fn rest(&self) -> &'a str {
        &self.source[self.index..]
    }

    fn at_end(&self) -> bool {
        self.index >= self.source.len()
    }

    fn match_str(&self, expected: &str) -> bool {
        self.rest().starts_with(expected)
    }

    fn advance(&mut self, expected: &str) -> Result<(), CompilerError> {
        if self.match_str(expected) {
            self.index += expected.len();
            Ok(())
        } else {
            Err(self.error(&format!("Parse error: expecting {}", expected)))
        }
    }

    fn read_while_matching(&mut self, pattern: &Regex) -> &'a str {
        let rest = self.rest();
        match pattern.find(rest) {
            Some(m) => {
                self.index += m.end();
                &rest[..m.end()]
            }
            None => "",
        }
    }

    fn skip_whitespace(&mut self) {
        self.read_while_matching(&WHITESPACE);
    }

    /// Absolute offset of the first occurrence of `needle` at or after the cursor.
    fn find_from(&self, needle: &str) -> Result<usize, CompilerError> {
        self.rest()
            .find(needle)
            .map(|offset| self.index + offset)
            .ok_or_else(|| self.error(&format!("Parse error: expecting {}", needle)))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    fn error(&self, message: &str) -> CompilerError {
        self.error_with_code(PARSE_ERROR, message)
    }

    fn error_with_code(&self, code: &str, message: &str) -> CompilerError {
        let (line, column) = line_column(self.source, self.index);
        let context: String = self.rest().chars().take(24).collect();
        CompilerError::with_context(
            code,
            message,
            line,
            column,
            if context.is_empty() { None } else { Some(context) },
        )
    }

    fn syntax_error(&self, offset: usize, message: &str) -> CompilerError {
        let (line, column) = line_column(self.source, offset);
        CompilerError::new(EXPRESSION_SYNTAX_ERROR, message, line, column)
    }
}

fn strip_quotes(raw: &str) -> &str {
    let quote = &raw[..1];
    let inner = &raw[1..];
    inner.strip_suffix(quote).unwrap_or(inner)
}

/// 1-based line and column of a byte offset.
pub fn line_column(source: &str, offset: usize) -> (u32, u32) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line as u32, column as u32)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
