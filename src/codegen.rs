//! Code generation
//!
//! Turns the fragment tree and its analysis into a lifecycle module:
//! one exported factory that inlines the instrumented script and returns
//! `{ create(target), update(changed), destroy() }`.

use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use std::fmt::Write as _;

use crate::analyze::AnalysisResult;
use crate::ast::{Attribute, AttributeValue, ComponentAst, Element, EmbeddedExpression, Text};
use crate::compile::CompileOptions;
use crate::error::{CompilerError, INVALID_EVENT_HANDLER, RESERVED_NAME};
use crate::instrument::{instrument_and_print, InstrumentedScript};
use crate::visitor::{walk_element, TemplateVisitor};

// ═══════════════════════════════════════════════════════════════════════════════
// INSTRUCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    CreateElement { name: String, tag: String },
    CreateText { name: String, value: String },
    /// Text node holding the value of `source`, a printed JS expression.
    CreateTextFromExpression { name: String, source: String },
    Append { parent: String, child: String },
    AddListener { target: String, event: String, handler: String },
    RemoveListener { target: String, event: String, handler: String },
    SetData { name: String, source: String },
    Remove { parent: String, child: String },
    /// Removal from whatever node currently holds `child`. Used for root
    /// nodes, whose parent is only in scope during `create`.
    Detach { child: String },
}

impl Instruction {
    pub fn to_js(&self) -> String {
        match self {
            Instruction::CreateElement { name, tag } => {
                format!("{} = document.createElement({});", name, js_string(tag))
            }
            Instruction::CreateText { name, value } => {
                format!("{} = document.createTextNode({});", name, js_string(value))
            }
            Instruction::CreateTextFromExpression { name, source } => {
                format!("{} = document.createTextNode({});", name, source)
            }
            Instruction::Append { parent, child } => {
                format!("{}.appendChild({});", parent, child)
            }
            Instruction::AddListener {
                target,
                event,
                handler,
            } => format!(
                "{}.addEventListener({}, {});",
                target,
                js_string(event),
                handler
            ),
            Instruction::RemoveListener {
                target,
                event,
                handler,
            } => format!(
                "{}.removeEventListener({}, {});",
                target,
                js_string(event),
                handler
            ),
            Instruction::SetData { name, source } => format!("{}.data = {};", name, source),
            Instruction::Remove { parent, child } => {
                format!("{}.removeChild({});", parent, child)
            }
            Instruction::Detach { child } => {
                format!("{}.parentNode.removeChild({});", child, child)
            }
        }
    }
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// JS for an embedded expression, printed from its tree so comments are
/// dropped. Anything other than a bare identifier is parenthesized, which keeps
/// `a, b` a single argument.
fn expression_js(expression: &EmbeddedExpression<'_>) -> String {
    if let Some(name) = expression.identifier() {
        return name.to_string();
    }
    let mut codegen = Codegen::new();
    codegen.print_expression(&expression.tree);
    format!("({})", codegen.into_source_text().trim())
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATED CODE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedCode {
    pub variables: Vec<String>,
    pub create: Vec<Instruction>,
    /// `(guard, instruction)`: runs only when `guard` is in the changed set.
    pub update: Vec<(String, Instruction)>,
    pub destroy: Vec<Instruction>,
    pub script: InstrumentedScript,
}

/// Generates the module source. Output depends only on the inputs.
pub fn generate<'a>(
    allocator: &'a Allocator,
    ast: &ComponentAst<'a>,
    analysis: &AnalysisResult,
    options: &CompileOptions,
) -> Result<String, CompilerError> {
    let mut code = build_fragment_code(ast, analysis, options)?;
    check_reserved_names(&code, analysis, options)?;
    if let Some(program) = ast.program() {
        code.script = instrument_and_print(
            allocator,
            program,
            &analysis.will_use_in_template,
            &options.hook_object,
        )?;
    }
    Ok(render_module(&code, options))
}

/// Parameter of the generated `update` procedure.
const CHANGED_PARAM: &str = "changed";

/// The script shares the factory scope with the synthetic variables and the
/// lifecycle object, and is visible inside `create`/`update`. A top-level
/// declaration with any of those names would redeclare or shadow it.
fn check_reserved_names(
    code: &GeneratedCode,
    analysis: &AnalysisResult,
    options: &CompileOptions,
) -> Result<(), CompilerError> {
    let reserved = code
        .variables
        .iter()
        .map(String::as_str)
        .chain([
            options.hook_object.as_str(),
            options.root_target.as_str(),
            CHANGED_PARAM,
        ]);
    for name in reserved {
        if analysis.declared_variables.contains(name) {
            return Err(CompilerError::unpositioned(
                RESERVED_NAME,
                &format!("`{}` is used by the generated module; rename it in the script", name),
            ));
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// FRAGMENT PASS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn build_fragment_code(
    ast: &ComponentAst<'_>,
    analysis: &AnalysisResult,
    options: &CompileOptions,
) -> Result<GeneratedCode, CompilerError> {
    let mut builder = FragmentCodeBuilder {
        analysis,
        options,
        counter: 1,
        parents: vec![options.root_target.clone()],
        code: GeneratedCode::default(),
        error: None,
    };
    builder.visit_fragments(&ast.html);
    match builder.error {
        Some(error) => Err(error),
        None => Ok(builder.code),
    }
}

struct FragmentCodeBuilder<'r> {
    analysis: &'r AnalysisResult,
    options: &'r CompileOptions,
    counter: usize,
    parents: Vec<String>,
    code: GeneratedCode,
    error: Option<CompilerError>,
}

impl<'r> FragmentCodeBuilder<'r> {
    fn declare(&mut self, prefix: &str) -> String {
        let name = format!("{}_{}", prefix, self.counter);
        self.counter += 1;
        self.code.variables.push(name.clone());
        name
    }

    fn parent(&self) -> String {
        self.parents
            .last()
            .cloned()
            .unwrap_or_else(|| self.options.root_target.clone())
    }

    fn at_root(&self) -> bool {
        self.parents.len() == 1
    }

    /// Appends `child` to the current parent. Elements always get a matching
    /// removal; text only at the root, since nested text leaves with its element.
    fn attach(&mut self, child: &str, is_element: bool) {
        let parent = self.parent();
        self.code.create.push(Instruction::Append {
            parent: parent.clone(),
            child: child.to_string(),
        });
        if self.at_root() {
            self.code.destroy.push(Instruction::Detach {
                child: child.to_string(),
            });
        } else if is_element {
            self.code.destroy.push(Instruction::Remove {
                parent,
                child: child.to_string(),
            });
        }
    }

    /// `(event, handler)` for an event binding, `None` for other attributes.
    fn event_binding(
        &self,
        attribute: &Attribute<'_>,
    ) -> Result<Option<(String, String)>, CompilerError> {
        let Some(event) = attribute.name.strip_prefix(self.options.event_prefix.as_str()) else {
            return Ok(None);
        };
        let handler = match &attribute.value {
            AttributeValue::Expression(expression) => expression.identifier(),
            _ => None,
        };
        match handler {
            Some(handler) => Ok(Some((event.to_string(), handler.to_string()))),
            None => Err(CompilerError::unpositioned(
                INVALID_EVENT_HANDLER,
                &format!(
                    "`{}` must be bound to a handler name, as in {}={{handler}}",
                    attribute.name, attribute.name
                ),
            )),
        }
    }
}

impl<'a, 'r> TemplateVisitor<'a> for FragmentCodeBuilder<'r> {
    fn visit_element(&mut self, element: &Element<'a>) {
        if self.error.is_some() {
            return;
        }
        let name = self.declare(&element.name);
        self.code.create.push(Instruction::CreateElement {
            name: name.clone(),
            tag: element.name.clone(),
        });

        self.parents.push(name.clone());
        walk_element(self, element);
        self.parents.pop();

        self.attach(&name, true);
    }

    fn visit_attribute(&mut self, attribute: &Attribute<'a>) {
        if self.error.is_some() {
            return;
        }
        match self.event_binding(attribute) {
            Ok(Some((event, handler))) => {
                let target = self.parent();
                self.code.create.push(Instruction::AddListener {
                    target: target.clone(),
                    event: event.clone(),
                    handler: handler.clone(),
                });
                self.code.destroy.push(Instruction::RemoveListener {
                    target,
                    event,
                    handler,
                });
            }
            Ok(None) => {}
            Err(error) => self.error = Some(error),
        }
    }

    fn visit_text(&mut self, text: &Text) {
        if self.error.is_some() {
            return;
        }
        let name = self.declare("txt");
        self.code.create.push(Instruction::CreateText {
            name: name.clone(),
            value: text.value.clone(),
        });
        self.attach(&name, false);
    }

    fn visit_expression(&mut self, expression: &EmbeddedExpression<'a>) {
        if self.error.is_some() {
            return;
        }
        let name = self.declare("txt");
        let source = expression_js(expression);
        self.code.create.push(Instruction::CreateTextFromExpression {
            name: name.clone(),
            source: source.clone(),
        });
        self.attach(&name, false);

        if let Some(identifier) = expression.identifier() {
            if self.analysis.will_change.contains(identifier) {
                self.code.update.push((
                    identifier.to_string(),
                    Instruction::SetData { name, source },
                ));
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE ASSEMBLY
// ═══════════════════════════════════════════════════════════════════════════════

pub fn render_module(code: &GeneratedCode, options: &CompileOptions) -> String {
    let hook = &options.hook_object;
    let mut out = String::new();

    out.push_str(&code.script.imports);
    out.push_str("export default function() {\n");

    for variable in &code.variables {
        let _ = writeln!(out, "  let {};", variable);
    }
    push_indented(&mut out, &code.script.body, 1);

    // Declared after the script: a write that runs while the script body itself
    // executes (top-level `n++`) reaches the hook in its temporal dead zone.
    let _ = writeln!(out, "  const {} = {{", hook);

    let _ = writeln!(out, "    create({}) {{", options.root_target);
    for instruction in &code.create {
        let _ = writeln!(out, "      {}", instruction.to_js());
    }
    out.push_str("    },\n");

    let _ = writeln!(out, "    update({}) {{", CHANGED_PARAM);
    for (guard, instruction) in &code.update {
        let _ = writeln!(
            out,
            "      if ({}.includes({})) {{",
            CHANGED_PARAM,
            js_string(guard)
        );
        let _ = writeln!(out, "        {}", instruction.to_js());
        out.push_str("      }\n");
    }
    out.push_str("    },\n");

    out.push_str("    destroy() {\n");
    for instruction in &code.destroy {
        let _ = writeln!(out, "      {}", instruction.to_js());
    }
    out.push_str("    },\n");

    out.push_str("  };\n");
    let _ = writeln!(out, "  return {};", hook);
    out.push_str("}\n");
    out
}

fn push_indented(out: &mut String, text: &str, depth: usize) {
    let pad = "  ".repeat(depth);
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        out.push_str(&pad);
        out.push_str(line);
        out.push('\n');
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
