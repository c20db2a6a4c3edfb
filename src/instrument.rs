//! Script instrumentation
//!
//! Rewrites every top-level mutation site whose target the markup reads so the
//! write is followed by a change notification on the hook object:
//!
//! ```text
//! count++                  ->  (count++, lifecycle.update(["count"]))
//! { count += 1; rest }     ->  { count += 1; lifecycle.update(["count"]); rest }
//! ```
//!
//! The parsed program is never touched. Rewrites happen on a `CloneIn` copy
//! that gets its own scope tree.

use oxc_allocator::{Allocator, Box as oxc_box, CloneIn, Vec as ArenaVec};
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_ast_visit::walk_mut::{
    walk_arrow_function_expression, walk_block_statement, walk_expression, walk_function_body,
};
use oxc_ast_visit::VisitMut;
use oxc_codegen::Codegen;
use oxc_span::SPAN;
use oxc_syntax::scope::{ScopeFlags, ScopeId};
use std::cell::Cell;
use std::collections::HashSet;

use crate::analyze::{block_assignment_target, update_target};
use crate::error::{CompilerError, UNSUPPORTED_EXPORT};
use crate::scope::{ScopeCursor, ScopeIndex, ScopeTree};

/// Outcome of looking at one node.
#[derive(Debug)]
pub enum Rewrite<T> {
    Unchanged,
    Replace(T),
    /// Replace and do not descend into the replacement.
    ReplaceAndSkip(T),
}

/// Printed script, split so imports can sit at module level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentedScript {
    pub imports: String,
    pub body: String,
}

pub fn instrument<'a>(
    allocator: &'a Allocator,
    program: &Program<'a>,
    will_use_in_template: &HashSet<String>,
    hook_object: &str,
) -> Result<Program<'a>, CompilerError> {
    let mut copy = program.clone_in(allocator);
    let scopes = ScopeTree::build(&copy);

    let mut instrumenter = Instrumenter {
        ast: AstBuilder::new(allocator),
        scopes: &scopes,
        cursor: ScopeCursor::default(),
        will_use_in_template,
        hook_object: allocator.alloc_str(hook_object),
        error: None,
    };
    instrumenter.visit_program(&mut copy);

    match instrumenter.error {
        Some(error) => Err(error),
        None => Ok(copy),
    }
}

/// Instruments and prints, hoisting import declarations out of the body.
/// `export let x` becomes `let x`; other export forms have nowhere to go
/// inside the factory and are rejected.
pub fn instrument_and_print<'a>(
    allocator: &'a Allocator,
    program: &Program<'a>,
    will_use_in_template: &HashSet<String>,
    hook_object: &str,
) -> Result<InstrumentedScript, CompilerError> {
    let mut instrumented = instrument(allocator, program, will_use_in_template, hook_object)?;
    unwrap_exports(AstBuilder::new(allocator), &mut instrumented)?;

    let mut imports = instrumented.clone_in(allocator);
    imports
        .body
        .retain(|stmt| matches!(stmt, Statement::ImportDeclaration(_)));

    let mut body = instrumented;
    body.body
        .retain(|stmt| !matches!(stmt, Statement::ImportDeclaration(_)));

    Ok(InstrumentedScript {
        imports: print(&imports),
        body: print(&body),
    })
}

fn unwrap_exports<'a>(ast: AstBuilder<'a>, program: &mut Program<'a>) -> Result<(), CompilerError> {
    let statements = std::mem::replace(&mut program.body, ast.vec());
    for statement in statements {
        match statement {
            Statement::ExportNamedDeclaration(mut export) => match export.declaration.take() {
                Some(declaration) => program.body.push(Statement::from(declaration)),
                None => return Err(unsupported_export("export { ... }")),
            },
            Statement::ExportDefaultDeclaration(_) => {
                return Err(unsupported_export("export default"))
            }
            Statement::ExportAllDeclaration(_) => return Err(unsupported_export("export *")),
            other => program.body.push(other),
        }
    }
    Ok(())
}

fn unsupported_export(form: &str) -> CompilerError {
    CompilerError::unpositioned(
        UNSUPPORTED_EXPORT,
        &format!("`{}` is not allowed in a component script", form),
    )
}

pub fn print(program: &Program<'_>) -> String {
    Codegen::new().build(program).code
}

struct Instrumenter<'a, 's> {
    ast: AstBuilder<'a>,
    scopes: &'s ScopeTree,
    cursor: ScopeCursor,
    will_use_in_template: &'s HashSet<String>,
    hook_object: &'a str,
    error: Option<CompilerError>,
}

impl<'a, 's> Instrumenter<'a, 's> {
    /// `<hook>.update(["name"])`
    fn notify(&self, name: &str) -> Expression<'a> {
        let name = self.ast.allocator.alloc_str(name);
        let mut names = self.ast.vec();
        names.push(ArrayExpressionElement::from(
            self.ast.expression_string_literal(SPAN, name, None),
        ));

        let mut args = self.ast.vec();
        args.push(Argument::from(self.ast.expression_array(SPAN, names)));

        let callee = Expression::from(self.ast.member_expression_static(
            SPAN,
            self.ast.expression_identifier(SPAN, self.hook_object),
            self.ast.identifier_name(SPAN, "update"),
            false,
        ));

        self.ast.expression_call(
            SPAN,
            callee,
            None::<oxc_box<TSTypeParameterInstantiation>>,
            args,
            false,
        )
    }

    fn rewrite_expression(&self, expr: &Expression<'a>) -> Rewrite<Expression<'a>> {
        let Expression::UpdateExpression(update) = expr else {
            return Rewrite::Unchanged;
        };
        let Some(name) = update_target(update, self.scopes, self.cursor.current()) else {
            return Rewrite::Unchanged;
        };
        if !self.will_use_in_template.contains(name) {
            return Rewrite::Unchanged;
        }

        let mut sequence = self.ast.vec();
        sequence.push(expr.clone_in(self.ast.allocator));
        sequence.push(self.notify(name));
        let sequence = self.ast.expression_sequence(SPAN, sequence);
        Rewrite::ReplaceAndSkip(self.ast.expression_parenthesized(SPAN, sequence))
    }

    fn rewrite_block(
        &self,
        statements: &ArenaVec<'a, Statement<'a>>,
        scope: ScopeIndex,
    ) -> Result<Rewrite<ArenaVec<'a, Statement<'a>>>, CompilerError> {
        let name = match block_assignment_target(statements, self.scopes, scope)? {
            Some(name) if self.will_use_in_template.contains(name) => name,
            _ => return Ok(Rewrite::Unchanged),
        };

        let mut rewritten = self.ast.vec();
        let mut rest = statements.iter();
        if let Some(first) = rest.next() {
            rewritten.push(first.clone_in(self.ast.allocator));
        }
        rewritten.push(self.ast.statement_expression(SPAN, self.notify(name)));
        for statement in rest {
            rewritten.push(statement.clone_in(self.ast.allocator));
        }
        Ok(Rewrite::ReplaceAndSkip(rewritten))
    }

    /// Applies a block rewrite; returns whether traversal should descend.
    fn apply_block(
        &mut self,
        statements: &mut ArenaVec<'a, Statement<'a>>,
        scope: ScopeIndex,
    ) -> bool {
        match self.rewrite_block(statements, scope) {
            Ok(Rewrite::Unchanged) => true,
            Ok(Rewrite::Replace(new)) => {
                *statements = new;
                true
            }
            Ok(Rewrite::ReplaceAndSkip(new)) => {
                *statements = new;
                false
            }
            Err(error) => {
                self.error = Some(error);
                false
            }
        }
    }
}

impl<'a, 's> VisitMut<'a> for Instrumenter<'a, 's> {
    fn enter_scope(&mut self, _flags: ScopeFlags, scope_id: &Cell<Option<ScopeId>>) {
        self.cursor.enter(self.scopes, scope_id);
    }

    fn leave_scope(&mut self) {
        self.cursor.leave();
    }

    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        if self.error.is_some() {
            return;
        }
        match self.rewrite_expression(expr) {
            Rewrite::Unchanged => walk_expression(self, expr),
            Rewrite::Replace(new) => {
                *expr = new;
                walk_expression(self, expr);
            }
            Rewrite::ReplaceAndSkip(new) => *expr = new,
        }
    }

    fn visit_block_statement(&mut self, it: &mut BlockStatement<'a>) {
        if self.error.is_some() {
            return;
        }
        let scope = self
            .scopes
            .scope_for(&it.scope_id)
            .unwrap_or_else(|| self.cursor.current());
        if self.apply_block(&mut it.body, scope) {
            walk_block_statement(self, it);
        }
    }

    fn visit_function_body(&mut self, it: &mut FunctionBody<'a>) {
        if self.error.is_some() {
            return;
        }
        let scope = self.cursor.current();
        if self.apply_block(&mut it.statements, scope) {
            walk_function_body(self, it);
        }
    }

    fn visit_arrow_function_expression(&mut self, it: &mut ArrowFunctionExpression<'a>) {
        if !it.expression {
            walk_arrow_function_expression(self, it);
            return;
        }
        self.enter_scope(ScopeFlags::Function | ScopeFlags::Arrow, &it.scope_id);
        self.visit_formal_parameters(&mut it.params);
        for statement in it.body.statements.iter_mut() {
            self.visit_statement(statement);
        }
        self.leave_scope();
    }
}
