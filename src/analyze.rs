//! Reactivity analysis
//!
//! Classifies script variables for the code generator:
//! - `declared_variables`: bindings of the script's root scope
//! - `will_change`: variables hit by a mutation site reachable from the top level
//! - `will_use_in_template`: identifiers the markup refers to directly

use oxc_ast::ast::*;
use oxc_ast_visit::{walk, Visit};
use oxc_syntax::scope::{ScopeFlags, ScopeId};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::HashSet;

use crate::ast::{Attribute, ComponentAst, EmbeddedExpression};
use crate::error::{CompilerError, MALFORMED_REACTIVE_SHAPE};
use crate::scope::{ScopeCursor, ScopeIndex, ScopeTree};
use crate::visitor::TemplateVisitor;

// ═══════════════════════════════════════════════════════════════════════════════
// RESULT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub declared_variables: HashSet<String>,
    pub will_change: HashSet<String>,
    pub will_use_in_template: HashSet<String>,
    pub root_scope: ScopeIndex,
    /// Parent-linked scopes; AST nodes map into it through their `scope_id`.
    pub scopes: ScopeTree,
}

impl AnalysisResult {
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            declared_variables: sorted(&self.declared_variables),
            will_change: sorted(&self.will_change),
            will_use_in_template: sorted(&self.will_use_in_template),
        }
    }
}

/// Sorted, serializable view of an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub declared_variables: Vec<String>,
    pub will_change: Vec<String>,
    pub will_use_in_template: Vec<String>,
}

fn sorted(set: &HashSet<String>) -> Vec<String> {
    let mut names: Vec<String> = set.iter().cloned().collect();
    names.sort();
    names
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

pub fn analyze(ast: &ComponentAst<'_>) -> Result<AnalysisResult, CompilerError> {
    let scopes = match ast.program() {
        Some(program) => ScopeTree::build(program),
        None => ScopeTree::empty(),
    };
    let root_scope = scopes.root();
    let declared_variables = scopes.declarations(root_scope).clone();

    let will_change = match ast.program() {
        Some(program) => collect_mutations(program, &scopes)?,
        None => HashSet::new(),
    };

    let mut references = TemplateReferences::default();
    references.visit_fragments(&ast.html);

    Ok(AnalysisResult {
        declared_variables,
        will_change,
        will_use_in_template: references.names,
        root_scope,
        scopes,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// MUTATION SHAPES
// ═══════════════════════════════════════════════════════════════════════════════

/// `x++` / `--x` on an identifier whose owner is the root scope.
pub(crate) fn update_target<'e>(
    update: &'e UpdateExpression<'_>,
    scopes: &ScopeTree,
    current: ScopeIndex,
) -> Option<&'e str> {
    match &update.argument {
        SimpleAssignmentTarget::AssignmentTargetIdentifier(ident) => {
            let name = ident.name.as_str();
            (scopes.owner(current, name) == Some(scopes.root())).then_some(name)
        }
        _ => None,
    }
}

/// A block opening with `x = ...` (any assignment operator) where `x` resolves
/// to some scope. The owner does not have to be the root scope.
///
/// Blocks must open with an expression statement, and an opening assignment
/// must target a plain identifier; anything else is a malformed shape.
pub(crate) fn block_assignment_target<'e>(
    statements: &'e [Statement<'_>],
    scopes: &ScopeTree,
    current: ScopeIndex,
) -> Result<Option<&'e str>, CompilerError> {
    let first = statements
        .first()
        .ok_or_else(|| malformed("block has no statements"))?;

    let Statement::ExpressionStatement(statement) = first else {
        return Err(malformed("block does not open with an expression statement"));
    };
    let Expression::AssignmentExpression(assignment) = &statement.expression else {
        return Ok(None);
    };
    let AssignmentTarget::AssignmentTargetIdentifier(ident) = &assignment.left else {
        return Err(malformed(
            "block opens with an assignment whose target is not an identifier",
        ));
    };

    let name = ident.name.as_str();
    Ok(scopes.owner(current, name).map(|_| name))
}

fn malformed(message: &str) -> CompilerError {
    CompilerError::unpositioned(MALFORMED_REACTIVE_SHAPE, message)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCRIPT WALK
// ═══════════════════════════════════════════════════════════════════════════════

fn collect_mutations(
    program: &Program<'_>,
    scopes: &ScopeTree,
) -> Result<HashSet<String>, CompilerError> {
    let mut collector = MutationCollector {
        scopes,
        cursor: ScopeCursor::default(),
        will_change: HashSet::new(),
        error: None,
    };
    collector.visit_program(program);
    match collector.error {
        Some(error) => Err(error),
        None => Ok(collector.will_change),
    }
}

struct MutationCollector<'s> {
    scopes: &'s ScopeTree,
    cursor: ScopeCursor,
    will_change: HashSet<String>,
    error: Option<CompilerError>,
}

impl<'s> MutationCollector<'s> {
    fn check_block(&mut self, statements: &[Statement<'_>], scope: ScopeIndex) -> bool {
        match block_assignment_target(statements, self.scopes, scope) {
            Ok(Some(name)) => {
                self.will_change.insert(name.to_string());
                true
            }
            Ok(None) => true,
            Err(error) => {
                self.error = Some(error);
                false
            }
        }
    }
}

impl<'a, 's> Visit<'a> for MutationCollector<'s> {
    fn enter_scope(&mut self, _flags: ScopeFlags, scope_id: &Cell<Option<ScopeId>>) {
        self.cursor.enter(self.scopes, scope_id);
    }

    fn leave_scope(&mut self) {
        self.cursor.leave();
    }

    fn visit_update_expression(&mut self, it: &UpdateExpression<'a>) {
        if self.error.is_some() {
            return;
        }
        if let Some(name) = update_target(it, self.scopes, self.cursor.current()) {
            self.will_change.insert(name.to_string());
        }
        walk::walk_update_expression(self, it);
    }

    fn visit_block_statement(&mut self, it: &BlockStatement<'a>) {
        if self.error.is_some() {
            return;
        }
        let scope = self
            .scopes
            .scope_for(&it.scope_id)
            .unwrap_or_else(|| self.cursor.current());
        if self.check_block(&it.body, scope) {
            walk::walk_block_statement(self, it);
        }
    }

    fn visit_function_body(&mut self, it: &FunctionBody<'a>) {
        if self.error.is_some() {
            return;
        }
        if self.check_block(&it.statements, self.cursor.current()) {
            walk::walk_function_body(self, it);
        }
    }

    fn visit_arrow_function_expression(&mut self, it: &ArrowFunctionExpression<'a>) {
        if !it.expression {
            walk::walk_arrow_function_expression(self, it);
            return;
        }
        // `() => expr` has no block; visit the single expression directly.
        self.enter_scope(ScopeFlags::Function | ScopeFlags::Arrow, &it.scope_id);
        self.visit_formal_parameters(&it.params);
        for statement in &it.body.statements {
            self.visit_statement(statement);
        }
        self.leave_scope();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE REFERENCES
// ═══════════════════════════════════════════════════════════════════════════════

/// Records only the identifier an expression node carries itself, not the free
/// variables of compound expressions.
#[derive(Default)]
struct TemplateReferences {
    names: HashSet<String>,
}

impl TemplateReferences {
    fn record(&mut self, expression: &EmbeddedExpression<'_>) {
        if let Some(name) = expression.identifier() {
            self.names.insert(name.to_string());
        }
    }
}

impl<'a> TemplateVisitor<'a> for TemplateReferences {
    fn visit_attribute(&mut self, attribute: &Attribute<'a>) {
        if let Some(expression) = attribute.value.expression() {
            self.record(expression);
        }
    }

    fn visit_expression(&mut self, expression: &EmbeddedExpression<'a>) {
        self.record(expression);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use oxc_allocator::Allocator;

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_counter_analysis() {
        let allocator = Allocator::default();
        let ast = parse(
            &allocator,
            "<script>let count = 0; function increment() { count += 1 }</script><button on:click={increment}>{count}</button>",
        )
        .unwrap();
        let analysis = analyze(&ast).unwrap();

        assert_eq!(analysis.declared_variables, set(&["count", "increment"]));
        assert_eq!(analysis.will_change, set(&["count"]));
        assert_eq!(analysis.will_use_in_template, set(&["count", "increment"]));
        assert_eq!(analysis.root_scope, ScopeTree::ROOT);
    }

    #[test]
    fn test_update_expression_requires_root_owner() {
        let allocator = Allocator::default();
        let ast = parse(
            &allocator,
            "<script>let a = 0; let b = 0; function f(b) { a++; --b; }</script><p>{a}</p>",
        )
        .unwrap();
        let analysis = analyze(&ast).unwrap();
        assert_eq!(analysis.will_change, set(&["a"]));
    }

    #[test]
    fn test_block_assignment_uses_loose_owner_check() {
        let allocator = Allocator::default();
        // `inner` is owned by the function scope, not the root, and still counts.
        let ast = parse(
            &allocator,
            "<script>let total = 0; function f() { inner = 1; var inner; } function g() { total = 5 }</script>",
        )
        .unwrap();
        let analysis = analyze(&ast).unwrap();
        assert_eq!(analysis.will_change, set(&["inner", "total"]));
        assert!(!analysis.declared_variables.contains("inner"));
    }

    #[test]
    fn test_block_assignment_to_undeclared_is_ignored() {
        let allocator = Allocator::default();
        let ast = parse(&allocator, "<script>function f() { missing = 1 }</script>").unwrap();
        let analysis = analyze(&ast).unwrap();
        assert!(analysis.will_change.is_empty());
    }

    #[test]
    fn test_only_first_statement_of_block_counts() {
        let allocator = Allocator::default();
        let ast = parse(
            &allocator,
            "<script>let a = 0; let b = 0; function f() { a = 1; b = 2 }</script>",
        )
        .unwrap();
        let analysis = analyze(&ast).unwrap();
        assert_eq!(analysis.will_change, set(&["a"]));
    }

    #[test]
    fn test_non_assignment_opening_statement_is_skipped() {
        let allocator = Allocator::default();
        let ast = parse(
            &allocator,
            "<script>let a = 0; function f() { console.log(a); a = 2 }</script>",
        )
        .unwrap();
        let analysis = analyze(&ast).unwrap();
        assert!(analysis.will_change.is_empty());
    }

    #[test]
    fn test_expression_arrow_update() {
        let allocator = Allocator::default();
        let ast = parse(
            &allocator,
            "<script>let n = 0; let m = 0; const inc = () => n++; const set = () => m = 3;</script>",
        )
        .unwrap();
        let analysis = analyze(&ast).unwrap();
        // An expression-bodied arrow has no block, so `m = 3` is not a block assignment.
        assert_eq!(analysis.will_change, set(&["n"]));
    }

    #[test]
    fn test_declaration_first_block_is_malformed() {
        let allocator = Allocator::default();
        let ast = parse(
            &allocator,
            "<script>function f() { let x = 1; x = 2 }</script>",
        )
        .unwrap();
        let err = analyze(&ast).unwrap_err();
        assert_eq!(err.code, MALFORMED_REACTIVE_SHAPE);
    }

    #[test]
    fn test_empty_block_is_malformed() {
        let allocator = Allocator::default();
        let ast = parse(&allocator, "<script>function noop() {}</script>").unwrap();
        assert!(analyze(&ast).unwrap_err().is(MALFORMED_REACTIVE_SHAPE));
    }

    #[test]
    fn test_member_assignment_is_malformed() {
        let allocator = Allocator::default();
        let ast = parse(
            &allocator,
            "<script>const o = {}; function f() { o.x = 1 }</script>",
        )
        .unwrap();
        assert!(analyze(&ast).unwrap_err().is(MALFORMED_REACTIVE_SHAPE));
    }

    #[test]
    fn test_template_references_are_shallow() {
        let allocator = Allocator::default();
        let ast = parse(
            &allocator,
            r#"<div title={label} class={"fixed"} id="plain"><p>{a + b}</p>{name}</div>"#,
        )
        .unwrap();
        let analysis = analyze(&ast).unwrap();
        assert_eq!(analysis.will_use_in_template, set(&["label", "name"]));
        assert!(analysis.declared_variables.is_empty());
        assert!(analysis.will_change.is_empty());
    }

    #[test]
    fn test_summary_is_sorted() {
        let allocator = Allocator::default();
        let ast = parse(
            &allocator,
            "<script>let z = 0; let a = 0; function f() { z = 1 }</script><p>{z}</p><p>{a}</p>",
        )
        .unwrap();
        let summary = analyze(&ast).unwrap().summary();
        assert_eq!(summary.declared_variables, vec!["a", "f", "z"]);
        assert_eq!(summary.will_change, vec!["z"]);
        assert_eq!(summary.will_use_in_template, vec!["a", "z"]);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["willChange"][0], "z");
    }
}
