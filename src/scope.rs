//! Lexical scope tree for the component script.
//!
//! oxc's `SemanticBuilder` resolves bindings and stamps every scope-owning node
//! with a `ScopeId`. This module folds that into a plain parent-linked tree so
//! owner lookup is a walk over parent indices.

use oxc_ast::ast::Program;
use oxc_ast_visit::Visit;
use oxc_semantic::{Scoping, SemanticBuilder};
use oxc_syntax::scope::{ScopeFlags, ScopeId};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};

pub type ScopeIndex = usize;

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub parent: Option<ScopeIndex>,
    pub declarations: HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    by_id: HashMap<ScopeId, ScopeIndex>,
}

impl ScopeTree {
    pub const ROOT: ScopeIndex = 0;

    /// Tree for a component without a script: one root scope, no declarations.
    pub fn empty() -> Self {
        ScopeTree {
            scopes: vec![Scope::default()],
            by_id: HashMap::new(),
        }
    }

    pub fn build(program: &Program<'_>) -> Self {
        let scoping = SemanticBuilder::new().build(program).semantic.into_scoping();
        let mut collector = ScopeCollector {
            scoping: &scoping,
            tree: ScopeTree {
                scopes: Vec::new(),
                by_id: HashMap::new(),
            },
            stack: Vec::new(),
        };
        collector.visit_program(program);

        let mut tree = collector.tree;
        if tree.scopes.is_empty() {
            tree.scopes.push(Scope::default());
        }
        tree
    }

    pub fn root(&self) -> ScopeIndex {
        Self::ROOT
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn parent(&self, scope: ScopeIndex) -> Option<ScopeIndex> {
        self.scopes.get(scope).and_then(|s| s.parent)
    }

    pub fn declarations(&self, scope: ScopeIndex) -> &HashSet<String> {
        &self.scopes[scope].declarations
    }

    pub fn declares(&self, scope: ScopeIndex, name: &str) -> bool {
        self.scopes
            .get(scope)
            .map(|s| s.declarations.contains(name))
            .unwrap_or(false)
    }

    /// Nearest scope, starting at `scope` and walking parents, that declares `name`.
    pub fn owner(&self, scope: ScopeIndex, name: &str) -> Option<ScopeIndex> {
        let mut current = Some(scope);
        while let Some(index) = current {
            if self.declares(index, name) {
                return Some(index);
            }
            current = self.parent(index);
        }
        None
    }

    /// Scope owned by an AST node, given the node's `scope_id` cell.
    pub fn scope_for(&self, scope_id: &Cell<Option<ScopeId>>) -> Option<ScopeIndex> {
        scope_id.get().and_then(|id| self.by_id.get(&id).copied())
    }
}

struct ScopeCollector<'s> {
    scoping: &'s Scoping,
    tree: ScopeTree,
    stack: Vec<ScopeIndex>,
}

impl<'a, 's> Visit<'a> for ScopeCollector<'s> {
    fn enter_scope(&mut self, _flags: ScopeFlags, scope_id: &Cell<Option<ScopeId>>) {
        let index = self.tree.scopes.len();
        let mut scope = Scope {
            parent: self.stack.last().copied(),
            declarations: HashSet::new(),
        };
        if let Some(id) = scope_id.get() {
            self.tree.by_id.insert(id, index);
            scope.declarations = self
                .scoping
                .iter_bindings_in(id)
                .map(|symbol| self.scoping.symbol_name(symbol).to_string())
                .collect();
        }
        self.tree.scopes.push(scope);
        self.stack.push(index);
    }

    fn leave_scope(&mut self) {
        self.stack.pop();
    }
}

/// Scope-tracking cursor shared by the script walkers. The current scope moves
/// into a node's scope on entry and back to the enclosing one on exit.
#[derive(Debug, Default)]
pub struct ScopeCursor {
    stack: Vec<ScopeIndex>,
}

impl ScopeCursor {
    pub fn enter(&mut self, tree: &ScopeTree, scope_id: &Cell<Option<ScopeId>>) {
        let scope = tree.scope_for(scope_id).unwrap_or_else(|| self.current());
        self.stack.push(scope);
    }

    pub fn leave(&mut self) {
        self.stack.pop();
    }

    pub fn current(&self) -> ScopeIndex {
        self.stack.last().copied().unwrap_or(ScopeTree::ROOT)
    }
}
