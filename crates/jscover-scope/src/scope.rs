//! Scope records and the scope arena

use std::collections::HashMap;

use jscover_ast::{Expr, NodeId, Program, Span, VarKind};
use serde::{Deserialize, Serialize};

use crate::builder::{Declarer, MutationResolver};

/// Index of a scope in its `ScopeTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// The program scope is always the first record
    pub const ROOT: ScopeId = ScopeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    Program,
    Function,
}

/// How a name was introduced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingKind {
    Var,
    Let,
    Const,
    Function,
    Class,
    Param,
    CatchParam,
    Import,
}

impl BindingKind {
    /// Declared by `var`, `let` or `const`
    pub fn is_variable(self) -> bool {
        matches!(self, BindingKind::Var | BindingKind::Let | BindingKind::Const)
    }
}

impl From<VarKind> for BindingKind {
    fn from(kind: VarKind) -> Self {
        match kind {
            VarKind::Var => BindingKind::Var,
            VarKind::Let => BindingKind::Let,
            VarKind::Const => BindingKind::Const,
        }
    }
}

/// A declared name
#[derive(Debug, Clone)]
pub struct Binding<'a> {
    pub name: &'a str,
    pub kind: BindingKind,
    /// Span of the declaring node (the declarator for variables)
    pub span: Span,
    /// Initializer, recorded only when the declarator binds a plain identifier
    pub init: Option<&'a Expr>,
    /// Reassignments, updates and redeclarations seen anywhere in the program
    pub constant_violations: u32,
}

impl Binding<'_> {
    /// Never written after its declaration
    pub fn is_constant(&self) -> bool {
        self.constant_violations == 0
    }
}

/// One lexical environment
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// The function that opened this scope, `None` for the program scope
    pub function: Option<NodeId>,
    bindings: Vec<Binding<'a>>,
    by_name: HashMap<&'a str, usize>,
}

impl<'a> Scope<'a> {
    fn new(id: ScopeId, kind: ScopeKind, parent: Option<ScopeId>, function: Option<NodeId>) -> Self {
        Self {
            id,
            kind,
            parent,
            function,
            bindings: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Binding declared directly in this scope
    pub fn own_binding(&self, name: &str) -> Option<&Binding<'a>> {
        self.by_name.get(name).map(|&index| &self.bindings[index])
    }

    pub fn has_own_binding(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Bindings in declaration order
    pub fn bindings(&self) -> impl Iterator<Item = &Binding<'a>> {
        self.bindings.iter()
    }

    fn binding_mut(&mut self, name: &str) -> Option<&mut Binding<'a>> {
        let index = *self.by_name.get(name)?;
        self.bindings.get_mut(index)
    }
}

/// Arena of scopes for one program.
///
/// Only the program and functions open scopes. Blocks do not, so `let`,
/// `const` and class declarations land in the nearest function scope like
/// `var` does. Function scopes are numbered in document order starting at 1,
/// which lets later passes recover the scope of any function with a
/// [`ScopeCursor`] instead of relying on node ids.
#[derive(Debug, Clone)]
pub struct ScopeTree<'a> {
    scopes: Vec<Scope<'a>>,
}

impl<'a> ScopeTree<'a> {
    /// Analyze a program. The tree borrows initializers from it.
    pub fn build(program: &'a Program) -> Self {
        let mut tree = ScopeTree {
            scopes: vec![Scope::new(ScopeId::ROOT, ScopeKind::Program, None, None)],
        };
        // Hoisting means every declaration must be known before any
        // assignment is attributed, hence two passes
        Declarer::new(&mut tree).run(program);
        MutationResolver::new(&mut tree).run(program);
        tree
    }

    pub fn root(&self) -> ScopeId {
        ScopeId::ROOT
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope<'a>> {
        self.scopes.get(id.index())
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id).and_then(|scope| scope.parent)
    }

    /// Own binding of `name` in scope `id`, parents are not consulted
    pub fn own_binding(&self, id: ScopeId, name: &str) -> Option<&Binding<'a>> {
        self.get(id)?.own_binding(name)
    }

    /// Resolve `name` from scope `id` outward. Returns the declaring scope
    /// with the binding.
    pub fn lookup(&self, id: ScopeId, name: &str) -> Option<(ScopeId, &Binding<'a>)> {
        let mut current = Some(id);
        while let Some(scope_id) = current {
            let scope = self.get(scope_id)?;
            if let Some(binding) = scope.own_binding(name) {
                return Some((scope_id, binding));
            }
            current = scope.parent;
        }
        None
    }

    /// Scope opened by the function with this id, when the id is unique
    pub fn function_scope(&self, function: NodeId) -> Option<ScopeId> {
        if function == NodeId::SYNTHETIC {
            return None;
        }
        let mut matches = self
            .scopes
            .iter()
            .filter(|scope| scope.function == Some(function));
        match (matches.next(), matches.next()) {
            (Some(scope), None) => Some(scope.id),
            _ => None,
        }
    }

    /// Start following function scopes in document order
    pub fn cursor(&self) -> ScopeCursor {
        ScopeCursor::new()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope<'a>> {
        self.scopes.iter()
    }

    pub(crate) fn push_function_scope(&mut self, parent: ScopeId, function: NodeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes
            .push(Scope::new(id, ScopeKind::Function, Some(parent), Some(function)));
        id
    }

    /// Record a declaration. Declaring a name twice in one scope keeps the
    /// first binding and counts the second as a violation.
    pub(crate) fn declare(&mut self, id: ScopeId, binding: Binding<'a>) {
        let Some(scope) = self.scopes.get_mut(id.index()) else {
            return;
        };
        if let Some(existing) = scope.binding_mut(binding.name) {
            existing.constant_violations += 1;
            return;
        }
        scope.by_name.insert(binding.name, scope.bindings.len());
        scope.bindings.push(binding);
    }

    /// Count a write to whatever `name` resolves to from scope `id`
    pub(crate) fn record_violation(&mut self, id: ScopeId, name: &str) {
        let Some((scope_id, _)) = self.lookup(id, name) else {
            return;
        };
        if let Some(binding) = self
            .scopes
            .get_mut(scope_id.index())
            .and_then(|scope| scope.binding_mut(name))
        {
            binding.constant_violations += 1;
        }
    }
}

/// Tracks the current scope during a pre-order walk.
///
/// Call [`enter_function`](Self::enter_function) each time the walk reaches
/// a function and [`exit_function`](Self::exit_function) when it leaves.
/// As long as functions are visited in document order the ids line up with
/// the ones `ScopeTree::build` assigned.
#[derive(Debug, Clone)]
pub struct ScopeCursor {
    stack: Vec<ScopeId>,
    next: u32,
}

impl ScopeCursor {
    pub fn new() -> Self {
        Self {
            stack: vec![ScopeId::ROOT],
            next: 1,
        }
    }

    pub fn current(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or(ScopeId::ROOT)
    }

    pub fn enter_function(&mut self) -> ScopeId {
        let id = ScopeId(self.next);
        self.next += 1;
        self.stack.push(id);
        id
    }

    pub fn exit_function(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }
}

impl Default for ScopeCursor {
    fn default() -> Self {
        Self::new()
    }
}
