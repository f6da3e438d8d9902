//! The two analysis passes behind `ScopeTree::build`

use std::ops::ControlFlow;

use jscover_ast::*;

use crate::{Binding, BindingKind, ScopeCursor, ScopeId, ScopeTree};

/// Pass 1: open function scopes and declare every name
pub(crate) struct Declarer<'t, 'a> {
    tree: &'t mut ScopeTree<'a>,
    current: ScopeId,
}

impl<'t, 'a> Declarer<'t, 'a> {
    pub(crate) fn new(tree: &'t mut ScopeTree<'a>) -> Self {
        Self {
            tree,
            current: ScopeId::ROOT,
        }
    }

    pub(crate) fn run(mut self, program: &'a Program) {
        let _ = self.visit_program(program);
    }

    fn declare(&mut self, name: &'a str, kind: BindingKind, span: Span, init: Option<&'a Expr>) {
        self.tree.declare(
            self.current,
            Binding {
                name,
                kind,
                span,
                init,
                constant_violations: 0,
            },
        );
    }

    fn declare_pattern(&mut self, pattern: &'a Pattern, kind: BindingKind, span: Span) {
        for name in pattern.bound_names() {
            self.declare(name, kind, span, None);
        }
    }

    /// `self_name` is the name a function expression binds inside itself
    fn enter_function(
        &mut self,
        function: &'a Function,
        self_name: Option<&'a str>,
    ) -> ControlFlow<()> {
        let outer = self.current;
        self.current = self.tree.push_function_scope(outer, function.id);
        if let Some(name) = self_name {
            self.declare(name, BindingKind::Function, function.span, None);
        }
        for param in &function.params {
            self.declare_pattern(param, BindingKind::Param, param.span);
        }
        let flow = walk_function(self, function);
        self.current = outer;
        flow
    }
}

impl<'a> Visitor<'a> for Declarer<'_, 'a> {
    type Break = ();

    fn visit_stmt(&mut self, stmt: &'a Stmt) -> ControlFlow<()> {
        match &stmt.kind {
            StmtKind::Function(function) => {
                if let Some(name) = &function.name {
                    self.declare(name, BindingKind::Function, function.span, None);
                }
            }
            StmtKind::Class(class) => {
                if let Some(name) = &class.name {
                    self.declare(name, BindingKind::Class, class.span, None);
                }
            }
            StmtKind::Export(ExportDecl::DefaultFunction(function)) => {
                if let Some(name) = &function.name {
                    self.declare(name, BindingKind::Function, function.span, None);
                }
            }
            StmtKind::Export(ExportDecl::DefaultClass(class)) => {
                if let Some(name) = &class.name {
                    self.declare(name, BindingKind::Class, class.span, None);
                }
            }
            StmtKind::Import(import) => {
                for specifier in &import.specifiers {
                    let local = match specifier {
                        ImportSpecifier::Default(local)
                        | ImportSpecifier::Namespace(local)
                        | ImportSpecifier::Named { local, .. } => local,
                    };
                    self.declare(local, BindingKind::Import, stmt.span, None);
                }
            }
            StmtKind::Try {
                handler: Some(handler),
                ..
            } => {
                if let Some(param) = &handler.param {
                    self.declare_pattern(param, BindingKind::CatchParam, param.span);
                }
            }
            _ => {}
        }
        walk_stmt(self, stmt)
    }

    fn visit_var_decl(&mut self, decl: &'a VarDecl) -> ControlFlow<()> {
        let kind = BindingKind::from(decl.kind);
        for declarator in &decl.declarations {
            match &declarator.id.kind {
                PatternKind::Ident(name) => {
                    self.declare(name, kind, declarator.span, declarator.init.as_ref())
                }
                _ => self.declare_pattern(&declarator.id, kind, declarator.span),
            }
        }
        walk_var_decl(self, decl)
    }

    fn visit_expr(&mut self, expr: &'a Expr) -> ControlFlow<()> {
        match &expr.kind {
            ExprKind::Function(function) => self.enter_function(function, function.name.as_deref()),
            _ => walk_expr(self, expr),
        }
    }

    fn visit_function(&mut self, function: &'a Function) -> ControlFlow<()> {
        self.enter_function(function, None)
    }
}

/// Pass 2: count writes against the bindings they resolve to
pub(crate) struct MutationResolver<'t, 'a> {
    tree: &'t mut ScopeTree<'a>,
    cursor: ScopeCursor,
}

impl<'t, 'a> MutationResolver<'t, 'a> {
    pub(crate) fn new(tree: &'t mut ScopeTree<'a>) -> Self {
        let cursor = tree.cursor();
        Self { tree, cursor }
    }

    pub(crate) fn run(mut self, program: &Program) {
        let _ = self.visit_program(program);
    }

    /// Every identifier an assignment target writes, destructuring included
    fn record_target(&mut self, target: &Expr) {
        match &target.kind {
            ExprKind::Ident(name) => self.tree.record_violation(self.cursor.current(), name),
            ExprKind::Array(elements) => {
                for element in elements.iter().flatten() {
                    self.record_target(element);
                }
            }
            ExprKind::Object(props) => {
                for prop in props {
                    match &prop.kind {
                        PropertyKind::KeyValue { value, .. } => self.record_target(value),
                        PropertyKind::Spread(inner) => self.record_target(inner),
                        PropertyKind::Method { .. } => {}
                    }
                }
            }
            // Inside a pattern `a = 1` is a default, and `...a` a rest element
            ExprKind::Assign { target, .. } | ExprKind::Spread(target) => {
                self.record_target(target)
            }
            _ => {}
        }
    }
}

impl<'a> Visitor<'a> for MutationResolver<'_, '_> {
    type Break = ();

    fn visit_stmt(&mut self, stmt: &'a Stmt) -> ControlFlow<()> {
        if let StmtKind::ForIn {
            left: ForHead::Target(target),
            ..
        }
        | StmtKind::ForOf {
            left: ForHead::Target(target),
            ..
        } = &stmt.kind
        {
            self.record_target(target);
        }
        walk_stmt(self, stmt)
    }

    fn visit_expr(&mut self, expr: &'a Expr) -> ControlFlow<()> {
        match &expr.kind {
            ExprKind::Assign { target, .. } | ExprKind::Update { target, .. } => {
                self.record_target(target)
            }
            _ => {}
        }
        walk_expr(self, expr)
    }

    fn visit_function(&mut self, function: &'a Function) -> ControlFlow<()> {
        self.cursor.enter_function();
        let flow = walk_function(self, function);
        self.cursor.exit_function();
        flow
    }
}

#[cfg(test)]
mod tests {
    use jscover_ast::{NodeId, Program, StmtKind};
    use jscover_parser::{parse, ParseOptions};
    use pretty_assertions::assert_eq;

    use crate::*;

    fn program(source: &str) -> Program {
        parse(source, &ParseOptions::module()).expect("parse failed")
    }

    fn violations(tree: &ScopeTree, scope: ScopeId, name: &str) -> u32 {
        tree.own_binding(scope, name)
            .map(|binding| binding.constant_violations)
            .expect("binding not found")
    }

    #[test]
    fn test_program_scope_bindings() {
        let program = program("var a = 1; let b; const c = a + 2; function f() {} class K {}");
        let tree = ScopeTree::build(&program);
        assert_eq!(tree.len(), 2);

        let root = tree.get(tree.root()).unwrap();
        let names: Vec<(&str, BindingKind)> =
            root.bindings().map(|b| (b.name, b.kind)).collect();
        assert_eq!(
            names,
            vec![
                ("a", BindingKind::Var),
                ("b", BindingKind::Let),
                ("c", BindingKind::Const),
                ("f", BindingKind::Function),
                ("K", BindingKind::Class),
            ]
        );
        assert!(root.own_binding("a").unwrap().init.is_some());
        assert!(root.own_binding("b").unwrap().init.is_none());
    }

    #[test]
    fn test_function_scopes_nest_in_document_order() {
        let program = program(
            "function outer(p) { var x = 1; var inner = function named() { var y; }; }\n\
             var arrow = (q) => q;",
        );
        let tree = ScopeTree::build(&program);
        assert_eq!(tree.len(), 4);

        let outer = ScopeId(1);
        let named = ScopeId(2);
        let arrow = ScopeId(3);
        assert_eq!(tree.parent(outer), Some(ScopeId::ROOT));
        assert_eq!(tree.parent(named), Some(outer));
        assert_eq!(tree.parent(arrow), Some(ScopeId::ROOT));

        assert!(tree.own_binding(ScopeId::ROOT, "outer").is_some());
        assert!(tree.own_binding(outer, "p").is_some());
        assert!(tree.own_binding(outer, "inner").is_some());
        // A function expression's name is only visible inside it
        assert!(tree.own_binding(outer, "named").is_none());
        assert!(tree.own_binding(named, "named").is_some());
        assert!(tree.own_binding(named, "y").is_some());
        assert!(tree.own_binding(arrow, "q").is_some());
    }

    #[test]
    fn test_blocks_do_not_open_scopes() {
        let program = program("if (t) { let a = 1; } try { } catch (e) { const b = 2; }");
        let tree = ScopeTree::build(&program);
        assert_eq!(tree.len(), 1);
        assert_eq!(
            tree.own_binding(ScopeId::ROOT, "e").map(|b| b.kind),
            Some(BindingKind::CatchParam)
        );
        assert!(tree.own_binding(ScopeId::ROOT, "a").is_some());
        assert!(tree.own_binding(ScopeId::ROOT, "b").is_some());
    }

    #[test]
    fn test_lookup_walks_parents() {
        let program = program("var a = 1; function f() { var b = 2; function g() {} }");
        let tree = ScopeTree::build(&program);
        let g = ScopeId(2);
        let (found_in, binding) = tree.lookup(g, "a").unwrap();
        assert_eq!(found_in, ScopeId::ROOT);
        assert_eq!(binding.kind, BindingKind::Var);
        assert_eq!(tree.lookup(g, "b").map(|(id, _)| id), Some(ScopeId(1)));
        assert!(tree.lookup(g, "missing").is_none());
        assert!(tree.own_binding(g, "a").is_none());
    }

    #[test]
    fn test_constant_violations() {
        let program = program(
            "var a = 1, b = 2, c = 3, d = 4, e = 5, untouched = 6;\n\
             a = 10;\n\
             b++;\n\
             [c, { x: d = 1 }] = pair;\n\
             for (e in obj) {}\n\
             function f() { untouched; var a; a = 2; }",
        );
        let tree = ScopeTree::build(&program);
        let root = ScopeId::ROOT;
        assert_eq!(violations(&tree, root, "a"), 1);
        assert_eq!(violations(&tree, root, "b"), 1);
        for name in ["c", "d", "e"] {
            assert!(violations(&tree, root, name) > 0, "{} should be written", name);
        }
        assert_eq!(violations(&tree, root, "untouched"), 0);
        // The write inside f hits f's own `a`
        assert_eq!(violations(&tree, ScopeId(1), "a"), 1);
        assert!(tree.own_binding(root, "untouched").unwrap().is_constant());
    }

    #[test]
    fn test_hoisted_declaration_sees_earlier_write() {
        let program = program("x = 1; var x = 2;");
        let tree = ScopeTree::build(&program);
        assert_eq!(violations(&tree, ScopeId::ROOT, "x"), 1);
    }

    #[test]
    fn test_redeclaration_is_a_violation() {
        let program = program("var path = 'a.js'; var path = 'b.js';");
        let tree = ScopeTree::build(&program);
        let binding = tree.own_binding(ScopeId::ROOT, "path").unwrap();
        assert_eq!(binding.constant_violations, 1);
    }

    #[test]
    fn test_imports_and_params() {
        let program = program("import a, { b as c } from 'm'; function f({ d }, [e], ...g) {}");
        let tree = ScopeTree::build(&program);
        for name in ["a", "c"] {
            assert_eq!(
                tree.own_binding(ScopeId::ROOT, name).map(|b| b.kind),
                Some(BindingKind::Import)
            );
        }
        for name in ["d", "e", "g"] {
            assert_eq!(
                tree.own_binding(ScopeId(1), name).map(|b| b.kind),
                Some(BindingKind::Param)
            );
        }
    }

    #[test]
    fn test_function_scope_by_node_id() {
        let program = program("function f() {} function g() {}");
        let tree = ScopeTree::build(&program);
        let ids: Vec<NodeId> = program
            .body
            .iter()
            .filter_map(|stmt| match &stmt.kind {
                StmtKind::Function(function) => Some(function.id),
                _ => None,
            })
            .collect();
        assert_eq!(tree.function_scope(ids[0]), Some(ScopeId(1)));
        assert_eq!(tree.function_scope(ids[1]), Some(ScopeId(2)));
        assert_eq!(tree.function_scope(NodeId::SYNTHETIC), None);
    }

    #[test]
    fn test_cursor_follows_document_order() {
        let mut cursor = ScopeCursor::new();
        assert_eq!(cursor.current(), ScopeId::ROOT);
        assert_eq!(cursor.enter_function(), ScopeId(1));
        assert_eq!(cursor.enter_function(), ScopeId(2));
        cursor.exit_function();
        assert_eq!(cursor.current(), ScopeId(1));
        cursor.exit_function();
        cursor.exit_function();
        assert_eq!(cursor.current(), ScopeId::ROOT);
        assert_eq!(cursor.enter_function(), ScopeId(3));
    }
}
