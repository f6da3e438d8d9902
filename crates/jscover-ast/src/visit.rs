//! Read-only AST traversal
//!
//! `Visitor` walks the tree in document order (pre-order, left to right).
//! Every method returns `ControlFlow`, so a pass can stop the whole walk by
//! returning `ControlFlow::Break` and the `?` operator unwinds it. Override
//! the methods you need and call the matching `walk_*` function to keep the
//! default recursion; omit the call to prune that subtree.
//!
//! The `'ast` lifetime lets a visitor keep references into the tree it
//! walks, which scope analysis uses to remember initializers.

use std::ops::ControlFlow;

use crate::*;

pub trait Visitor<'ast>: Sized {
    /// Value carried out of the walk when it stops early
    type Break;

    fn visit_program(&mut self, program: &'ast Program) -> ControlFlow<Self::Break> {
        walk_program(self, program)
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) -> ControlFlow<Self::Break> {
        walk_stmt(self, stmt)
    }

    fn visit_expr(&mut self, expr: &'ast Expr) -> ControlFlow<Self::Break> {
        walk_expr(self, expr)
    }

    fn visit_pattern(&mut self, pattern: &'ast Pattern) -> ControlFlow<Self::Break> {
        walk_pattern(self, pattern)
    }

    fn visit_function(&mut self, function: &'ast Function) -> ControlFlow<Self::Break> {
        walk_function(self, function)
    }

    fn visit_class(&mut self, class: &'ast Class) -> ControlFlow<Self::Break> {
        walk_class(self, class)
    }

    fn visit_property(&mut self, property: &'ast Property) -> ControlFlow<Self::Break> {
        walk_property(self, property)
    }

    fn visit_var_decl(&mut self, decl: &'ast VarDecl) -> ControlFlow<Self::Break> {
        walk_var_decl(self, decl)
    }
}

pub fn walk_program<'ast, V: Visitor<'ast>>(
    v: &mut V,
    program: &'ast Program,
) -> ControlFlow<V::Break> {
    walk_stmts(v, &program.body)
}

pub fn walk_stmts<'ast, V: Visitor<'ast>>(v: &mut V, stmts: &'ast [Stmt]) -> ControlFlow<V::Break> {
    for stmt in stmts {
        v.visit_stmt(stmt)?;
    }
    ControlFlow::Continue(())
}

pub fn walk_stmt<'ast, V: Visitor<'ast>>(v: &mut V, stmt: &'ast Stmt) -> ControlFlow<V::Break> {
    match &stmt.kind {
        StmtKind::Expr(expr) | StmtKind::Throw(expr) => v.visit_expr(expr),
        StmtKind::Var(decl) => v.visit_var_decl(decl),
        StmtKind::Function(function) => v.visit_function(function),
        StmtKind::Class(class) => v.visit_class(class),
        StmtKind::Return(arg) => walk_opt_expr(v, arg.as_ref()),
        StmtKind::If {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr(test)?;
            v.visit_stmt(consequent)?;
            match alternate {
                Some(alt) => v.visit_stmt(alt),
                None => ControlFlow::Continue(()),
            }
        }
        StmtKind::Block(stmts) => walk_stmts(v, stmts),
        StmtKind::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::Var(decl)) => v.visit_var_decl(decl)?,
                Some(ForInit::Expr(expr)) => v.visit_expr(expr)?,
                None => {}
            }
            walk_opt_expr(v, test.as_ref())?;
            walk_opt_expr(v, update.as_ref())?;
            v.visit_stmt(body)
        }
        StmtKind::ForIn { left, right, body } | StmtKind::ForOf { left, right, body, .. } => {
            match left {
                ForHead::Var(decl) => v.visit_var_decl(decl)?,
                ForHead::Target(expr) => v.visit_expr(expr)?,
            }
            v.visit_expr(right)?;
            v.visit_stmt(body)
        }
        StmtKind::While { test, body } => {
            v.visit_expr(test)?;
            v.visit_stmt(body)
        }
        StmtKind::DoWhile { body, test } => {
            v.visit_stmt(body)?;
            v.visit_expr(test)
        }
        StmtKind::Try {
            block,
            handler,
            finalizer,
        } => {
            walk_stmts(v, block)?;
            if let Some(handler) = handler {
                if let Some(param) = &handler.param {
                    v.visit_pattern(param)?;
                }
                walk_stmts(v, &handler.body)?;
            }
            match finalizer {
                Some(stmts) => walk_stmts(v, stmts),
                None => ControlFlow::Continue(()),
            }
        }
        StmtKind::Switch {
            discriminant,
            cases,
        } => {
            v.visit_expr(discriminant)?;
            for case in cases {
                walk_opt_expr(v, case.test.as_ref())?;
                walk_stmts(v, &case.consequent)?;
            }
            ControlFlow::Continue(())
        }
        StmtKind::Labeled { body, .. } => v.visit_stmt(body),
        StmtKind::Export(export) => match export {
            ExportDecl::Declaration(decl) => v.visit_stmt(decl),
            ExportDecl::DefaultExpr(expr) => v.visit_expr(expr),
            ExportDecl::DefaultFunction(function) => v.visit_function(function),
            ExportDecl::DefaultClass(class) => v.visit_class(class),
            ExportDecl::Named { .. } | ExportDecl::All { .. } => ControlFlow::Continue(()),
        },
        StmtKind::Break(_)
        | StmtKind::Continue(_)
        | StmtKind::Empty
        | StmtKind::Debugger
        | StmtKind::Import(_) => ControlFlow::Continue(()),
    }
}

pub fn walk_var_decl<'ast, V: Visitor<'ast>>(
    v: &mut V,
    decl: &'ast VarDecl,
) -> ControlFlow<V::Break> {
    for declarator in &decl.declarations {
        v.visit_pattern(&declarator.id)?;
        walk_opt_expr(v, declarator.init.as_ref())?;
    }
    ControlFlow::Continue(())
}

fn walk_opt_expr<'ast, V: Visitor<'ast>>(
    v: &mut V,
    expr: Option<&'ast Expr>,
) -> ControlFlow<V::Break> {
    match expr {
        Some(expr) => v.visit_expr(expr),
        None => ControlFlow::Continue(()),
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast>>(v: &mut V, expr: &'ast Expr) -> ControlFlow<V::Break> {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Ident(_) | ExprKind::This | ExprKind::Super => {
            ControlFlow::Continue(())
        }
        ExprKind::Array(elements) => {
            for element in elements.iter().flatten() {
                v.visit_expr(element)?;
            }
            ControlFlow::Continue(())
        }
        ExprKind::Object(props) => {
            for prop in props {
                v.visit_property(prop)?;
            }
            ControlFlow::Continue(())
        }
        ExprKind::Function(function) | ExprKind::Arrow(function) => v.visit_function(function),
        ExprKind::Class(class) => v.visit_class(class),
        ExprKind::Template { exprs, .. } | ExprKind::Sequence(exprs) => {
            for expr in exprs {
                v.visit_expr(expr)?;
            }
            ControlFlow::Continue(())
        }
        ExprKind::TaggedTemplate { tag, quasi } => {
            v.visit_expr(tag)?;
            v.visit_expr(quasi)
        }
        ExprKind::Unary { operand, .. } => v.visit_expr(operand),
        ExprKind::Update { target, .. } => v.visit_expr(target),
        ExprKind::Spread(inner) | ExprKind::Await(inner) => v.visit_expr(inner),
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            v.visit_expr(left)?;
            v.visit_expr(right)
        }
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr(target)?;
            v.visit_expr(value)
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr(test)?;
            v.visit_expr(consequent)?;
            v.visit_expr(alternate)
        }
        ExprKind::Call { callee, args, .. } | ExprKind::New { callee, args } => {
            v.visit_expr(callee)?;
            for arg in args {
                v.visit_expr(arg)?;
            }
            ControlFlow::Continue(())
        }
        ExprKind::Member {
            object, property, ..
        } => {
            v.visit_expr(object)?;
            match property {
                MemberProp::Computed(prop) => v.visit_expr(prop),
                MemberProp::Ident(_) | MemberProp::Private(_) => ControlFlow::Continue(()),
            }
        }
        ExprKind::Yield { argument, .. } => walk_opt_expr(v, argument.as_deref()),
    }
}

pub fn walk_property<'ast, V: Visitor<'ast>>(
    v: &mut V,
    property: &'ast Property,
) -> ControlFlow<V::Break> {
    match &property.kind {
        PropertyKind::KeyValue { key, value, .. } => {
            walk_prop_key(v, key)?;
            v.visit_expr(value)
        }
        PropertyKind::Method { key, function, .. } => {
            walk_prop_key(v, key)?;
            v.visit_function(function)
        }
        PropertyKind::Spread(expr) => v.visit_expr(expr),
    }
}

fn walk_prop_key<'ast, V: Visitor<'ast>>(v: &mut V, key: &'ast PropKey) -> ControlFlow<V::Break> {
    match key {
        PropKey::Computed(expr) => v.visit_expr(expr),
        _ => ControlFlow::Continue(()),
    }
}

pub fn walk_pattern<'ast, V: Visitor<'ast>>(
    v: &mut V,
    pattern: &'ast Pattern,
) -> ControlFlow<V::Break> {
    match &pattern.kind {
        PatternKind::Ident(_) => ControlFlow::Continue(()),
        PatternKind::Array(elements) => {
            for element in elements.iter().flatten() {
                v.visit_pattern(element)?;
            }
            ControlFlow::Continue(())
        }
        PatternKind::Object(props) => {
            for prop in props {
                match prop {
                    ObjectPatternProp::KeyValue { key, value, .. } => {
                        walk_prop_key(v, key)?;
                        v.visit_pattern(value)?;
                    }
                    ObjectPatternProp::Rest(rest) => v.visit_pattern(rest)?,
                }
            }
            ControlFlow::Continue(())
        }
        PatternKind::Assign { target, default } => {
            v.visit_pattern(target)?;
            v.visit_expr(default)
        }
        PatternKind::Rest(inner) => v.visit_pattern(inner),
    }
}

pub fn walk_function<'ast, V: Visitor<'ast>>(
    v: &mut V,
    function: &'ast Function,
) -> ControlFlow<V::Break> {
    for param in &function.params {
        v.visit_pattern(param)?;
    }
    match &function.body {
        FunctionBody::Block(stmts) => walk_stmts(v, stmts),
        FunctionBody::Expr(expr) => v.visit_expr(expr),
    }
}

pub fn walk_class<'ast, V: Visitor<'ast>>(v: &mut V, class: &'ast Class) -> ControlFlow<V::Break> {
    for decorator in &class.decorators {
        v.visit_expr(decorator)?;
    }
    if let Some(super_class) = &class.super_class {
        v.visit_expr(super_class)?;
    }
    for member in &class.members {
        for decorator in &member.decorators {
            v.visit_expr(decorator)?;
        }
        match &member.kind {
            ClassMemberKind::Method { key, function, .. } => {
                walk_prop_key(v, key)?;
                v.visit_function(function)?;
            }
            ClassMemberKind::Field { key, value, .. } => {
                walk_prop_key(v, key)?;
                walk_opt_expr(v, value.as_ref())?;
            }
        }
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct IdentCollector {
        names: Vec<String>,
        stop_at: Option<&'static str>,
    }

    impl<'ast> Visitor<'ast> for IdentCollector {
        type Break = String;

        fn visit_expr(&mut self, expr: &'ast Expr) -> ControlFlow<String> {
            if let ExprKind::Ident(name) = &expr.kind {
                self.names.push(name.clone());
                if self.stop_at == Some(name.as_str()) {
                    return ControlFlow::Break(name.clone());
                }
            }
            walk_expr(self, expr)
        }
    }

    fn sample() -> Program {
        let call = Expr::synthetic(ExprKind::Call {
            callee: Box::new(Expr::ident("f")),
            args: vec![Expr::ident("a"), Expr::ident("b")],
            optional: false,
        });
        Program {
            body: vec![Stmt::expr(call), Stmt::expr(Expr::ident("c"))],
            comments: vec![],
            source_type: SourceType::Script,
            span: Span::dummy(),
        }
    }

    #[test]
    fn test_walk_visits_in_document_order() {
        let mut collector = IdentCollector {
            names: vec![],
            stop_at: None,
        };
        let flow = collector.visit_program(&sample());
        assert_eq!(flow, ControlFlow::Continue(()));
        assert_eq!(collector.names, vec!["f", "a", "b", "c"]);
    }

    #[test]
    fn test_break_stops_walk() {
        let mut collector = IdentCollector {
            names: vec![],
            stop_at: Some("a"),
        };
        let flow = collector.visit_program(&sample());
        assert_eq!(flow, ControlFlow::Break("a".to_string()));
        assert_eq!(collector.names, vec!["f", "a"]);
    }
}
