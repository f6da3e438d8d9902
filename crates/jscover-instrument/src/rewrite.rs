//! The tree rewrite that inserts counters

use jscover_ast::*;

use crate::coverage::{BranchKind, FileCoverage};
use crate::template::{counter, with_counter};

/// Walks a program mutably, registering every countable location in a
/// `FileCoverage` and inserting the matching counter increment.
pub(crate) struct Rewriter<'v> {
    pub coverage: &'v mut FileCoverage,
    pub lines: &'v LineIndex,
    pub cov_name: &'v str,
    pub ignore_class_methods: &'v [String],
}

/// Statements that get their own counter
fn is_counted(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Block(_)
        | StmtKind::Empty
        | StmtKind::Function(_)
        | StmtKind::Import(_) => false,
        StmtKind::Export(export) => match export {
            ExportDecl::Declaration(inner) => is_counted(inner),
            ExportDecl::DefaultExpr(_) | ExportDecl::DefaultClass(_) => true,
            ExportDecl::DefaultFunction(_) | ExportDecl::Named { .. } | ExportDecl::All { .. } => {
                false
            }
        },
        _ => true,
    }
}

fn is_directive(stmt: &Stmt) -> bool {
    matches!(
        &stmt.kind,
        StmtKind::Expr(Expr {
            kind: ExprKind::Literal(Literal::String(_)),
            ..
        })
    )
}

/// Replace `expr` with `(counter, expr)`
fn wrap(expr: &mut Expr, counter: Expr) {
    let inner = std::mem::replace(expr, Expr::synthetic(ExprKind::This));
    *expr = with_counter(counter, inner);
}

impl Rewriter<'_> {
    pub fn program(&mut self, program: &mut Program) {
        self.body(&mut program.body, None);
    }

    fn loc(&self, span: Span) -> Location {
        self.lines.location(span)
    }

    fn counter(&self, map: &str, indices: &[usize]) -> Expr {
        counter(self.cov_name, map, indices)
    }

    /// A program or function body: directives stay first, `prefix` follows
    /// them
    fn body(&mut self, stmts: &mut Vec<Stmt>, prefix: Option<Stmt>) {
        let directives = stmts.iter().take_while(|stmt| is_directive(stmt)).count();
        let mut rest = stmts.split_off(directives);
        self.stmts(&mut rest);
        stmts.extend(prefix);
        stmts.append(&mut rest);
    }

    fn stmts(&mut self, stmts: &mut Vec<Stmt>) {
        let original = std::mem::take(stmts);
        stmts.reserve(original.len() * 2);
        for mut stmt in original {
            if is_counted(&stmt) {
                let id = self.coverage.new_statement(self.loc(stmt.span));
                stmts.push(Stmt::expr(self.counter("s", &[id])));
            }
            self.stmt(&mut stmt);
            stmts.push(stmt);
        }
    }

    /// Instrument the parts of a statement; the statement's own counter is
    /// handled by `stmts`
    fn stmt(&mut self, stmt: &mut Stmt) {
        let span = stmt.span;
        match &mut stmt.kind {
            StmtKind::Expr(expr) | StmtKind::Throw(expr) => self.expr(expr),
            StmtKind::Return(arg) => {
                if let Some(arg) = arg {
                    self.expr(arg);
                }
            }
            StmtKind::Var(decl) => self.var_decl(decl),
            StmtKind::Function(function) => self.function(function, None),
            StmtKind::Class(class) => self.class(class),
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test);
                let branch = self.coverage.new_branch(BranchKind::If, self.loc(span));
                let taken = self.coverage.add_branch_path(branch, self.loc(consequent.span));
                let alt_span = alternate.as_ref().map_or(span, |alt| alt.span);
                let not_taken = self.coverage.add_branch_path(branch, self.loc(alt_span));

                self.block_body(consequent, Some(self.counter("b", &[branch, taken])));
                match alternate {
                    Some(alt) => {
                        self.block_body(alt, Some(self.counter("b", &[branch, not_taken])))
                    }
                    None => {
                        let counter = Stmt::expr(self.counter("b", &[branch, not_taken]));
                        let block = Stmt::synthetic(StmtKind::Block(vec![counter]));
                        *alternate = Some(Box::new(block));
                    }
                }
            }
            StmtKind::Block(stmts) => self.stmts(stmts),
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                match init {
                    Some(ForInit::Var(decl)) => self.var_decl(decl),
                    Some(ForInit::Expr(expr)) => self.expr(expr),
                    None => {}
                }
                if let Some(test) = test {
                    self.expr(test);
                }
                if let Some(update) = update {
                    self.expr(update);
                }
                self.block_body(body, None);
            }
            StmtKind::ForIn { left, right, body } | StmtKind::ForOf { left, right, body, .. } => {
                match left {
                    ForHead::Var(decl) => self.var_decl(decl),
                    ForHead::Target(target) => self.expr(target),
                }
                self.expr(right);
                self.block_body(body, None);
            }
            StmtKind::While { test, body } => {
                self.expr(test);
                self.block_body(body, None);
            }
            StmtKind::DoWhile { body, test } => {
                self.block_body(body, None);
                self.expr(test);
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.stmts(block);
                if let Some(handler) = handler {
                    if let Some(param) = &mut handler.param {
                        self.pattern(param);
                    }
                    self.stmts(&mut handler.body);
                }
                if let Some(finalizer) = finalizer {
                    self.stmts(finalizer);
                }
            }
            StmtKind::Switch {
                discriminant,
                cases,
            } => {
                self.expr(discriminant);
                let branch = self.coverage.new_branch(BranchKind::Switch, self.loc(span));
                for case in cases {
                    let path = self.coverage.add_branch_path(branch, self.loc(case.span));
                    if let Some(test) = &mut case.test {
                        self.expr(test);
                    }
                    self.stmts(&mut case.consequent);
                    case.consequent
                        .insert(0, Stmt::expr(self.counter("b", &[branch, path])));
                }
            }
            // A counter between a label and its loop would break `continue label`
            StmtKind::Labeled { body, .. } => self.stmt(body),
            StmtKind::Export(export) => match export {
                ExportDecl::Declaration(inner) => self.stmt(inner),
                ExportDecl::DefaultExpr(expr) => self.expr(expr),
                ExportDecl::DefaultFunction(function) => self.function(function, None),
                ExportDecl::DefaultClass(class) => self.class(class),
                ExportDecl::Named { .. } | ExportDecl::All { .. } => {}
            },
            StmtKind::Break(_)
            | StmtKind::Continue(_)
            | StmtKind::Empty
            | StmtKind::Debugger
            | StmtKind::Import(_) => {}
        }
    }

    /// Instrument the body of a loop or branch, turning it into a block so
    /// counters can be placed inside. `prefix` becomes its first statement.
    fn block_body(&mut self, body: &mut Stmt, prefix: Option<Expr>) {
        let stmt = std::mem::replace(body, Stmt::synthetic(StmtKind::Empty));
        let span = stmt.span;
        let mut stmts = match stmt.kind {
            StmtKind::Block(stmts) => stmts,
            kind => vec![Stmt::new(kind, span)],
        };
        self.stmts(&mut stmts);
        if let Some(counter) = prefix {
            stmts.insert(0, Stmt::expr(counter));
        }
        *body = Stmt::new(StmtKind::Block(stmts), span);
    }

    fn var_decl(&mut self, decl: &mut VarDecl) {
        for declarator in &mut decl.declarations {
            self.pattern(&mut declarator.id);
            if let Some(init) = &mut declarator.init {
                self.expr(init);
            }
        }
    }

    /// Defaults and computed keys inside a binding pattern
    fn pattern(&mut self, pattern: &mut Pattern) {
        match &mut pattern.kind {
            PatternKind::Ident(_) => {}
            PatternKind::Array(elements) => {
                for element in elements.iter_mut().flatten() {
                    self.pattern(element);
                }
            }
            PatternKind::Object(props) => {
                for prop in props {
                    match prop {
                        ObjectPatternProp::KeyValue { key, value, .. } => {
                            self.prop_key(key);
                            self.pattern(value);
                        }
                        ObjectPatternProp::Rest(rest) => self.pattern(rest),
                    }
                }
            }
            PatternKind::Assign { target, default } => {
                self.pattern(target);
                self.expr(default);
            }
            PatternKind::Rest(inner) => self.pattern(inner),
        }
    }

    fn params(&mut self, params: &mut [Pattern]) {
        for param in params {
            let span = param.span;
            match &mut param.kind {
                PatternKind::Assign { target, default } => {
                    self.pattern(target);
                    self.expr(default);
                    let branch = self.coverage.new_branch(BranchKind::DefaultArg, self.loc(span));
                    let path = self.coverage.add_branch_path(branch, self.loc(default.span));
                    wrap(default, self.counter("b", &[branch, path]));
                }
                _ => self.pattern(param),
            }
        }
    }

    /// `name` overrides the function's own name, for methods
    fn function(&mut self, function: &mut Function, name: Option<String>) {
        let name = name
            .or_else(|| function.name.clone())
            .unwrap_or_else(|| format!("(anonymous_{})", self.coverage.function_count()));
        let loc = self.loc(function.span);
        let id = self.coverage.new_function(name, loc, loc);
        self.params(&mut function.params);

        let entered = Stmt::expr(self.counter("f", &[id]));
        let body = std::mem::replace(&mut function.body, FunctionBody::Block(Vec::new()));
        function.body = match body {
            FunctionBody::Block(mut stmts) => {
                self.body(&mut stmts, Some(entered));
                FunctionBody::Block(stmts)
            }
            // A concise arrow body becomes `{ f++; s++; return expr; }`
            FunctionBody::Expr(mut expr) => {
                self.expr(&mut expr);
                let span = expr.span;
                let statement = self.coverage.new_statement(self.loc(span));
                FunctionBody::Block(vec![
                    entered,
                    Stmt::expr(self.counter("s", &[statement])),
                    Stmt::new(StmtKind::Return(Some(*expr)), span),
                ])
            }
        };
    }

    fn class(&mut self, class: &mut Class) {
        if let Some(super_class) = &mut class.super_class {
            self.expr(super_class);
        }
        for member in &mut class.members {
            match &mut member.kind {
                ClassMemberKind::Method { key, function, .. } => {
                    let name = key.static_name();
                    if let Some(name) = &name {
                        if self.ignore_class_methods.contains(name) {
                            continue;
                        }
                    }
                    self.prop_key(key);
                    self.function(function, name);
                }
                ClassMemberKind::Field { key, value, .. } => {
                    self.prop_key(key);
                    if let Some(value) = value {
                        self.expr(value);
                    }
                }
            }
        }
    }

    fn prop_key(&mut self, key: &mut PropKey) {
        if let PropKey::Computed(expr) = key {
            self.expr(expr);
        }
    }

    fn expr(&mut self, expr: &mut Expr) {
        let span = expr.span;
        if matches!(expr.kind, ExprKind::Logical { .. }) {
            let branch = self.coverage.new_branch(BranchKind::BinaryExpr, self.loc(span));
            self.logical_operands(expr, branch);
            return;
        }
        match &mut expr.kind {
            ExprKind::Literal(_) | ExprKind::Ident(_) | ExprKind::This | ExprKind::Super => {}
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test);
                self.expr(consequent);
                self.expr(alternate);
                let branch = self.coverage.new_branch(BranchKind::CondExpr, self.loc(span));
                let taken = self.coverage.add_branch_path(branch, self.loc(consequent.span));
                let not_taken = self.coverage.add_branch_path(branch, self.loc(alternate.span));
                wrap(consequent, self.counter("b", &[branch, taken]));
                wrap(alternate, self.counter("b", &[branch, not_taken]));
            }
            ExprKind::Function(function) | ExprKind::Arrow(function) => {
                self.function(function, None)
            }
            ExprKind::Class(class) => self.class(class),
            ExprKind::Object(props) => {
                for prop in props {
                    match &mut prop.kind {
                        PropertyKind::KeyValue { key, value, .. } => {
                            self.prop_key(key);
                            self.expr(value);
                        }
                        PropertyKind::Method { key, function, .. } => {
                            let name = key.static_name();
                            self.prop_key(key);
                            self.function(function, name);
                        }
                        PropertyKind::Spread(inner) => self.expr(inner),
                    }
                }
            }
            ExprKind::Array(elements) => {
                for element in elements.iter_mut().flatten() {
                    self.expr(element);
                }
            }
            ExprKind::Template { exprs, .. } | ExprKind::Sequence(exprs) => {
                for expr in exprs {
                    self.expr(expr);
                }
            }
            ExprKind::TaggedTemplate { tag, quasi } => {
                self.expr(tag);
                self.expr(quasi);
            }
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::Update { target, .. } => self.expr(target),
            ExprKind::Spread(inner) | ExprKind::Await(inner) => self.expr(inner),
            ExprKind::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::Assign { target, value, .. } => {
                self.expr(target);
                self.expr(value);
            }
            ExprKind::Call { callee, args, .. } | ExprKind::New { callee, args } => {
                self.expr(callee);
                for arg in args {
                    self.expr(arg);
                }
            }
            ExprKind::Member {
                object, property, ..
            } => {
                self.expr(object);
                if let MemberProp::Computed(prop) = property {
                    self.expr(prop);
                }
            }
            ExprKind::Yield { argument, .. } => {
                if let Some(argument) = argument {
                    self.expr(argument);
                }
            }
            ExprKind::Logical { .. } => {}
        }
    }

    /// Every operand of a chain of logical operators is one path of the
    /// same branch
    fn logical_operands(&mut self, expr: &mut Expr, branch: usize) {
        if let ExprKind::Logical { left, right, .. } = &mut expr.kind {
            self.logical_operands(left, branch);
            self.logical_operands(right, branch);
            return;
        }
        self.expr(expr);
        let path = self.coverage.add_branch_path(branch, self.loc(expr.span));
        wrap(expr, self.counter("b", &[branch, path]));
    }
}
