//! Code generator
//!
//! Serializes a program back to source text. Parentheses are derived from
//! operator precedence rather than kept from the input, so rewritten trees
//! print correctly. Optionally re-emits comments and records a source map.

use crate::*;

/// Options controlling generated output
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Omit newlines and indentation
    pub compact: bool,
    /// Re-emit comments from the original source
    pub comments: bool,
    /// Record a source map while printing
    pub source_maps: bool,
    /// Name recorded as the map's source
    pub source_file_name: Option<String>,
}

/// Output of [`generate`]
#[derive(Debug, Clone)]
pub struct GeneratedCode {
    pub code: String,
    pub map: Option<SourceMap>,
}

/// Generate source text for a program.
///
/// `source` is the text the program was parsed from; it is only used for
/// source-map positions and `sourcesContent`, and may be empty for trees
/// built by hand.
pub fn generate(program: &Program, options: &GenerateOptions, source: &str) -> GeneratedCode {
    let mut printer = Printer::new(options, source, &program.comments);
    printer.print_stmts(&program.body);
    printer.flush_remaining_comments();
    printer.finish()
}

const PREC_SEQUENCE: u8 = 1;
const PREC_ASSIGN: u8 = 2;
const PREC_CONDITIONAL: u8 = 3;
const PREC_UNARY: u8 = 15;
const PREC_UPDATE: u8 = 16;
const PREC_CALL: u8 = 18;
const PREC_PRIMARY: u8 = 20;

fn binary_precedence(op: BinaryOp) -> u8 {
    op.precedence() + 2
}

fn logical_precedence(op: LogicalOp) -> u8 {
    match op {
        LogicalOp::And => 5,
        LogicalOp::Or | LogicalOp::Nullish => 4,
    }
}

fn expr_precedence(expr: &Expr) -> u8 {
    match &expr.kind {
        ExprKind::Literal(Literal::Number(n)) if n.is_sign_negative() => PREC_UNARY,
        ExprKind::Literal(_)
        | ExprKind::Ident(_)
        | ExprKind::This
        | ExprKind::Super
        | ExprKind::Array(_)
        | ExprKind::Object(_)
        | ExprKind::Function(_)
        | ExprKind::Class(_)
        | ExprKind::Template { .. } => PREC_PRIMARY,
        ExprKind::Call { .. }
        | ExprKind::New { .. }
        | ExprKind::Member { .. }
        | ExprKind::TaggedTemplate { .. } => PREC_CALL,
        ExprKind::Update { .. } => PREC_UPDATE,
        ExprKind::Unary { .. } | ExprKind::Await(_) => PREC_UNARY,
        ExprKind::Binary { op, .. } => binary_precedence(*op),
        ExprKind::Logical { op, .. } => logical_precedence(*op),
        ExprKind::Conditional { .. } => PREC_CONDITIONAL,
        ExprKind::Arrow(_)
        | ExprKind::Assign { .. }
        | ExprKind::Yield { .. }
        | ExprKind::Spread(_) => PREC_ASSIGN,
        ExprKind::Sequence(_) => PREC_SEQUENCE,
    }
}

/// The expression whose text starts the printed form of `expr`
fn leftmost(expr: &Expr) -> &Expr {
    match &expr.kind {
        ExprKind::Binary { left, .. } | ExprKind::Logical { left, .. } => leftmost(left),
        ExprKind::Assign { target, .. } => leftmost(target),
        ExprKind::Conditional { test, .. } => leftmost(test),
        ExprKind::Call { callee, .. } => leftmost(callee),
        ExprKind::Member { object, .. } => leftmost(object),
        ExprKind::TaggedTemplate { tag, .. } => leftmost(tag),
        ExprKind::Update {
            prefix: false,
            target,
            ..
        } => leftmost(target),
        ExprKind::Sequence(items) => items.first().map(leftmost).unwrap_or(expr),
        _ => expr,
    }
}

/// Would this expression be misread as a declaration or block at the start
/// of a statement?
fn needs_statement_parens(expr: &Expr) -> bool {
    matches!(
        leftmost(expr).kind,
        ExprKind::Object(_) | ExprKind::Function(_) | ExprKind::Class(_)
    )
}

fn contains_call(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Call { .. } => true,
        ExprKind::Member { object, .. } | ExprKind::TaggedTemplate { tag: object, .. } => {
            contains_call(object)
        }
        _ => false,
    }
}

/// Escape a string for output (double quotes, newlines, etc.)
fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push('"');
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            '\u{2028}' => result.push_str("\\u2028"),
            '\u{2029}' => result.push_str("\\u2029"),
            c if (c as u32) < 0x20 => result.push_str(&format!("\\u{:04x}", c as u32)),
            _ => result.push(c),
        }
    }
    result.push('"');
    result
}

struct Printer<'a> {
    options: &'a GenerateOptions,
    out: String,
    indent: usize,
    line: u32,
    column: u32,
    lines: Option<LineIndex>,
    map: Option<SourceMapBuilder>,
    comments: &'a [Comment],
    next_comment: usize,
}

impl<'a> Printer<'a> {
    fn new(options: &'a GenerateOptions, source: &str, comments: &'a [Comment]) -> Self {
        let (lines, map) = if options.source_maps {
            let name = options
                .source_file_name
                .clone()
                .unwrap_or_else(|| "unknown.js".to_string());
            let mut builder = SourceMapBuilder::new(name);
            if !source.is_empty() {
                builder = builder.with_source_content(source);
            }
            (Some(LineIndex::new(source)), Some(builder))
        } else {
            (None, None)
        };

        Self {
            options,
            out: String::new(),
            indent: 0,
            line: 0,
            column: 0,
            lines,
            map,
            comments,
            next_comment: 0,
        }
    }

    fn finish(self) -> GeneratedCode {
        GeneratedCode {
            code: self.out,
            map: self.map.map(SourceMapBuilder::build),
        }
    }

    // === Output primitives ===

    fn write(&mut self, text: &str) {
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        self.out.push_str(text);
    }

    /// Optional whitespace, dropped in compact mode
    fn space(&mut self) {
        if !self.options.compact {
            self.write(" ");
        }
    }

    fn start_line(&mut self) {
        if self.options.compact {
            return;
        }
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.write("\n");
        }
        let pad = "  ".repeat(self.indent);
        self.write(&pad);
    }

    /// Record a mapping from the current output position to `span`
    fn mark(&mut self, span: Span) {
        if span.is_dummy() {
            return;
        }
        if let (Some(map), Some(lines)) = (self.map.as_mut(), self.lines.as_ref()) {
            let original = lines.position(span.start);
            map.add(Mapping {
                generated_line: self.line,
                generated_column: self.column,
                original_line: original.line - 1,
                original_column: original.column,
            });
        }
    }

    // === Comments ===

    fn flush_comments(&mut self, before: Span) {
        if !self.options.comments || before.is_dummy() {
            return;
        }
        let comments = self.comments;
        while let Some(comment) = comments.get(self.next_comment) {
            if comment.span.start >= before.start {
                break;
            }
            self.next_comment += 1;
            self.start_line();
            self.print_comment(comment);
        }
    }

    fn flush_remaining_comments(&mut self) {
        if !self.options.comments {
            return;
        }
        let comments = self.comments;
        for comment in &comments[self.next_comment..] {
            self.start_line();
            self.print_comment(comment);
        }
        self.next_comment = comments.len();
    }

    fn print_comment(&mut self, comment: &Comment) {
        match comment.kind {
            CommentKind::Line => {
                self.write("//");
                self.write(&comment.text);
                self.write("\n");
            }
            CommentKind::Block => {
                self.write("/*");
                self.write(&comment.text);
                self.write("*/");
            }
        }
    }

    // === Statements ===

    fn print_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.print_stmt(stmt);
        }
    }

    fn print_stmt(&mut self, stmt: &Stmt) {
        self.flush_comments(stmt.span);
        self.start_line();
        self.print_stmt_inline(stmt);
    }

    fn print_block(&mut self, stmts: &[Stmt]) {
        self.write("{");
        if stmts.is_empty() {
            self.write("}");
            return;
        }
        self.indent += 1;
        self.print_stmts(stmts);
        self.indent -= 1;
        self.start_line();
        self.write("}");
    }

    /// Body of `if`, loops and labels: blocks stay on the same line, other
    /// statements follow after a single space
    fn print_body(&mut self, body: &Stmt) {
        match &body.kind {
            StmtKind::Block(stmts) => {
                self.space();
                self.mark(body.span);
                self.print_block(stmts);
            }
            _ => {
                self.write(" ");
                self.print_stmt_inline(body);
            }
        }
    }

    fn print_stmt_inline(&mut self, stmt: &Stmt) {
        self.mark(stmt.span);
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                if needs_statement_parens(expr) {
                    self.write("(");
                    self.print_expr(expr, PREC_SEQUENCE);
                    self.write(")");
                } else {
                    self.print_expr(expr, PREC_SEQUENCE);
                }
                self.write(";");
            }
            StmtKind::Var(decl) => {
                self.print_var_decl(decl);
                self.write(";");
            }
            StmtKind::Function(function) => self.print_function(function),
            StmtKind::Class(class) => self.print_class(class),
            StmtKind::Return(arg) => {
                self.write("return");
                if let Some(arg) = arg {
                    self.write(" ");
                    self.print_expr(arg, PREC_SEQUENCE);
                }
                self.write(";");
            }
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.write("if");
                self.space();
                self.write("(");
                self.print_expr(test, PREC_SEQUENCE);
                self.write(")");
                match alternate {
                    Some(alternate) => {
                        // Braces keep a nested `if` from capturing the `else`
                        match &consequent.kind {
                            StmtKind::Block(_) => self.print_body(consequent),
                            _ => {
                                self.space();
                                self.print_block(std::slice::from_ref(consequent.as_ref()));
                            }
                        }
                        self.space();
                        self.write("else");
                        match &alternate.kind {
                            StmtKind::If { .. } => {
                                self.write(" ");
                                self.print_stmt_inline(alternate);
                            }
                            _ => self.print_body(alternate),
                        }
                    }
                    None => self.print_body(consequent),
                }
            }
            StmtKind::Block(stmts) => self.print_block(stmts),
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                self.write("for");
                self.space();
                self.write("(");
                match init {
                    Some(ForInit::Var(decl)) => self.print_var_decl(decl),
                    Some(ForInit::Expr(expr)) => self.print_expr(expr, PREC_SEQUENCE),
                    None => {}
                }
                self.write(";");
                if let Some(test) = test {
                    self.space();
                    self.print_expr(test, PREC_SEQUENCE);
                }
                self.write(";");
                if let Some(update) = update {
                    self.space();
                    self.print_expr(update, PREC_SEQUENCE);
                }
                self.write(")");
                self.print_body(body);
            }
            StmtKind::ForIn { left, right, body } => {
                self.write("for");
                self.space();
                self.write("(");
                self.print_for_head(left);
                self.write(" in ");
                self.print_expr(right, PREC_SEQUENCE);
                self.write(")");
                self.print_body(body);
            }
            StmtKind::ForOf {
                left,
                right,
                body,
                is_await,
            } => {
                self.write(if *is_await { "for await" } else { "for" });
                self.space();
                self.write("(");
                self.print_for_head(left);
                self.write(" of ");
                self.print_expr(right, PREC_ASSIGN);
                self.write(")");
                self.print_body(body);
            }
            StmtKind::While { test, body } => {
                self.write("while");
                self.space();
                self.write("(");
                self.print_expr(test, PREC_SEQUENCE);
                self.write(")");
                self.print_body(body);
            }
            StmtKind::DoWhile { body, test } => {
                self.write("do");
                self.print_body(body);
                self.space();
                self.write("while");
                self.space();
                self.write("(");
                self.print_expr(test, PREC_SEQUENCE);
                self.write(");");
            }
            StmtKind::Break(label) => {
                self.write("break");
                if let Some(label) = label {
                    self.write(" ");
                    self.write(label);
                }
                self.write(";");
            }
            StmtKind::Continue(label) => {
                self.write("continue");
                if let Some(label) = label {
                    self.write(" ");
                    self.write(label);
                }
                self.write(";");
            }
            StmtKind::Throw(expr) => {
                self.write("throw ");
                self.print_expr(expr, PREC_SEQUENCE);
                self.write(";");
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                self.write("try");
                self.space();
                self.print_block(block);
                if let Some(handler) = handler {
                    self.space();
                    self.write("catch");
                    if let Some(param) = &handler.param {
                        self.space();
                        self.write("(");
                        self.print_pattern(param);
                        self.write(")");
                    }
                    self.space();
                    self.print_block(&handler.body);
                }
                if let Some(finalizer) = finalizer {
                    self.space();
                    self.write("finally");
                    self.space();
                    self.print_block(finalizer);
                }
            }
            StmtKind::Switch {
                discriminant,
                cases,
            } => {
                self.write("switch");
                self.space();
                self.write("(");
                self.print_expr(discriminant, PREC_SEQUENCE);
                self.write(")");
                self.space();
                self.write("{");
                self.indent += 1;
                for case in cases {
                    self.flush_comments(case.span);
                    self.start_line();
                    self.mark(case.span);
                    match &case.test {
                        Some(test) => {
                            self.write("case ");
                            self.print_expr(test, PREC_SEQUENCE);
                            self.write(":");
                        }
                        None => self.write("default:"),
                    }
                    self.indent += 1;
                    self.print_stmts(&case.consequent);
                    self.indent -= 1;
                }
                self.indent -= 1;
                if !cases.is_empty() {
                    self.start_line();
                }
                self.write("}");
            }
            StmtKind::Labeled { label, body } => {
                self.write(label);
                self.write(":");
                self.print_body(body);
            }
            StmtKind::Empty => self.write(";"),
            StmtKind::Debugger => self.write("debugger;"),
            StmtKind::Import(import) => self.print_import(import),
            StmtKind::Export(export) => self.print_export(export),
        }
    }

    fn print_for_head(&mut self, head: &ForHead) {
        match head {
            ForHead::Var(decl) => self.print_var_decl(decl),
            ForHead::Target(expr) => self.print_expr(expr, PREC_CALL),
        }
    }

    fn print_var_decl(&mut self, decl: &VarDecl) {
        self.write(decl.kind.as_str());
        self.write(" ");
        for (i, declarator) in decl.declarations.iter().enumerate() {
            if i > 0 {
                self.write(",");
                self.space();
            }
            self.mark(declarator.span);
            self.print_pattern(&declarator.id);
            if let Some(init) = &declarator.init {
                self.space();
                self.write("=");
                self.space();
                self.print_expr(init, PREC_ASSIGN);
            }
        }
    }

    fn print_import(&mut self, import: &ImportDecl) {
        self.write("import ");
        if import.specifiers.is_empty() {
            self.write(&escape_string(&import.source));
            self.write(";");
            return;
        }

        let mut wrote_any = false;
        let mut named = Vec::new();
        for specifier in &import.specifiers {
            match specifier {
                ImportSpecifier::Default(local) => {
                    self.write(local);
                    wrote_any = true;
                }
                ImportSpecifier::Namespace(local) => {
                    if wrote_any {
                        self.write(",");
                        self.space();
                    }
                    self.write("* as ");
                    self.write(local);
                    wrote_any = true;
                }
                ImportSpecifier::Named { imported, local } => named.push((imported, local)),
            }
        }
        if !named.is_empty() {
            if wrote_any {
                self.write(",");
                self.space();
            }
            self.write("{");
            self.space();
            for (i, (imported, local)) in named.iter().enumerate() {
                if i > 0 {
                    self.write(",");
                    self.space();
                }
                self.write(imported);
                if imported != local {
                    self.write(" as ");
                    self.write(local);
                }
            }
            self.space();
            self.write("}");
        }
        self.write(" from ");
        self.write(&escape_string(&import.source));
        self.write(";");
    }

    fn print_export(&mut self, export: &ExportDecl) {
        self.write("export ");
        match export {
            ExportDecl::Declaration(decl) => self.print_stmt_inline(decl),
            ExportDecl::Named { specifiers, source } => {
                self.write("{");
                self.space();
                for (i, specifier) in specifiers.iter().enumerate() {
                    if i > 0 {
                        self.write(",");
                        self.space();
                    }
                    self.write(&specifier.local);
                    if specifier.local != specifier.exported {
                        self.write(" as ");
                        self.write(&specifier.exported);
                    }
                }
                self.space();
                self.write("}");
                if let Some(source) = source {
                    self.write(" from ");
                    self.write(&escape_string(source));
                }
                self.write(";");
            }
            ExportDecl::DefaultExpr(expr) => {
                self.write("default ");
                if needs_statement_parens(expr) {
                    self.write("(");
                    self.print_expr(expr, PREC_ASSIGN);
                    self.write(")");
                } else {
                    self.print_expr(expr, PREC_ASSIGN);
                }
                self.write(";");
            }
            ExportDecl::DefaultFunction(function) => {
                self.write("default ");
                self.print_function(function);
            }
            ExportDecl::DefaultClass(class) => {
                self.write("default ");
                self.print_class(class);
            }
            ExportDecl::All { exported, source } => {
                self.write("*");
                if let Some(exported) = exported {
                    self.write(" as ");
                    self.write(exported);
                }
                self.write(" from ");
                self.write(&escape_string(source));
                self.write(";");
            }
        }
    }

    // === Functions and classes ===

    fn print_params(&mut self, params: &[Pattern]) {
        self.write("(");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.write(",");
                self.space();
            }
            self.print_pattern(param);
        }
        self.write(")");
    }

    fn print_function_block(&mut self, body: &FunctionBody) {
        match body {
            FunctionBody::Block(stmts) => self.print_block(stmts),
            FunctionBody::Expr(expr) => {
                // Only arrows have concise bodies; print as a block otherwise
                let ret = Stmt::synthetic(StmtKind::Return(Some(expr.as_ref().clone())));
                self.print_block(std::slice::from_ref(&ret));
            }
        }
    }

    fn print_function(&mut self, function: &Function) {
        self.mark(function.span);
        if function.is_async {
            self.write("async ");
        }
        self.write("function");
        if function.is_generator {
            self.write("*");
        }
        if let Some(name) = &function.name {
            self.write(" ");
            self.write(name);
        }
        self.print_params(&function.params);
        self.space();
        self.print_function_block(&function.body);
    }

    fn print_arrow(&mut self, function: &Function) {
        if function.is_async {
            self.write("async ");
        }
        self.print_params(&function.params);
        self.space();
        self.write("=>");
        self.space();
        match &function.body {
            FunctionBody::Block(stmts) => self.print_block(stmts),
            FunctionBody::Expr(expr) => {
                if matches!(leftmost(expr).kind, ExprKind::Object(_)) {
                    self.write("(");
                    self.print_expr(expr, PREC_ASSIGN);
                    self.write(")");
                } else {
                    self.print_expr(expr, PREC_ASSIGN);
                }
            }
        }
    }

    fn print_method(&mut self, key: &PropKey, kind: MethodKind, is_static: bool, function: &Function) {
        if is_static {
            self.write("static ");
        }
        if function.is_async {
            self.write("async ");
        }
        match kind {
            MethodKind::Get => self.write("get "),
            MethodKind::Set => self.write("set "),
            MethodKind::Method | MethodKind::Constructor => {}
        }
        if function.is_generator {
            self.write("*");
        }
        self.print_prop_key(key);
        self.print_params(&function.params);
        self.space();
        self.print_function_block(&function.body);
    }

    fn print_decorators(&mut self, decorators: &[Expr]) {
        for decorator in decorators {
            self.write("@");
            self.print_expr(decorator, PREC_CALL);
            self.write(" ");
        }
    }

    fn print_class(&mut self, class: &Class) {
        self.print_decorators(&class.decorators);
        self.mark(class.span);
        self.write("class");
        if let Some(name) = &class.name {
            self.write(" ");
            self.write(name);
        }
        if let Some(super_class) = &class.super_class {
            self.write(" extends ");
            self.print_expr(super_class, PREC_CALL);
        }
        self.space();
        self.write("{");
        if class.members.is_empty() {
            self.write("}");
            return;
        }
        self.indent += 1;
        for member in &class.members {
            self.flush_comments(member.span);
            self.start_line();
            self.mark(member.span);
            self.print_decorators(&member.decorators);
            match &member.kind {
                ClassMemberKind::Method {
                    key,
                    kind,
                    is_static,
                    function,
                } => self.print_method(key, *kind, *is_static, function),
                ClassMemberKind::Field {
                    key,
                    value,
                    is_static,
                } => {
                    if *is_static {
                        self.write("static ");
                    }
                    self.print_prop_key(key);
                    if let Some(value) = value {
                        self.space();
                        self.write("=");
                        self.space();
                        self.print_expr(value, PREC_ASSIGN);
                    }
                    self.write(";");
                }
            }
        }
        self.indent -= 1;
        self.start_line();
        self.write("}");
    }

    fn print_prop_key(&mut self, key: &PropKey) {
        match key {
            PropKey::Ident(name) => self.write(name),
            PropKey::String(value) => self.write(&escape_string(value)),
            PropKey::Number(n) => self.write(&format_number(*n)),
            PropKey::Private(name) => {
                self.write("#");
                self.write(name);
            }
            PropKey::Computed(expr) => {
                self.write("[");
                self.print_expr(expr, PREC_ASSIGN);
                self.write("]");
            }
        }
    }

    // === Patterns ===

    fn print_pattern(&mut self, pattern: &Pattern) {
        self.mark(pattern.span);
        match &pattern.kind {
            PatternKind::Ident(name) => self.write(name),
            PatternKind::Array(elements) => {
                self.write("[");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.write(",");
                        self.space();
                    }
                    if let Some(element) = element {
                        self.print_pattern(element);
                    }
                }
                if matches!(elements.last(), Some(None)) {
                    self.write(",");
                }
                self.write("]");
            }
            PatternKind::Object(props) => {
                self.write("{");
                self.space();
                for (i, prop) in props.iter().enumerate() {
                    if i > 0 {
                        self.write(",");
                        self.space();
                    }
                    match prop {
                        ObjectPatternProp::KeyValue {
                            key,
                            value,
                            shorthand,
                        } => {
                            if *shorthand {
                                self.print_pattern(value);
                            } else {
                                self.print_prop_key(key);
                                self.write(":");
                                self.space();
                                self.print_pattern(value);
                            }
                        }
                        ObjectPatternProp::Rest(rest) => {
                            self.write("...");
                            self.print_pattern(rest);
                        }
                    }
                }
                self.space();
                self.write("}");
            }
            PatternKind::Assign { target, default } => {
                self.print_pattern(target);
                self.space();
                self.write("=");
                self.space();
                self.print_expr(default, PREC_ASSIGN);
            }
            PatternKind::Rest(inner) => {
                self.write("...");
                self.print_pattern(inner);
            }
        }
    }

    // === Expressions ===

    fn print_expr(&mut self, expr: &Expr, min_prec: u8) {
        let wrap = expr_precedence(expr) < min_prec;
        if wrap {
            self.write("(");
        }
        self.mark(expr.span);
        self.print_expr_kind(expr);
        if wrap {
            self.write(")");
        }
    }

    fn print_expr_list(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.write(",");
                self.space();
            }
            self.print_expr(expr, PREC_ASSIGN);
        }
    }

    fn print_logical_operand(&mut self, operand: &Expr, min_prec: u8, parent: LogicalOp) {
        // `??` cannot be mixed with `&&`/`||` without parentheses
        let mixed = match &operand.kind {
            ExprKind::Logical { op, .. } => {
                (*op == LogicalOp::Nullish) != (parent == LogicalOp::Nullish)
            }
            _ => false,
        };
        if mixed {
            self.write("(");
            self.print_expr(operand, PREC_SEQUENCE);
            self.write(")");
        } else {
            self.print_expr(operand, min_prec);
        }
    }

    fn print_expr_kind(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(lit) => match lit {
                Literal::Null => self.write("null"),
                Literal::Bool(b) => self.write(if *b { "true" } else { "false" }),
                Literal::Number(n) => self.write(&format_number(*n)),
                Literal::String(s) => self.write(&escape_string(s)),
            },
            ExprKind::Ident(name) => self.write(name),
            ExprKind::This => self.write("this"),
            ExprKind::Super => self.write("super"),
            ExprKind::Array(elements) => {
                self.write("[");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.write(",");
                        self.space();
                    }
                    if let Some(element) = element {
                        self.print_expr(element, PREC_ASSIGN);
                    }
                }
                if matches!(elements.last(), Some(None)) {
                    self.write(",");
                }
                self.write("]");
            }
            ExprKind::Object(props) => {
                if props.is_empty() {
                    self.write("{}");
                    return;
                }
                self.write("{");
                self.space();
                for (i, prop) in props.iter().enumerate() {
                    if i > 0 {
                        self.write(",");
                        self.space();
                    }
                    self.print_property(prop);
                }
                self.space();
                self.write("}");
            }
            ExprKind::Function(function) => self.print_function(function),
            ExprKind::Arrow(function) => self.print_arrow(function),
            ExprKind::Class(class) => self.print_class(class),
            ExprKind::Template { quasis, exprs } => {
                self.write("`");
                for (i, quasi) in quasis.iter().enumerate() {
                    self.write(&quasi.raw);
                    if let Some(expr) = exprs.get(i) {
                        self.write("${");
                        self.print_expr(expr, PREC_SEQUENCE);
                        self.write("}");
                    }
                }
                self.write("`");
            }
            ExprKind::TaggedTemplate { tag, quasi } => {
                self.print_expr(tag, PREC_CALL);
                self.print_expr(quasi, PREC_PRIMARY);
            }
            ExprKind::Unary { op, operand } => {
                self.write(op.as_str());
                let needs_space = match op {
                    UnaryOp::TypeOf | UnaryOp::Void | UnaryOp::Delete => true,
                    UnaryOp::Neg | UnaryOp::Plus => {
                        let sign = op.as_str();
                        match &operand.kind {
                            ExprKind::Unary { op: inner, .. } => inner.as_str() == sign,
                            ExprKind::Update {
                                op: inner,
                                prefix: true,
                                ..
                            } => inner.as_str().starts_with(sign),
                            ExprKind::Literal(Literal::Number(n)) => {
                                sign == "-" && n.is_sign_negative()
                            }
                            _ => false,
                        }
                    }
                    UnaryOp::Not | UnaryOp::BitNot => false,
                };
                if needs_space {
                    self.write(" ");
                }
                self.print_expr(operand, PREC_UNARY);
            }
            ExprKind::Update {
                op,
                prefix,
                target,
            } => {
                if *prefix {
                    self.write(op.as_str());
                    self.print_expr(target, PREC_CALL);
                } else {
                    self.print_expr(target, PREC_CALL);
                    self.write(op.as_str());
                }
            }
            ExprKind::Binary { op, left, right } => {
                let prec = binary_precedence(*op);
                let (left_min, right_min) = if *op == BinaryOp::Exp {
                    // `**` is right-associative and rejects a unary left operand
                    (PREC_UPDATE, prec)
                } else {
                    (prec, prec + 1)
                };
                self.print_expr(left, left_min);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.print_expr(right, right_min);
            }
            ExprKind::Logical { op, left, right } => {
                let prec = logical_precedence(*op);
                self.print_logical_operand(left, prec, *op);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.print_logical_operand(right, prec + 1, *op);
            }
            ExprKind::Assign { op, target, value } => {
                self.print_expr(target, PREC_CALL);
                self.write(" ");
                self.write(op.as_str());
                self.write(" ");
                self.print_expr(value, PREC_ASSIGN);
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.print_expr(test, PREC_CONDITIONAL + 1);
                self.write(" ? ");
                self.print_expr(consequent, PREC_ASSIGN);
                self.write(" : ");
                self.print_expr(alternate, PREC_ASSIGN);
            }
            ExprKind::Call {
                callee,
                args,
                optional,
            } => {
                self.print_expr(callee, PREC_CALL);
                if *optional {
                    self.write("?.");
                }
                self.write("(");
                self.print_expr_list(args);
                self.write(")");
            }
            ExprKind::New { callee, args } => {
                self.write("new ");
                if contains_call(callee) {
                    self.write("(");
                    self.print_expr(callee, PREC_SEQUENCE);
                    self.write(")");
                } else {
                    self.print_expr(callee, PREC_CALL);
                }
                self.write("(");
                self.print_expr_list(args);
                self.write(")");
            }
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                if matches!(object.kind, ExprKind::Literal(Literal::Number(_))) {
                    self.write("(");
                    self.print_expr(object, PREC_SEQUENCE);
                    self.write(")");
                } else {
                    self.print_expr(object, PREC_CALL);
                }
                match property {
                    MemberProp::Ident(name) => {
                        self.write(if *optional { "?." } else { "." });
                        self.write(name);
                    }
                    MemberProp::Private(name) => {
                        self.write(if *optional { "?.#" } else { ".#" });
                        self.write(name);
                    }
                    MemberProp::Computed(prop) => {
                        if *optional {
                            self.write("?.");
                        }
                        self.write("[");
                        self.print_expr(prop, PREC_SEQUENCE);
                        self.write("]");
                    }
                }
            }
            ExprKind::Sequence(items) => self.print_expr_list(items),
            ExprKind::Spread(inner) => {
                self.write("...");
                self.print_expr(inner, PREC_ASSIGN);
            }
            ExprKind::Await(inner) => {
                self.write("await ");
                self.print_expr(inner, PREC_UNARY);
            }
            ExprKind::Yield { argument, delegate } => {
                self.write(if *delegate { "yield*" } else { "yield" });
                if let Some(argument) = argument {
                    self.write(" ");
                    self.print_expr(argument, PREC_ASSIGN);
                }
            }
        }
    }

    fn print_property(&mut self, prop: &Property) {
        self.mark(prop.span);
        match &prop.kind {
            PropertyKind::KeyValue {
                key,
                value,
                shorthand,
            } => {
                if *shorthand {
                    self.print_expr(value, PREC_ASSIGN);
                } else {
                    self.print_prop_key(key);
                    self.write(":");
                    self.space();
                    self.print_expr(value, PREC_ASSIGN);
                }
            }
            PropertyKind::Method {
                key,
                kind,
                function,
            } => self.print_method(key, *kind, false, function),
            PropertyKind::Spread(expr) => {
                self.write("...");
                self.print_expr(expr, PREC_ASSIGN);
            }
        }
    }
}
