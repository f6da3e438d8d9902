//! jscover Parser - Recursive descent parser
//!
//! Parses the supported ECMAScript subset into an AST. The parser can be
//! made lenient so that partially transformed or bundled input still parses:
//! - `import`/`export` anywhere, even in scripts
//! - `return` at the top level
//! - `super` outside of methods
//!
//! Every function, arrow and method gets a fresh [`NodeId`](jscover_ast::NodeId)
//! so later passes can key per-function data by node.

mod error;
mod parser;

pub use error::*;
pub use parser::*;

use jscover_ast::{Program, SourceType};
use jscover_lexer::tokenize;
use serde::{Deserialize, Serialize};

/// Plugin names accepted in [`ParseOptions::plugins`]. Only the decorator
/// plugins change what parses; the rest name syntax that is always on.
pub const KNOWN_PLUGINS: &[&str] = &[
    "decorators",
    "decorators-legacy",
    "classProperties",
    "classPrivateProperties",
    "classPrivateMethods",
    "asyncGenerators",
    "dynamicImport",
    "objectRestSpread",
    "optionalChaining",
    "nullishCoalescingOperator",
    "topLevelAwait",
];

/// Dialect flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseOptions {
    pub source_type: SourceType,
    pub allow_return_outside_function: bool,
    pub allow_import_export_everywhere: bool,
    pub allow_super_outside_method: bool,
    pub plugins: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            source_type: SourceType::Script,
            allow_return_outside_function: false,
            allow_import_export_everywhere: false,
            allow_super_outside_method: false,
            plugins: Vec::new(),
        }
    }
}

impl ParseOptions {
    pub fn module() -> Self {
        Self {
            source_type: SourceType::Module,
            ..Self::default()
        }
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p == name)
    }

    fn validate(&self) -> Result<(), ParseError> {
        match self
            .plugins
            .iter()
            .find(|p| !KNOWN_PLUGINS.contains(&p.as_str()))
        {
            Some(name) => Err(ParseError::UnknownPlugin { name: name.clone() }),
            None => Ok(()),
        }
    }
}

/// Parse a source string into a Program AST
pub fn parse(source: &str, options: &ParseOptions) -> Result<Program, ParseError> {
    options.validate()?;
    let tokens = tokenize(source);
    let mut parser = Parser::new(source, tokens, options);
    parser.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jscover_ast::*;
    use pretty_assertions::assert_eq;

    fn parse_script(source: &str) -> Program {
        let result = parse(source, &ParseOptions::default());
        assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
        result.unwrap()
    }

    fn first_expr(program: &Program) -> &Expr {
        match &program.body[0].kind {
            StmtKind::Expr(expr) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_var_declarations() {
        let program = parse_script("var a = 1, b; let [c, , ...d] = e; const { f, g: h = 2 } = i;");
        assert_eq!(program.body.len(), 3);
        let StmtKind::Var(decl) = &program.body[1].kind else {
            panic!("expected declaration");
        };
        assert_eq!(decl.kind, VarKind::Let);
        assert_eq!(decl.declarations[0].id.bound_names(), vec!["c", "d"]);
        let StmtKind::Var(decl) = &program.body[2].kind else {
            panic!("expected declaration");
        };
        assert_eq!(decl.declarations[0].id.bound_names(), vec!["f", "h"]);
    }

    #[test]
    fn test_operator_precedence() {
        let program = parse_script("a + b * c ** d ** e;");
        let ExprKind::Binary { op, right, .. } = &first_expr(&program).kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        let ExprKind::Binary { op, right, .. } = &right.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Mul);
        // `**` is right-associative
        let ExprKind::Binary { op, right, .. } = &right.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Exp);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Exp, .. }));
    }

    #[test]
    fn test_logical_and_conditional() {
        let program = parse_script("x = a ?? b ? c || d && e : f;");
        let ExprKind::Assign { value, .. } = &first_expr(&program).kind else {
            panic!("expected assignment");
        };
        let ExprKind::Conditional { test, consequent, .. } = &value.kind else {
            panic!("expected conditional");
        };
        assert!(matches!(test.kind, ExprKind::Logical { op: LogicalOp::Nullish, .. }));
        assert!(matches!(consequent.kind, ExprKind::Logical { op: LogicalOp::Or, .. }));
    }

    #[test]
    fn test_object_literal_forms() {
        let program = parse_script(
            "o = { a: 1, 'b': 2, 3: c, [d]: e, f, g() {}, get h() { return 1; }, ...i };",
        );
        let ExprKind::Assign { value, .. } = &first_expr(&program).kind else {
            panic!("expected assignment");
        };
        let ExprKind::Object(props) = &value.kind else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 8);
        assert!(matches!(
            &props[1].kind,
            PropertyKind::KeyValue { key: PropKey::String(s), .. } if s == "b"
        ));
        assert!(matches!(
            &props[3].kind,
            PropertyKind::KeyValue { key: PropKey::Computed(_), .. }
        ));
        assert!(matches!(
            &props[4].kind,
            PropertyKind::KeyValue { shorthand: true, .. }
        ));
        assert!(matches!(
            &props[6].kind,
            PropertyKind::Method { kind: MethodKind::Get, .. }
        ));
        assert!(matches!(&props[7].kind, PropertyKind::Spread(_)));
    }

    #[test]
    fn test_arrow_functions() {
        let program = parse_script("f = (a, b = 1) => a + b; g = x => ({ x }); h = async () => { await y; };");
        assert_eq!(program.body.len(), 3);
        let ExprKind::Assign { value, .. } = &first_expr(&program).kind else {
            panic!("expected assignment");
        };
        let ExprKind::Arrow(function) = &value.kind else {
            panic!("expected arrow");
        };
        assert_eq!(function.params.len(), 2);
        assert!(matches!(function.body, FunctionBody::Expr(_)));
    }

    #[test]
    fn test_parenthesized_call_is_not_arrow() {
        let program = parse_script("(a, b)\n(c)");
        // No semicolon is inserted before `(`
        assert_eq!(program.body.len(), 1);
        assert!(matches!(first_expr(&program).kind, ExprKind::Call { .. }));
    }

    #[test]
    fn test_function_ids_are_unique() {
        let program = parse_script("function a() { return function () {}; } var b = () => 1;");
        let StmtKind::Function(outer) = &program.body[0].kind else {
            panic!("expected function");
        };
        let FunctionBody::Block(body) = &outer.body else {
            panic!("expected block body");
        };
        let StmtKind::Return(Some(inner)) = &body[0].kind else {
            panic!("expected return");
        };
        let ExprKind::Function(inner) = &inner.kind else {
            panic!("expected function expression");
        };
        assert_ne!(outer.id, inner.id);
    }

    #[test]
    fn test_automatic_semicolons() {
        let program = parse_script("a = 1\nb = 2\nreturnValue\n++c");
        assert_eq!(program.body.len(), 4);
        // `++` after a line break starts a new statement
        assert!(matches!(
            &program.body[3].kind,
            StmtKind::Expr(Expr { kind: ExprKind::Update { prefix: true, .. }, .. })
        ));
    }

    #[test]
    fn test_control_flow_statements() {
        let source = r#"
            for (var i = 0; i < 10; i++) { if (i % 2) continue; else break; }
            for (const k in obj) {}
            for (let v of list) {}
            while (x) x--;
            do { y++; } while (y < 3)
            switch (z) { case 1: a(); break; default: b(); }
            try { risky(); } catch (e) { handle(e); } finally { done(); }
            outer: for (;;) { break outer; }
        "#;
        let program = parse_script(source);
        assert_eq!(program.body.len(), 8);
        assert!(matches!(program.body[1].kind, StmtKind::ForIn { .. }));
        assert!(matches!(program.body[2].kind, StmtKind::ForOf { .. }));
        assert!(matches!(program.body[7].kind, StmtKind::Labeled { .. }));
    }

    #[test]
    fn test_class_syntax() {
        let source = r#"
            class A extends B {
                static count = 0;
                #secret = 1;
                constructor(x) { super(x); }
                get value() { return this.#secret; }
                static async *items() {}
            }
        "#;
        let program = parse_script(source);
        let StmtKind::Class(class) = &program.body[0].kind else {
            panic!("expected class");
        };
        assert_eq!(class.name.as_deref(), Some("A"));
        assert_eq!(class.members.len(), 5);
        assert!(matches!(
            &class.members[2].kind,
            ClassMemberKind::Method { kind: MethodKind::Constructor, .. }
        ));
        assert!(matches!(
            &class.members[4].kind,
            ClassMemberKind::Method { is_static: true, function, .. }
                if function.is_async && function.is_generator
        ));
    }

    #[test]
    fn test_template_literals() {
        let program = parse_script("s = `a\\n${b}c${`d`}`;");
        let ExprKind::Assign { value, .. } = &first_expr(&program).kind else {
            panic!("expected assignment");
        };
        let ExprKind::Template { quasis, exprs } = &value.kind else {
            panic!("expected template");
        };
        assert_eq!(quasis.len(), 3);
        assert_eq!(exprs.len(), 2);
        assert_eq!(quasis[0].raw, "a\\n");
        assert_eq!(quasis[0].cooked.as_deref(), Some("a\n"));
    }

    #[test]
    fn test_comments_collected() {
        let program = parse_script("// first\na; /* second */");
        assert_eq!(program.comments.len(), 2);
        assert_eq!(program.comments[0].kind, CommentKind::Line);
        assert_eq!(program.comments[0].text, " first");
        assert_eq!(program.comments[1].text, " second ");
    }

    #[test]
    fn test_block_comments_anywhere() {
        for source in [
            "/* c */ x;",
            "a /* c */ + b;",
            "/** doc */\nfunction f() {}",
            "x;/* c */",
        ] {
            let program = parse_script(source);
            assert_eq!(program.comments.len(), 1, "{}", source);
            assert_eq!(program.comments[0].kind, CommentKind::Block, "{}", source);
        }
        assert!(parse("x; /* open", &ParseOptions::default()).is_err());
    }

    #[test]
    fn test_modules_require_module_source_type() {
        let err = parse("import a from 'a';", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::ModuleItemNotAllowed { .. }));

        let program = parse(
            "import a, { b as c } from 'a'; export default a; export * from 'b';",
            &ParseOptions::module(),
        )
        .unwrap();
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn test_import_export_everywhere() {
        let source = "if (x) { import a from 'a'; export { a }; }";
        assert!(parse(source, &ParseOptions::module()).is_err());

        let options = ParseOptions {
            allow_import_export_everywhere: true,
            ..ParseOptions::default()
        };
        assert!(parse(source, &options).is_ok());
    }

    #[test]
    fn test_return_outside_function() {
        let err = parse("return 1;", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::ReturnOutsideFunction { .. }));

        let options = ParseOptions {
            allow_return_outside_function: true,
            ..ParseOptions::default()
        };
        assert!(parse("return 1;", &options).is_ok());
    }

    #[test]
    fn test_super_outside_method() {
        let err = parse("function f() { super.x(); }", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::SuperOutsideMethod { .. }));

        let options = ParseOptions {
            allow_super_outside_method: true,
            ..ParseOptions::default()
        };
        assert!(parse("function f() { super.x(); }", &options).is_ok());
        assert!(parse("o = { m() { return super.m(); } };", &ParseOptions::default()).is_ok());
    }

    #[test]
    fn test_decorators_need_plugin() {
        let source = "@dec class A { @prop() x = 1; }";
        let err = parse(source, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::PluginRequired { .. }));

        let options = ParseOptions {
            plugins: vec!["decorators".to_string()],
            ..ParseOptions::default()
        };
        let program = parse(source, &options).unwrap();
        let StmtKind::Class(class) = &program.body[0].kind else {
            panic!("expected class");
        };
        assert_eq!(class.decorators.len(), 1);
        assert_eq!(class.members[0].decorators.len(), 1);
    }

    #[test]
    fn test_unknown_plugin_rejected() {
        let options = ParseOptions {
            plugins: vec!["jsx".to_string()],
            ..ParseOptions::default()
        };
        let err = parse("a;", &options).unwrap_err();
        assert_eq!(err, ParseError::UnknownPlugin { name: "jsx".to_string() });
    }

    #[test]
    fn test_syntax_error_span() {
        let err = parse("var = 1;", &ParseOptions::default()).unwrap_err();
        assert_eq!(err.span(), Span::new(4, 5));
    }

    #[test]
    fn test_generated_code_reparses() {
        let source = "function f(a, ...b) { return a ? -(-b.length) : (a, b); } x = { y: 1 }.y;";
        let program = parse_script(source);
        let generated = generate(&program, &GenerateOptions::default(), source);
        let reparsed = parse_script(&generated.code);
        let again = generate(&reparsed, &GenerateOptions::default(), &generated.code);
        assert_eq!(generated.code, again.code);
    }
}
