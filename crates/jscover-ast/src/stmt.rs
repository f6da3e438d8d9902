//! Statement AST nodes

use serde::{Deserialize, Serialize};
use crate::{Expr, MethodKind, NodeId, PropKey, Span};

/// A statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn synthetic(kind: StmtKind) -> Self {
        Self {
            kind,
            span: Span::dummy(),
        }
    }

    /// Wrap an expression as a statement with no source location
    pub fn expr(expr: Expr) -> Self {
        Self::synthetic(StmtKind::Expr(expr))
    }

    /// Declarations are hoisted or bind names and are not counted as
    /// executable statements on their own.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::Function(_) | StmtKind::Import(_) | StmtKind::Export(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// Expression statement: `foo();`
    Expr(Expr),

    /// Variable declaration: `var a = 1, b;`, `const { x } = o;`
    Var(VarDecl),

    /// Function declaration: `function f() {}`
    Function(Box<Function>),

    /// Class declaration: `class A extends B {}`
    Class(Box<Class>),

    /// `return x;`
    Return(Option<Expr>),

    /// `if (test) a else b`
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },

    /// `{ ... }`
    Block(Vec<Stmt>),

    /// `for (init; test; update) body`
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },

    /// `for (left in right) body`
    ForIn {
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
    },

    /// `for (left of right) body`, `for await (...)`
    ForOf {
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
        is_await: bool,
    },

    /// `while (test) body`
    While { test: Expr, body: Box<Stmt> },

    /// `do body while (test);`
    DoWhile { body: Box<Stmt>, test: Expr },

    /// `break label;`
    Break(Option<String>),

    /// `continue label;`
    Continue(Option<String>),

    /// `throw x;`
    Throw(Expr),

    /// `try { } catch (e) { } finally { }`
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },

    /// `switch (x) { case 1: ... default: ... }`
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },

    /// `label: body`
    Labeled { label: String, body: Box<Stmt> },

    /// `;`
    Empty,

    /// `debugger;`
    Debugger,

    /// `import ... from "m";`
    Import(ImportDecl),

    /// `export ...`
    Export(ExportDecl),
}

/// Declaration keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarations: Vec<VarDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDeclarator {
    pub id: Pattern,
    pub init: Option<Expr>,
    pub span: Span,
}

/// Initializer clause of a classic `for` loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForInit {
    Var(VarDecl),
    Expr(Expr),
}

/// Left side of `for-in` / `for-of`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForHead {
    Var(VarDecl),
    Target(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// `None` for `default:`
    pub test: Option<Expr>,
    pub consequent: Vec<Stmt>,
    pub span: Span,
}

/// Binding pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

impl Pattern {
    pub fn ident(name: impl Into<String>) -> Self {
        Self {
            kind: PatternKind::Ident(name.into()),
            span: Span::dummy(),
        }
    }

    /// All names bound by this pattern, in source order
    pub fn bound_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match &self.kind {
            PatternKind::Ident(name) => names.push(name),
            PatternKind::Array(elements) => {
                for element in elements.iter().flatten() {
                    element.collect_names(names);
                }
            }
            PatternKind::Object(props) => {
                for prop in props {
                    match prop {
                        ObjectPatternProp::KeyValue { value, .. } => value.collect_names(names),
                        ObjectPatternProp::Rest(rest) => rest.collect_names(names),
                    }
                }
            }
            PatternKind::Assign { target, .. } => target.collect_names(names),
            PatternKind::Rest(inner) => inner.collect_names(names),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternKind {
    /// `a`
    Ident(String),
    /// `[a, , b]`
    Array(Vec<Option<Pattern>>),
    /// `{ a, b: c, ...rest }`
    Object(Vec<ObjectPatternProp>),
    /// `a = 1`
    Assign {
        target: Box<Pattern>,
        default: Box<Expr>,
    },
    /// `...rest`
    Rest(Box<Pattern>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectPatternProp {
    KeyValue {
        key: PropKey,
        value: Pattern,
        shorthand: bool,
    },
    Rest(Pattern),
}

/// Function declaration, expression, arrow or method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: NodeId,
    pub name: Option<String>,
    pub params: Vec<Pattern>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub is_async: bool,
    pub is_generator: bool,
    pub span: Span,
}

impl Function {
    /// A synthesized `function () { body }` expression
    pub fn synthetic(body: Vec<Stmt>) -> Self {
        Self {
            id: NodeId::SYNTHETIC,
            name: None,
            params: Vec::new(),
            body: FunctionBody::Block(body),
            is_arrow: false,
            is_async: false,
            is_generator: false,
            span: Span::dummy(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionBody {
    Block(Vec<Stmt>),
    /// Concise arrow body: `x => x + 1`
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub name: Option<String>,
    pub super_class: Option<Box<Expr>>,
    pub members: Vec<ClassMember>,
    pub decorators: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMember {
    pub kind: ClassMemberKind,
    pub decorators: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassMemberKind {
    Method {
        key: PropKey,
        kind: MethodKind,
        is_static: bool,
        function: Box<Function>,
    },
    Field {
        key: PropKey,
        value: Option<Expr>,
        is_static: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImportSpecifier {
    /// `import a from "m"`
    Default(String),
    /// `import * as ns from "m"`
    Namespace(String),
    /// `import { a as b } from "m"`
    Named { imported: String, local: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExportDecl {
    /// `export var a = 1;`, `export function f() {}`
    Declaration(Box<Stmt>),
    /// `export { a as b } from "m";`
    Named {
        specifiers: Vec<ExportSpecifier>,
        source: Option<String>,
    },
    /// `export default expr;`
    DefaultExpr(Expr),
    /// `export default function () {}`
    DefaultFunction(Box<Function>),
    /// `export default class {}`
    DefaultClass(Box<Class>),
    /// `export * from "m";`, `export * as ns from "m";`
    All {
        exported: Option<String>,
        source: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSpecifier {
    pub local: String,
    pub exported: String,
}
