//! Expression AST nodes

use serde::{Deserialize, Serialize};
use crate::{Class, Function, Span};

/// An expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Build an expression with no source location
    pub fn synthetic(kind: ExprKind) -> Self {
        Self {
            kind,
            span: Span::dummy(),
        }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::synthetic(ExprKind::Ident(name.into()))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::synthetic(ExprKind::Literal(Literal::String(value.into())))
    }

    pub fn number(value: f64) -> Self {
        Self::synthetic(ExprKind::Literal(Literal::Number(value)))
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Literal value: `42`, `"hello"`, `true`, `null`
    Literal(Literal),

    /// Identifier: `x`, `undefined`
    Ident(String),

    /// `this`
    This,

    /// `super`, only valid as a callee or member object
    Super,

    /// Array literal: `[1, , 3]`, `None` marks a hole
    Array(Vec<Option<Expr>>),

    /// Object literal: `{ a: 1, b, [k]: v, m() {} }`
    Object(Vec<Property>),

    /// Function expression: `function f(a) { ... }`
    Function(Box<Function>),

    /// Arrow function: `(a) => a + 1`
    Arrow(Box<Function>),

    /// Class expression: `class extends B { ... }`
    Class(Box<Class>),

    /// Template literal: `` `a${b}c` ``, `quasis` has one more element than `exprs`
    Template {
        quasis: Vec<TemplateQuasi>,
        exprs: Vec<Expr>,
    },

    /// Tagged template: `` tag`a${b}` ``, `quasi` is always a `Template`
    TaggedTemplate {
        tag: Box<Expr>,
        quasi: Box<Expr>,
    },

    /// Unary operation: `!x`, `typeof y`
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// Update: `i++`, `--j`
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
    },

    /// Binary operation: `a + b`, `x === y`
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Logical operation: `a && b`, `a ?? b`
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Assignment: `x = 5`, `x += 1`
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },

    /// Conditional: `test ? a : b`
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    /// Function call: `foo(a, b)`, `foo?.(a)`
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        optional: bool,
    },

    /// Constructor call: `new Foo(a)`
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    /// Member access: `a.b`, `a[b]`, `a?.b`
    Member {
        object: Box<Expr>,
        property: MemberProp,
        optional: bool,
    },

    /// Comma sequence: `a, b, c`
    Sequence(Vec<Expr>),

    /// Spread element in arrays and call arguments: `...xs`
    Spread(Box<Expr>),

    /// `await x`
    Await(Box<Expr>),

    /// `yield x`, `yield* xs`
    Yield {
        argument: Option<Box<Expr>>,
        delegate: bool,
    },
}

/// Static part of a template literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateQuasi {
    /// Text as written, escapes intact
    pub raw: String,
    /// Text with escapes processed; `None` when an escape is malformed
    pub cooked: Option<String>,
}

/// A literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// Member property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberProp {
    /// `a.name`
    Ident(String),
    /// `a.#name`
    Private(String),
    /// `a[expr]`
    Computed(Box<Expr>),
}

/// Object literal property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub kind: PropertyKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyKind {
    /// `key: value`, or `key` when shorthand
    KeyValue {
        key: PropKey,
        value: Expr,
        shorthand: bool,
    },
    /// `m() {}`, `get x() {}`, `set x(v) {}`
    Method {
        key: PropKey,
        kind: MethodKind,
        function: Box<Function>,
    },
    /// `...rest`
    Spread(Expr),
}

/// Property key in object literals and class bodies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropKey {
    Ident(String),
    String(String),
    Number(f64),
    Private(String),
    Computed(Box<Expr>),
}

impl PropKey {
    /// Static name of the key, if it is not computed
    pub fn static_name(&self) -> Option<String> {
        match self {
            PropKey::Ident(name) | PropKey::String(name) => Some(name.clone()),
            PropKey::Number(n) => Some(crate::format_number(*n)),
            PropKey::Private(name) => Some(format!("#{}", name)),
            PropKey::Computed(_) => None,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, PropKey::Computed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodKind {
    Method,
    Get,
    Set,
    Constructor,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    TypeOf,
    Void,
    Delete,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::TypeOf => "typeof",
            UnaryOp::Void => "void",
            UnaryOp::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,

    // Comparison
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,

    // Relational keywords
    In,
    InstanceOf,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Exp => "**",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::In => "in",
            BinaryOp::InstanceOf => "instanceof",
        }
    }

    /// Binding power, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::BitOr => 4,
            BinaryOp::BitXor => 5,
            BinaryOp::BitAnd => 6,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::StrictEq | BinaryOp::StrictNe => 7,
            BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::In
            | BinaryOp::InstanceOf => 8,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 9,
            BinaryOp::Add | BinaryOp::Sub => 10,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 11,
            BinaryOp::Exp => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

impl LogicalOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
            LogicalOp::Nullish => "??",
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            LogicalOp::Nullish => 1,
            LogicalOp::Or => 2,
            LogicalOp::And => 3,
        }
    }
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Nullish,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
            AssignOp::Exp => "**=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
            AssignOp::UShr => ">>>=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
            AssignOp::And => "&&=",
            AssignOp::Or => "||=",
            AssignOp::Nullish => "??=",
        }
    }
}
