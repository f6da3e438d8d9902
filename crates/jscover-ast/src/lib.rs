//! jscover AST - Core types for the abstract syntax tree
//!
//! This crate defines the node types for the ECMAScript subset understood by
//! jscover, spans and line/column mapping, a read-only visitor, and the code
//! generator that turns a (possibly rewritten) tree back into source text
//! with an optional source map.

mod span;
mod expr;
mod stmt;
mod visit;
mod printer;
mod sourcemap;

pub use span::*;
pub use expr::*;
pub use stmt::*;
pub use visit::*;
pub use printer::*;
pub use sourcemap::*;

use serde::{Deserialize, Serialize};

/// Parse goal of a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    Script,
    Module,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Script => "script",
            SourceType::Module => "module",
        }
    }
}

/// A complete program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Stmt>,
    /// Comments in source order, kept out of the tree
    pub comments: Vec<Comment>,
    pub source_type: SourceType,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentKind {
    /// `// text`
    Line,
    /// `/* text */`
    Block,
}

/// A source comment; `text` excludes the delimiters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub kind: CommentKind,
    pub text: String,
    pub span: Span,
}

/// Format a number the way `Number.prototype.toString` does
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let formatted = format!("{:e}", n);
        // JS always signs positive exponents
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        };
    }
    if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}
