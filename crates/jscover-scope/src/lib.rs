//! jscover Scope - Function-level scope analysis
//!
//! Builds an arena of scopes for a parsed program: one program scope plus
//! one scope per function, each holding the names declared directly in it.
//! Every binding remembers its initializer (when it has a simple one) and
//! how many times the program writes to it after declaring it, which is
//! what constant evaluation needs to trust a variable's value.
//!
//! # Example
//!
//! ```ignore
//! use jscover_parser::{parse, ParseOptions};
//! use jscover_scope::ScopeTree;
//!
//! let program = parse("var a = 1; function f() { a = 2; }", &ParseOptions::default()).unwrap();
//! let tree = ScopeTree::build(&program);
//! let binding = tree.own_binding(tree.root(), "a").unwrap();
//! assert_eq!(binding.constant_violations, 1);
//! ```

mod builder;
mod scope;

pub use scope::{Binding, BindingKind, Scope, ScopeCursor, ScopeId, ScopeKind, ScopeTree};
