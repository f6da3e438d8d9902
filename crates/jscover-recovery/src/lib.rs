//! jscover Recovery - Static recovery of embedded coverage data
//!
//! An instrumented program carries its own coverage descriptor: a preamble
//! declares `path`, `hash`, `gcv` and `coverageData` next to an object that
//! contains a fixed marker property. When such a program is handed back to
//! the instrumenter nothing new is added, and this crate reads the
//! descriptor back out without executing anything:
//!
//! 1. [`find_coverage_scope`] locates the first property that provably
//!    carries the marker and takes its enclosing function scope
//! 2. [`recover`] evaluates the four bindings declared in that scope with
//!    the constant evaluator in [`evaluate`]
//!
//! Any doubt at either step yields `None` rather than a guess.

mod descriptor;
mod evaluate;
mod recover;
mod sentinel;
mod value;

pub use descriptor::{sanitize, CoverageDescriptor};
pub use evaluate::{evaluate, evaluate_binding};
pub use recover::{
    read_initial_coverage, recover, COVERAGE_DATA_BINDING, GLOBAL_VARIABLE_BINDING, HASH_BINDING,
    PATH_BINDING,
};
pub use sentinel::find_coverage_scope;
pub use value::{Evaluation, Value};

/// Key of the marker property instrumented code always contains
pub const MAGIC_KEY: &str = "__cov__marker";

/// Value of the marker property, `0xC0FFEE`
pub const MAGIC_VALUE: f64 = 12648430.0;
