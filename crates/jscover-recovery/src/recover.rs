//! Rebuilding the coverage descriptor of an already-instrumented program

use jscover_ast::Program;
use jscover_scope::{ScopeId, ScopeTree};
use tracing::debug;

use crate::descriptor::CoverageDescriptor;
use crate::evaluate::evaluate_binding;
use crate::sentinel::find_coverage_scope;
use crate::value::Value;

/// Names the instrumentation preamble declares in the coverage scope
pub const PATH_BINDING: &str = "path";
pub const HASH_BINDING: &str = "hash";
pub const GLOBAL_VARIABLE_BINDING: &str = "gcv";
pub const COVERAGE_DATA_BINDING: &str = "coverageData";

/// Recover the coverage descriptor embedded in `program`, if it has one.
///
/// Returns `None` unless every piece can be proven statically.
pub fn read_initial_coverage(program: &Program) -> Option<CoverageDescriptor> {
    let tree = ScopeTree::build(program);
    recover(program, &tree)
}

/// Same as [`read_initial_coverage`] with a scope tree already built for
/// `program`
pub fn recover(program: &Program, tree: &ScopeTree) -> Option<CoverageDescriptor> {
    let Some(scope) = find_coverage_scope(program, tree) else {
        debug!("no coverage marker found");
        return None;
    };
    debug!(?scope, "found coverage scope");

    let path = own_value(tree, scope, PATH_BINDING)?;
    let hash = own_value(tree, scope, HASH_BINDING)?;
    let gcv = own_value(tree, scope, GLOBAL_VARIABLE_BINDING)?;
    let coverage_data = own_value(tree, scope, COVERAGE_DATA_BINDING)?;

    let (Value::String(path), Value::String(hash), Value::String(gcv)) = (path, hash, gcv) else {
        debug!("path, hash or gcv is not a string");
        return None;
    };
    let serde_json::Value::Object(coverage_data) = coverage_data.to_json() else {
        debug!("coverage data is not an object");
        return None;
    };
    Some(CoverageDescriptor::new(path, hash, gcv, coverage_data))
}

/// Confident value of a binding declared directly in `scope`
fn own_value(tree: &ScopeTree, scope: ScopeId, name: &str) -> Option<Value> {
    let Some(binding) = tree.own_binding(scope, name) else {
        debug!(name, "coverage scope lacks binding");
        return None;
    };
    let value = evaluate_binding(binding, scope, tree).into_value();
    if value.is_none() {
        debug!(name, "binding is not a provable constant");
    }
    value
}
