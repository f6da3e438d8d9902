//! Locating the scope an instrumentation preamble was emitted into

use std::ops::ControlFlow;

use jscover_ast::*;
use jscover_scope::{ScopeCursor, ScopeId, ScopeTree};
use tracing::trace;

use crate::evaluate::evaluate;
use crate::value::{Evaluation, Value};
use crate::{MAGIC_KEY, MAGIC_VALUE};

/// Find the coverage scope: the nearest function (or the program) around the
/// first object property whose key is the marker and whose value provably
/// equals the marker value.
///
/// Properties are checked in pre-order, left to right. A marker whose value
/// cannot be proven, or is some other value, is skipped and the scan goes on.
pub fn find_coverage_scope(program: &Program, tree: &ScopeTree) -> Option<ScopeId> {
    let mut scanner = SentinelScanner {
        tree,
        cursor: tree.cursor(),
    };
    match scanner.visit_program(program) {
        ControlFlow::Break(scope) => Some(scope),
        ControlFlow::Continue(()) => None,
    }
}

struct SentinelScanner<'t, 'a> {
    tree: &'t ScopeTree<'a>,
    cursor: ScopeCursor,
}

impl SentinelScanner<'_, '_> {
    fn is_marker(&self, key: &PropKey, value: &Expr) -> bool {
        // Only a bare identifier key counts; quoted and computed keys do not
        match key {
            PropKey::Ident(name) if name == MAGIC_KEY => {}
            _ => return false,
        }
        match evaluate(value, self.cursor.current(), self.tree) {
            Evaluation::Confident(Value::Number(n)) if n == MAGIC_VALUE => true,
            other => {
                trace!(
                    span = ?value.span,
                    confident = other.is_confident(),
                    "skipping marker candidate"
                );
                false
            }
        }
    }
}

impl<'ast> Visitor<'ast> for SentinelScanner<'_, '_> {
    type Break = ScopeId;

    fn visit_property(&mut self, property: &'ast Property) -> ControlFlow<ScopeId> {
        if let PropertyKind::KeyValue { key, value, .. } = &property.kind {
            if self.is_marker(key, value) {
                let scope = self.cursor.current();
                trace!(?scope, span = ?property.span, "found coverage marker");
                return ControlFlow::Break(scope);
            }
        }
        walk_property(self, property)
    }

    fn visit_function(&mut self, function: &'ast Function) -> ControlFlow<ScopeId> {
        self.cursor.enter_function();
        walk_function(self, function)?;
        self.cursor.exit_function();
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use jscover_parser::{parse, ParseOptions};

    use super::*;

    fn scope_of(source: &str) -> Option<ScopeId> {
        let program = parse(source, &ParseOptions::module()).expect("parse failed");
        let tree = ScopeTree::build(&program);
        find_coverage_scope(&program, &tree)
    }

    #[test]
    fn test_marker_at_program_scope() {
        assert_eq!(scope_of("var o = { __cov__marker: 0xC0FFEE };"), Some(ScopeId::ROOT));
    }

    #[test]
    fn test_marker_inside_function() {
        let source = "function a() {}\nfunction cov() { var d = { __cov__marker: 12648430 }; }";
        assert_eq!(scope_of(source), Some(ScopeId(2)));
    }

    #[test]
    fn test_no_marker() {
        assert_eq!(scope_of("var o = { other: 0xC0FFEE };"), None);
        assert_eq!(scope_of("var o = { __cov__marker: 1 };"), None);
        assert_eq!(scope_of("var o = { [__cov__marker]: 0xC0FFEE };"), None);
    }

    #[test]
    fn test_first_confident_match_wins() {
        let source = "function first() { var a = { __cov__marker: runtime() }; }\n\
                      function second() { var b = { __cov__marker: 0xC0FFEE }; }\n\
                      function third() { var c = { __cov__marker: 0xC0FFEE }; }";
        assert_eq!(scope_of(source), Some(ScopeId(2)));
    }

    #[test]
    fn test_quoted_marker_key_is_skipped() {
        assert_eq!(scope_of("var o = { '__cov__marker': 0xC0FFEE };"), None);
        let source = "function user() { var o = { \"__cov__marker\": 0xC0FFEE }; }\n\
                      var d = { __cov__marker: 0xC0FFEE };";
        assert_eq!(scope_of(source), Some(ScopeId::ROOT));
    }

    #[test]
    fn test_mismatched_marker_value_does_not_stop_scan() {
        let source = "function first() { var a = { __cov__marker: 1 }; }\n\
                      function second() { var b = { __cov__marker: 0xC0FFEE }; }";
        assert_eq!(scope_of(source), Some(ScopeId(2)));
    }

    #[test]
    fn test_marker_value_from_constant_binding() {
        let source = "function f() { var m = 0xC0FFEE; var o = { __cov__marker: m }; }";
        assert_eq!(scope_of(source), Some(ScopeId(1)));
        let source = "function f() { var m = 0xC0FFEE; m = 0; var o = { __cov__marker: m }; }";
        assert_eq!(scope_of(source), None);
    }

    #[test]
    fn test_marker_nested_in_arrow() {
        let source = "var f = () => ({ x: { __cov__marker: 12648430 } });";
        assert_eq!(scope_of(source), Some(ScopeId(1)));
    }
}
