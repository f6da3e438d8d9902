//! Constant folding over expressions
//!
//! The evaluator answers "what is the value of this expression under every
//! possible execution". Anything it cannot prove, including anything that
//! depends on a call, a property read or a variable that may be reassigned,
//! is `NotConfident`. It never runs code and never mutates the tree.

use std::cmp::Ordering;

use jscover_ast::*;
use jscover_scope::{Binding, ScopeId, ScopeTree};

use crate::value::{Evaluation, Value};

/// Evaluate `expr` as it appears in `scope`
pub fn evaluate(expr: &Expr, scope: ScopeId, tree: &ScopeTree) -> Evaluation {
    Evaluator::new(tree).eval(expr, scope).into()
}

/// Evaluate the initializer of a binding declared in `scope`, applying the
/// same trust rules an identifier reference would
pub fn evaluate_binding<'a>(
    binding: &Binding<'a>,
    scope: ScopeId,
    tree: &ScopeTree<'a>,
) -> Evaluation {
    Evaluator::new(tree).binding_value(binding, scope).into()
}

struct Evaluator<'t, 'a> {
    tree: &'t ScopeTree<'a>,
    /// Bindings whose initializers are being evaluated, to reject cycles
    resolving: Vec<(ScopeId, &'a str)>,
}

impl<'t, 'a> Evaluator<'t, 'a> {
    fn new(tree: &'t ScopeTree<'a>) -> Self {
        Self {
            tree,
            resolving: Vec::new(),
        }
    }

    fn eval(&mut self, expr: &Expr, scope: ScopeId) -> Option<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Some(match literal {
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
            }),
            ExprKind::Ident(name) => self.identifier(name, expr.span, scope),
            ExprKind::Template { quasis, exprs } => {
                let mut out = String::new();
                for (index, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi.cooked.as_deref()?);
                    if let Some(expr) = exprs.get(index) {
                        out.push_str(&self.eval(expr, scope)?.to_js_string()?);
                    }
                }
                Some(Value::String(out))
            }
            ExprKind::Unary { op, operand } => self.unary(*op, operand, scope),
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                binary(*op, &left, &right)
            }
            ExprKind::Logical { op, left, right } => {
                let left = self.eval(left, scope)?;
                let short_circuits = match op {
                    LogicalOp::And => !left.truthy(),
                    LogicalOp::Or => left.truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuits {
                    Some(left)
                } else {
                    self.eval(right, scope)
                }
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            ExprKind::Sequence(exprs) => {
                let mut last = None;
                for expr in exprs {
                    last = Some(self.eval(expr, scope)?);
                }
                last
            }
            ExprKind::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        None => items.push(Value::Undefined),
                        Some(Expr {
                            kind: ExprKind::Spread(_),
                            ..
                        }) => return None,
                        Some(element) => items.push(self.eval(element, scope)?),
                    }
                }
                Some(Value::Array(items))
            }
            ExprKind::Object(props) => self.object(props, scope),
            _ => None,
        }
    }

    /// Resolve a reference through the scope tree. The declared-before-use
    /// check compares spans, so it is a no-op for synthesized nodes with
    /// dummy spans; cycles among those are caught by `resolving` instead.
    fn identifier(&mut self, name: &str, span: Span, scope: ScopeId) -> Option<Value> {
        let tree = self.tree;
        let Some((declared_in, binding)) = tree.lookup(scope, name) else {
            return match name {
                "undefined" => Some(Value::Undefined),
                "NaN" => Some(Value::Number(f64::NAN)),
                "Infinity" => Some(Value::Number(f64::INFINITY)),
                _ => None,
            };
        };
        // Temporal dead zone, or a `var` read before its assignment ran
        if binding.span.end > span.start {
            return None;
        }
        self.binding_value(binding, declared_in)
    }

    fn binding_value(&mut self, binding: &Binding<'a>, scope: ScopeId) -> Option<Value> {
        if !binding.kind.is_variable() || !binding.is_constant() {
            return None;
        }
        let init = binding.init?;
        let key = (scope, binding.name);
        if self.resolving.contains(&key) {
            return None;
        }
        self.resolving.push(key);
        let value = self.eval(init, scope);
        self.resolving.pop();
        value
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr, scope: ScopeId) -> Option<Value> {
        // `delete` has an effect even on a constant operand
        if op == UnaryOp::Delete {
            return None;
        }
        let value = self.eval(operand, scope)?;
        Some(match op {
            UnaryOp::Neg => Value::Number(-value.to_number()?),
            UnaryOp::Plus => Value::Number(value.to_number()?),
            UnaryOp::Not => Value::Bool(!value.truthy()),
            UnaryOp::BitNot => Value::Number(!value.to_int32()? as f64),
            UnaryOp::TypeOf => Value::String(value.typeof_str().to_string()),
            UnaryOp::Void => Value::Undefined,
            UnaryOp::Delete => return None,
        })
    }

    fn object(&mut self, props: &[Property], scope: ScopeId) -> Option<Value> {
        let mut fields: Vec<(String, Value)> = Vec::with_capacity(props.len());
        for prop in props {
            let PropertyKind::KeyValue { key, value, .. } = &prop.kind else {
                return None;
            };
            let key = match key {
                PropKey::Ident(_) | PropKey::String(_) | PropKey::Number(_) => key.static_name()?,
                PropKey::Private(_) | PropKey::Computed(_) => return None,
            };
            // Assigning `__proto__` in a literal changes the prototype
            if key == "__proto__" {
                return None;
            }
            let value = self.eval(value, scope)?;
            match fields.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, slot)) => *slot = value,
                None => fields.push((key, value)),
            }
        }
        Some(Value::Object(fields))
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    if !left.is_primitive() || !right.is_primitive() {
        return None;
    }
    let value = match op {
        BinaryOp::Add => {
            if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                let mut s = left.to_js_string()?;
                s.push_str(&right.to_js_string()?);
                Value::String(s)
            } else {
                Value::Number(left.to_number()? + right.to_number()?)
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number()? - right.to_number()?),
        BinaryOp::Mul => Value::Number(left.to_number()? * right.to_number()?),
        BinaryOp::Div => Value::Number(left.to_number()? / right.to_number()?),
        BinaryOp::Mod => Value::Number(left.to_number()? % right.to_number()?),
        BinaryOp::Exp => Value::Number(js_pow(left.to_number()?, right.to_number()?)),
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)?),
        BinaryOp::Ne => Value::Bool(!left.loose_equals(right)?),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)?),
        BinaryOp::StrictNe => Value::Bool(!left.strict_equals(right)?),
        BinaryOp::Lt => Value::Bool(left.compare(right)? == Some(Ordering::Less)),
        BinaryOp::Gt => Value::Bool(left.compare(right)? == Some(Ordering::Greater)),
        BinaryOp::Le => Value::Bool(matches!(
            left.compare(right)?,
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Ge => Value::Bool(matches!(
            left.compare(right)?,
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::BitAnd => Value::Number((left.to_int32()? & right.to_int32()?) as f64),
        BinaryOp::BitOr => Value::Number((left.to_int32()? | right.to_int32()?) as f64),
        BinaryOp::BitXor => Value::Number((left.to_int32()? ^ right.to_int32()?) as f64),
        BinaryOp::Shl => {
            Value::Number(left.to_int32()?.wrapping_shl(right.to_uint32()? & 31) as f64)
        }
        BinaryOp::Shr => Value::Number((left.to_int32()? >> (right.to_uint32()? & 31)) as f64),
        BinaryOp::UShr => Value::Number((left.to_uint32()? >> (right.to_uint32()? & 31)) as f64),
        // Both depend on the runtime shape of an object
        BinaryOp::In | BinaryOp::InstanceOf => return None,
    };
    Some(value)
}

/// `**` differs from `powf` for a NaN exponent and for `±1 ** ±Infinity`
fn js_pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

#[cfg(test)]
mod tests {
    use jscover_parser::{parse, ParseOptions};
    use pretty_assertions::assert_eq;

    use super::*;

    /// Evaluate the initializer of the last top-level `var`
    fn eval_last(source: &str) -> Evaluation {
        let program = parse(source, &ParseOptions::module()).expect("parse failed");
        let tree = ScopeTree::build(&program);
        let init = program
            .body
            .iter()
            .rev()
            .find_map(|stmt| match &stmt.kind {
                StmtKind::Var(decl) => decl.declarations.last()?.init.as_ref(),
                _ => None,
            })
            .expect("no initializer");
        evaluate(init, tree.root(), &tree)
    }

    fn confident(source: &str) -> Value {
        match eval_last(source) {
            Evaluation::Confident(value) => value,
            Evaluation::NotConfident => panic!("not confident: {}", source),
        }
    }

    fn not_confident(source: &str) {
        assert_eq!(eval_last(source), Evaluation::NotConfident, "{}", source);
    }

    #[test]
    fn test_literals() {
        assert_eq!(confident("var x = 'a';"), Value::String("a".into()));
        assert_eq!(confident("var x = 0xC0FFEE;"), Value::Number(12648430.0));
        assert_eq!(confident("var x = null;"), Value::Null);
        assert_eq!(confident("var x = true;"), Value::Bool(true));
    }

    #[test]
    fn test_operators() {
        assert_eq!(confident("var x = 1 + 2 * 3;"), Value::Number(7.0));
        assert_eq!(confident("var x = 'a' + 1;"), Value::String("a1".into()));
        assert_eq!(confident("var x = -(2 ** 3);"), Value::Number(-8.0));
        assert_eq!(confident("var x = ~5;"), Value::Number(-6.0));
        assert_eq!(confident("var x = 1 << 31;"), Value::Number(-2147483648.0));
        assert_eq!(confident("var x = -1 >>> 28;"), Value::Number(15.0));
        assert_eq!(confident("var x = typeof 'a';"), Value::String("string".into()));
        assert_eq!(confident("var x = void 0;"), Value::Undefined);
        assert_eq!(confident("var x = 'b' > 'a';"), Value::Bool(true));
        assert_eq!(confident("var x = 1 == '1';"), Value::Bool(true));
        assert_eq!(confident("var x = 1 === '1';"), Value::Bool(false));
        assert_eq!(confident("var x = NaN < 1;"), Value::Bool(false));
        assert_eq!(confident("var x = `a${1 + 1}b`;"), Value::String("a2b".into()));
    }

    #[test]
    fn test_short_circuit() {
        // The right side is never evaluated, so it does not matter that it
        // calls a function
        assert_eq!(confident("var x = 0 && f();"), Value::Number(0.0));
        assert_eq!(confident("var x = 'a' || f();"), Value::String("a".into()));
        assert_eq!(confident("var x = null ?? 3;"), Value::Number(3.0));
        assert_eq!(confident("var x = true ? 1 : f();"), Value::Number(1.0));
        not_confident("var x = f() || 1;");
        not_confident("var x = 1 && f();");
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(
            confident("var x = { a: 1, 'b': [2, 'c'], 3: null, a: 4 };"),
            Value::Object(vec![
                ("a".into(), Value::Number(4.0)),
                ("b".into(), Value::Array(vec![Value::Number(2.0), Value::String("c".into())])),
                ("3".into(), Value::Null),
            ])
        );
        not_confident("var x = { [k]: 1 };");
        not_confident("var x = { ...o };");
        not_confident("var x = { m() {} };");
        not_confident("var x = [...xs];");
        not_confident("var x = { __proto__: null };");
    }

    #[test]
    fn test_global_identifiers() {
        assert_eq!(confident("var x = undefined;"), Value::Undefined);
        assert!(confident("var x = NaN;").as_number().unwrap().is_nan());
        assert_eq!(confident("var x = -Infinity;"), Value::Number(f64::NEG_INFINITY));
        not_confident("var x = window;");
        // A local named `undefined` shadows the global
        not_confident("var undefined = g(); var x = undefined;");
    }

    #[test]
    fn test_constant_bindings() {
        assert_eq!(
            confident("var a = 1; const b = a + 1; var x = b * 2;"),
            Value::Number(4.0)
        );
        assert_eq!(
            confident("let s = 'p'; var x = { s };"),
            Value::Object(vec![("s".into(), Value::String("p".into()))])
        );
        not_confident("var a = 1; a = 2; var x = a;");
        not_confident("var a = 1; a++; var x = a;");
        not_confident("var a; var x = a;");
        not_confident("var a = f(); var x = a;");
        not_confident("function a() {} var x = a;");
    }

    /// Evaluate the binding `name` declared at the top level
    fn eval_binding(source: &str, name: &str) -> Evaluation {
        let program = parse(source, &ParseOptions::module()).expect("parse failed");
        let tree = ScopeTree::build(&program);
        let binding = tree.own_binding(tree.root(), name).expect("no such binding");
        evaluate_binding(binding, tree.root(), &tree)
    }

    #[test]
    fn test_reference_before_declaration() {
        assert_eq!(eval_binding("var x = later; var later = 1;", "x"), Evaluation::NotConfident);
        assert_eq!(eval_binding("let x = y; const y = 2;", "x"), Evaluation::NotConfident);
        assert_eq!(
            eval_binding("var later = 1; var x = later;", "x"),
            Evaluation::Confident(Value::Number(1.0))
        );
        not_confident("var x = x;");
    }

    #[test]
    fn test_runtime_dependent_expressions() {
        not_confident("var x = f();");
        not_confident("var x = o.p;");
        not_confident("var x = this;");
        not_confident("var x = new Thing();");
        not_confident("var x = function () {};");
        not_confident("var x = (y = 1);");
        not_confident("var x = 'a' in o;");
        not_confident("var x = [] + 1;");
        not_confident("var x = tag`a`;");
    }

    #[test]
    fn test_cycle_is_not_confident() {
        // Synthesized nodes carry no positions, so only the cycle check
        // stops `var a = b; var b = a;` from recursing forever
        let declare = |name: &str, init: &str| {
            Stmt::synthetic(StmtKind::Var(VarDecl {
                kind: VarKind::Var,
                declarations: vec![VarDeclarator {
                    id: Pattern::ident(name),
                    init: Some(Expr::ident(init)),
                    span: Span::dummy(),
                }],
                span: Span::dummy(),
            }))
        };
        let program = Program {
            body: vec![declare("a", "b"), declare("b", "a")],
            comments: vec![],
            source_type: SourceType::Script,
            span: Span::dummy(),
        };
        let tree = ScopeTree::build(&program);
        let binding = tree.own_binding(tree.root(), "b").unwrap();
        assert_eq!(evaluate_binding(binding, tree.root(), &tree), Evaluation::NotConfident);
    }

    #[test]
    fn test_js_pow_edge_cases() {
        assert!(js_pow(1.0, f64::NAN).is_nan());
        assert!(js_pow(-1.0, f64::INFINITY).is_nan());
        assert_eq!(js_pow(2.0, 10.0), 1024.0);
    }
}
