//! Constructors for the synthesized nodes instrumentation inserts
//!
//! Everything built here has a dummy span, so the code generator neither
//! maps it back to the original source nor attaches original comments to it.

use jscover_ast::*;
use serde_json::{Map, Value as JsonValue};

use jscover_recovery::{MAGIC_KEY, MAGIC_VALUE};

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::synthetic(ExprKind::Call {
        callee: Box::new(callee),
        args,
        optional: false,
    })
}

pub fn member(object: Expr, name: &str) -> Expr {
    Expr::synthetic(ExprKind::Member {
        object: Box::new(object),
        property: MemberProp::Ident(name.to_string()),
        optional: false,
    })
}

pub fn index(object: Expr, property: Expr) -> Expr {
    Expr::synthetic(ExprKind::Member {
        object: Box::new(object),
        property: MemberProp::Computed(Box::new(property)),
        optional: false,
    })
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    Expr::synthetic(ExprKind::Assign {
        op: AssignOp::Assign,
        target: Box::new(target),
        value: Box::new(value),
    })
}

pub fn var(name: &str, init: Expr) -> Stmt {
    Stmt::synthetic(StmtKind::Var(VarDecl {
        kind: VarKind::Var,
        declarations: vec![VarDeclarator {
            id: Pattern::ident(name),
            init: Some(init),
            span: Span::dummy(),
        }],
        span: Span::dummy(),
    }))
}

/// `cov_xxx().s[3]++`, `cov_xxx().b[1][0]++`
pub fn counter(cov_name: &str, map: &str, indices: &[usize]) -> Expr {
    let mut target = member(call(Expr::ident(cov_name), vec![]), map);
    for &i in indices {
        target = index(target, Expr::number(i as f64));
    }
    Expr::synthetic(ExprKind::Update {
        op: UpdateOp::Increment,
        prefix: false,
        target: Box::new(target),
    })
}

/// `(counter, expr)`, keeping the wrapped expression's span on the sequence
pub fn with_counter(counter: Expr, expr: Expr) -> Expr {
    let span = expr.span;
    Expr::new(ExprKind::Sequence(vec![counter, expr]), span)
}

/// Object key, unquoted when it is a valid identifier name
fn prop_key(key: &str) -> PropKey {
    let mut chars = key.chars();
    let is_ident = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_ident {
        PropKey::Ident(key.to_string())
    } else {
        PropKey::String(key.to_string())
    }
}

/// A JSON value as a literal expression
pub fn json_to_expr(value: &JsonValue) -> Expr {
    match value {
        JsonValue::Null => Expr::synthetic(ExprKind::Literal(Literal::Null)),
        JsonValue::Bool(b) => Expr::synthetic(ExprKind::Literal(Literal::Bool(*b))),
        JsonValue::Number(n) => {
            let n = n.as_f64().unwrap_or(f64::NAN);
            if n < 0.0 {
                Expr::synthetic(ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(Expr::number(-n)),
                })
            } else {
                Expr::number(n)
            }
        }
        JsonValue::String(s) => Expr::string(s.as_str()),
        JsonValue::Array(items) => {
            Expr::synthetic(ExprKind::Array(items.iter().map(|v| Some(json_to_expr(v))).collect()))
        }
        JsonValue::Object(map) => object_literal(map),
    }
}

pub fn object_literal(map: &Map<String, JsonValue>) -> Expr {
    let props = map
        .iter()
        .map(|(key, value)| Property {
            kind: PropertyKind::KeyValue {
                key: prop_key(key),
                value: json_to_expr(value),
                shorthand: false,
            },
            span: Span::dummy(),
        })
        .collect();
    Expr::synthetic(ExprKind::Object(props))
}

/// The coverage object with the marker property in front
pub fn marked_object_literal(map: &Map<String, JsonValue>) -> Expr {
    let mut expr = object_literal(map);
    if let ExprKind::Object(props) = &mut expr.kind {
        props.insert(
            0,
            Property {
                kind: PropertyKind::KeyValue {
                    key: PropKey::Ident(MAGIC_KEY.to_string()),
                    value: Expr::number(MAGIC_VALUE),
                    shorthand: false,
                },
                span: Span::dummy(),
            },
        );
    }
    expr
}
