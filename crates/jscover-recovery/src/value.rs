//! Compile-time values and the JavaScript conversions over them

use std::cmp::Ordering;

use jscover_ast::format_number;
use serde_json::{Map, Number};

/// A value known without running the program
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    /// Properties in insertion order
    Object(Vec<(String, Value)>),
}

/// Outcome of constant evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The expression has this value under every execution
    Confident(Value),
    NotConfident,
}

impl Evaluation {
    pub fn is_confident(&self) -> bool {
        matches!(self, Evaluation::Confident(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Evaluation::Confident(value) => Some(value),
            Evaluation::NotConfident => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Evaluation::Confident(value) => Some(value),
            Evaluation::NotConfident => None,
        }
    }
}

impl From<Option<Value>> for Evaluation {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Evaluation::NotConfident, Evaluation::Confident)
    }
}

impl Value {
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Array(_) | Value::Object(_))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn typeof_str(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// `ToNumber` for primitives
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Undefined => Some(f64::NAN),
            Value::Null => Some(0.0),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => Some(*n),
            Value::String(s) => Some(string_to_number(s)),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// `ToString` for primitives
    pub fn to_js_string(&self) -> Option<String> {
        match self {
            Value::Undefined => Some("undefined".to_string()),
            Value::Null => Some("null".to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(format_number(*n)),
            Value::String(s) => Some(s.clone()),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// `ToInt32`
    pub fn to_int32(&self) -> Option<i32> {
        self.to_uint32().map(|n| n as i32)
    }

    /// `ToUint32`
    pub fn to_uint32(&self) -> Option<u32> {
        let n = self.to_number()?;
        if !n.is_finite() {
            return Some(0);
        }
        Some(n.trunc().rem_euclid(4294967296.0) as u32)
    }

    /// `===` over primitives
    pub fn strict_equals(&self, other: &Value) -> Option<bool> {
        if !self.is_primitive() || !other.is_primitive() {
            return None;
        }
        Some(match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self == other,
        })
    }

    /// `==` over primitives
    pub fn loose_equals(&self, other: &Value) -> Option<bool> {
        if !self.is_primitive() || !other.is_primitive() {
            return None;
        }
        Some(match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::Bool(_), _) | (_, Value::Bool(_)) => self.to_number()? == other.to_number()?,
            (Value::String(a), Value::String(b)) => a == b,
            _ => self.to_number()? == other.to_number()?,
        })
    }

    /// Abstract relational comparison; `None` inside means NaN was involved
    pub fn compare(&self, other: &Value) -> Option<Option<Ordering>> {
        if !self.is_primitive() || !other.is_primitive() {
            return None;
        }
        if let (Value::String(a), Value::String(b)) = (self, other) {
            // Strings compare by UTF-16 code unit
            return Some(Some(a.encode_utf16().cmp(b.encode_utf16())));
        }
        Some(self.to_number()?.partial_cmp(&other.to_number()?))
    }

    /// Convert to JSON the way `JSON.stringify` would: non-finite numbers
    /// become `null`, `undefined` properties are dropped and integral
    /// numbers stay integers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(props) => {
                let mut map = Map::new();
                for (key, value) in props {
                    if *value != Value::Undefined {
                        map.insert(key.clone(), value.to_json());
                    }
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

/// Largest integer an f64 holds exactly
const MAX_SAFE_INTEGER: f64 = 9007199254740991.0;

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// `ToNumber` applied to a string
fn string_to_number(s: &str) -> f64 {
    let s = s.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}');
    if s.is_empty() {
        return 0.0;
    }
    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &s[2..];
        if digits.is_empty() {
            return f64::NAN;
        }
        return digits
            .chars()
            .try_fold(0.0f64, |acc, c| c.to_digit(radix).map(|d| acc * radix as f64 + d as f64))
            .unwrap_or(f64::NAN);
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // Rust also accepts "inf" and "nan", JavaScript does not
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x1F"), 31.0);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("12px").is_nan());
    }

    #[test]
    fn test_loose_equality() {
        let null = Value::Null;
        let undefined = Value::Undefined;
        assert_eq!(null.loose_equals(&undefined), Some(true));
        assert_eq!(null.loose_equals(&Value::Number(0.0)), Some(false));
        assert_eq!(
            Value::String("1".into()).loose_equals(&Value::Number(1.0)),
            Some(true)
        );
        assert_eq!(Value::Bool(true).loose_equals(&Value::String("1".into())), Some(true));
        assert_eq!(Value::Array(vec![]).loose_equals(&Value::Null), None);
    }

    #[test]
    fn test_strict_equality() {
        assert_eq!(
            Value::Number(f64::NAN).strict_equals(&Value::Number(f64::NAN)),
            Some(false)
        );
        assert_eq!(Value::Number(0.0).strict_equals(&Value::Number(-0.0)), Some(true));
        assert_eq!(
            Value::String("1".into()).strict_equals(&Value::Number(1.0)),
            Some(false)
        );
    }

    #[test]
    fn test_int32_wraps() {
        assert_eq!(Value::Number(4294967297.0).to_int32(), Some(1));
        assert_eq!(Value::Number(2147483648.0).to_int32(), Some(-2147483648));
        assert_eq!(Value::Number(-1.0).to_uint32(), Some(4294967295));
        assert_eq!(Value::Number(f64::NAN).to_int32(), Some(0));
    }

    #[test]
    fn test_to_json() {
        let value = Value::Object(vec![
            ("s".to_string(), Value::Object(vec![("0".to_string(), Value::Number(0.0))])),
            ("skipped".to_string(), Value::Undefined),
            ("ratio".to_string(), Value::Number(0.5)),
            ("bad".to_string(), Value::Number(f64::INFINITY)),
            ("list".to_string(), Value::Array(vec![Value::Undefined, Value::Bool(true)])),
        ]);
        assert_eq!(
            value.to_json(),
            json!({ "s": { "0": 0 }, "ratio": 0.5, "bad": null, "list": [null, true] })
        );
    }
}
