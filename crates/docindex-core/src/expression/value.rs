//! Operations on expression values (`serde_json::Value`).

use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Python-style type name used in error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Render a value as the text stored on an index instance.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => render_number(n),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e16 => format!("{:.1}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Numeric view: integers stay integers so arithmetic can stay exact.
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            Value::Number(n) => n
                .as_i64()
                .map(Num::Int)
                .or_else(|| n.as_f64().map(Num::Float)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

fn float(f: f64) -> Result<Value, String> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| "arithmetic produced a non-finite number".to_string())
}

fn unsupported(op: &str, left: &Value, right: &Value) -> String {
    format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        type_name(left),
        type_name(right)
    )
}

pub fn add(left: &Value, right: &Value) -> Result<Value, String> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        (Value::Array(a), Value::Array(b)) => {
            Ok(Value::Array(a.iter().chain(b.iter()).cloned().collect()))
        }
        _ => match (Num::of(left), Num::of(right)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => a
                .checked_add(b)
                .map(Value::from)
                .ok_or_else(|| "integer overflow".to_string()),
            (Some(a), Some(b)) => float(a.as_f64() + b.as_f64()),
            _ => Err(unsupported("+", left, right)),
        },
    }
}

pub fn sub(left: &Value, right: &Value) -> Result<Value, String> {
    match (Num::of(left), Num::of(right)) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => a
            .checked_sub(b)
            .map(Value::from)
            .ok_or_else(|| "integer overflow".to_string()),
        (Some(a), Some(b)) => float(a.as_f64() - b.as_f64()),
        _ => Err(unsupported("-", left, right)),
    }
}

pub fn mul(left: &Value, right: &Value) -> Result<Value, String> {
    match (Num::of(left), Num::of(right)) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => a
            .checked_mul(b)
            .map(Value::from)
            .ok_or_else(|| "integer overflow".to_string()),
        (Some(a), Some(b)) => float(a.as_f64() * b.as_f64()),
        _ => Err(unsupported("*", left, right)),
    }
}

/// True division: the result is always a float.
pub fn div(left: &Value, right: &Value) -> Result<Value, String> {
    match (Num::of(left), Num::of(right)) {
        (Some(a), Some(b)) => {
            if b.as_f64() == 0.0 {
                return Err("division by zero".to_string());
            }
            float(a.as_f64() / b.as_f64())
        }
        _ => Err(unsupported("/", left, right)),
    }
}

/// Modulo with the sign of the divisor, as in Python.
pub fn rem(left: &Value, right: &Value) -> Result<Value, String> {
    match (Num::of(left), Num::of(right)) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => {
            if b == 0 {
                return Err("integer modulo by zero".to_string());
            }
            let r = a.wrapping_rem(b);
            Ok(Value::from(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
        }
        (Some(a), Some(b)) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            if b == 0.0 {
                return Err("float modulo".to_string());
            }
            let r = a % b;
            float(if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r })
        }
        _ => Err(unsupported("%", left, right)),
    }
}

pub fn neg(value: &Value) -> Result<Value, String> {
    match Num::of(value) {
        Some(Num::Int(i)) => i
            .checked_neg()
            .map(Value::from)
            .ok_or_else(|| "integer overflow".to_string()),
        Some(Num::Float(f)) => float(-f),
        None => Err(format!("bad operand type for unary -: '{}'", type_name(value))),
    }
}

/// Equality with numeric cross-comparison (`1 == 1.0`).
pub fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_) | Value::Bool(_), Value::Number(_) | Value::Bool(_)) => {
            match (Num::of(left), Num::of(right)) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => a == b,
                (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
                _ => false,
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equals(x, y))
        }
        _ => left == right,
    }
}

/// Ordering for `< <= > >=`; only numbers with numbers and strings with strings.
pub fn compare(op: &str, left: &Value, right: &Value) -> Result<Ordering, String> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        _ => match (Num::of(left), Num::of(right)) {
            (Some(a), Some(b)) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .ok_or_else(|| "cannot order NaN".to_string()),
            _ => Err(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                op,
                type_name(left),
                type_name(right)
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!("Invoices")), "Invoices");
        assert_eq!(render_value(&json!(2024)), "2024");
        assert_eq!(render_value(&json!(2.0)), "2.0");
        assert_eq!(render_value(&json!(2.5)), "2.5");
        assert_eq!(render_value(&json!(true)), "True");
        assert_eq!(render_value(&Value::Null), "");
        assert_eq!(render_value(&json!(["a", 1])), r#"["a",1]"#);
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!(0.5)));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(add(&json!(1), &json!(2)).unwrap(), json!(3));
        assert_eq!(add(&json!("a"), &json!("b")).unwrap(), json!("ab"));
        assert_eq!(div(&json!(7), &json!(2)).unwrap(), json!(3.5));
        assert_eq!(rem(&json!(-7), &json!(3)).unwrap(), json!(2));
        assert_eq!(neg(&json!(4)).unwrap(), json!(-4));
        assert!(add(&json!("a"), &json!(1)).is_err());
        assert_eq!(div(&json!(1), &json!(0)).unwrap_err(), "division by zero");
        assert_eq!(add(&json!(i64::MAX), &json!(1)).unwrap_err(), "integer overflow");
    }

    #[test]
    fn test_equality_and_ordering() {
        assert!(equals(&json!(1), &json!(1.0)));
        assert!(!equals(&json!("1"), &json!(1)));
        assert_eq!(compare("<", &json!("a"), &json!("b")).unwrap(), Ordering::Less);
        assert_eq!(compare(">", &json!(3), &json!(2.5)).unwrap(), Ordering::Greater);
        assert!(compare("<", &json!("a"), &json!(1)).is_err());
    }
}
