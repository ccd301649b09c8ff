//! Registry of functions that index expressions may call.

use super::value::{render_value, type_name};
use crate::slug::{proper_name, slugify};
use chrono::{DateTime, Datelike, NaiveDate};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Signature of an index function. Errors are plain messages; the evaluator
/// reports them as evaluation failures.
pub type IndexFunction = fn(args: &[Value]) -> Result<Value, String>;

/// The whitelist of callable names visible to expressions.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, IndexFunction>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FunctionRegistry {
    /// An empty registry: expressions can only read `document` and `metadata`.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in index functions.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("str", fn_str);
        registry.register("int", fn_int);
        registry.register("len", fn_len);
        registry.register("lower", fn_lower);
        registry.register("upper", fn_upper);
        registry.register("title", fn_title);
        registry.register("strip", fn_strip);
        registry.register("slugify", fn_slugify);
        registry.register("proper_name", fn_proper_name);
        registry.register("concat", fn_concat);
        registry.register("substring", fn_substring);
        registry.register("year", fn_year);
        registry.register("month", fn_month);
        registry.register("day", fn_day);
        registry.register("default", fn_default);
        registry
    }

    /// Add or replace a function. Returns the replaced one, if any.
    pub fn register(&mut self, name: impl Into<String>, function: IndexFunction) -> Option<IndexFunction> {
        self.functions.insert(name.into(), function)
    }

    /// Keep only the named functions. Unknown names are logged and skipped.
    pub fn restrict<S: AsRef<str>>(mut self, allowed: &[S]) -> Self {
        for name in allowed {
            if !self.functions.contains_key(name.as_ref()) {
                warn!("Allowed index function '{}' is not registered", name.as_ref());
            }
        }
        self.functions
            .retain(|name, _| allowed.iter().any(|a| a.as_ref() == name));
        self
    }

    pub fn get(&self, name: &str) -> Option<IndexFunction> {
        self.functions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

fn arity(args: &[Value], min: usize, max: usize) -> Result<(), String> {
    if args.len() < min || args.len() > max {
        if min == max {
            return Err(format!("expected {} argument(s), got {}", min, args.len()));
        }
        return Err(format!(
            "expected {} to {} arguments, got {}",
            min,
            max,
            args.len()
        ));
    }
    Ok(())
}

fn string_arg(args: &[Value], index: usize) -> Result<&str, String> {
    match &args[index] {
        Value::String(s) => Ok(s),
        other => Err(format!(
            "argument {} must be str, not {}",
            index + 1,
            type_name(other)
        )),
    }
}

fn int_arg(args: &[Value], index: usize) -> Result<i64, String> {
    args[index].as_i64().ok_or_else(|| {
        format!(
            "argument {} must be int, not {}",
            index + 1,
            type_name(&args[index])
        )
    })
}

fn fn_str(args: &[Value]) -> Result<Value, String> {
    arity(args, 1, 1)?;
    Ok(Value::String(render_value(&args[0])))
}

fn fn_int(args: &[Value]) -> Result<Value, String> {
    arity(args, 1, 1)?;
    match &args[0] {
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("invalid literal for int(): '{}'", s)),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .map(Value::from)
            .ok_or_else(|| "number out of range".to_string()),
        Value::Bool(b) => Ok(Value::from(i64::from(*b))),
        other => Err(format!(
            "int() argument must be a string or a number, not '{}'",
            type_name(other)
        )),
    }
}

fn fn_len(args: &[Value]) -> Result<Value, String> {
    arity(args, 1, 1)?;
    match &args[0] {
        Value::String(s) => Ok(Value::from(s.chars().count() as i64)),
        Value::Array(a) => Ok(Value::from(a.len() as i64)),
        Value::Object(o) => Ok(Value::from(o.len() as i64)),
        other => Err(format!("object of type '{}' has no len()", type_name(other))),
    }
}

fn fn_lower(args: &[Value]) -> Result<Value, String> {
    arity(args, 1, 1)?;
    Ok(Value::String(string_arg(args, 0)?.to_lowercase()))
}

fn fn_upper(args: &[Value]) -> Result<Value, String> {
    arity(args, 1, 1)?;
    Ok(Value::String(string_arg(args, 0)?.to_uppercase()))
}

fn fn_title(args: &[Value]) -> Result<Value, String> {
    arity(args, 1, 1)?;
    let mut out = String::new();
    let mut start_of_word = true;
    for c in string_arg(args, 0)?.chars() {
        if c.is_alphabetic() {
            if start_of_word {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            start_of_word = false;
        } else {
            out.push(c);
            start_of_word = true;
        }
    }
    Ok(Value::String(out))
}

fn fn_strip(args: &[Value]) -> Result<Value, String> {
    arity(args, 1, 1)?;
    Ok(Value::String(string_arg(args, 0)?.trim().to_string()))
}

fn fn_slugify(args: &[Value]) -> Result<Value, String> {
    arity(args, 1, 1)?;
    Ok(Value::String(slugify(string_arg(args, 0)?)))
}

fn fn_proper_name(args: &[Value]) -> Result<Value, String> {
    arity(args, 1, 1)?;
    Ok(Value::String(proper_name(string_arg(args, 0)?)))
}

fn fn_concat(args: &[Value]) -> Result<Value, String> {
    Ok(Value::String(args.iter().map(render_value).collect()))
}

fn fn_substring(args: &[Value]) -> Result<Value, String> {
    arity(args, 2, 3)?;
    let chars: Vec<char> = string_arg(args, 0)?.chars().collect();
    let len = chars.len() as i64;
    let clamp = |i: i64| -> usize {
        let i = if i < 0 { len + i } else { i };
        i.clamp(0, len) as usize
    };
    let start = clamp(int_arg(args, 1)?);
    let end = if args.len() == 3 {
        clamp(int_arg(args, 2)?)
    } else {
        chars.len()
    };
    if start >= end {
        return Ok(Value::String(String::new()));
    }
    Ok(Value::String(chars[start..end].iter().collect()))
}

fn parse_date(value: &Value) -> Result<NaiveDate, String> {
    let s = match value {
        Value::String(s) => s.trim(),
        other => return Err(format!("expected a date string, not {}", type_name(other))),
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| format!("unrecognized date '{}'", s))
}

fn fn_year(args: &[Value]) -> Result<Value, String> {
    arity(args, 1, 1)?;
    Ok(Value::from(i64::from(parse_date(&args[0])?.year())))
}

fn fn_month(args: &[Value]) -> Result<Value, String> {
    arity(args, 1, 1)?;
    Ok(Value::from(i64::from(parse_date(&args[0])?.month())))
}

fn fn_day(args: &[Value]) -> Result<Value, String> {
    arity(args, 1, 1)?;
    Ok(Value::from(i64::from(parse_date(&args[0])?.day())))
}

fn fn_default(args: &[Value]) -> Result<Value, String> {
    arity(args, 2, 2)?;
    match &args[0] {
        Value::Null => Ok(args[1].clone()),
        Value::String(s) if s.is_empty() => Ok(args[1].clone()),
        other => Ok(other.clone()),
    }
}
