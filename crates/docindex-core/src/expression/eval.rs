//! Tree-walking evaluation of a parsed expression.

use super::functions::FunctionRegistry;
use super::parser::{BinaryOp, Expr};
use super::value::{self, is_truthy, type_name};
use super::{EvalContext, EvalError};
use serde_json::Value;
use std::cmp::Ordering;

pub(crate) struct Evaluator<'a> {
    context: &'a EvalContext,
    functions: &'a FunctionRegistry,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(context: &'a EvalContext, functions: &'a FunctionRegistry) -> Self {
        Self { context, functions }
    }

    pub(crate) fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Name(name) => self.lookup(name),
            Expr::Attr(base, attr) => {
                let target = self.eval(base)?;
                attribute(&target, base, attr)
            }
            Expr::Index(base, index) => {
                let target = self.eval(base)?;
                let key = self.eval(index)?;
                subscript(&target, base, &key)
            }
            Expr::Call(name, args) => self.call(name, args),
            Expr::Neg(inner) => value::neg(&self.eval(inner)?).map_err(EvalError::Failed),
            Expr::Not(inner) => Ok(Value::Bool(!is_truthy(&self.eval(inner)?))),
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if is_truthy(&left) {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if is_truthy(&left) {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right).map_err(EvalError::Failed)
            }
            Expr::Conditional {
                then,
                condition,
                otherwise,
            } => {
                if is_truthy(&self.eval(condition)?) {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        if let Some(value) = self.context.get(name) {
            return Ok(value.clone());
        }
        if self.functions.contains(name) {
            return Err(EvalError::Failed(format!(
                "index function '{}' can only be called",
                name
            )));
        }
        Err(EvalError::Unresolved(format!("name '{}' is not defined", name)))
    }

    fn call(&self, name: &str, args: &[Expr]) -> Result<Value, EvalError> {
        let function = self.functions.get(name).ok_or_else(|| {
            EvalError::Failed(format!("'{}' is not an allowed index function", name))
        })?;
        let args = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        function(&args).map_err(|message| EvalError::Failed(format!("{}(): {}", name, message)))
    }
}

fn attribute(target: &Value, base: &Expr, attr: &str) -> Result<Value, EvalError> {
    match target {
        Value::Object(map) => map.get(attr).cloned().ok_or_else(|| {
            EvalError::Unresolved(format!(
                "'{}' has no attribute '{}'",
                base.describe(),
                attr
            ))
        }),
        other => Err(EvalError::Unresolved(format!(
            "'{}' object has no attribute '{}'",
            type_name(other),
            attr
        ))),
    }
}

fn subscript(target: &Value, base: &Expr, key: &Value) -> Result<Value, EvalError> {
    match (target, key) {
        (Value::Object(map), Value::String(k)) => map.get(k).cloned().ok_or_else(|| {
            EvalError::Unresolved(format!("'{}' has no key '{}'", base.describe(), k))
        }),
        (Value::Object(_), other) => Err(EvalError::Failed(format!(
            "mapping keys must be str, not {}",
            type_name(other)
        ))),
        (Value::Array(items), Value::Number(n)) if n.is_i64() => {
            position(n.as_i64().unwrap_or_default(), items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| EvalError::Failed("list index out of range".to_string()))
        }
        (Value::String(s), Value::Number(n)) if n.is_i64() => {
            let chars: Vec<char> = s.chars().collect();
            position(n.as_i64().unwrap_or_default(), chars.len())
                .map(|i| Value::String(chars[i].to_string()))
                .ok_or_else(|| EvalError::Failed("string index out of range".to_string()))
        }
        (Value::Array(_) | Value::String(_), other) => Err(EvalError::Failed(format!(
            "indices must be integers, not {}",
            type_name(other)
        ))),
        (other, _) => Err(EvalError::Failed(format!(
            "'{}' object is not subscriptable",
            type_name(other)
        ))),
    }
}

/// Resolve a possibly negative index against `len`.
fn position(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { len + index } else { index };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    let ordered = |accept: fn(Ordering) -> bool| -> Result<Value, String> {
        value::compare(op.symbol(), left, right).map(|o| Value::Bool(accept(o)))
    };
    match op {
        BinaryOp::Add => value::add(left, right),
        BinaryOp::Sub => value::sub(left, right),
        BinaryOp::Mul => value::mul(left, right),
        BinaryOp::Div => value::div(left, right),
        BinaryOp::Mod => value::rem(left, right),
        BinaryOp::Eq => Ok(Value::Bool(value::equals(left, right))),
        BinaryOp::NotEq => Ok(Value::Bool(!value::equals(left, right))),
        BinaryOp::Lt => ordered(Ordering::is_lt),
        BinaryOp::Le => ordered(Ordering::is_le),
        BinaryOp::Gt => ordered(Ordering::is_gt),
        BinaryOp::Ge => ordered(Ordering::is_ge),
    }
}
