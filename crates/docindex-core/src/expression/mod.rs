//! Restricted expression language for index definitions.
//!
//! Expressions see exactly two names, `document` and `metadata`, plus the
//! functions of a [`FunctionRegistry`]. There is no assignment, no import and
//! no way to reach anything outside the context, so evaluation is pure.
//!
//! Failures come in two kinds:
//! - [`EvalError::Unresolved`]: a name, attribute or key is not available for
//!   this document. This is the normal way a document falls out of a branch.
//! - [`EvalError::Failed`]: everything else (syntax, types, disallowed or
//!   failing functions).

mod eval;
mod functions;
mod lexer;
mod parser;
pub mod value;

pub use functions::{FunctionRegistry, IndexFunction};
pub use value::render_value;

use crate::models::Document;
use serde_json::{Map, Value};
use thiserror::Error;

/// Outcome of an evaluation that did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A name, attribute or key could not be resolved.
    #[error("{0}")]
    Unresolved(String),
    /// Any other failure.
    #[error("{0}")]
    Failed(String),
}

impl EvalError {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, EvalError::Unresolved(_))
    }
}

/// The immutable namespace an expression is evaluated against.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalContext {
    document: Value,
    metadata: Value,
}

impl EvalContext {
    /// Build the context for one document. Empty metadata values are omitted.
    pub fn for_document(document: &Document) -> Self {
        let metadata = Value::Object(document.metadata_values());

        let mut doc = Map::new();
        doc.insert("id".into(), Value::String(document.id.0.clone()));
        doc.insert("label".into(), Value::String(document.label.clone()));
        doc.insert(
            "file_path".into(),
            document
                .file_path
                .as_ref()
                .map(|p| Value::String(p.to_string_lossy().into_owned()))
                .unwrap_or(Value::Null),
        );
        doc.insert(
            "date_added".into(),
            document
                .date_added
                .map(|d| Value::String(d.to_rfc3339()))
                .unwrap_or(Value::Null),
        );
        doc.insert(
            "extension".into(),
            document.extension().map(Value::String).unwrap_or(Value::Null),
        );
        doc.insert("metadata".into(), metadata.clone());

        Self {
            document: Value::Object(doc),
            metadata,
        }
    }

    /// A context from raw values; useful for previews and tests.
    pub fn from_values(document: Value, metadata: Value) -> Self {
        Self { document, metadata }
    }

    /// Resolve one of the two context names.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match name {
            "document" => Some(&self.document),
            "metadata" => Some(&self.metadata),
            _ => None,
        }
    }
}

/// Parse and evaluate `expression` against `context`.
pub fn evaluate(
    expression: &str,
    context: &EvalContext,
    functions: &FunctionRegistry,
) -> Result<Value, EvalError> {
    let ast = parser::parse(expression)
        .map_err(|message| EvalError::Failed(format!("invalid syntax: {}", message)))?;
    eval::Evaluator::new(context, functions).eval(&ast)
}

/// Check that `expression` parses, without evaluating it.
pub fn check_syntax(expression: &str) -> Result<(), String> {
    parser::parse(expression).map(|_| ())
}
