// pipewright-core/src/expressions.rs
// Constructors for common accumulator and reshaping expressions
//
// These only shape values; nothing here validates operator semantics.

use crate::error::{PipelineError, Result};
use crate::payload::FieldMap;
use serde_json::{json, Value};

/// `{"$first": expr}`
pub fn first(expr: impl Into<Value>) -> Value {
    json!({ "$first": expr.into() })
}

/// `{"$push": expr}`
pub fn push(expr: impl Into<Value>) -> Value {
    json!({ "$push": expr.into() })
}

/// `$push` of a document built from alternating keys and values.
///
/// A single argument is pushed as is. Otherwise the arguments must come in
/// `key, value` pairs with string keys, or `MalformedArguments` is returned.
///
/// ```
/// use pipewright_core::expressions::push_fields;
/// use serde_json::json;
///
/// let pushed = push_fields(vec![
///     json!("category"), json!("$_id.category"),
///     json!("products"), json!("$products"),
/// ])?;
/// assert_eq!(pushed, json!({"$push": {"category": "$_id.category", "products": "$products"}}));
/// # Ok::<(), pipewright_core::PipelineError>(())
/// ```
pub fn push_fields(args: Vec<Value>) -> Result<Value> {
    if args.len() == 1 {
        return Ok(push(args.into_iter().next().unwrap_or(Value::Null)));
    }
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(PipelineError::MalformedArguments(format!(
            "$push expects one expression or an even number of key/value arguments, got {}",
            args.len()
        )));
    }

    let mut fields = FieldMap::new();
    let mut args = args.into_iter();
    while let (Some(key), Some(value)) = (args.next(), args.next()) {
        match key {
            Value::String(key) => {
                fields.insert(key, value);
            }
            other => {
                return Err(PipelineError::MalformedArguments(format!(
                    "$push keys must be strings, got {}",
                    other
                )))
            }
        }
    }
    Ok(json!({ "$push": fields }))
}

/// `{"$arrayToObject": expr}`
pub fn array_to_object(expr: impl Into<Value>) -> Value {
    json!({ "$arrayToObject": expr.into() })
}

/// `$map` over `input`, binding each element to `alias` and emitting `{k, v}`.
///
/// Pairs with [`array_to_object`] to turn an array into a document.
pub fn map_key_value(input: &str, alias: &str, k: impl Into<Value>, v: impl Into<Value>) -> Value {
    json!({
        "$map": {
            "input": input,
            "as": alias,
            "in": { "k": k.into(), "v": v.into() }
        }
    })
}

/// `{"$each": values}`
pub fn each(values: impl Into<Value>) -> Value {
    json!({ "$each": values.into() })
}

/// `{"$addToSet": {...fields}}`
pub fn add_to_set(fields: FieldMap) -> Value {
    json!({ "$addToSet": fields })
}
