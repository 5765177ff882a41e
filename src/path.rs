//! Dot-path traversal over JSON values.
//!
//! Two flavours exist: context paths, where arrays are searched by element
//! `key` and every miss is an error, and rule-data paths, where arrays are
//! indexed numerically and any miss simply yields `None`.

use serde_json::Value;

use crate::errors::{NotationError, Result};

/// Split `a.b.c` into segments; empty segments are rejected.
pub fn split_path<'a>(expr: &str, path: &'a str) -> Result<Vec<&'a str>> {
    let segments: Vec<&str> = path.split('.').map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(NotationError::reference(expr, "empty path segment"));
    }
    Ok(segments)
}

/// Walk a context path. `expr` is the full expression, used in errors.
pub fn traverse<'v>(root: &'v Value, segments: &[&str], expr: &str) -> Result<&'v Value> {
    let mut current = root;
    for (depth, seg) in segments.iter().enumerate() {
        current = match current {
            Value::Object(map) => map.get(*seg).ok_or_else(|| {
                NotationError::reference(
                    expr,
                    format!("no property '{seg}' at '{}'", segments[..depth].join(".")),
                )
            })?,
            Value::Array(items) => find_by_key(items, seg).ok_or_else(|| {
                NotationError::reference(
                    expr,
                    format!(
                        "no element with key '{seg}' in '{}'",
                        segments[..depth].join(".")
                    ),
                )
            })?,
            other => {
                return Err(NotationError::reference(
                    expr,
                    format!("cannot read '{seg}' of {}", type_name(other)),
                ))
            }
        };
    }
    Ok(current)
}

/// Array element whose `key` equals `key` (strings or numbers).
pub fn find_by_key<'v>(items: &'v [Value], key: &str) -> Option<&'v Value> {
    items.iter().find(|item| match item.get("key") {
        Some(Value::String(s)) => s == key,
        Some(Value::Number(n)) => n.to_string() == key,
        _ => false,
    })
}

/// Walk a rule-data path: object keys and numeric array indexes.
pub fn traverse_indexed<'v>(root: &'v Value, segments: &[&str]) -> Option<&'v Value> {
    let mut current = root;
    for seg in segments {
        current = match current {
            Value::Object(map) => map.get(*seg)?,
            Value::Array(items) => {
                let idx = seg.parse::<usize>().ok()?;
                items.get(idx)?
            }
            _ => return None,
        };
        if current.is_null() {
            return None;
        }
    }
    Some(current)
}

pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
