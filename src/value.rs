//! Probing of loosely-typed entity records by conventional field names.

use serde_json::Value;

use crate::format::format_number;

/// Numeric view of a value: a bare number or numeric string, else the
/// first of `total`, `value`, `base`, `min` found on the nested `value`
/// object, then on the object itself. `prefer_base` moves `base` first.
pub fn extract_number(v: &Value, prefer_base: bool) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace('\u{2212}', "-").parse::<f64>().ok(),
        Value::Object(map) => {
            if let Some(inner) = map.get("value") {
                match inner {
                    Value::Number(n) if !prefer_base => return n.as_f64(),
                    Value::Object(_) => {
                        if let Some(n) = probe(inner, prefer_base) {
                            return Some(n);
                        }
                    }
                    _ => {}
                }
            }
            probe(v, prefer_base)
        }
        _ => None,
    }
}

fn probe(v: &Value, prefer_base: bool) -> Option<f64> {
    let order: &[&str] = if prefer_base {
        &["base", "total", "value", "min"]
    } else {
        &["total", "value", "base", "min"]
    };
    order
        .iter()
        .find_map(|field| v.get(*field).and_then(Value::as_f64))
}

pub fn field_str<'a>(v: &'a Value, field: &str) -> Option<&'a str> {
    v.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// `display` → `name` → `key`, for list and reference rendering.
pub fn display_label(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(_) => extract_number(v, false).map(format_number),
        Value::Object(_) => field_str(v, "display")
            .or_else(|| field_str(v, "name"))
            .or_else(|| field_str(v, "key"))
            .map(str::to_string),
        _ => None,
    }
}

/// Plain-text rendering of a resolved reference.
pub fn stringify(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(_) => extract_number(v, false)
            .map(format_number)
            .unwrap_or_default(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(stringify)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => display_label(v)
            .or_else(|| extract_number(v, false).map(format_number))
            .unwrap_or_else(|| v.to_string()),
    }
}

/// JSON number for `n`; integral values are stored as integers.
pub fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// A string as JSON: numeric text becomes a number.
pub fn from_text(s: &str) -> Value {
    let trimmed = s.trim();
    match trimmed.replace('\u{2212}', "-").parse::<f64>() {
        Ok(n) if !trimmed.is_empty() => serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(s.to_string())),
        _ => Value::String(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integral_numbers_stay_integers() {
        assert_eq!(number(6.0), json!(6));
        assert_eq!(number(2.5), json!(2.5));
        assert_eq!(number(f64::NAN), Value::Null);
    }

    #[test]
    fn value_priority() {
        let e = json!({"value": {"base": 2, "total": 3}});
        assert_eq!(extract_number(&e, false), Some(3.0));
        assert_eq!(extract_number(&e, true), Some(2.0));
        assert_eq!(extract_number(&json!({"value": {"min": 1}}), false), Some(1.0));
        assert_eq!(extract_number(&json!({"value": 4}), false), Some(4.0));
        assert_eq!(extract_number(&json!({"base": 1, "total": 5}), false), Some(5.0));
        assert_eq!(extract_number(&json!("\u{2212}2"), false), Some(-2.0));
        assert_eq!(extract_number(&json!({"name": "x"}), false), None);
    }

    #[test]
    fn labels() {
        assert_eq!(
            display_label(&json!({"display": "Allies (Police)", "name": "Allies"})).as_deref(),
            Some("Allies (Police)")
        );
        assert_eq!(display_label(&json!({"key": "allies"})).as_deref(), Some("allies"));
        assert_eq!(stringify(&json!(["a", 2])), "a, 2");
        assert_eq!(stringify(&json!(2.0)), "2");
    }

    #[test]
    fn text_to_value() {
        assert_eq!(from_text("3"), json!(3.0));
        assert_eq!(from_text("fire"), json!("fire"));
        assert_eq!(from_text(""), json!(""));
    }
}
