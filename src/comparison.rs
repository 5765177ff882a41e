use std::cmp::Ordering;

use serde_json::Value;

/// Loose ordering between two JSON values.
///
/// Numbers and numeric strings compare numerically, strings compare
/// case-insensitively, everything else falls back to its serialized form.
pub fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(sa), Value::String(sb)) => {
            match (sa.trim().parse::<f64>(), sb.trim().parse::<f64>()) {
                (Ok(da), Ok(db)) => cmp_f64(da, db),
                _ => sa.to_lowercase().cmp(&sb.to_lowercase()),
            }
        }
        (Value::Number(na), Value::Number(nb)) => match (na.as_f64(), nb.as_f64()) {
            (Some(da), Some(db)) => cmp_f64(da, db),
            _ => na.to_string().cmp(&nb.to_string()),
        },
        (Value::Bool(ba), Value::Bool(bb)) => ba.cmp(bb),
        (Value::Number(na), Value::String(sb)) => match (na.as_f64(), sb.trim().parse::<f64>()) {
            (Some(da), Ok(db)) => cmp_f64(da, db),
            _ => a.to_string().cmp(&b.to_string()),
        },
        (Value::String(_), Value::Number(_)) => cmp_values(b, a).reverse(),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn cmp_f64(da: f64, db: f64) -> Ordering {
    if (da - db).abs() < f64::EPSILON {
        Ordering::Equal
    } else if da < db {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

pub fn loose_eq(a: &Value, b: &Value) -> bool {
    cmp_values(a, b) == Ordering::Equal
}

/// Membership test used by IFIN/IFNOTIN.
///
/// Arrays match an equal element or an element whose `key` equals the
/// needle; objects match on key presence.
pub fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| {
            loose_eq(item, needle)
                || item
                    .get("key")
                    .map(|key| loose_eq(key, needle))
                    .unwrap_or(false)
        }),
        Value::Object(map) => match needle {
            Value::String(s) => map.contains_key(s.as_str()),
            other => map.contains_key(&other.to_string()),
        },
        Value::String(s) => match needle {
            Value::String(n) => s.to_lowercase().contains(&n.to_lowercase()),
            _ => false,
        },
        _ => false,
    }
}

/// JSON-like truthiness: `null`, `false`, `0`, `""` and `[]` are false.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}
