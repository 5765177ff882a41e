//! Layering of rule data beneath character data.

use itertools::Itertools;
use serde_json::{Map, Value};

/// Identity used for array de-duplication: the element `key` when it has
/// one, otherwise its serialized form.
fn dedupe_key(v: &Value) -> String {
    match v.get("key") {
        Some(Value::String(k)) => format!("key:{k}"),
        _ => serde_json::to_string(v).unwrap_or_default(),
    }
}

/// Deduplicate, keeping the first occurrence of each element.
pub fn unique(vals: &[Value]) -> Vec<Value> {
    vals.iter().cloned().unique_by(dedupe_key).collect()
}

/// `rule` followed by `over`, each element once, in that relative order.
pub fn concat_unique(rule: &[Value], over: &[Value]) -> Vec<Value> {
    rule.iter()
        .chain(over.iter())
        .cloned()
        .unique_by(dedupe_key)
        .collect()
}

/// Deep merge with `over` winning. Arrays from both sides are concatenated
/// and deduplicated; nested objects merge recursively.
pub fn merge_beneath(rule: &Value, over: &Value) -> Value {
    match (rule, over) {
        (Value::Object(base), Value::Object(top)) => {
            let mut out = base.clone();
            for (k, v) in top {
                let merged = match out.get(k) {
                    Some(existing) => merge_beneath(existing, v),
                    None => v.clone(),
                };
                out.insert(k.clone(), merged);
            }
            Value::Object(out)
        }
        (Value::Array(base), Value::Array(top)) => Value::Array(concat_unique(base, top)),
        (_, top) => top.clone(),
    }
}

/// A bare number from the character replaces the rule record's `value`.
pub fn merge_numeric(rule: &Value, n: &Value) -> Value {
    match rule {
        Value::Object(map) => {
            let mut out = map.clone();
            out.insert("value".to_string(), n.clone());
            Value::Object(out)
        }
        _ => n.clone(),
    }
}

/// Shallow merge used by the advantage pipeline.
///
/// Player arrays replace rule arrays (deduplicated), player scalars and
/// objects override. A player `deviations` array is a selection and is
/// stored as `selectedDeviations`, leaving the rule map intact; a player
/// `deviations` object supersedes rule entries of the same name.
pub fn merge_advantage(rule: &Value, player: &Value) -> Value {
    let mut out: Map<String, Value> = rule.as_object().cloned().unwrap_or_default();
    let Some(top) = player.as_object() else {
        return Value::Object(out);
    };
    for (k, v) in top {
        match (k.as_str(), v) {
            ("deviations", Value::Array(selected)) => {
                out.insert("selectedDeviations".to_string(), Value::Array(unique(selected)));
            }
            ("deviations", Value::Object(entries)) => {
                let mut map = out
                    .get("deviations")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                for (name, def) in entries {
                    map.insert(name.clone(), def.clone());
                }
                out.insert("deviations".to_string(), Value::Object(map));
            }
            (_, Value::Array(items)) => {
                out.insert(k.clone(), Value::Array(unique(items)));
            }
            _ => {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn arrays_concat_in_order_without_duplicates() {
        let out = merge_beneath(
            &json!({"tags": ["a", "b"]}),
            &json!({"tags": ["b", "c"]}),
        );
        assert_eq!(out, json!({"tags": ["a", "b", "c"]}));
    }

    #[test]
    fn context_properties_win() {
        let rule = json!({"name": "Athletics", "value": {"max": 5}, "source": "CofD/55"});
        let ctx = json!({"value": {"base": 2}});
        assert_eq!(
            merge_beneath(&rule, &ctx),
            json!({"name": "Athletics", "value": {"max": 5, "base": 2}, "source": "CofD/55"})
        );
    }

    #[test]
    fn keyed_elements_dedupe_by_key() {
        let out = unique(&[json!({"key": "a", "x": 1}), json!({"key": "a", "x": 2})]);
        assert_eq!(out, vec![json!({"key": "a", "x": 1})]);
    }

    #[test]
    fn numbers_replace_value_only() {
        let rule = json!({"name": "Size", "value": 5, "note": "x"});
        assert_eq!(
            merge_numeric(&rule, &json!(6)),
            json!({"name": "Size", "value": 6, "note": "x"})
        );
    }

    #[test]
    fn advantage_merge_keeps_rule_deviations() {
        let rule = json!({
            "key": "claws",
            "tags": ["a", "b"],
            "deviations": {"long": {"magMod": 1}, "sharp": {"magMod": 2}}
        });
        let player = json!({"tags": ["c", "c"], "deviations": ["long"], "value": 3});
        let merged = merge_advantage(&rule, &player);
        assert_eq!(merged["tags"], json!(["c"]));
        assert_eq!(merged["selectedDeviations"], json!(["long"]));
        assert_eq!(merged["deviations"]["sharp"], json!({"magMod": 2}));
        assert_eq!(merged["value"], json!(3));
    }

    #[test]
    fn advantage_merge_supersedes_named_deviations() {
        let rule = json!({"deviations": {"long": {"magMod": 1}, "sharp": {"magMod": 2}}});
        let player = json!({"deviations": {"long": {"magMod": 3}}});
        let merged = merge_advantage(&rule, &player);
        assert_eq!(merged["deviations"]["long"], json!({"magMod": 3}));
        assert_eq!(merged["deviations"]["sharp"], json!({"magMod": 2}));
    }
}
