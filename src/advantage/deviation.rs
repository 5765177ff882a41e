//! Deviations: named modifiers selected on an advantage.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::{NotationError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deviation {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mag_mod: f64,
    #[serde(default)]
    pub replace: Map<String, Value>,
    #[serde(default)]
    pub regexp_replace: Vec<RawRule>,
}

/// `[pattern, replacement]`, `[pattern, replacement, flags]` or
/// `{pattern, replacement, flags}`. Flags default to `g`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRule {
    Pair(String, String),
    Flagged(String, String, String),
    Full {
        pattern: String,
        replacement: String,
        #[serde(default)]
        flags: Option<String>,
    },
}

/// A compiled text rewrite.
#[derive(Debug, Clone)]
pub struct RegexpReplace {
    pub regex: Regex,
    pub replacement: String,
    pub global: bool,
}

impl RegexpReplace {
    pub fn compile(rule: &RawRule) -> Result<Self> {
        let (pattern, replacement, flags) = match rule {
            RawRule::Pair(p, r) => (p, r, "g"),
            RawRule::Flagged(p, r, f) => (p, r, f.as_str()),
            RawRule::Full {
                pattern,
                replacement,
                flags,
            } => (pattern, replacement, flags.as_deref().unwrap_or("g")),
        };
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .build()
            .map_err(|e| NotationError::RuleData(format!("bad regexpReplace pattern '{pattern}': {e}")))?;
        let replacement = braced_groups(replacement, regex.captures_len());
        Ok(Self {
            regex,
            replacement,
            global: flags.contains('g'),
        })
    }

    pub fn apply(&self, text: &str) -> String {
        if self.global {
            self.regex.replace_all(text, self.replacement.as_str()).into_owned()
        } else {
            self.regex.replace(text, self.replacement.as_str()).into_owned()
        }
    }
}

/// Rewrite `$1`, `$&` and `$<name>` into braced `${...}` references so a
/// group number never absorbs the text after it. Of two digits, the second
/// belongs to the number only when that group exists. A `$` that starts no
/// reference stays literal.
fn braced_groups(replacement: &str, groups: usize) -> String {
    let mut out = String::with_capacity(replacement.len() + 8);
    let mut rest = replacement;
    while let Some(at) = rest.find('$') {
        out.push_str(&rest[..at]);
        let tail = &rest[at + 1..];
        let digits = tail.bytes().take(2).take_while(u8::is_ascii_digit).count();
        let (reference, used) = match tail.as_bytes().first() {
            Some(b'$') => ("$$".to_string(), 1),
            Some(b'&') => ("${0}".to_string(), 1),
            Some(b'<') => match tail.find('>') {
                Some(close) => (format!("${{{}}}", &tail[1..close]), close + 1),
                None => ("$$".to_string(), 0),
            },
            Some(_) if digits > 0 => {
                let two = digits == 2 && tail[..2].parse::<usize>().is_ok_and(|n| n < groups);
                let len = if two { 2 } else { 1 };
                (format!("${{{}}}", &tail[..len]), len)
            }
            _ => ("$$".to_string(), 0),
        };
        out.push_str(&reference);
        rest = &tail[used..];
    }
    out.push_str(rest);
    out
}

/// Apply every rewrite in order.
pub fn apply_all(rules: &[RegexpReplace], text: &str) -> String {
    rules
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc))
}

/// What the selected deviations add up to.
#[derive(Debug, Default)]
pub struct DeviationOutcome {
    pub mag_mod: f64,
    pub applied: Vec<String>,
    pub replacements: Map<String, Value>,
    pub regexp_replacements: Vec<RegexpReplace>,
}

/// Key of a selection entry: a bare string or an object's `key`/`name`.
fn selection_key(entry: &Value) -> Option<&str> {
    match entry {
        Value::String(s) => Some(s.as_str()),
        Value::Object(_) => entry
            .get("key")
            .or_else(|| entry.get("name"))
            .and_then(Value::as_str),
        _ => None,
    }
}

fn lookup<'a>(defs: &'a Map<String, Value>, key: &str) -> Option<(&'a String, &'a Value)> {
    defs.get_key_value(key)
        .or_else(|| defs.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)))
}

/// Apply `selected` (in the player's order) against the `defs` map.
///
/// Unknown selections are skipped with a warning; two deviations replacing
/// the same property is a conflict.
pub fn apply_selected(
    advantage: &str,
    defs: &Map<String, Value>,
    selected: &[Value],
) -> Result<DeviationOutcome> {
    let mut outcome = DeviationOutcome::default();
    let mut replaced_by: HashMap<String, String> = HashMap::new();

    for entry in selected {
        let Some(key) = selection_key(entry) else {
            warn!(advantage = %advantage, entry = %entry, "ignoring malformed deviation selection");
            continue;
        };
        let Some((def_key, raw)) = lookup(defs, key) else {
            warn!(advantage = %advantage, deviation = %key, "selected deviation has no definition");
            continue;
        };
        let deviation: Deviation = serde_json::from_value(raw.clone()).map_err(|e| {
            NotationError::RuleData(format!("deviation '{def_key}' of '{advantage}': {e}"))
        })?;
        let name = deviation.name.clone().unwrap_or_else(|| def_key.clone());

        outcome.mag_mod += deviation.mag_mod;
        for (property, value) in &deviation.replace {
            if let Some(first) = replaced_by.get(property) {
                return Err(NotationError::Conflict {
                    property: property.clone(),
                    first: first.clone(),
                    second: name,
                });
            }
            replaced_by.insert(property.clone(), name.clone());
            outcome.replacements.insert(property.clone(), value.clone());
        }
        for rule in &deviation.regexp_replace {
            outcome.regexp_replacements.push(RegexpReplace::compile(rule)?);
        }
        outcome.applied.push(name);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn defs() -> Map<String, Value> {
        json!({
            "Enhanced": {"magMod": 1},
            "Greater": {"magMod": 2, "replace": {"effect": "Bigger."}},
            "Renamed": {"name": "Other", "replace": {"effect": "Different."}},
            "Quiet": {"regexpReplace": [["loud", "quiet"], {"pattern": "ROAR", "replacement": "hum", "flags": "i"}]}
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn mag_mods_sum() {
        let out = apply_selected("x", &defs(), &[json!("Enhanced"), json!({"key": "Greater"})]).unwrap();
        assert_eq!(out.mag_mod, 3.0);
        assert_eq!(out.applied, vec!["Enhanced", "Greater"]);
        assert_eq!(out.replacements.get("effect"), Some(&json!("Bigger.")));
    }

    #[test]
    fn same_property_twice_is_a_conflict() {
        let err = apply_selected("x", &defs(), &[json!("Greater"), json!("Renamed")]).unwrap_err();
        match err {
            NotationError::Conflict { property, first, second } => {
                assert_eq!(property, "effect");
                assert_eq!(first, "Greater");
                assert_eq!(second, "Other");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_selections_are_skipped() {
        let out = apply_selected("x", &defs(), &[json!("Missing"), json!("enhanced")]).unwrap();
        assert_eq!(out.mag_mod, 1.0);
        assert_eq!(out.applied, vec!["Enhanced"]);
    }

    #[test]
    fn regexp_rules() {
        let out = apply_selected("x", &defs(), &[json!("Quiet")]).unwrap();
        let text = apply_all(&out.regexp_replacements, "a loud, loud roar");
        assert_eq!(text, "a quiet, quiet hum");
        let first_only = RegexpReplace::compile(&RawRule::Flagged("a".into(), "b".into(), "".into())).unwrap();
        assert_eq!(first_only.apply("aaa"), "baa");
        assert!(RegexpReplace::compile(&RawRule::Pair("(".into(), "x".into())).is_err());
    }

    #[test]
    fn group_references_end_at_the_number() {
        let rule = RegexpReplace::compile(&RawRule::Pair("(\\d+) dice".into(), "$1a dice".into())).unwrap();
        assert_eq!(rule.apply("roll 3 dice"), "roll 3a dice");
        let rule = RegexpReplace::compile(&RawRule::Pair("(\\w+)".into(), "[$&] $12 $$ $".into())).unwrap();
        assert_eq!(rule.apply("x"), "[x] x2 $ $");
        assert_eq!(braced_groups("$<word>s", 2), "${word}s");
    }
}
