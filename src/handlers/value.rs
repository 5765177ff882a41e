use std::ops::RangeInclusive;

use serde_json::Value;

use super::numeric::evaluate_expression;
use super::{number_arg, operand, Handler};
use crate::context::ProcessingContext;
use crate::dotline::{dotline, render, DotValue};
use crate::errors::{NotationError, Result};
use crate::format::{format_number, format_signed};
use crate::notation::scan::split_args;
use crate::notation::NotationProcessor;
use crate::value::{extract_number, field_str};

/// Names for bare numeric stats that carry no `display`/`name` of their own.
const STAT_NAMES: &[(&str, &str)] = &[
    ("health", "Health"),
    ("willpower", "Willpower"),
    ("speed", "Speed"),
    ("defense", "Defense"),
    ("initiative", "Initiative"),
    ("size", "Size"),
    ("armor", "Armor"),
    ("integrity", "Integrity"),
    ("conviction", "Conviction"),
    ("loyalty", "Loyalty"),
];

fn stat_name(key: &str) -> Option<&'static str> {
    STAT_NAMES
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, name)| *name)
}

fn last_segment(expr: &str) -> &str {
    expr.trim().rsplit('.').next().unwrap_or(expr)
}

/// `{{VALUE:ref[,base][,signed][,default]}}`
pub struct ValueHandler;
impl Handler for ValueHandler {
    fn name(&self) -> &'static str {
        "VALUE"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=4
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let args = split_args(content, ',');
        let mut prefer_base = false;
        let mut signed = false;
        let mut default: Option<&str> = None;
        for flag in &args[1..] {
            match flag.to_ascii_lowercase().as_str() {
                "base" => prefer_base = true,
                "signed" => signed = true,
                _ if default.is_none() => default = Some(flag),
                other => {
                    return Err(NotationError::handler(
                        self.name(),
                        format!("unexpected argument '{other}'"),
                    ))
                }
            }
        }

        let extracted = match operand(args[0], ctx, p) {
            Ok(v) => extract_number(&v, prefer_base),
            Err(NotationError::Reference { .. }) if default.is_some() => None,
            Err(e) => return Err(e),
        };
        let n = match (extracted, default) {
            (Some(n), _) => n,
            (None, Some(d)) => match d.replace('\u{2212}', "-").parse::<f64>() {
                Ok(n) => n,
                Err(_) => return Ok(Value::String(d.to_string())),
            },
            (None, None) => {
                return Err(NotationError::handler(
                    self.name(),
                    format!("no numeric value at '{}'", args[0]),
                ))
            }
        };
        if signed {
            Ok(Value::String(format_signed(n)))
        } else {
            Ok(Value::String(format_number(n)))
        }
    }
}

/// `{{NAMEVALUE:ref}}` → `<strong>Name (+N)</strong>`
pub struct NameValue;
impl Handler for NameValue {
    fn name(&self) -> &'static str {
        "NAMEVALUE"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=1
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let v = operand(content, ctx, p)?;
        let key = field_str(&v, "key").unwrap_or_else(|| last_segment(content));

        if let (Some(general), Some(ballistic)) = (
            v.get("general").and_then(|g| extract_number(g, false)),
            v.get("ballistic").and_then(|b| extract_number(b, false)),
        ) {
            let name = field_str(&v, "display")
                .or_else(|| field_str(&v, "name"))
                .or_else(|| stat_name(key))
                .unwrap_or("Armor");
            return Ok(Value::String(format!(
                "<strong>{name} ({}/{})</strong>",
                format_number(general),
                format_number(ballistic)
            )));
        }

        let name = field_str(&v, "display")
            .or_else(|| field_str(&v, "name"))
            .or_else(|| stat_name(key))
            .ok_or_else(|| {
                NotationError::handler(self.name(), format!("no display name for '{}'", content.trim()))
            })?;
        let n = extract_number(&v, false).ok_or_else(|| {
            NotationError::handler(self.name(), format!("no numeric value for '{}'", content.trim()))
        })?;
        Ok(Value::String(format!("<strong>{name} ({})</strong>", format_signed(n))))
    }
}

/// `{{SIGNED:expr}}` → `+2` / `−1`
pub struct Signed;
impl Handler for Signed {
    fn name(&self) -> &'static str {
        "SIGNED"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=1
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let n = evaluate_expression(content, ctx, p)?;
        Ok(Value::String(format_signed(n)))
    }
}

/// `{{DOTS:ref[,max]}}`
pub struct Dots;
impl Handler for Dots {
    fn name(&self) -> &'static str {
        "DOTS"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=2
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let args = split_args(content, ',');
        let v = operand(args[0], ctx, p)?;
        let max = match args.get(1) {
            Some(m) => Some(number_arg(self.name(), m, ctx, p)? as i64),
            None => None,
        };
        let value = DotValue::from_json(&v, max).capped(p.config().max_dots);
        Ok(Value::String(render(&dotline(value))))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::config::ProcessorConfig;
    use crate::context::ProcessingContext;
    use crate::notation::NotationProcessor;
    use crate::system_data::SystemDataLoader;

    fn run(text: &str, ctx: &ProcessingContext) -> String {
        let p = NotationProcessor::with_config(
            Arc::new(SystemDataLoader::empty()),
            ProcessorConfig::default().with_seed(1).with_typography(false),
        );
        p.process(text, ctx).unwrap()
    }

    fn ctx() -> ProcessingContext {
        ProcessingContext::new(json!({
            "derived": {"defense": 3, "armor": {"general": 1, "ballistic": 2}, "speed": -1},
            "skills": {"brawl": {"name": "Brawl", "value": {"base": 2, "total": 3}}},
            "merits": [{"key": "allies", "name": "Allies", "value": 2}]
        }))
        .with_entity(json!({"value": {"base": 2, "total": 3}}))
    }

    #[test]
    fn value_priority_and_flags() {
        let c = ctx();
        assert_eq!(run("{{VALUE:this}}", &c), "3");
        assert_eq!(run("{{VALUE:this,base}}", &c), "2");
        assert_eq!(run("{{VALUE:derived.speed,signed}}", &c), "\u{2212}1");
        assert_eq!(run("{{VALUE:defense,signed}}", &c), "+3");
        assert_eq!(run("{{VALUE:merits.contacts,0}}", &c), "0");
        assert_eq!(run("{{VALUE:merits.allies.name,n/a}}", &c), "n/a");
    }

    #[test]
    fn namevalue_shapes() {
        let c = ctx();
        assert_eq!(run("{{NAMEVALUE:skills.brawl}}", &c), "<strong>Brawl (+3)</strong>");
        assert_eq!(run("{{NAMEVALUE:defense}}", &c), "<strong>Defense (+3)</strong>");
        assert_eq!(run("{{NAMEVALUE:armor}}", &c), "<strong>Armor (1/2)</strong>");
        assert_eq!(run("{{NAMEVALUE:merits.allies}}", &c), "<strong>Allies (+2)</strong>");
    }

    #[test]
    fn signed_and_dots() {
        let c = ctx();
        assert_eq!(run("{{SIGNED:0}}", &c), "+0");
        assert_eq!(run("{{SIGNED:defense - 5}}", &c), "\u{2212}2");
        let dots = run("{{DOTS:skills.brawl,3}}", &c);
        assert_eq!(dots.matches("dot-full").count(), 2);
        assert_eq!(dots.matches("class='dot ").count(), 3);
    }

    #[test]
    fn dot_rows_are_capped_by_config() {
        let p = NotationProcessor::with_config(
            Arc::new(SystemDataLoader::empty()),
            ProcessorConfig::default().with_seed(1).with_max_dots(8),
        );
        let dots = p.process("{{DOTS:skills.brawl,1000000000}}", &ctx()).unwrap();
        assert_eq!(dots.matches("class='dot ").count(), 8);
    }
}
