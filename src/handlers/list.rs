use std::ops::RangeInclusive;

use serde_json::Value;

use super::{operand, Handler};
use crate::context::ProcessingContext;
use crate::errors::{NotationError, Result};
use crate::format::join_list;
use crate::notation::scan::split_args;
use crate::notation::NotationProcessor;
use crate::parser::quoted_literal;
use crate::path::type_name;
use crate::value::{display_label, stringify};

/// `{{INLINELIST:ref[,conjunction]}}` → "A, B, and C"
pub struct InlineList;
impl Handler for InlineList {
    fn name(&self) -> &'static str {
        "INLINELIST"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=2
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let args = split_args(content, ',');
        let items = match operand(args[0], ctx, p)? {
            Value::Array(items) => items,
            Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
            Value::Null => Vec::new(),
            other => {
                return Err(NotationError::handler(
                    self.name(),
                    format!("'{}' is a {}, not a list", args[0], type_name(&other)),
                ))
            }
        };
        let labels: Vec<String> = items
            .iter()
            .filter_map(display_label)
            .map(|label| p.expand(&label, ctx))
            .collect::<Result<_>>()?;
        let conjunction = args
            .get(1)
            .map(|c| quoted_literal(c).unwrap_or_else(|| c.to_string()))
            .unwrap_or_else(|| "and".to_string());
        Ok(Value::String(join_list(&labels, &conjunction)))
    }
}

/// The entity's `options` map.
fn options<'a>(handler: &str, ctx: &'a ProcessingContext) -> Result<&'a serde_json::Map<String, Value>> {
    ctx.entity()
        .and_then(|e| e.get("options"))
        .and_then(Value::as_object)
        .ok_or_else(|| NotationError::handler(handler, "no options map on the entity in scope"))
}

/// Option text for `key`: `None` when the option is explicitly null.
fn option_text(
    handler: &str,
    key: &str,
    ctx: &ProcessingContext,
    p: &NotationProcessor,
) -> Result<Option<String>> {
    match options(handler, ctx)?.get(key) {
        None => Err(NotationError::handler(handler, format!("no option '{key}'"))),
        Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(p.expand(s, ctx)?)),
        Some(other) => Ok(Some(stringify(other))),
    }
}

/// Keys named directly, or held in a referenced array.
fn option_keys(content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Vec<String> {
    let args = split_args(content, ',');
    if let [single] = args[..] {
        if quoted_literal(single).is_none() {
            if let Ok(Value::Array(items)) = p.resolve(single, ctx) {
                return items
                    .iter()
                    .map(|item| match item.get("key") {
                        Some(key) => stringify(key),
                        None => stringify(item),
                    })
                    .collect();
            }
        }
    }
    args.iter()
        .map(|a| quoted_literal(a).unwrap_or_else(|| a.to_string()))
        .collect()
}

/// `{{OPTIONLIST:key,...}}` or `{{OPTIONLIST:ref}}` → `<ul class='option-list'>`
pub struct OptionList;
impl Handler for OptionList {
    fn name(&self) -> &'static str {
        "OPTIONLIST"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=usize::MAX
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let mut items = String::new();
        for key in option_keys(content, ctx, p) {
            if let Some(text) = option_text(self.name(), &key, ctx, p)? {
                items.push_str(&format!("<li>{text}</li>"));
            }
        }
        if items.is_empty() {
            return Ok(Value::String(String::new()));
        }
        Ok(Value::String(format!("<ul class='option-list'>{items}</ul>")))
    }
}

/// `{{INLINEOPTION:key}}`
pub struct InlineOption;
impl Handler for InlineOption {
    fn name(&self) -> &'static str {
        "INLINEOPTION"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=1
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let key = quoted_literal(content).unwrap_or_else(|| content.trim().to_string());
        Ok(Value::String(
            option_text(self.name(), &key, ctx, p)?.unwrap_or_default(),
        ))
    }
}
