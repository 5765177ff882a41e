//! Pluggable notation handlers.

mod conditional;
mod list;
mod numeric;
mod source;
mod text;
mod tooltip;
mod value;

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use serde_json::Value;

use crate::comparison::truthy;
use crate::context::ProcessingContext;
use crate::errors::{NotationError, Result};
use crate::notation::scan::has_notation;
use crate::notation::NotationProcessor;
use crate::parser::quoted_literal;
use crate::value::{extract_number, from_text, number};

pub use source::{book_title, format_citation};
pub(crate) use source::citation_parts;

/// A named notation operator: `{{NAME:content}}`.
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;
    /// Accepted number of top-level comma-separated arguments.
    fn arity(&self) -> RangeInclusive<usize>;
    fn process(
        &self,
        content: &str,
        ctx: &ProcessingContext,
        processor: &NotationProcessor,
    ) -> Result<Value>;
}

/// Handler table keyed by upper-case name.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<String, Arc<dyn Handler>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(text::Name);
        registry.register(text::Br);
        registry.register(text::Lower);
        registry.register(text::Upper);
        registry.register(text::Ref);
        registry.register(value::ValueHandler);
        registry.register(value::NameValue);
        registry.register(value::Signed);
        registry.register(value::Dots);
        registry.register(numeric::Max);
        registry.register(numeric::Min);
        registry.register(numeric::Calc);
        registry.register(numeric::RoundUp);
        registry.register(numeric::RoundDown);
        registry.register(conditional::IfTrue);
        registry.register(conditional::IfFalse);
        registry.register(conditional::IfNa);
        registry.register(conditional::IfIn);
        registry.register(conditional::IfNotIn);
        registry.register(conditional::Switch);
        registry.register(tooltip::Tooltip);
        registry.register(list::InlineList);
        registry.register(list::OptionList);
        registry.register(list::InlineOption);
        registry.register(source::Source);
        registry
    }

    pub fn register<H: Handler + 'static>(&mut self, handler: H) {
        let map = Arc::make_mut(&mut self.inner);
        map.insert(handler.name().to_ascii_uppercase(), Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.inner.get(&name.to_ascii_uppercase()).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Rendered text of an argument: quoted literals are unquoted, then any
/// nested notation is expanded.
pub(crate) fn text_arg(arg: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<String> {
    match quoted_literal(arg) {
        Some(literal) => p.expand(&literal, ctx),
        None => p.expand(arg.trim(), ctx),
    }
}

/// Value of an argument: a quoted literal, an expanded notation, a number
/// literal, or a resolved reference.
pub(crate) fn operand(arg: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
    let arg = arg.trim();
    if let Some(literal) = quoted_literal(arg) {
        return Ok(Value::String(p.expand(&literal, ctx)?));
    }
    if has_notation(arg) {
        return Ok(from_text(&p.expand(arg, ctx)?));
    }
    if let Ok(n) = arg.replace('\u{2212}', "-").parse::<f64>() {
        if let Some(num) = serde_json::Number::from_f64(n) {
            return Ok(Value::Number(num));
        }
    }
    p.resolve(arg, ctx)
}

/// Like [`operand`], but an unresolvable bare word is taken literally.
pub(crate) fn operand_or_literal(
    arg: &str,
    ctx: &ProcessingContext,
    p: &NotationProcessor,
) -> Result<Value> {
    match operand(arg, ctx, p) {
        Err(NotationError::Reference { .. }) => Ok(Value::String(arg.trim().to_string())),
        other => other,
    }
}

pub(crate) fn number_arg(
    handler: &str,
    arg: &str,
    ctx: &ProcessingContext,
    p: &NotationProcessor,
) -> Result<f64> {
    let v = operand(arg, ctx, p)?;
    extract_number(&v, false)
        .ok_or_else(|| NotationError::handler(handler, format!("'{}' is not numeric", arg.trim())))
}

/// A rated trait stands for its rating. Rule data turns a bare rating into
/// a record carrying `value`, and conditions must still see the number.
pub(crate) fn rating_view(v: Value) -> Value {
    let rated = matches!(&v, Value::Object(map) if map.contains_key("value"));
    if !rated {
        return v;
    }
    extract_number(&v, false).map(number).unwrap_or(v)
}

/// Truthiness of a condition argument; an unresolvable reference counts as
/// undefined and is therefore false.
pub(crate) fn condition(arg: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<bool> {
    let v = match operand(arg, ctx, p) {
        Ok(v) => rating_view(v),
        Err(NotationError::Reference { .. }) => return Ok(false),
        Err(e) => return Err(e),
    };
    Ok(match &v {
        Value::String(s) => {
            let t = s.trim();
            !(t.is_empty() || t == "false" || t == "null" || t == "undefined")
        }
        other => truthy(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_case_insensitive() {
        let registry = Registry::with_builtins();
        assert!(registry.get("value").is_some());
        assert!(registry.get("NameValue").is_some());
        assert!(registry.get("nope").is_none());
        assert!(registry.names().len() >= 20);
    }

    #[test]
    fn rated_records_read_as_their_rating() {
        use serde_json::json;
        assert_eq!(rating_view(json!({"name": "Brawl", "value": 0})), json!(0));
        assert_eq!(rating_view(json!({"value": {"base": 2, "total": 3}})), json!(3));
        assert_eq!(rating_view(json!({"veteran": true})), json!({"veteran": true}));
        assert_eq!(rating_view(json!({"value": "high"})), json!({"value": "high"}));
    }

    #[test]
    fn custom_handlers_can_be_registered() {
        struct Shout;
        impl Handler for Shout {
            fn name(&self) -> &'static str {
                "shout"
            }
            fn arity(&self) -> RangeInclusive<usize> {
                1..=1
            }
            fn process(
                &self,
                content: &str,
                _ctx: &ProcessingContext,
                _p: &NotationProcessor,
            ) -> Result<Value> {
                Ok(Value::String(format!("{}!", content.to_uppercase())))
            }
        }
        let mut registry = Registry::with_builtins();
        registry.register(Shout);
        assert_eq!(registry.get("SHOUT").map(|h| h.name()), Some("shout"));
    }
}
