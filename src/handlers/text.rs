use std::ops::RangeInclusive;

use serde_json::Value;

use super::{text_arg, Handler};
use crate::context::ProcessingContext;
use crate::errors::{NotationError, Result};
use crate::notation::NotationProcessor;
use crate::value::{field_str, stringify};

/// `{{NAME}}`: the character's name.
pub struct Name;
impl Handler for Name {
    fn name(&self) -> &'static str {
        "NAME"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        0..=0
    }
    fn process(&self, _: &str, ctx: &ProcessingContext, _: &NotationProcessor) -> Result<Value> {
        field_str(&ctx.context, "name")
            .map(|n| Value::String(n.to_string()))
            .ok_or_else(|| NotationError::reference("name", "character has no name"))
    }
}

/// `{{BR}}`: a line break.
pub struct Br;
impl Handler for Br {
    fn name(&self) -> &'static str {
        "BR"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        0..=0
    }
    fn process(&self, _: &str, _: &ProcessingContext, _: &NotationProcessor) -> Result<Value> {
        Ok(Value::String("<br>".to_string()))
    }
}

pub struct Lower;
impl Handler for Lower {
    fn name(&self) -> &'static str {
        "LOWER"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=usize::MAX
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        Ok(Value::String(text_arg(content, ctx, p)?.to_lowercase()))
    }
}

pub struct Upper;
impl Handler for Upper {
    fn name(&self) -> &'static str {
        "UPPER"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=usize::MAX
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        Ok(Value::String(text_arg(content, ctx, p)?.to_uppercase()))
    }
}

/// `{{REF:path}}`: a reference rendered as text.
pub struct Ref;
impl Handler for Ref {
    fn name(&self) -> &'static str {
        "REF"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=1
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let v = p.resolve(content, ctx)?;
        Ok(Value::String(stringify(&v)))
    }
}
