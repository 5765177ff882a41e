use std::ops::RangeInclusive;

use serde_json::Value;

use super::{condition, operand, operand_or_literal, rating_view, text_arg, Handler};
use crate::comparison::{contains, loose_eq};
use crate::context::ProcessingContext;
use crate::errors::{NotationError, Result};
use crate::notation::scan::split_args;
use crate::notation::NotationProcessor;

/// Render `then` or the optional `else`; the branch not taken is never
/// expanded.
fn branch(
    taken: bool,
    then: &str,
    otherwise: Option<&&str>,
    ctx: &ProcessingContext,
    p: &NotationProcessor,
) -> Result<Value> {
    let text = match (taken, otherwise) {
        (true, _) => text_arg(then, ctx, p)?,
        (false, Some(alt)) => text_arg(alt, ctx, p)?,
        (false, None) => String::new(),
    };
    Ok(Value::String(text))
}

/// `{{IFTRUE:cond,then[,else]}}`
pub struct IfTrue;
impl Handler for IfTrue {
    fn name(&self) -> &'static str {
        "IFTRUE"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        2..=3
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let args = split_args(content, ',');
        branch(condition(args[0], ctx, p)?, args[1], args.get(2), ctx, p)
    }
}

/// `{{IFFALSE:cond,then[,else]}}`
pub struct IfFalse;
impl Handler for IfFalse {
    fn name(&self) -> &'static str {
        "IFFALSE"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        2..=3
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let args = split_args(content, ',');
        branch(!condition(args[0], ctx, p)?, args[1], args.get(2), ctx, p)
    }
}

/// `{{IFNA:ref,then[,else]}}`: `then` when the reference is missing or null.
pub struct IfNa;
impl Handler for IfNa {
    fn name(&self) -> &'static str {
        "IFNA"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        2..=3
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let args = split_args(content, ',');
        let missing = match operand(args[0], ctx, p) {
            Ok(Value::Null) => true,
            Ok(_) => false,
            Err(NotationError::Reference { .. }) => true,
            Err(e) => return Err(e),
        };
        branch(missing, args[1], args.get(2), ctx, p)
    }
}

/// Needle in haystack. The haystack must resolve; the needle may be a
/// bare word.
fn membership(args: &[&str], ctx: &ProcessingContext, p: &NotationProcessor) -> Result<bool> {
    let needle = rating_view(operand_or_literal(args[0], ctx, p)?);
    let haystack = operand(args[1], ctx, p)?;
    Ok(contains(&haystack, &needle))
}

/// `{{IFIN:needle,haystack,then[,else]}}`
pub struct IfIn;
impl Handler for IfIn {
    fn name(&self) -> &'static str {
        "IFIN"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        3..=4
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let args = split_args(content, ',');
        branch(membership(&args, ctx, p)?, args[2], args.get(3), ctx, p)
    }
}

/// `{{IFNOTIN:needle,haystack,then[,else]}}`
pub struct IfNotIn;
impl Handler for IfNotIn {
    fn name(&self) -> &'static str {
        "IFNOTIN"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        3..=4
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let args = split_args(content, ',');
        branch(!membership(&args, ctx, p)?, args[2], args.get(3), ctx, p)
    }
}

/// `{{SWITCH:subject,case,out,...[,default]}}`
pub struct Switch;
impl Handler for Switch {
    fn name(&self) -> &'static str {
        "SWITCH"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        3..=usize::MAX
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let args = split_args(content, ',');
        let subject = match operand(args[0], ctx, p) {
            Ok(v) => rating_view(v),
            Err(NotationError::Reference { .. }) => Value::Null,
            Err(e) => return Err(e),
        };
        let rest = &args[1..];
        for pair in rest.chunks_exact(2) {
            let case = rating_view(operand_or_literal(pair[0], ctx, p)?);
            if loose_eq(&subject, &case) {
                return Ok(Value::String(text_arg(pair[1], ctx, p)?));
            }
        }
        match rest.len() % 2 {
            1 => Ok(Value::String(text_arg(rest[rest.len() - 1], ctx, p)?)),
            _ => Ok(Value::String(String::new())),
        }
    }
}
