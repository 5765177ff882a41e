use std::ops::RangeInclusive;

use serde_json::Value;

use super::{number_arg, Handler};
use crate::context::ProcessingContext;
use crate::errors::{NotationError, Result};
use crate::expression::{eval_expr, parse_expr};
use crate::notation::scan::{has_notation, split_args};
use crate::notation::NotationProcessor;
use crate::value::{extract_number, number};

/// Expand nested notation in `content`, then evaluate it as arithmetic with
/// references resolved to numbers.
pub(crate) fn evaluate_expression(
    content: &str,
    ctx: &ProcessingContext,
    p: &NotationProcessor,
) -> Result<f64> {
    let source = if has_notation(content) {
        p.expand(content, ctx)?
    } else {
        content.to_string()
    };
    let ast = parse_expr(&source)?;
    eval_expr(&ast, &mut |path: &str| {
        let v = p.resolve(path, ctx)?;
        extract_number(&v, false)
            .ok_or_else(|| NotationError::reference(path, "does not hold a number"))
    })
}

fn numbers(name: &str, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Vec<f64>> {
    split_args(content, ',')
        .into_iter()
        .map(|arg| number_arg(name, arg, ctx, p))
        .collect()
}

pub struct Max;
impl Handler for Max {
    fn name(&self) -> &'static str {
        "MAX"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=usize::MAX
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let nums = numbers(self.name(), content, ctx, p)?;
        Ok(number(nums.into_iter().fold(f64::NEG_INFINITY, f64::max)))
    }
}

pub struct Min;
impl Handler for Min {
    fn name(&self) -> &'static str {
        "MIN"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=usize::MAX
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let nums = numbers(self.name(), content, ctx, p)?;
        Ok(number(nums.into_iter().fold(f64::INFINITY, f64::min)))
    }
}

/// `{{CALC:expr}}`: `+ - * /` and parentheses over numbers and references.
pub struct Calc;
impl Handler for Calc {
    fn name(&self) -> &'static str {
        "CALC"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=1
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        Ok(number(evaluate_expression(content, ctx, p)?))
    }
}

pub struct RoundUp;
impl Handler for RoundUp {
    fn name(&self) -> &'static str {
        "ROUNDUP"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=1
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        Ok(number(evaluate_expression(content, ctx, p)?.ceil()))
    }
}

pub struct RoundDown;
impl Handler for RoundDown {
    fn name(&self) -> &'static str {
        "ROUNDDOWN"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=1
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        Ok(number(evaluate_expression(content, ctx, p)?.floor()))
    }
}
