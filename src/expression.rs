// src/expression.rs
//! Restricted arithmetic used by CALC, ROUNDUP, ROUNDDOWN and SIGNED.
//!
//! Grammar: numbers, dotted references, unary `+`/`-`, `+ - * /` and
//! parentheses. Nothing else is evaluated.

use crate::errors::{NotationError, Result};
use crate::parser::Parser;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Ref(String),
    Neg(Box<Expr>),
    Bin {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

pub fn parse_expr(input: &str) -> Result<Expr> {
    let normalized = input.replace('\u{2212}', "-");
    let mut p = EParser::new(&normalized);
    let node = p.parse_sum()?;
    p.parser.skip_ws();
    if !p.parser.eof() {
        return Err(NotationError::Syntax(format!(
            "trailing input '{}' in expression '{input}'",
            p.parser.rest()
        )));
    }
    Ok(node)
}

struct EParser<'a> {
    parser: Parser<'a>,
}

impl<'a> EParser<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            parser: Parser::new(s),
        }
    }

    fn parse_sum(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_product()?;
        loop {
            self.parser.skip_ws();
            let op = if self.parser.consume_char('+') {
                BinOp::Add
            } else if self.parser.consume_char('-') {
                BinOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_product()?;
            lhs = Expr::Bin {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_product(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_factor()?;
        loop {
            self.parser.skip_ws();
            let op = if self.parser.consume_char('*') {
                BinOp::Mul
            } else if self.parser.consume_char('/') {
                BinOp::Div
            } else {
                break;
            };
            let rhs = self.parse_factor()?;
            lhs = Expr::Bin {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        self.parser.skip_ws();
        if self.parser.consume_char('-') {
            return Ok(Expr::Neg(Box::new(self.parse_factor()?)));
        }
        if self.parser.consume_char('+') {
            return self.parse_factor();
        }
        if self.parser.consume_char('(') {
            let inner = self.parse_sum()?;
            self.parser.skip_ws();
            self.parser.expect(')')?;
            return Ok(inner);
        }
        match self.parser.peek_char() {
            Some(c) if c.is_ascii_digit() || c == '.' => {
                Ok(Expr::Num(self.parser.parse_number_literal()?))
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                Ok(Expr::Ref(self.parser.parse_path()?.to_string()))
            }
            Some(c) => Err(NotationError::Syntax(format!(
                "unexpected '{c}' in arithmetic expression"
            ))),
            None => Err(NotationError::Syntax(
                "unexpected end of arithmetic expression".into(),
            )),
        }
    }
}

/// Evaluate an expression; `lookup` turns a reference operand into a number.
pub fn eval_expr<F>(expr: &Expr, lookup: &mut F) -> Result<f64>
where
    F: FnMut(&str) -> Result<f64>,
{
    match expr {
        Expr::Num(n) => Ok(*n),
        Expr::Ref(path) => lookup(path),
        Expr::Neg(inner) => Ok(-eval_expr(inner, lookup)?),
        Expr::Bin { op, lhs, rhs } => {
            let a = eval_expr(lhs, lookup)?;
            let b = eval_expr(rhs, lookup)?;
            match op {
                BinOp::Add => Ok(a + b),
                BinOp::Sub => Ok(a - b),
                BinOp::Mul => Ok(a * b),
                BinOp::Div if b == 0.0 => {
                    Err(NotationError::Syntax("division by zero".into()))
                }
                BinOp::Div => Ok(a / b),
            }
        }
    }
}

/// Parse and evaluate an expression without reference operands.
#[cfg(test)]
fn eval_str(input: &str) -> Result<f64> {
    let ast = parse_expr(input)?;
    eval_expr(&ast, &mut |path: &str| {
        Err(NotationError::Syntax(format!(
            "unexpected reference '{path}' in arithmetic expression"
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(eval_str("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(eval_str("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(eval_str("10 / 4").unwrap(), 2.5);
        assert_eq!(eval_str("-2 - -3").unwrap(), 1.0);
        assert_eq!(eval_str("\u{2212}2 + 5").unwrap(), 3.0);
        assert_eq!(eval_str("+4").unwrap(), 4.0);
    }

    #[test]
    fn references_go_through_lookup() {
        let ast = parse_expr("skills.athletics * 2 + dex").unwrap();
        let out = eval_expr(&ast, &mut |p: &str| match p {
            "skills.athletics" => Ok(3.0),
            "dex" => Ok(2.0),
            other => Err(NotationError::reference(other, "unknown")),
        })
        .unwrap();
        assert_eq!(out, 8.0);
    }

    #[test]
    fn rejects_anything_but_arithmetic() {
        assert!(parse_expr("1 +").is_err());
        assert!(parse_expr("alert(1)").is_err());
        assert!(parse_expr("2 ** 3").is_err());
        assert!(parse_expr("1; 2").is_err());
        assert!(eval_str("1 / 0").is_err());
    }
}
