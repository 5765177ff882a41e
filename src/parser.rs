// src/parser.rs
use crate::errors::{NotationError, Result};

/// Forward-only character cursor shared by the argument and arithmetic parsers.
pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    /// Identifier with optional dotted continuation, e.g. `skills.athletics`.
    pub fn parse_path(&mut self) -> Result<&'a str> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c == '_' || c == '.' || c.is_ascii_alphanumeric() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
        if self.i == start {
            return Err(NotationError::Syntax("identifier expected".into()));
        }
        Ok(&self.s[start..self.i])
    }

    pub fn parse_number_literal(&mut self) -> Result<f64> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.i += 1;
            } else {
                break;
            }
        }
        if self.peek_char() == Some('.') {
            self.i += 1;
            while let Some(c) = self.peek_char() {
                if c.is_ascii_digit() {
                    self.i += 1;
                } else {
                    break;
                }
            }
        }
        let s = &self.s[start..self.i];
        if s.is_empty() || s == "." {
            return Err(NotationError::Syntax("number expected".into()));
        }
        s.parse::<f64>()
            .map_err(|_| NotationError::Syntax(format!("bad number '{s}'")))
    }

    pub fn parse_quoted_string(&mut self) -> Result<String> {
        let quote = self
            .peek_char()
            .ok_or_else(|| NotationError::Syntax("string expected".into()))?;
        if quote != '\'' && quote != '"' {
            return Err(NotationError::Syntax("expected quoted string".into()));
        }
        self.i += 1;
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            self.i += c.len_utf8();
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                if let Some(nc) = self.peek_char() {
                    self.i += nc.len_utf8();
                    match nc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        '\\' => out.push('\\'),
                        '"' => out.push('"'),
                        '\'' => out.push('\''),
                        _ => {
                            out.push('\\');
                            out.push(nc);
                        }
                    }
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        Err(NotationError::Syntax("unterminated string".into()))
    }

    pub fn expect(&mut self, c: char) -> Result<()> {
        if self.consume_char(c) {
            Ok(())
        } else {
            Err(NotationError::Syntax(format!(
                "expected '{c}' at offset {} in '{}'",
                self.i, self.s
            )))
        }
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    pub fn rest(&self) -> &'a str {
        &self.s[self.i..]
    }
}

/// Whole-string form of a quoted literal (`'fire'` or `"fire"`), if it is one.
pub fn quoted_literal(arg: &str) -> Option<String> {
    let trimmed = arg.trim();
    let first = trimmed.chars().next()?;
    if first != '\'' && first != '"' {
        return None;
    }
    let mut p = Parser::new(trimmed);
    let s = p.parse_quoted_string().ok()?;
    p.eof().then_some(s)
}
