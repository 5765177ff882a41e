//! Balanced `{{...}}` scanning.

use crate::errors::{NotationError, Result};

/// A notation span: `start..end` covers the braces, `inner` the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub inner_start: usize,
    pub inner_end: usize,
}

impl Span {
    pub fn inner<'a>(&self, text: &'a str) -> &'a str {
        &text[self.inner_start..self.inner_end]
    }

    pub fn whole<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// First span starting at or after `from`, with nested spans counted so an
/// inner `}}` does not close the outer one.
pub fn find_span(text: &str, from: usize) -> Result<Option<Span>> {
    let Some(off) = text[from..].find("{{") else {
        return Ok(None);
    };
    let start = from + off;
    let mut depth = 1usize;
    let mut i = start + 2;
    while i < text.len() {
        let rest = &text[i..];
        if rest.starts_with("{{") {
            depth += 1;
            i += 2;
        } else if rest.starts_with("}}") {
            depth -= 1;
            if depth == 0 {
                return Ok(Some(Span {
                    start,
                    end: i + 2,
                    inner_start: start + 2,
                    inner_end: i,
                }));
            }
            i += 2;
        } else {
            i += rest.chars().next().map(char::len_utf8).unwrap_or(1);
        }
    }
    Err(NotationError::Unterminated {
        snippet: text[start..].chars().take(60).collect(),
    })
}

/// True when `text` still contains a complete or partial notation opener.
pub fn has_notation(text: &str) -> bool {
    text.contains("{{")
}

/// Split on `sep` at the top level only: separators inside nested spans or
/// inside a quoted argument (`'a, b'`) do not split.
pub fn split_args(content: &str, sep: char) -> Vec<&str> {
    split_args_limit(content, sep, usize::MAX)
}

/// Like [`split_args`], but at most `limit` pieces: the last one keeps any
/// remaining separators.
pub fn split_args_limit(content: &str, sep: char, limit: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut arg_start = 0;
    let mut at_arg_start = true;
    let bytes = content.as_bytes();
    let mut i = 0;
    while i < content.len() {
        let c = content[i..].chars().next().unwrap_or(' ');
        let width = c.len_utf8();
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            i += width;
            continue;
        }
        if bytes[i..].starts_with(b"{{") {
            depth += 1;
            at_arg_start = false;
            i += 2;
            continue;
        }
        if depth > 0 && bytes[i..].starts_with(b"}}") {
            depth -= 1;
            i += 2;
            continue;
        }
        if depth == 0 && c == sep && out.len() + 1 < limit {
            out.push(content[arg_start..i].trim());
            arg_start = i + width;
            at_arg_start = true;
            i += width;
            continue;
        }
        if at_arg_start && depth == 0 && (c == '\'' || c == '"') {
            quote = Some(c);
        }
        if !c.is_whitespace() {
            at_arg_start = false;
        }
        i += width;
    }
    out.push(content[arg_start..].trim());
    out
}

/// `NAME:CONTENT` when `NAME` is a plain identifier.
pub fn split_handler(inner: &str) -> Option<(&str, &str)> {
    let (name, rest) = inner.split_once(':')?;
    let name = name.trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then_some((name, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_outer_span_over_nested_ones() {
        let text = "a {{IFTRUE:x,{{VALUE:y}}}} b {{BR}}";
        let span = find_span(text, 0).unwrap().unwrap();
        assert_eq!(span.whole(text), "{{IFTRUE:x,{{VALUE:y}}}}");
        assert_eq!(span.inner(text), "IFTRUE:x,{{VALUE:y}}");
        let next = find_span(text, span.end).unwrap().unwrap();
        assert_eq!(next.inner(text), "BR");
        assert_eq!(find_span(text, next.end).unwrap(), None);
    }

    #[test]
    fn unterminated_is_an_error() {
        let err = find_span("x {{NAME and more", 0).unwrap_err();
        assert!(matches!(err, NotationError::Unterminated { .. }));
        assert!(err.to_string().contains("{{NAME"));
        assert!(find_span("{{A:{{B}}", 0).is_err());
    }

    #[test]
    fn top_level_arguments() {
        assert_eq!(
            split_args("a, {{MAX:1,2}} ,c", ','),
            vec!["a", "{{MAX:1,2}}", "c"]
        );
        assert_eq!(split_args("'a, b',c", ','), vec!["'a, b'", "c"]);
        assert_eq!(split_args("He's fast, strong", ','), vec!["He's fast", "strong"]);
        assert_eq!(split_args("", ','), vec![""]);
    }

    #[test]
    fn limited_split_keeps_the_tail() {
        assert_eq!(
            split_args_limit("anchor, one, two", ',', 2),
            vec!["anchor", "one, two"]
        );
        assert_eq!(split_args_limit("a", ',', 3), vec!["a"]);
    }

    #[test]
    fn handler_names() {
        assert_eq!(split_handler("VALUE:skills.x"), Some(("VALUE", "skills.x")));
        assert_eq!(split_handler("NAME"), None);
        assert_eq!(split_handler("some text: more"), None);
    }
}
