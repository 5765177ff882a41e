//! HTML helpers: escaping, balanced-tag validation, typography.

use crate::errors::{NotationError, Result};
use crate::format::MINUS_SIGN;

pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Tags permitted inside tooltip bodies.
pub const TOOLTIP_TAGS: &[&str] = &[
    "p", "strong", "em", "b", "i", "u", "ul", "ol", "li", "br", "span", "div", "small", "sup",
    "sub", "table", "thead", "tbody", "tr", "th", "td", "h4", "h5", "cite",
];

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, PartialEq, Eq)]
enum Tag<'a> {
    Open(&'a str),
    SelfClosing(&'a str),
    Close(&'a str),
}

/// Byte ranges of every tag or comment in `html`, in order. Text `<` that
/// does not start a tag (`a < b`) is left alone.
fn tag_spans(html: &str) -> Result<Vec<(usize, usize)>> {
    let bytes = html.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while let Some(off) = html[i..].find('<') {
        let start = i + off;
        let next = bytes.get(start + 1).copied();
        if html[start..].starts_with("<!--") {
            let end = html[start..].find("-->").ok_or_else(|| {
                NotationError::Markup(format!("unterminated comment at offset {start}"))
            })?;
            spans.push((start, start + end + 3));
            i = start + end + 3;
            continue;
        }
        let starts_tag = matches!(next, Some(b) if b.is_ascii_alphabetic() || b == b'/' || b == b'!');
        if !starts_tag {
            i = start + 1;
            continue;
        }
        let end = find_tag_end(html, start).ok_or_else(|| {
            NotationError::Markup(format!("unterminated tag '{}'", snippet(&html[start..])))
        })?;
        spans.push((start, end));
        i = end;
    }
    Ok(spans)
}

/// End (exclusive) of the tag opened at `start`, skipping quoted attributes.
fn find_tag_end(html: &str, start: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (off, c) in html[start + 1..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(start + 1 + off + 1),
            (None, '<') => return None,
            _ => {}
        }
    }
    None
}

fn classify(raw: &str) -> Option<Tag<'_>> {
    if raw.starts_with("<!") {
        return None;
    }
    let inner = raw.trim_start_matches('<').trim_end_matches('>');
    let (closing, inner) = match inner.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };
    let name_end = inner
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(inner.len());
    let name = &inner[..name_end];
    if closing {
        Some(Tag::Close(name))
    } else if inner.trim_end().ends_with('/') {
        Some(Tag::SelfClosing(name))
    } else {
        Some(Tag::Open(name))
    }
}

fn snippet(s: &str) -> String {
    s.chars().take(40).collect()
}

/// Check that tags nest properly; void elements need no closing tag. With
/// `allowed`, any tag outside the list is rejected.
pub fn validate(html: &str, allowed: Option<&[&str]>) -> Result<()> {
    let mut stack: Vec<String> = Vec::new();
    for (start, end) in tag_spans(html)? {
        let Some(tag) = classify(&html[start..end]) else {
            continue;
        };
        let name = match &tag {
            Tag::Open(n) | Tag::SelfClosing(n) | Tag::Close(n) => n.to_ascii_lowercase(),
        };
        if let Some(allowed) = allowed {
            if !allowed.contains(&name.as_str()) {
                return Err(NotationError::Markup(format!("tag <{name}> is not allowed here")));
            }
        }
        let is_void = VOID_ELEMENTS.contains(&name.as_str());
        match tag {
            Tag::Open(_) if is_void => {}
            Tag::SelfClosing(_) => {}
            Tag::Open(_) => stack.push(name),
            Tag::Close(_) if is_void => {
                return Err(NotationError::Markup(format!("closing tag for void element <{name}>")))
            }
            Tag::Close(_) => match stack.pop() {
                Some(open) if open == name => {}
                Some(open) => {
                    return Err(NotationError::Markup(format!(
                        "</{name}> closes <{open}>"
                    )))
                }
                None => {
                    return Err(NotationError::Markup(format!("</{name}> without opening tag")))
                }
            },
        }
    }
    match stack.pop() {
        Some(open) => Err(NotationError::Markup(format!("<{open}> is never closed"))),
        None => Ok(()),
    }
}

/// Em-dash for `--` and U+2212 for a hyphen that starts a number, applied
/// to text only (tags and comments are untouched). Idempotent.
pub fn normalize_typography(html: &str) -> String {
    let spans = match tag_spans(html) {
        Ok(spans) => spans,
        Err(_) => return html.to_string(),
    };
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    for (start, end) in spans {
        out.push_str(&normalize_text(&html[cursor..start]));
        out.push_str(&html[start..end]);
        cursor = end;
    }
    out.push_str(&normalize_text(&html[cursor..]));
    out
}

fn normalize_text(text: &str) -> String {
    let text = text.replace("--", "\u{2014}");
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let prev_ok = i == 0 || matches!(chars[i - 1], ' ' | '\t' | '\n' | '(' | '[' | '/');
        let next_digit = chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
        if c == '-' && prev_ok && next_digit {
            out.push(MINUS_SIGN);
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn balanced_documents_pass() {
        validate("<p>Hi <strong>there</strong><br></p>", None).unwrap();
        validate("<div class='a > b'><img src=\"x\"/><hr/></div>", None).unwrap();
        validate("a < b and <!-- <p> --> done", None).unwrap();
    }

    #[test]
    fn unbalanced_documents_fail() {
        assert!(validate("<p><strong>x</p></strong>", None).is_err());
        assert!(validate("<p>open", None).is_err());
        assert!(validate("close</p>", None).is_err());
        assert!(validate("<p class='x'", None).is_err());
        assert!(validate("<br></br>", None).is_err());
    }

    #[test]
    fn allow_list() {
        validate("<p><em>x</em></p>", Some(TOOLTIP_TAGS)).unwrap();
        let err = validate("<script>x</script>", Some(TOOLTIP_TAGS)).unwrap_err();
        assert!(err.to_string().contains("<script>"));
    }

    #[test]
    fn typography() {
        assert_eq!(
            normalize_typography("a -- b, take -2 (-1) <span data-x='-1'>x-2</span>"),
            "a \u{2014} b, take \u{2212}2 (\u{2212}1) <span data-x='-1'>x-2</span>"
        );
        let once = normalize_typography("x -- -3");
        assert_eq!(normalize_typography(&once), once);
    }

    #[test]
    fn escaping_hides_notation() {
        assert_eq!(escape("{{X:<b>}}"), "&#123;&#123;X:&lt;b&gt;&#125;&#125;");
    }
}
