use std::ops::RangeInclusive;

use serde_json::Value;

use super::Handler;
use crate::context::ProcessingContext;
use crate::errors::{NotationError, Result};
use crate::format::format_number;
use crate::html::escape;
use crate::notation::NotationProcessor;

const BOOKS: &[(&str, &str)] = &[
    ("CofD", "Chronicles of Darkness"),
    ("DtR", "Deviant: The Renegades"),
    ("HL", "Hurt Locker"),
    ("DtCC", "Deviant: The Collector's Cache"),
];

/// Full title for a book code.
pub fn book_title(code: &str) -> Option<&'static str> {
    BOOKS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code.trim()))
        .map(|(_, title)| *title)
}

/// `<span class='citation'><em>Title</em>, p. N</span>`
pub fn format_citation(book: &str, page: &str) -> Result<String> {
    let title = book_title(book)
        .ok_or_else(|| NotationError::handler("SOURCE", format!("unknown book code '{book}'")))?;
    let page = page.trim();
    if page.is_empty() {
        return Err(NotationError::handler("SOURCE", format!("no page given for '{book}'")));
    }
    Ok(format!(
        "<span class='citation'><em>{}</em>, p. {}</span>",
        escape(title),
        escape(page)
    ))
}

/// `BOOK/page`, a `{book, page}` object, or nothing citable.
pub(crate) fn citation_parts(v: &Value) -> Option<(String, String)> {
    match v {
        Value::String(s) => s
            .split_once('/')
            .map(|(b, p)| (b.trim().to_string(), p.trim().to_string())),
        Value::Object(map) => {
            let book = map.get("book")?.as_str()?.to_string();
            let page = match map.get("page")? {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.as_f64().map(format_number)?,
                _ => return None,
            };
            Some((book, page))
        }
        _ => None,
    }
}

/// `{{SOURCE:DtR/123}}` or `{{SOURCE:this.source}}`
pub struct Source;
impl Handler for Source {
    fn name(&self) -> &'static str {
        "SOURCE"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=1
    }
    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let raw = content.trim();
        let v = if raw.contains('/') {
            Value::String(raw.to_string())
        } else {
            p.resolve(raw, ctx)?
        };
        let (book, page) = citation_parts(&v).ok_or_else(|| {
            NotationError::handler(self.name(), format!("'{raw}' is not a BOOK/page citation"))
        })?;
        Ok(Value::String(format_citation(&book, &page)?))
    }
}
