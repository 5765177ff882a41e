//! `{{TOOLTIP:[.class,]anchor,content}}`
//!
//! The anchor/content pair is registered with the processor and only a
//! placeholder token is spliced into the surrounding text.

use std::ops::RangeInclusive;

use serde_json::Value;

use super::source::{citation_parts, format_citation};
use super::{text_arg, Handler};
use crate::context::ProcessingContext;
use crate::errors::{NotationError, Result};
use crate::html::{self, TOOLTIP_TAGS};
use crate::notation::scan::split_args_limit;
use crate::notation::NotationProcessor;
use crate::value::stringify;

const REFERENCE_SCOPES: &[&str] = &["this.", "context.", "vars.", "json."];

pub struct Tooltip;

impl Handler for Tooltip {
    fn name(&self) -> &'static str {
        "TOOLTIP"
    }

    fn arity(&self) -> RangeInclusive<usize> {
        2..=usize::MAX
    }

    fn process(&self, content: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<Value> {
        let head = split_args_limit(content, ',', 2);
        let (class, rest): (Option<&str>, &str) = match head[..] {
            [first, rest] if first.starts_with('.') => (Some(&first[1..]), rest),
            _ => (None, content),
        };
        let parts = split_args_limit(rest, ',', 2);
        let [anchor, body] = parts[..] else {
            return Err(NotationError::handler(
                self.name(),
                "expected an anchor and a content argument",
            ));
        };

        let anchor_html = text_arg(anchor, ctx, p)?;
        let body_html = self.body(body, ctx, p)?;
        html::validate(&body_html, Some(TOOLTIP_TAGS))?;

        let id = p.next_id();
        let class = match class {
            Some(c) if !c.trim().is_empty() => format!("tooltip-anchor {}", c.trim()),
            _ => "tooltip-anchor".to_string(),
        };
        let rendered = format!(
            "<span class='{class}' data-tooltip='tt-{id}'>{anchor_html}</span>\
             <span class='tooltip-content' id='tt-{id}' role='tooltip'>{body_html}</span>"
        );
        let notation = format!("{{{{TOOLTIP:{content}}}}}");
        Ok(Value::String(p.register_tooltip(rendered, &notation)))
    }
}

impl Tooltip {
    fn body(&self, arg: &str, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<String> {
        let arg = arg.trim();
        let is_reference = REFERENCE_SCOPES.iter().any(|s| arg.starts_with(s))
            && !arg.contains(char::is_whitespace);
        if !is_reference {
            return text_arg(arg, ctx, p);
        }
        match p.resolve(arg, ctx)? {
            Value::String(s) => p.expand(&s, ctx),
            v @ Value::Object(_) if is_descriptor(&v) => render_descriptor(&v, ctx, p),
            other => Ok(stringify(&other)),
        }
    }
}

fn is_descriptor(v: &Value) -> bool {
    ["title", "subtitle", "blocks", "citation"]
        .iter()
        .any(|field| v.get(*field).is_some())
}

/// `{title, subtitle, blocks[], citation}` as tooltip HTML.
fn render_descriptor(v: &Value, ctx: &ProcessingContext, p: &NotationProcessor) -> Result<String> {
    let mut out = String::new();
    if let Some(title) = v.get("title").and_then(Value::as_str) {
        out.push_str(&format!("<h4 class='tooltip-title'>{}</h4>", p.expand(title, ctx)?));
    }
    if let Some(subtitle) = v.get("subtitle").and_then(Value::as_str) {
        out.push_str(&format!(
            "<h5 class='tooltip-subtitle'>{}</h5>",
            p.expand(subtitle, ctx)?
        ));
    }
    if let Some(blocks) = v.get("blocks").and_then(Value::as_array) {
        for block in blocks {
            let text = match block {
                Value::String(s) => s.clone(),
                other => stringify(other),
            };
            out.push_str(&format!("<p>{}</p>", p.expand(&text, ctx)?));
        }
    }
    if let Some(citation) = v.get("citation") {
        let cited = match citation_parts(citation) {
            Some((book, page)) => format_citation(&book, &page)?,
            None => html::escape(&stringify(citation)),
        };
        out.push_str(&format!("<cite class='tooltip-citation'>{cited}</cite>"));
    }
    Ok(out)
}
