//! The notation processor: expands `{{...}}` spans in template text.

pub mod placeholder;
pub mod scan;

use std::cell::RefCell;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::ProcessorConfig;
use crate::context::ProcessingContext;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticsSink, TracingSink};
use crate::errors::{NotationError, Result};
use crate::format::{is_pronoun, pronoun, Sex};
use crate::handlers::Registry;
use crate::html;
use crate::reference::ReferenceResolver;
use crate::system_data::SystemDataLoader;
use crate::value::stringify;

use placeholder::Placeholders;
use scan::{find_span, has_notation, split_args, split_handler};

struct RenderState {
    placeholders: Placeholders,
    depth: usize,
    expansions: usize,
}

/// Expands notation spans and finalizes the resulting document.
///
/// Not shareable across threads: one processor renders one document at a
/// time, and nested calls made by handlers share its placeholder registry.
pub struct NotationProcessor {
    resolver: ReferenceResolver,
    registry: Registry,
    config: ProcessorConfig,
    sink: Arc<dyn DiagnosticsSink>,
    state: RefCell<RenderState>,
}

struct DepthGuard<'a> {
    state: &'a RefCell<RenderState>,
}

impl<'a> DepthGuard<'a> {
    fn enter(state: &'a RefCell<RenderState>) -> Self {
        state.borrow_mut().depth += 1;
        Self { state }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.depth = state.depth.saturating_sub(1);
    }
}

/// Maps positions in partly expanded text back to the template. Text
/// produced by a replacement maps to the start of the span it replaced.
#[derive(Default)]
struct SourceOffsets {
    /// Expanded length minus source length, for positions past `frontier`.
    delta: isize,
    /// End of the rightmost replacement, in expanded coordinates.
    frontier: usize,
    /// Source start of the span that produced the text before `frontier`.
    anchor: usize,
}

impl SourceOffsets {
    fn source(&self, at: usize) -> usize {
        if at >= self.frontier {
            (at as isize - self.delta).max(0) as usize
        } else {
            self.anchor
        }
    }

    fn replaced(&mut self, start: usize, end: usize, len: usize) {
        if start >= self.frontier {
            self.anchor = self.source(start);
        }
        let shift = len as isize - (end - start) as isize;
        let moved = (self.frontier as isize + shift).max(0) as usize;
        self.frontier = moved.max(start + len);
        self.delta += shift;
    }
}

impl NotationProcessor {
    pub fn new(loader: Arc<SystemDataLoader>) -> Self {
        Self::with_config(loader, ProcessorConfig::default())
    }

    pub fn with_config(loader: Arc<SystemDataLoader>, config: ProcessorConfig) -> Self {
        Self {
            resolver: ReferenceResolver::new(loader),
            registry: Registry::with_builtins(),
            state: RefCell::new(RenderState {
                placeholders: Placeholders::new(config.placeholder_seed),
                depth: 0,
                expansions: 0,
            }),
            config,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn sink(&self) -> &dyn DiagnosticsSink {
        self.sink.as_ref()
    }

    /// Resolve a reference expression in `ctx`.
    pub fn resolve(&self, expression: &str, ctx: &ProcessingContext) -> Result<Value> {
        self.resolver.resolve(expression, ctx)
    }

    /// Expand and finalize `text`. Called from inside a handler it behaves
    /// like [`expand`](Self::expand) so the outermost call finalizes once.
    pub fn process(&self, text: &str, ctx: &ProcessingContext) -> Result<String> {
        if self.state.borrow().depth > 0 {
            return self.expand(text, ctx);
        }
        {
            let mut state = self.state.borrow_mut();
            state.placeholders.clear();
            state.expansions = 0;
        }
        let expanded = self.expand(text, ctx)?;
        self.finalize(&expanded)
    }

    /// Expand every span in `text` without finalizing. Handlers use this
    /// for their sub-expressions.
    pub fn expand(&self, text: &str, ctx: &ProcessingContext) -> Result<String> {
        let _guard = DepthGuard::enter(&self.state);
        let mut out = text.to_string();
        let mut offsets = SourceOffsets::default();
        let mut pos = 0;
        while let Some(span) = find_span(&out, pos)? {
            self.count_expansion()?;
            let notation = span.whole(&out).to_string();
            let replacement = match self.evaluate(span.inner(&out), ctx) {
                Ok(rendered) => rendered,
                Err(e) if !ctx.strict && e.is_recoverable() => {
                    let source = offsets.source(span.start);
                    let lines_before = text.get(..source).map_or(0, |t| t.matches('\n').count());
                    self.inline_error(&e, &notation, lines_before, ctx)
                }
                Err(e) => return Err(e),
            };
            out.replace_range(span.start..span.end, &replacement);
            offsets.replaced(span.start, span.end, replacement.len());
            pos = span.start;
        }
        Ok(out)
    }

    fn count_expansion(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.expansions += 1;
        if state.expansions > self.config.max_expansions {
            return Err(NotationError::handler(
                "process",
                format!(
                    "more than {} notation expansions; a handler may be re-emitting its own notation",
                    self.config.max_expansions
                ),
            ));
        }
        Ok(())
    }

    fn evaluate(&self, inner: &str, ctx: &ProcessingContext) -> Result<String> {
        let trimmed = inner.trim();
        if is_pronoun(trimmed) {
            let sex = Sex::parse(ctx.context.get("sex").and_then(Value::as_str));
            return pronoun(trimmed, sex)
                .ok_or_else(|| NotationError::UnsupportedNotation(trimmed.to_string()));
        }
        let upper = trimmed.to_ascii_uppercase();
        if upper == "NAME" || upper == "BR" {
            return self.dispatch(&upper, "", ctx);
        }
        match split_handler(trimmed) {
            Some((name, content)) => self.dispatch(name, content, ctx),
            None => Err(NotationError::UnsupportedNotation(format!(
                "'{trimmed}' is neither a keyword nor HANDLER:content"
            ))),
        }
    }

    /// Run one handler by name with its raw content.
    pub fn dispatch(&self, name: &str, content: &str, ctx: &ProcessingContext) -> Result<String> {
        let handler = self
            .registry
            .get(name)
            .ok_or_else(|| NotationError::UnsupportedNotation(format!("unknown handler '{name}'")))?;
        let argc = if content.trim().is_empty() {
            0
        } else {
            split_args(content, ',').len()
        };
        let arity = handler.arity();
        if !arity.contains(&argc) {
            return Err(NotationError::handler(
                handler.name(),
                format!(
                    "expected {} argument(s), got {argc}",
                    describe_arity(arity.start(), arity.end())
                ),
            ));
        }
        let value = handler.process(content, ctx, self)?;
        Ok(match value {
            Value::String(s) => s,
            other => stringify(&other),
        })
    }

    /// Fresh identifier for visual anchors.
    pub fn next_id(&self) -> String {
        self.state.borrow_mut().placeholders.next_id()
    }

    /// Keep tooltip HTML aside and get the token to splice in its place.
    pub fn register_tooltip(&self, html: String, notation: &str) -> String {
        if self.config.debug_tooltips {
            self.sink.record(
                Diagnostic::new(DiagnosticKind::TooltipRegistered, html.clone())
                    .with_notation(notation),
            );
        }
        self.state.borrow_mut().placeholders.register(html)
    }

    fn inline_error(
        &self,
        error: &NotationError,
        notation: &str,
        lines_before: usize,
        ctx: &ProcessingContext,
    ) -> String {
        let location = ctx
            .location
            .as_ref()
            .map(|l| l.offset(lines_before).to_string())
            .unwrap_or_else(|| "unknown".to_string());
        self.sink.record(
            Diagnostic::new(DiagnosticKind::InlineError, error.to_string()).with_notation(notation),
        );
        format!(
            "<span class='inline-error'>{} | Notation: {} | Context: {} | Location: {}</span>",
            html::escape(&error.to_string()),
            html::escape(notation),
            html::escape(&ctx.describe()),
            html::escape(&location),
        )
    }

    fn finalize(&self, text: &str) -> Result<String> {
        let substituted = if self.config.preserve_placeholders {
            let count = self.state.borrow().placeholders.len();
            if count > 0 {
                self.sink.record(Diagnostic::new(
                    DiagnosticKind::PlaceholderPreserved,
                    format!("{count} tooltip placeholder(s) left in output"),
                ));
            }
            text.to_string()
        } else {
            self.state.borrow().placeholders.substitute(text)?
        };
        if has_notation(&substituted) {
            let at = substituted.find("{{").unwrap_or(0);
            return Err(NotationError::Internal(format!(
                "notation left after finalization: '{}'",
                substituted[at..].chars().take(40).collect::<String>()
            )));
        }
        let finished = if self.config.typography {
            html::normalize_typography(&substituted)
        } else {
            substituted
        };
        html::validate(&finished, None)?;
        debug!(bytes = finished.len(), "finalized document");
        Ok(finished)
    }
}

fn describe_arity(min: &usize, max: &usize) -> String {
    if min == max {
        min.to_string()
    } else if *max == usize::MAX {
        format!("at least {min}")
    } else {
        format!("{min} to {max}")
    }
}
