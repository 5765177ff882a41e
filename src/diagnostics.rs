//! Diagnostics sinks injected into the processor.
//!
//! Tooltip tracing and inline-error reporting go through a sink handed to
//! the processor at construction rather than through ambient process state.

use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    TooltipRegistered,
    InlineError,
    PlaceholderPreserved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub notation: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            notation: None,
        }
    }

    pub fn with_notation(mut self, notation: impl Into<String>) -> Self {
        self.notation = Some(notation.into());
        self
    }
}

pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, diagnostic: Diagnostic) {
        match diagnostic.kind {
            DiagnosticKind::InlineError => tracing::warn!(
                notation = diagnostic.notation.as_deref().unwrap_or(""),
                "{}",
                diagnostic.message
            ),
            _ => tracing::debug!(
                kind = ?diagnostic.kind,
                notation = diagnostic.notation.as_deref().unwrap_or(""),
                "{}",
                diagnostic.message
            ),
        }
    }
}

/// Collects diagnostics in memory, mostly for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.events().iter().filter(|d| d.kind == kind).count()
    }
}

impl DiagnosticsSink for MemorySink {
    fn record(&self, diagnostic: Diagnostic) {
        if let Ok(mut events) = self.events.lock() {
            events.push(diagnostic);
        }
    }
}
