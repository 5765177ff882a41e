use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Where a template came from, for inline error markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    pub(crate) fn offset(&self, extra_lines: usize) -> Self {
        Self {
            file: self.file.clone(),
            line: self.line + extra_lines,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Evaluation scope for one `process` call.
///
/// Never mutated in place: nested evaluation derives a new context with
/// `with_entity`/`with_vars`, which share the underlying values.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    pub context: Arc<Value>,
    pub this_entity: Option<Arc<Value>>,
    pub vars: Option<Arc<Value>>,
    pub strict: bool,
    pub location: Option<SourceLocation>,
}

impl ProcessingContext {
    pub fn new(context: Value) -> Self {
        Self::from_shared(Arc::new(context))
    }

    pub fn from_shared(context: Arc<Value>) -> Self {
        Self {
            context,
            this_entity: None,
            vars: None,
            strict: true,
            location: None,
        }
    }

    pub fn with_entity(&self, entity: Value) -> Self {
        Self {
            this_entity: Some(Arc::new(entity)),
            ..self.clone()
        }
    }

    pub fn with_vars(&self, vars: Value) -> Self {
        Self {
            vars: Some(Arc::new(vars)),
            ..self.clone()
        }
    }

    pub fn with_strict(&self, strict: bool) -> Self {
        Self {
            strict,
            ..self.clone()
        }
    }

    pub fn with_location(&self, location: SourceLocation) -> Self {
        Self {
            location: Some(location),
            ..self.clone()
        }
    }

    pub fn entity(&self) -> Option<&Value> {
        self.this_entity.as_deref()
    }

    /// Short label for diagnostics: the entity key or name, else `context`.
    pub fn describe(&self) -> String {
        self.entity()
            .and_then(|e| {
                e.get("key")
                    .or_else(|| e.get("name"))
                    .and_then(Value::as_str)
                    .map(|s| format!("this={s}"))
            })
            .unwrap_or_else(|| "context".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn derived_contexts_keep_the_shared_graph() {
        let base = ProcessingContext::new(json!({"name": "Ada"}));
        let nested = base.with_entity(json!({"key": "allies"})).with_strict(false);
        assert!(Arc::ptr_eq(&base.context, &nested.context));
        assert!(base.strict);
        assert!(!nested.strict);
        assert_eq!(nested.describe(), "this=allies");
        assert_eq!(base.describe(), "context");
    }
}
