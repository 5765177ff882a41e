use thiserror::Error;

// Every failure the renderer can raise, grouped the way the render policy treats them.
#[derive(Debug, Error)]
pub enum NotationError {
    // A `{{` with no matching `}}`; never downgraded to an inline error.
    #[error("unterminated notation: {snippet}")]
    Unterminated { snippet: String },

    // Malformed handler content, e.g. a bad CALC expression.
    #[error("syntax error: {0}")]
    Syntax(String),

    // Unknown handler name or stray bare word inside `{{...}}`.
    #[error("unsupported notation: {0}")]
    UnsupportedNotation(String),

    // Missing scope, missing path segment, array-key miss, non-traversable hop.
    #[error("cannot resolve '{expr}': {reason}")]
    Reference { expr: String, reason: String },

    // Wrong argument count/type, non-numeric operand, unresolvable display name.
    #[error("{handler}: {message}")]
    Handler { handler: String, message: String },

    // Authoring mistakes in rule data or advantages (always fatal).
    #[error("rule data error: {0}")]
    RuleData(String),

    // Two selected deviations replacing the same property (always fatal).
    #[error("deviation conflict on '{property}': '{first}' and '{second}' both replace it")]
    Conflict {
        property: String,
        first: String,
        second: String,
    },

    // Malformed HTML or a tag outside the allow-list.
    #[error("markup error: {0}")]
    Markup(String),

    // Processor invariant broken, e.g. notation left over after finalization.
    #[error("internal error: {0}")]
    Internal(String),
}

impl NotationError {
    pub fn reference(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        NotationError::Reference {
            expr: expr.into(),
            reason: reason.into(),
        }
    }

    pub fn handler(handler: impl Into<String>, message: impl Into<String>) -> Self {
        NotationError::Handler {
            handler: handler.into(),
            message: message.into(),
        }
    }

    /// Whether lenient mode may replace this error with an inline marker.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            NotationError::Syntax(_)
                | NotationError::UnsupportedNotation(_)
                | NotationError::Reference { .. }
                | NotationError::Handler { .. }
                | NotationError::Markup(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, NotationError>;
