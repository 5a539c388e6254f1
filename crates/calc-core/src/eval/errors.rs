//! Evaluation failures.

use thiserror::Error;

/// Classified evaluation failure.
///
/// The `Display` text of each variant is exactly what a failed `calculate`
/// response carries in its `error` field.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Division or modulo by zero, or zero raised to a negative power.
    #[error("Division by zero")]
    DivisionByZero,

    /// Invalid argument to a mathematical function.
    #[error("Math error: {0}")]
    Domain(String),

    /// The expression could not be tokenized or parsed.
    ///
    /// The detail is kept for logs; clients only see `Invalid expression`.
    #[error("Invalid expression")]
    Syntax(String),

    /// Any other failure (unknown name, bad arity, overflow).
    #[error("Error: {0}")]
    Other(String),
}

impl EvalError {
    pub(crate) fn syntax(detail: impl Into<String>) -> Self {
        Self::Syntax(detail.into())
    }

    pub(crate) fn domain() -> Self {
        Self::Domain("math domain error".into())
    }

    pub(crate) fn other(detail: impl Into<String>) -> Self {
        Self::Other(detail.into())
    }
}
