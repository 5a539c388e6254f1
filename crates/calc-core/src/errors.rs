//! Request-level error types.

use thiserror::Error;

use crate::eval::EvalError;

/// Everything that turns a single request into a failure response.
///
/// None of these tear down the connection; the `Display` text becomes the
/// response's `error` field verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The payload is not a JSON document.
    #[error("Invalid JSON format")]
    InvalidJson,
    /// The payload bytes are not UTF-8.
    #[error("Invalid JSON format")]
    NotUtf8,
    /// The frame exceeded the configured maximum size.
    #[error("Request too large (max {max} bytes)")]
    FrameTooLarge {
        /// Configured limit in bytes.
        max: usize,
    },
    /// `command` is missing, not a string, or not recognized.
    #[error("Unknown command")]
    UnknownCommand,
    /// `expression` is present but not a string.
    #[error("Invalid expression")]
    InvalidExpression,
    /// `operation` is missing or not one of store/recall/clear/add.
    #[error("Invalid memory operation")]
    InvalidMemoryOperation,
    /// `value` is present but not a number.
    #[error("Invalid memory value")]
    InvalidMemoryValue,
    /// The expression failed to evaluate.
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Result type for request handling.
pub type Result<T> = std::result::Result<T, RequestError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
