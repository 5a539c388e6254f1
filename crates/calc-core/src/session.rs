//! Per-connection calculator state and command dispatch.

use tracing::debug;

use crate::errors::{RequestError, Result};
use crate::eval::{self, EvalError, Evaluate, ScientificEvaluator};
use crate::format::format_result;
use crate::number::Number;
use crate::protocol::{MemoryOp, Request, Response};

/// One connection's calculator: a memory register, the last result, and an
/// evaluator.
///
/// Each stream connection owns exactly one `Session`; nothing here is shared.
#[derive(Debug, Default)]
pub struct Session<E = ScientificEvaluator> {
    memory: Number,
    last_result: Number,
    evaluator: E,
}

impl Session {
    /// Fresh session with both registers at zero.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: Evaluate> Session<E> {
    /// Fresh session over a custom evaluator.
    pub fn with_evaluator(evaluator: E) -> Self {
        Self {
            memory: Number::ZERO,
            last_result: Number::ZERO,
            evaluator,
        }
    }

    /// Current memory register.
    pub fn memory(&self) -> Number {
        self.memory
    }

    /// Value of the last successful calculation.
    pub fn last_result(&self) -> Number {
        self.last_result
    }

    /// Decode one JSON payload and dispatch it. Never fails: every error
    /// becomes a failure [`Response`].
    pub fn handle_line(&mut self, line: &str) -> Response {
        match Request::from_json(line) {
            Ok(request) => self.dispatch(&request),
            Err(err) => {
                debug!(error = %err, "request rejected");
                Response::from(err)
            }
        }
    }

    /// Apply a decoded request.
    pub fn dispatch(&mut self, request: &Request) -> Response {
        debug!(command = request.command(), "dispatch");
        let outcome = match request {
            Request::Calculate { expression } => self.calculate(expression),
            Request::Memory { operation, value } => self.apply_memory(*operation, *value),
            Request::Ping => Ok(Response::pong()),
        };
        outcome.unwrap_or_else(Response::from)
    }

    fn calculate(&mut self, expression: &str) -> Result<Response> {
        let normalized = eval::preprocess(expression);
        let value = self
            .evaluator
            .evaluate(&normalized)
            .map_err(RequestError::from)?;
        self.last_result = value;
        Ok(Response::calculated(value, normalized, format_result(value)))
    }

    fn apply_memory(&mut self, operation: MemoryOp, value: Option<Number>) -> Result<Response> {
        let operand = value.unwrap_or(self.last_result);
        let next = match operation {
            MemoryOp::Store => operand,
            MemoryOp::Recall => self.memory,
            MemoryOp::Clear => Number::ZERO,
            MemoryOp::Add => self.memory.checked_add(operand),
        };
        // The register must stay representable as a JSON number.
        if !next.is_finite() {
            return Err(EvalError::other("math range error").into());
        }
        self.memory = next;
        Ok(Response::memory(operation, self.memory))
    }
}
