//! # calc-core
//!
//! Foundation of the calculator service:
//!
//! - [`Number`]: integer/float values with checked arithmetic
//! - [`eval`]: sandboxed tokenizer → parser → tree evaluator over a fixed symbol table
//! - [`format`]: display formatting of results
//! - [`protocol`]: request/response wire types
//! - [`session`]: per-connection registers and the command dispatcher
//! - [`logging`]: `tracing` subscriber initialisation shared by the binaries

#![deny(unsafe_code)]

pub mod errors;
pub mod eval;
pub mod format;
pub mod logging;
pub mod number;
pub mod protocol;
pub mod session;

pub use errors::RequestError;
pub use eval::{EvalError, Evaluate, ScientificEvaluator};
pub use number::Number;
pub use protocol::{MemoryOp, Request, Response};
pub use session::Session;
