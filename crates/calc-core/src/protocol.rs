//! Wire types shared by the stream server, the relay, and the client.
//!
//! A request is a JSON object with a `command` discriminator:
//!
//! ```json
//! {"command": "calculate", "expression": "2+2"}
//! {"command": "memory", "operation": "store", "value": 5}
//! {"command": "ping"}
//! ```
//!
//! Decoding is hand-rolled over [`serde_json::Value`] rather than derived so
//! each malformed field maps to its own error label (see [`RequestError`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{RequestError, Result};
use crate::number::Number;

/// Memory register operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryOp {
    /// Overwrite memory with `value` (or the last result).
    Store,
    /// Read memory.
    Recall,
    /// Reset memory to zero.
    Clear,
    /// Add `value` (or the last result) to memory.
    Add,
}

impl MemoryOp {
    /// Wire name of the operation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Recall => "recall",
            Self::Clear => "clear",
            Self::Add => "add",
        }
    }

    /// Past-tense name echoed in the `operation` field of a response.
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Store => "stored",
            Self::Recall => "recalled",
            Self::Clear => "cleared",
            Self::Add => "added",
        }
    }
}

impl FromStr for MemoryOp {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "store" => Ok(Self::Store),
            "recall" => Ok(Self::Recall),
            "clear" => Ok(Self::Clear),
            "add" => Ok(Self::Add),
            _ => Err(RequestError::InvalidMemoryOperation),
        }
    }
}

impl fmt::Display for MemoryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Request {
    /// Evaluate an expression.
    Calculate {
        /// Raw expression text, before preprocessing.
        expression: String,
    },
    /// Operate on the memory register.
    Memory {
        /// Which operation.
        operation: MemoryOp,
        /// Explicit operand; `None` means "use the last result".
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Number>,
    },
    /// Liveness check.
    Ping,
}

impl Request {
    /// Decode a request from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|_| RequestError::InvalidJson)?;
        Self::from_value(&value)
    }

    /// Decode a request from an already-parsed JSON value.
    pub fn from_value(value: &Value) -> Result<Self> {
        let command = value
            .get("command")
            .and_then(Value::as_str)
            .ok_or(RequestError::UnknownCommand)?;

        match command {
            "calculate" => {
                let expression = match value.get("expression") {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s.clone(),
                    Some(_) => return Err(RequestError::InvalidExpression),
                };
                Ok(Self::Calculate { expression })
            }
            "memory" => {
                let operation = value
                    .get("operation")
                    .and_then(Value::as_str)
                    .ok_or(RequestError::InvalidMemoryOperation)?
                    .parse()?;
                let value = match value.get("value") {
                    None | Some(Value::Null) => None,
                    Some(Value::Number(n)) => Some(number_from_json(n)),
                    Some(_) => return Err(RequestError::InvalidMemoryValue),
                };
                Ok(Self::Memory { operation, value })
            }
            "ping" => Ok(Self::Ping),
            _ => Err(RequestError::UnknownCommand),
        }
    }

    /// Command name used in logs.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Calculate { .. } => "calculate",
            Self::Memory { .. } => "memory",
            Self::Ping => "ping",
        }
    }
}

fn number_from_json(n: &serde_json::Number) -> Number {
    match n.as_i64() {
        Some(i) => Number::Int(i),
        None => Number::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

/// A response. Only the fields relevant to the command are serialized.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the request succeeded.
    pub success: bool,
    /// Numeric result of `calculate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Number>,
    /// Normalized expression that was evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Display rendering of `result`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_result: Option<String>,
    /// Memory register after a `memory` command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Number>,
    /// Past-tense name of the applied memory operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Informational text (ping, greeting).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Message kind; only the relay greeting sets this.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Successful `calculate`.
    pub fn calculated(result: Number, expression: String, formatted_result: String) -> Self {
        Self {
            success: true,
            result: Some(result),
            expression: Some(expression),
            formatted_result: Some(formatted_result),
            ..Self::default()
        }
    }

    /// Successful `memory` operation.
    pub fn memory(operation: MemoryOp, memory: Number) -> Self {
        Self {
            success: true,
            memory: Some(memory),
            operation: Some(operation.past_tense().to_string()),
            ..Self::default()
        }
    }

    /// Reply to `ping`.
    pub fn pong() -> Self {
        Self {
            success: true,
            message: Some("Server is running".to_string()),
            ..Self::default()
        }
    }

    /// Greeting the relay sends when a message client attaches.
    pub fn greeting() -> Self {
        Self {
            success: true,
            message: Some("Connected to calculator server".to_string()),
            kind: Some("connection".to_string()),
            ..Self::default()
        }
    }

    /// Failure with the given text.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

impl From<RequestError> for Response {
    fn from(err: RequestError) -> Self {
        Self::error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn decode_calculate() {
        let req = Request::from_json(r#"{"command":"calculate","expression":"2+2"}"#).unwrap();
        assert_eq!(
            req,
            Request::Calculate {
                expression: "2+2".into()
            }
        );
    }

    #[test]
    fn calculate_without_expression_is_empty() {
        let req = Request::from_json(r#"{"command":"calculate"}"#).unwrap();
        assert_eq!(
            req,
            Request::Calculate {
                expression: String::new()
            }
        );
    }

    #[test]
    fn calculate_with_non_string_expression() {
        let err = Request::from_json(r#"{"command":"calculate","expression":42}"#).unwrap_err();
        assert_eq!(err, RequestError::InvalidExpression);
    }

    #[test]
    fn decode_memory() {
        let req = Request::from_json(r#"{"command":"memory","operation":"store","value":5}"#)
            .unwrap();
        assert_eq!(
            req,
            Request::Memory {
                operation: MemoryOp::Store,
                value: Some(Number::Int(5))
            }
        );

        let req = Request::from_json(r#"{"command":"memory","operation":"add","value":1.5}"#)
            .unwrap();
        assert_matches!(
            req,
            Request::Memory {
                operation: MemoryOp::Add,
                value: Some(Number::Float(v))
            } if (v - 1.5).abs() < f64::EPSILON
        );

        let req =
            Request::from_json(r#"{"command":"memory","operation":"recall","value":null}"#)
                .unwrap();
        assert_eq!(
            req,
            Request::Memory {
                operation: MemoryOp::Recall,
                value: None
            }
        );
    }

    #[test]
    fn memory_errors() {
        assert_eq!(
            Request::from_json(r#"{"command":"memory","operation":"multiply"}"#),
            Err(RequestError::InvalidMemoryOperation)
        );
        assert_eq!(
            Request::from_json(r#"{"command":"memory"}"#),
            Err(RequestError::InvalidMemoryOperation)
        );
        assert_eq!(
            Request::from_json(r#"{"command":"memory","operation":"store","value":"5"}"#),
            Err(RequestError::InvalidMemoryValue)
        );
    }

    #[test]
    fn command_errors() {
        assert_eq!(
            Request::from_json(r#"{"command":"explode"}"#),
            Err(RequestError::UnknownCommand)
        );
        assert_eq!(
            Request::from_json(r#"{"expression":"1"}"#),
            Err(RequestError::UnknownCommand)
        );
        assert_eq!(
            Request::from_json(r#"{"command":7}"#),
            Err(RequestError::UnknownCommand)
        );
        assert_eq!(Request::from_json("[1,2]"), Err(RequestError::UnknownCommand));
    }

    #[test]
    fn malformed_json() {
        assert_eq!(Request::from_json("not json"), Err(RequestError::InvalidJson));
        assert_eq!(
            Request::from_json(r#"{"command":"ping""#),
            Err(RequestError::InvalidJson)
        );
    }

    #[test]
    fn request_serializes_with_command_tag() {
        let req = Request::Memory {
            operation: MemoryOp::Store,
            value: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"command": "memory", "operation": "store"})
        );
        assert_eq!(
            serde_json::to_value(Request::Ping).unwrap(),
            json!({"command": "ping"})
        );
    }

    #[test]
    fn serialized_requests_decode_back() {
        for req in [
            Request::Ping,
            Request::Calculate {
                expression: "sqrt(2)".into(),
            },
            Request::Memory {
                operation: MemoryOp::Add,
                value: Some(Number::Int(3)),
            },
        ] {
            let text = serde_json::to_string(&req).unwrap();
            assert_eq!(Request::from_json(&text).unwrap(), req);
        }
    }

    #[test]
    fn response_shapes() {
        assert_eq!(
            serde_json::to_value(Response::pong()).unwrap(),
            json!({"success": true, "message": "Server is running"})
        );
        assert_eq!(
            serde_json::to_value(Response::greeting()).unwrap(),
            json!({
                "success": true,
                "message": "Connected to calculator server",
                "type": "connection"
            })
        );
        assert_eq!(
            serde_json::to_value(Response::memory(MemoryOp::Clear, Number::ZERO)).unwrap(),
            json!({"success": true, "memory": 0, "operation": "cleared"})
        );
        assert_eq!(
            serde_json::to_value(Response::from(RequestError::UnknownCommand)).unwrap(),
            json!({"success": false, "error": "Unknown command"})
        );
    }

    #[test]
    fn calculated_response_keeps_number_kind() {
        let resp = Response::calculated(Number::Float(2.0), "4/2".into(), "2".into());
        assert_eq!(
            serde_json::to_string(&resp).unwrap(),
            r#"{"success":true,"result":2.0,"expression":"4/2","formatted_result":"2"}"#
        );
    }

    #[test]
    fn memory_op_names() {
        assert_eq!("add".parse::<MemoryOp>().unwrap(), MemoryOp::Add);
        assert_eq!(MemoryOp::Recall.past_tense(), "recalled");
        assert_eq!(MemoryOp::Store.to_string(), "store");
    }
}
