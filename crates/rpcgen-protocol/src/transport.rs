//! The client-side seam.
//!
//! Generated clients never open sockets: they serialize a request value and
//! hand it to a [`Transport`], which is supplied by the application (an HTTP
//! client, a test double, a pipe). Timeouts, retries and connection
//! management all live behind this trait.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::error_codes;
use crate::response::JsonRpcMessage;
use crate::types::RequestId;

/// Carries one request body to the server and returns the response body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Value) -> Result<Value, TransportError>;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport failure: {0}")]
    Failed(String),
}

/// Failure modes of one generated client call.
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with an error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// The response body did not follow JSON-RPC 2.0.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl CallError {
    /// Distinguishes protocol-level errors (the reserved range, e.g.
    /// Method Not Found) from application codes declared per method.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            CallError::Rpc { code, .. }
                if (error_codes::RESERVED_START..=error_codes::RESERVED_END).contains(code)
        )
    }
}

/// Decode a response body for the call with id `expected`.
///
/// Generated client methods call this with their concrete return type.
pub fn decode_response<T: DeserializeOwned>(
    body: Value,
    expected: &RequestId,
) -> Result<T, CallError> {
    let message: JsonRpcMessage = serde_json::from_value(body)
        .map_err(|err| CallError::Malformed(err.to_string()))?;
    match message {
        JsonRpcMessage::Error(err) => Err(CallError::Rpc {
            code: err.error.code,
            message: err.error.message,
            data: err.error.data,
        }),
        JsonRpcMessage::Response(resp) => {
            if resp.id != *expected {
                return Err(CallError::Malformed(format!(
                    "response id {} does not match request id {}",
                    resp.id, expected
                )));
            }
            serde_json::from_value(resp.result)
                .map_err(|err| CallError::Malformed(format!("result: {err}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_typed_result() {
        let body = json!({"jsonrpc": "2.0", "id": 4, "result": 6});
        let n: i64 = decode_response(body, &RequestId::Number(4)).unwrap();
        assert_eq!(n, 6);
    }

    #[test]
    fn surfaces_error_object() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 4,
            "error": {"code": 401, "message": "unauthorized"}
        });
        let err = decode_response::<i64>(body, &RequestId::Number(4)).unwrap_err();
        match err {
            CallError::Rpc { code, message, .. } => {
                assert_eq!(code, 401);
                assert_eq!(message, "unauthorized");
            }
            other => panic!("expected Rpc error, got {other:?}"),
        }
    }

    #[test]
    fn protocol_errors_are_distinguished() {
        let protocol = CallError::Rpc {
            code: -32601,
            message: "Method not found".into(),
            data: None,
        };
        assert!(protocol.is_protocol_error());

        let application = CallError::Rpc {
            code: 401,
            message: "unauthorized".into(),
            data: None,
        };
        assert!(!application.is_protocol_error());
    }

    #[test]
    fn id_mismatch_is_malformed() {
        let body = json!({"jsonrpc": "2.0", "id": 5, "result": 6});
        let err = decode_response::<i64>(body, &RequestId::Number(4)).unwrap_err();
        assert!(matches!(err, CallError::Malformed(_)));
    }

    #[test]
    fn result_type_mismatch_is_malformed() {
        let body = json!({"jsonrpc": "2.0", "id": 4, "result": "six"});
        let err = decode_response::<i64>(body, &RequestId::Number(4)).unwrap_err();
        assert!(matches!(err, CallError::Malformed(_)));
    }
}
