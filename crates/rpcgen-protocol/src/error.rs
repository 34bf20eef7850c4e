use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error_codes;
use crate::types::RequestId;

/// Classified JSON-RPC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    /// A code declared by the application, outside the reserved range.
    Application(i64),
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::Application(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::Application(_) => "Application error",
        }
    }

    /// Whether a code falls inside the range the protocol reserves.
    pub fn is_reserved(code: i64) -> bool {
        (error_codes::RESERVED_START..=error_codes::RESERVED_END).contains(&code)
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// The `error` member of an error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(JsonRpcErrorCode::ParseError, None, None)
    }

    pub fn invalid_request() -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, None, None)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            Some(format!("Method '{method}' not found")),
            None,
        )
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::InvalidParams,
            Some(message.to_string()),
            None,
        )
    }

    /// The generic internal error. Deliberately carries no detail; the raw
    /// cause stays on the server side.
    pub fn internal_error() -> Self {
        Self::new(JsonRpcErrorCode::InternalError, None, None)
    }

    /// A declared application error, passed through verbatim.
    pub fn application(err: ServiceError) -> Self {
        Self::new(
            JsonRpcErrorCode::Application(err.code),
            Some(err.message),
            err.data,
        )
    }
}

/// A complete JSON-RPC error response.
///
/// `id` is `None` when the request id could not be recovered (parse errors,
/// structurally invalid entries); JSON-RPC 2.0 requires it to serialize as
/// `"id": null` in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: String,
    pub id: Option<RequestId>,
    pub error: JsonRpcErrorObject,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            version: crate::JSONRPC_VERSION.to_string(),
            id,
            error,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorObject::parse_error())
    }

    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_request())
    }

    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(Some(id), JsonRpcErrorObject::method_not_found(method))
    }

    pub fn invalid_params(id: RequestId, message: &str) -> Self {
        Self::new(Some(id), JsonRpcErrorObject::invalid_params(message))
    }

    pub fn internal_error(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorObject::internal_error())
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.error.code, self.error.message)
    }
}

impl std::error::Error for JsonRpcError {}

/// An application-level error a service method may return.
///
/// Methods declare their expected codes in doc directives; the generated
/// dispatcher passes declared codes through verbatim and collapses anything
/// undeclared into the generic internal error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message} (code {code})")]
pub struct ServiceError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ServiceError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_codes() {
        assert_eq!(JsonRpcErrorCode::ParseError.code(), -32700);
        assert_eq!(JsonRpcErrorCode::MethodNotFound.code(), -32601);
        assert!(JsonRpcErrorCode::is_reserved(-32000));
        assert!(JsonRpcErrorCode::is_reserved(-32768));
        assert!(!JsonRpcErrorCode::is_reserved(-31999));
        assert!(!JsonRpcErrorCode::is_reserved(401));
    }

    #[test]
    fn error_serialization_keeps_null_id() {
        let err = JsonRpcError::parse_error();
        let text = serde_json::to_string(&err).unwrap();
        assert!(text.contains("\"id\":null"));
        assert!(text.contains("-32700"));
    }

    #[test]
    fn declared_error_passes_through() {
        let service_err =
            ServiceError::new(401, "unauthorized").with_data(serde_json::json!({"user": "n"}));
        let obj = JsonRpcErrorObject::application(service_err);
        assert_eq!(obj.code, 401);
        assert_eq!(obj.message, "unauthorized");
        assert!(obj.data.is_some());
    }

    #[test]
    fn internal_error_is_generic() {
        let obj = JsonRpcErrorObject::internal_error();
        assert_eq!(obj.message, "Internal error");
        assert!(obj.data.is_none());
    }
}
