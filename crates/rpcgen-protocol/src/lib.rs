//! # JSON-RPC 2.0 runtime for generated services
//!
//! Everything `rpcgen`-generated code needs at runtime: the wire types of
//! JSON-RPC 2.0, the [`Registry`] that processes request envelopes (single
//! and batch), the [`ParamSet`] decoder used inside generated dispatch arms,
//! and the [`Transport`] trait generated clients call through.
//!
//! The crate is transport agnostic. A generated server is driven by handing
//! request bodies to [`Registry::dispatch`]; how those bodies arrive (HTTP,
//! WebSocket, a pipe) is the caller's concern. A generated client builds
//! request values and sends them through whatever [`Transport`] it is given.

pub mod error;
pub mod notification;
pub mod params;
pub mod registry;
pub mod request;
pub mod response;
pub mod transport;
pub mod types;

// Re-exports for generated code, which depends on this crate alone. The
// macros resolve through these paths (`rpcgen_protocol::serde_json::json!`,
// `#[rpcgen_protocol::async_trait]`), so consuming crates do not need the
// underlying crates as direct dependencies.
pub use async_trait::async_trait;
pub use serde;
pub use serde_json;
pub use tracing;

pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, ServiceError};
pub use notification::JsonRpcNotification;
pub use params::ParamSet;
pub use registry::{InvokeError, MethodInvoker, Registry};
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessage, JsonRpcResponse};
pub use transport::{CallError, Transport, TransportError, decode_response};
pub use types::{JsonRpcVersion, RequestId, Service};

/// JSON-RPC 2.0 version string carried in every request and response.
pub const JSONRPC_VERSION: &str = "2.0";

/// Reserved JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Inclusive bounds of the range reserved by the protocol.
    pub const RESERVED_START: i64 = -32768;
    pub const RESERVED_END: i64 = -32000;
}
