use std::fmt;

use serde::{Deserialize, Serialize};

/// JSON-RPC request identifier.
///
/// The protocol allows strings and numbers. Fractional numeric ids are not
/// supported; generated clients only ever mint integer ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// The `jsonrpc` member. Only `"2.0"` exists; deserialization of anything
/// else fails, which is how envelope validation rejects wrong versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsonRpcVersion {
    #[serde(rename = "2.0")]
    V2,
}

impl Default for JsonRpcVersion {
    fn default() -> Self {
        JsonRpcVersion::V2
    }
}

/// Marker type embedded in a struct field to tag that struct as an RPC
/// service.
///
/// The scanner recognises services structurally: a struct is a service iff
/// one of its fields has this type, written either fully qualified
/// (`rpcgen_protocol::Service`) or through a `use` of this item. A field
/// whose type merely happens to be *named* `Service` is not a marker.
///
/// ```ignore
/// pub struct Arith {
///     rpc: rpcgen_protocol::Service,
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Service;
