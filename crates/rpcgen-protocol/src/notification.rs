use serde::{Deserialize, Serialize};

use crate::request::RequestParams;
use crate::types::JsonRpcVersion;

/// A JSON-RPC notification: a request without an `id`.
///
/// Notifications are dispatched like requests but never answered; the
/// registry drops their results and their errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<RequestParams>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self {
            version: JsonRpcVersion::V2,
            method: method.into(),
            params,
        }
    }
}
