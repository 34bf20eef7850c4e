use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{JsonRpcVersion, RequestId};

/// Parameters of a JSON-RPC request: positional array or named object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters, matched to declared parameter order.
    Array(Vec<Value>),
    /// Named parameters, matched by declared parameter name.
    Object(Map<String, Value>),
}

impl RequestParams {
    /// Look up a named parameter. Positional params have no names.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            RequestParams::Object(map) => map.get(name),
            RequestParams::Array(_) => None,
        }
    }

    /// Look up a positional parameter. Named params have no indices.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            RequestParams::Array(values) => values.get(index),
            RequestParams::Object(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RequestParams::Array(values) => values.len(),
            RequestParams::Object(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(values: Vec<Value>) -> Self {
        RequestParams::Array(values)
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

/// A JSON-RPC request carrying an id. Requests without an id are
/// notifications and are modelled separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<RequestParams>,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self {
            version: JsonRpcVersion::V2,
            id,
            method: method.into(),
            params,
        }
    }

    /// Request with named parameters. Generated clients use this shape.
    pub fn with_object_params(
        id: RequestId,
        method: impl Into<String>,
        params: Map<String, Value>,
    ) -> Self {
        Self::new(id, method, Some(RequestParams::Object(params)))
    }

    /// Request with positional parameters.
    pub fn with_array_params(
        id: RequestId,
        method: impl Into<String>,
        params: Vec<Value>,
    ) -> Self {
        Self::new(id, method, Some(RequestParams::Array(params)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_roundtrip() {
        let req = JsonRpcRequest::new(RequestId::Number(1), "Arith.multiply", None);
        let text = serde_json::to_string(&req).unwrap();
        assert!(text.contains("\"jsonrpc\":\"2.0\""));
        assert!(!text.contains("params"));

        let back: JsonRpcRequest = serde_json::from_str(&text).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn named_and_positional_lookup() {
        let mut map = Map::new();
        map.insert("a".to_string(), json!(2));
        let named = RequestParams::Object(map);
        assert_eq!(named.get("a"), Some(&json!(2)));
        assert_eq!(named.get_index(0), None);

        let positional = RequestParams::Array(vec![json!("x"), json!(true)]);
        assert_eq!(positional.get_index(1), Some(&json!(true)));
        assert_eq!(positional.get("x"), None);
        assert_eq!(positional.len(), 2);
    }

    #[test]
    fn params_shape_is_untagged() {
        let positional: RequestParams = serde_json::from_str("[1, 2]").unwrap();
        assert!(matches!(positional, RequestParams::Array(_)));

        let named: RequestParams = serde_json::from_str(r#"{"a": 1}"#).unwrap();
        assert!(matches!(named, RequestParams::Object(_)));

        assert!(serde_json::from_str::<RequestParams>("3").is_err());
    }
}
