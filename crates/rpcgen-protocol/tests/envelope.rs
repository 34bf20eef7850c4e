//! Envelope-level behavior of the dispatch runtime, driven through an
//! invoker shaped exactly like rpcgen-generated output.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use rpcgen_protocol::{
    InvokeError, JsonRpcRequest, MethodInvoker, ParamSet, Registry, RequestId, RequestParams,
    ServiceError, decode_response,
};

/// Mirrors what the server generator emits for a small arithmetic service:
/// one required and one defaulted parameter, one declared error code.
struct Arith {
    calls: Arc<AtomicU64>,
}

impl Arith {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    async fn add(&self, a: i64, b: i64, delay_ms: u64) -> i64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        a + b
    }

    async fn divide(&self, a: i64, b: i64) -> Result<i64, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if b == 0 {
            return Err(ServiceError::new(400, "division by zero"));
        }
        Ok(a / b)
    }
}

#[async_trait]
impl MethodInvoker for Arith {
    fn service_name(&self) -> &'static str {
        "Arith"
    }

    fn method_names(&self) -> &'static [&'static str] {
        &["add", "divide"]
    }

    async fn invoke(
        &self,
        method: &str,
        params: Option<RequestParams>,
    ) -> Result<Value, InvokeError> {
        match method {
            "add" => {
                static NAMES: &[&str] = &["a", "b", "delay_ms"];
                let set = ParamSet::new(NAMES, params.as_ref())?;
                let a: i64 = set.required(0)?;
                let b: i64 = set.optional(1, json!(0))?;
                let delay_ms: u64 = set.optional(2, json!(0))?;
                let out = self.add(a, b, delay_ms).await;
                Ok(json!(out))
            }
            "divide" => {
                static NAMES: &[&str] = &["a", "b"];
                let set = ParamSet::new(NAMES, params.as_ref())?;
                let a: i64 = set.required(0)?;
                let b: i64 = set.required(1)?;
                match self.divide(a, b).await {
                    Ok(out) => Ok(json!(out)),
                    Err(err) if err.code == 400 => Err(InvokeError::Declared(err)),
                    Err(err) => {
                        tracing::warn!(error = %err, "Arith.divide failed");
                        Err(InvokeError::Internal)
                    }
                }
            }
            _ => Err(InvokeError::MethodNotFound),
        }
    }
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register(Arith::new());
    registry
}

#[tokio::test]
async fn batch_order_matches_request_order_despite_completion_order() {
    // The first entry sleeps longest, so it finishes last; the response
    // array must still come back as [1, 2, 3].
    let body = json!([
        {"jsonrpc": "2.0", "id": 1, "method": "Arith.add",
         "params": {"a": 1, "b": 1, "delay_ms": 60}},
        {"jsonrpc": "2.0", "id": 2, "method": "Arith.add",
         "params": {"a": 2, "b": 2, "delay_ms": 20}},
        {"jsonrpc": "2.0", "id": 3, "method": "Arith.add",
         "params": {"a": 3, "b": 3, "delay_ms": 0}},
    ]);

    let out = registry().dispatch_value(body).await.unwrap();
    let entries = out.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    for (index, expected) in [(0, 2), (1, 4), (2, 6)] {
        assert_eq!(entries[index]["id"], json!(index as i64 + 1));
        assert_eq!(entries[index]["result"], json!(expected));
    }
}

#[tokio::test]
async fn batch_entries_run_concurrently() {
    // Three 40ms methods dispatched together should take nowhere near
    // 120ms. Generous bound to stay robust on slow machines.
    let body = json!([
        {"jsonrpc": "2.0", "id": 1, "method": "Arith.add",
         "params": {"a": 1, "delay_ms": 40}},
        {"jsonrpc": "2.0", "id": 2, "method": "Arith.add",
         "params": {"a": 2, "delay_ms": 40}},
        {"jsonrpc": "2.0", "id": 3, "method": "Arith.add",
         "params": {"a": 3, "delay_ms": 40}},
    ]);

    let started = std::time::Instant::now();
    let out = registry().dispatch_value(body).await.unwrap();
    assert_eq!(out.as_array().unwrap().len(), 3);
    assert!(started.elapsed() < Duration::from_millis(110));
}

#[tokio::test]
async fn missing_required_param_never_reaches_method_body() {
    let arith = Arith::new();
    let calls = Arc::clone(&arith.calls);
    let mut registry = Registry::new();
    registry.register(arith);

    let body = json!({"jsonrpc": "2.0", "id": 1, "method": "Arith.divide", "params": {"a": 6}});
    let out = registry.dispatch_value(body).await.unwrap();
    assert_eq!(out["error"]["code"], json!(-32602));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn defaulted_param_fills_in() {
    let body = json!({"jsonrpc": "2.0", "id": 1, "method": "Arith.add", "params": {"a": 41}});
    let out = registry().dispatch_value(body).await.unwrap();
    assert_eq!(out["result"], json!(41));
}

#[tokio::test]
async fn positional_params_decode_by_declaration_order() {
    let body = json!({"jsonrpc": "2.0", "id": 1, "method": "Arith.add", "params": [40, 2]});
    let out = registry().dispatch_value(body).await.unwrap();
    assert_eq!(out["result"], json!(42));
}

#[tokio::test]
async fn declared_error_round_trips_through_client_decoder() {
    let body = json!({"jsonrpc": "2.0", "id": 1, "method": "Arith.divide",
                      "params": {"a": 1, "b": 0}});
    let out = registry().dispatch_value(body).await.unwrap();

    let err = decode_response::<i64>(out, &RequestId::Number(1)).unwrap_err();
    assert!(!err.is_protocol_error());
    match err {
        rpcgen_protocol::CallError::Rpc { code, message, .. } => {
            assert_eq!(code, 400);
            assert_eq!(message, "division by zero");
        }
        other => panic!("expected Rpc error, got {other:?}"),
    }
}

#[tokio::test]
async fn client_shaped_request_is_accepted_by_server_decoder() {
    // The exact request a generated client builds: named params, minted id,
    // omitted optional argument.
    let mut params = Map::new();
    params.insert("a".to_string(), json!(20));
    params.insert("b".to_string(), json!(22));
    let request = JsonRpcRequest::with_object_params(RequestId::Number(7), "Arith.add", params);
    let body = serde_json::to_value(&request).unwrap();

    let out = registry().dispatch_value(body).await.unwrap();
    let sum: i64 = decode_response(out, &RequestId::Number(7)).unwrap();
    assert_eq!(sum, 42);
}
