//! Request-envelope processing for generated dispatchers.
//!
//! The [`Registry`] owns one invoker per service and applies JSON-RPC 2.0
//! envelope semantics: single requests and batches, the mandated validation
//! order (parse, then envelope shape, then method resolution, then
//! parameters), notification suppression, and batch responses in request
//! order even though entries are dispatched concurrently.
//!
//! Thread safety of the service values themselves is the service author's
//! responsibility; see [`Registry::register`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use thiserror::Error;

use crate::error::{JsonRpcError, JsonRpcErrorObject, ServiceError};
use crate::request::RequestParams;
use crate::response::{JsonRpcMessage, JsonRpcResponse};
use crate::types::RequestId;

/// Failure modes of one generated method invocation, mapped onto wire
/// errors by the registry.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The method name did not match any generated dispatch arm.
    #[error("method not found")]
    MethodNotFound,

    /// Parameters failed to decode against the declared parameter list.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// An application error with a code the method declares. Passed through
    /// to the wire verbatim.
    #[error(transparent)]
    Declared(ServiceError),

    /// Any other failure. Collapsed to the generic internal error on the
    /// wire; the cause is logged server-side only.
    #[error("internal error")]
    Internal,
}

impl InvokeError {
    fn into_error_object(self, method: &str) -> JsonRpcErrorObject {
        match self {
            InvokeError::MethodNotFound => JsonRpcErrorObject::method_not_found(method),
            InvokeError::InvalidParams(message) => JsonRpcErrorObject::invalid_params(&message),
            InvokeError::Declared(err) => JsonRpcErrorObject::application(err),
            InvokeError::Internal => JsonRpcErrorObject::internal_error(),
        }
    }
}

/// Implemented by generated code, once per service type.
#[async_trait]
pub trait MethodInvoker: Send + Sync {
    /// The service name used as the namespace prefix in `Service.method`.
    fn service_name(&self) -> &'static str;

    /// Declared RPC method names, in declaration order.
    fn method_names(&self) -> &'static [&'static str];

    /// Decode params, run the method, encode the result.
    async fn invoke(
        &self,
        method: &str,
        params: Option<RequestParams>,
    ) -> Result<Value, InvokeError>;
}

/// One registered invoker per service, looked up by `Service.method`.
#[derive(Default)]
pub struct Registry {
    services: Vec<(String, Arc<dyn MethodInvoker>)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service invoker under its own service name.
    ///
    /// Service values must be `Send + Sync`; methods are invoked through
    /// `&self`, possibly concurrently within a batch. Guarding interior
    /// state is the service implementation's job, not the dispatcher's.
    pub fn register<I>(&mut self, invoker: I) -> &mut Self
    where
        I: MethodInvoker + 'static,
    {
        let name = invoker.service_name().to_string();
        if let Some(slot) = self.services.iter_mut().find(|(n, _)| *n == name) {
            tracing::warn!(service = %name, "replacing already-registered service");
            slot.1 = Arc::new(invoker);
        } else {
            self.services.push((name, Arc::new(invoker)));
        }
        self
    }

    /// All `Service.method` names this registry can route, in registration
    /// and declaration order.
    pub fn route_names(&self) -> Vec<String> {
        self.services
            .iter()
            .flat_map(|(name, invoker)| {
                invoker
                    .method_names()
                    .iter()
                    .map(move |m| format!("{name}.{m}"))
            })
            .collect()
    }

    fn lookup(&self, service: &str) -> Option<&Arc<dyn MethodInvoker>> {
        self.services
            .iter()
            .find(|(name, _)| name == service)
            .map(|(_, invoker)| invoker)
    }

    /// Process a raw request body. Returns `None` when nothing is owed to
    /// the caller (a lone notification, or a batch of only notifications).
    pub async fn dispatch(&self, body: &str) -> Option<String> {
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(error = %err, "request body is not valid JSON");
                return Some(encode(&JsonRpcMessage::from(JsonRpcError::parse_error())));
            }
        };
        self.dispatch_value(value).await.map(|v| v.to_string())
    }

    /// Same as [`dispatch`](Self::dispatch) for callers that already hold a
    /// parsed `Value`.
    pub async fn dispatch_value(&self, body: Value) -> Option<Value> {
        match body {
            Value::Array(entries) => {
                if entries.is_empty() {
                    // An empty batch is itself an invalid request.
                    return Some(to_value(&JsonRpcMessage::from(JsonRpcError::invalid_request(
                        None,
                    ))));
                }
                let pending: Vec<_> = entries.into_iter().map(|e| self.run_entry(e)).collect();
                let replies: Vec<JsonRpcMessage> =
                    join_all(pending).await.into_iter().flatten().collect();
                if replies.is_empty() {
                    None
                } else {
                    Some(to_value(&replies))
                }
            }
            entry => self.run_entry(entry).await.map(|m| to_value(&m)),
        }
    }

    /// Validate and dispatch one envelope entry.
    async fn run_entry(&self, entry: Value) -> Option<JsonRpcMessage> {
        // Anything that is not an object cannot be a notification, so it is
        // always answered, under a null id.
        let Value::Object(fields) = entry else {
            return Some(JsonRpcError::invalid_request(None).into());
        };

        let id = match fields.get("id") {
            None => None,
            Some(Value::String(s)) => Some(RequestId::String(s.clone())),
            Some(Value::Number(n)) if n.is_i64() => {
                n.as_i64().map(RequestId::Number)
            }
            Some(_) => return Some(JsonRpcError::invalid_request(None).into()),
        };
        let is_notification = id.is_none();

        let version_ok = fields.get("jsonrpc").and_then(Value::as_str) == Some(crate::JSONRPC_VERSION);
        let method = fields.get("method").and_then(Value::as_str);
        let (Some(method), true) = (method, version_ok) else {
            return Some(JsonRpcError::invalid_request(id).into());
        };
        let method = method.to_string();

        let params = match fields.get("params") {
            None => None,
            Some(raw) => match serde_json::from_value::<RequestParams>(raw.clone()) {
                Ok(params) => Some(params),
                Err(_) => {
                    // params must be an array or an object.
                    return self.reply(is_notification, &method, id, || {
                        JsonRpcErrorObject::invalid_request()
                    });
                }
            },
        };

        let Some((service, bare_method)) = method.split_once('.') else {
            return self.reply(is_notification, &method, id, || {
                JsonRpcErrorObject::method_not_found(&method)
            });
        };
        let Some(invoker) = self.lookup(service) else {
            return self.reply(is_notification, &method, id, || {
                JsonRpcErrorObject::method_not_found(&method)
            });
        };

        match invoker.invoke(bare_method, params).await {
            Ok(result) => {
                if is_notification {
                    None
                } else {
                    id.map(|id| JsonRpcResponse::new(id, result).into())
                }
            }
            Err(err) => {
                if matches!(err, InvokeError::Internal) {
                    tracing::warn!(method = %method, "method failed with undeclared error");
                }
                self.reply(is_notification, &method, id, || err.into_error_object(&method))
            }
        }
    }

    /// Notifications swallow their errors; requests carry them back.
    fn reply(
        &self,
        is_notification: bool,
        method: &str,
        id: Option<RequestId>,
        error: impl FnOnce() -> JsonRpcErrorObject,
    ) -> Option<JsonRpcMessage> {
        if is_notification {
            let err = error();
            tracing::debug!(method = %method, code = err.code, "dropping error for notification");
            None
        } else {
            Some(JsonRpcError::new(id, error()).into())
        }
    }
}

fn to_value<T: serde::Serialize>(message: &T) -> Value {
    // Response types serialize infallibly: every member is a Value, a
    // string, or an integer.
    serde_json::to_value(message).expect("response serialization is infallible")
}

fn encode<T: serde::Serialize>(message: &T) -> String {
    to_value(message).to_string()
}
