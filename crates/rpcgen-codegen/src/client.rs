//! Typed client generation.
//!
//! One `<Service>Client<T: Transport>` per service, one async method per
//! RPC method. Arguments are sent as named parameters; optional arguments
//! the caller passes as `None` are omitted from the request entirely, which
//! the dispatcher treats as "missing" and fills with the declared default.
//! That omission convention is the load-bearing agreement between the two
//! generators; neither side ever serializes a default.
//!
//! The emitted module stands alone: structs referenced by signatures and
//! defined in the scanned file are re-emitted here with serde derives
//! pointed at the runtime crate's re-export, so the only dependency of the
//! generated file is `rpcgen_protocol` itself.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use rpcgen_parser::{Method, PackageInfo, Param, Service, TypeDef, TypeKind};

use crate::GeneratorConfig;
use crate::render;

/// Render the client module for a package.
pub fn generate_client(config: &GeneratorConfig, info: &PackageInfo) -> String {
    let proto = &config.protocol_path;

    let type_defs = info.type_defs.iter().map(|def| emit_type_def(proto, def));
    let clients = info.services.iter().map(|service| emit_client(proto, service));

    let any_args = info
        .services
        .iter()
        .flat_map(|s| &s.methods)
        .any(|m| !m.params.is_empty());
    let encode_arg_fn = any_args.then(|| {
        quote! {
            fn encode_arg<T: #proto::serde::Serialize>(
                name: &str,
                value: &T,
            ) -> Result<Value, CallError> {
                #proto::serde_json::to_value(value)
                    .map_err(|err| CallError::Malformed(format!("argument '{name}': {err}")))
            }
        }
    });

    let tokens = quote! {
        use std::sync::atomic::{AtomicU64, Ordering};

        use #proto::serde_json::{Map, Value};
        use #proto::{CallError, JsonRpcRequest, RequestId, Transport};

        #(#type_defs)*

        #(#clients)*

        #encode_arg_fn
    };

    render::render(
        &render::header(&info.module_name, "JSON-RPC 2.0 typed client."),
        tokens,
    )
}

/// Re-emit one referenced struct so the client module compiles without the
/// scanned source on its dependency path.
fn emit_type_def(proto: &syn::Path, def: &TypeDef) -> TokenStream {
    let ident = format_ident!("{}", def.name);
    let serde_crate = quote!(#proto::serde).to_string().replace(' ', "");
    let doc = (!def.summary.is_empty()).then(|| {
        let text = format!(" {}", def.summary);
        quote!(#[doc = #text])
    });
    let fields = def.fields.iter().map(|field| {
        let name = format_ident!("{}", field.name);
        let ty = &field.ty;
        quote!(pub #name: #ty,)
    });

    quote! {
        #doc
        #[derive(Debug, Clone, PartialEq, #proto::serde::Serialize, #proto::serde::Deserialize)]
        #[serde(crate = #serde_crate)]
        pub struct #ident {
            #(#fields)*
        }
    }
}

fn emit_client(proto: &syn::Path, service: &Service) -> TokenStream {
    let client_ident = format_ident!("{}Client", service.name);
    let doc = client_doc(service);
    let methods = service.methods.iter().map(|method| emit_call(proto, method));

    quote! {
        #doc
        pub struct #client_ident<T: Transport> {
            transport: T,
            next_id: AtomicU64,
        }

        impl<T: Transport> #client_ident<T> {
            pub fn new(transport: T) -> Self {
                Self {
                    transport,
                    next_id: AtomicU64::new(0),
                }
            }

            /// Ids are unique per client instance and never reused.
            fn next_request_id(&self) -> RequestId {
                RequestId::Number((self.next_id.fetch_add(1, Ordering::Relaxed) + 1) as i64)
            }

            async fn call<R>(
                &self,
                method: &'static str,
                params: Map<String, Value>,
            ) -> Result<R, CallError>
            where
                R: #proto::serde::de::DeserializeOwned,
            {
                let id = self.next_request_id();
                let request = JsonRpcRequest::with_object_params(id.clone(), method, params);
                let body = #proto::serde_json::to_value(&request)
                    .map_err(|err| CallError::Malformed(format!("request encoding: {err}")))?;
                let response = self.transport.send(body).await?;
                #proto::decode_response(response, &id)
            }

            #(#methods)*
        }
    }
}

fn client_doc(service: &Service) -> TokenStream {
    if service.summary.is_empty() {
        let text = format!(" Client for the `{}` service.", service.name);
        quote!(#[doc = #text])
    } else {
        let text = format!(" Client for the `{}` service: {}", service.name, service.summary);
        quote!(#[doc = #text])
    }
}

fn emit_call(proto: &syn::Path, method: &Method) -> TokenStream {
    let method_ident = format_ident!("{}", method.name);
    let rpc_name = &method.rpc_name;
    let docs = call_docs(method);

    let args = method.params.iter().map(|param| {
        let ident = format_ident!("{}", param.name);
        let ty = argument_type(param);
        quote!(#ident: #ty)
    });

    let inserts = method.params.iter().map(|param| {
        let ident = format_ident!("{}", param.name);
        let name = &param.name;
        if param.optional {
            quote! {
                if let Some(value) = #ident {
                    params.insert(#name.to_string(), encode_arg(#name, &value)?);
                }
            }
        } else {
            quote! {
                params.insert(#name.to_string(), encode_arg(#name, &#ident)?);
            }
        }
    });

    let ok_ty = match &method.ret.ok {
        Some(ty) => quote!(#ty),
        None => quote!(()),
    };

    let params_binding = if method.params.is_empty() {
        quote!(let params = Map::new();)
    } else {
        quote!(let mut params = Map::new();)
    };

    quote! {
        #(#docs)*
        pub async fn #method_ident(&self, #(#args),*) -> Result<#ok_ty, CallError> {
            #params_binding
            #(#inserts)*
            self.call(#rpc_name, params).await
        }
    }
}

/// Optional parameters surface as `Option<T>`; `None` means "omit and let
/// the server apply the declared default".
fn argument_type(param: &Param) -> TokenStream {
    let ty = &param.ty;
    if param.optional && !matches!(param.kind, TypeKind::Option(_)) {
        quote!(Option<#ty>)
    } else {
        quote!(#ty)
    }
}

fn call_docs(method: &Method) -> Vec<TokenStream> {
    let mut docs = Vec::new();
    let mut push = |text: String| docs.push(quote!(#[doc = #text]));

    if !method.summary.is_empty() {
        push(format!(" {}", method.summary));
    }
    if !method.return_doc.is_empty() {
        push(String::new());
        push(format!(" Returns {}", method.return_doc));
    }
    if !method.errors.is_empty() {
        push(String::new());
        let codes = method
            .errors
            .iter()
            .map(|e| {
                if e.description.is_empty() {
                    e.code.to_string()
                } else {
                    format!("{} ({})", e.code, e.description)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        push(format!(" Declared errors: {codes}."));
    }
    docs
}
