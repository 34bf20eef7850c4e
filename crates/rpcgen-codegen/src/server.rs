//! Server dispatcher generation.
//!
//! For every service the emitted module implements
//! `rpcgen_protocol::MethodInvoker`: one match arm per method that decodes
//! parameters through [`ParamSet`](rpcgen_protocol::ParamSet), applies
//! declared defaults, invokes the method, and encodes the result. Envelope
//! semantics (batching, validation order, notifications) live in the
//! runtime crate's `Registry`, which the emitted `registry` constructor
//! wires up.
//!
//! The emitted file is meant to sit next to the scanned source as a sibling
//! module: it reaches the service types through `use super::<module>::*`.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use serde_json::Value;

use rpcgen_parser::{Method, PackageInfo, Service};

use crate::render;
use crate::{GeneratorConfig, to_snake_case};

/// Render the dispatcher module for a package.
pub fn generate_server(config: &GeneratorConfig, info: &PackageInfo) -> String {
    let proto = &config.protocol_path;
    let module = render::module_ident(&info.module_name);

    let service_idents: Vec<_> = info
        .services
        .iter()
        .map(|service| format_ident!("{}", service.name))
        .collect();
    let invokers = info
        .services
        .iter()
        .map(|service| emit_invoker(proto, service));
    let registry_fn = emit_registry_fn(proto, info);

    let tokens = quote! {
        use super::#module::{#(#service_idents),*};

        #(#invokers)*

        #registry_fn
    };

    render::render(
        &render::header(&info.module_name, "JSON-RPC 2.0 server dispatcher."),
        tokens,
    )
}

fn emit_invoker(proto: &syn::Path, service: &Service) -> TokenStream {
    let service_ident = format_ident!("{}", service.name);
    let service_name = &service.name;
    let method_names: Vec<&str> = service.methods.iter().map(|m| m.name.as_str()).collect();
    let arms = service.methods.iter().map(|method| emit_arm(proto, method));

    quote! {
        #[#proto::async_trait]
        impl #proto::MethodInvoker for #service_ident {
            fn service_name(&self) -> &'static str {
                #service_name
            }

            fn method_names(&self) -> &'static [&'static str] {
                &[#(#method_names),*]
            }

            async fn invoke(
                &self,
                method: &str,
                params: Option<#proto::RequestParams>,
            ) -> Result<#proto::serde_json::Value, #proto::InvokeError> {
                match method {
                    #(#arms)*
                    _ => Err(#proto::InvokeError::MethodNotFound),
                }
            }
        }
    }
}

fn emit_arm(proto: &syn::Path, method: &Method) -> TokenStream {
    let method_lit = &method.name;
    let method_ident = format_ident!("{}", method.name);
    let param_names: Vec<&str> = method.params.iter().map(|p| p.name.as_str()).collect();

    let decodes = method.params.iter().enumerate().map(|(index, param)| {
        let ident = format_ident!("{}", param.name);
        let ty = &param.ty;
        if param.optional {
            let default = render::value_expr(
                proto,
                param.default.as_ref().unwrap_or(&Value::Null),
            );
            quote! { let #ident: #ty = set.optional(#index, #default)?; }
        } else {
            quote! { let #ident: #ty = set.required(#index)?; }
        }
    });

    let args = method.params.iter().map(|p| format_ident!("{}", p.name));
    let call = if method.is_async {
        quote!(self.#method_ident(#(#args),*).await)
    } else {
        quote!(self.#method_ident(#(#args),*))
    };

    let encode_failed = format!("{}: result failed to serialize", method.rpc_name);
    let encode = quote! {
        #proto::serde_json::to_value(out).map_err(|err| {
            #proto::tracing::error!(error = %err, #encode_failed);
            #proto::InvokeError::Internal
        })
    };

    let body = match (method.ret.fallible, method.ret.ok.is_some()) {
        (false, true) => quote! {
            let out = #call;
            #encode
        },
        (false, false) => quote! {
            #call;
            Ok(#proto::serde_json::Value::Null)
        },
        (true, ok_present) => {
            let on_ok = if ok_present {
                quote!(Ok(out) => { #encode })
            } else {
                quote!(Ok(()) => Ok(#proto::serde_json::Value::Null),)
            };
            let undeclared = format!("{}: undeclared error code", method.rpc_name);
            let escalate = quote! {
                #proto::tracing::warn!(error = %err, code = err.code, #undeclared);
                Err(#proto::InvokeError::Internal)
            };
            let on_err = if method.errors.is_empty() {
                quote! {
                    Err(err) => {
                        #escalate
                    }
                }
            } else {
                let codes = method.errors.iter().map(|e| {
                    proc_macro2::Literal::i64_suffixed(e.code)
                });
                quote! {
                    Err(err) => match err.code {
                        #(#codes)|* => Err(#proto::InvokeError::Declared(err)),
                        _ => {
                            #escalate
                        }
                    },
                }
            };
            quote! {
                match #call {
                    #on_ok
                    #on_err
                }
            }
        }
    };

    quote! {
        #method_lit => {
            static NAMES: &[&str] = &[#(#param_names),*];
            let set = #proto::ParamSet::new(NAMES, params.as_ref())?;
            #(#decodes)*
            #body
        }
    }
}

fn emit_registry_fn(proto: &syn::Path, info: &PackageInfo) -> TokenStream {
    let bindings: Vec<_> = info
        .services
        .iter()
        .map(|service| format_ident!("{}", to_snake_case(&service.name)))
        .collect();
    let types = info
        .services
        .iter()
        .map(|service| format_ident!("{}", service.name));
    let registrations = bindings.iter().map(|binding| {
        quote!(registry.register(#binding);)
    });

    let doc = format!(
        " Registry routing every service declared in `{}.rs`.",
        info.module_name
    );
    quote! {
        #[doc = #doc]
        #[doc = ""]
        #[doc = " Service values are shared by the dispatcher and may be invoked"]
        #[doc = " concurrently within a batch; interior state needs its own"]
        #[doc = " synchronization."]
        pub fn registry(#(#bindings: #types),*) -> #proto::Registry {
            let mut registry = #proto::Registry::new();
            #(#registrations)*
            registry
        }
    }
}
