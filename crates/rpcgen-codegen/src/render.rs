//! Token-stream to source-text rendering.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use serde_json::Value;

/// Format a generated file, best-effort.
///
/// A token stream that fails to re-parse is a generator bug, but a cosmetic
/// one: the caller still gets compilable-or-diagnosable text instead of a
/// failed run. The failure is surfaced as a warning, distinct from
/// generation errors.
pub fn render(header: &str, tokens: TokenStream) -> String {
    match syn::parse2::<syn::File>(tokens.clone()) {
        Ok(file) => format!("{header}{}", prettyplease::unparse(&file)),
        Err(err) => {
            tracing::warn!(
                error = %err,
                "generated source failed to re-parse; emitting unformatted text"
            );
            format!("{header}{tokens}\n")
        }
    }
}

/// The fixed header of both artifacts. Carries no timestamps or versions,
/// so regeneration is byte-stable.
pub fn header(module_name: &str, artifact: &str) -> String {
    format!(
        "// @generated by rpcgen from `{module_name}.rs`. Do not edit.\n// Regenerate with `rpcgen {module_name}.rs`.\n// {artifact}\n\n"
    )
}

/// An identifier derived from a file stem, with characters Rust rejects
/// mapped to underscores.
pub fn module_ident(module_name: &str) -> proc_macro2::Ident {
    let mut cleaned: String = module_name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() || cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        cleaned.insert(0, '_');
    }
    format_ident!("{cleaned}")
}

/// An expression evaluating to the given JSON value, built against the
/// runtime crate's `serde_json` re-export. Used to embed default literals
/// in generated dispatch arms without going through text.
pub fn value_expr(proto: &syn::Path, value: &Value) -> TokenStream {
    match value {
        Value::Null => quote!(#proto::serde_json::Value::Null),
        Value::Bool(b) => quote!(#proto::serde_json::Value::from(#b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                let lit = proc_macro2::Literal::i64_suffixed(i);
                quote!(#proto::serde_json::Value::from(#lit))
            } else if let Some(u) = n.as_u64() {
                let lit = proc_macro2::Literal::u64_suffixed(u);
                quote!(#proto::serde_json::Value::from(#lit))
            } else {
                let lit = proc_macro2::Literal::f64_suffixed(n.as_f64().unwrap_or_default());
                quote!(#proto::serde_json::Value::from(#lit))
            }
        }
        Value::String(s) => quote!(#proto::serde_json::Value::from(#s)),
        Value::Array(items) => {
            let elements = items.iter().map(|item| value_expr(proto, item));
            quote!(#proto::serde_json::Value::Array(vec![#(#elements),*]))
        }
        Value::Object(map) => {
            let inserts = map.iter().map(|(key, value)| {
                let value = value_expr(proto, value);
                quote!(object.insert(#key.to_string(), #value);)
            });
            quote!({
                let mut object = #proto::serde_json::Map::new();
                #(#inserts)*
                #proto::serde_json::Value::Object(object)
            })
        }
    }
}
