//! # Source generation
//!
//! Renders a [`rpcgen_parser::PackageInfo`] into the two artifacts: a
//! server dispatcher module and a typed client module. Both generators are
//! pure functions of the model and a [`GeneratorConfig`]; for identical
//! input they produce byte-identical output, so regenerating over unchanged
//! source never dirties a checkout.
//!
//! Token streams are assembled with [`quote`] and formatted with
//! [`prettyplease`]. Formatting is best-effort: if the assembled stream
//! fails to re-parse the unformatted text is emitted and a warning is
//! logged, which keeps a cosmetic failure from masking a good generation
//! run.

pub mod client;
pub mod render;
pub mod server;

use syn::parse_quote;

pub use client::generate_client;
pub use server::generate_server;

/// Constructed once per run and passed into both generators. Deliberately
/// not a process-wide singleton, so parallel test runs stay independent.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// The path generated code uses to reach the runtime crate. Overridable
    /// for consumers that re-export `rpcgen_protocol` under another name.
    pub protocol_path: syn::Path,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            protocol_path: parse_quote!(rpcgen_protocol),
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Lower a type or module name to the snake_case identifier used for
/// bindings in generated code.
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            result.push('_');
        }
        for lc in c.to_lowercase() {
            result.push(lc);
        }
    }
    result
}
