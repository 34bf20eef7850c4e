//! Locating services and their candidate methods in a parsed source file.
//!
//! A struct is a service iff one of its fields carries the marker type
//! `rpcgen_protocol::Service`, written fully qualified or through a `use`
//! of the marker (renames and glob imports of the crate count). Matching is
//! structural: a field whose type merely happens to be named `Service`
//! without such an import does not qualify.
//!
//! A method is a candidate iff it sits in an inherent `impl` of a service
//! struct, is `pub`, and takes `&self`. Everything else (trait impls,
//! associated functions, `&mut self` or consuming receivers, private
//! methods) is skipped; skipped receivers are logged at debug level since
//! that is the usual "why is my method missing" question.

use syn::{FnArg, ImplItem, Item, Pat, UseTree, Visibility};

use crate::error::ExtractError;

/// A parameter as declared: name and exact type.
#[derive(Debug, Clone)]
pub struct RawParam {
    pub name: String,
    pub ty: syn::Type,
}

/// A candidate method, before annotation interpretation.
#[derive(Debug, Clone)]
pub struct RawMethod {
    pub name: String,
    pub doc: Vec<String>,
    pub params: Vec<RawParam>,
    pub output: syn::ReturnType,
    pub is_async: bool,
}

/// A service struct with its admitted methods, in declaration order.
#[derive(Debug, Clone)]
pub struct RawService {
    pub name: String,
    pub doc: Vec<String>,
    pub methods: Vec<RawMethod>,
}

/// A plain struct with named fields, kept around so referenced types can be
/// re-emitted into the client module.
#[derive(Debug, Clone)]
pub struct RawStruct {
    pub name: String,
    pub doc: Vec<String>,
    pub fields: Vec<(String, syn::Type)>,
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub services: Vec<RawService>,
    /// Non-service structs, by declaration order.
    pub structs: Vec<RawStruct>,
}

/// Scan a whole file, including inline modules.
pub fn scan(file: &syn::File) -> Result<ScanOutcome, ExtractError> {
    let mut items: Vec<&Item> = Vec::new();
    flatten_items(&file.items, &mut items);

    let aliases = marker_aliases(&items);

    // First pass: classify structs.
    let mut service_order: Vec<(String, Vec<String>)> = Vec::new(); // (name, doc)
    let mut plain_structs: Vec<RawStruct> = Vec::new();
    for item in &items {
        let Item::Struct(strukt) = item else { continue };
        let doc = doc_lines(&strukt.attrs);
        let is_service = strukt
            .fields
            .iter()
            .any(|field| is_marker_type(&field.ty, &aliases));
        if is_service {
            service_order.push((strukt.ident.to_string(), doc));
        } else if let syn::Fields::Named(named) = &strukt.fields {
            plain_structs.push(RawStruct {
                name: strukt.ident.to_string(),
                doc,
                fields: named
                    .named
                    .iter()
                    .filter_map(|f| f.ident.as_ref().map(|i| (i.to_string(), f.ty.clone())))
                    .collect(),
            });
        }
    }

    // Second pass: attach methods from inherent impl blocks.
    let mut services: Vec<RawService> = service_order
        .into_iter()
        .map(|(name, doc)| RawService {
            name,
            doc,
            methods: Vec::new(),
        })
        .collect();

    for item in &items {
        let Item::Impl(imp) = item else { continue };
        if imp.trait_.is_some() {
            continue;
        }
        let Some(self_name) = impl_target_name(&imp.self_ty) else {
            continue;
        };
        let Some(service) = services.iter_mut().find(|s| s.name == self_name) else {
            continue;
        };
        for impl_item in &imp.items {
            let ImplItem::Fn(method) = impl_item else {
                continue;
            };
            if !matches!(method.vis, Visibility::Public(_)) {
                continue;
            }
            match admit_method(&service.name, method)? {
                Some(raw) => service.methods.push(raw),
                None => {}
            }
        }
    }

    Ok(ScanOutcome {
        services,
        structs: plain_structs,
    })
}

/// Flatten nested inline modules into one item list, declaration order.
fn flatten_items<'a>(items: &'a [Item], out: &mut Vec<&'a Item>) {
    for item in items {
        match item {
            Item::Mod(module) => {
                if let Some((_, nested)) = &module.content {
                    flatten_items(nested, out);
                }
            }
            other => out.push(other),
        }
    }
}

/// Local names under which the marker type is importable in this file.
fn marker_aliases(items: &[&Item]) -> Vec<String> {
    let mut aliases = Vec::new();
    for item in items {
        if let Item::Use(use_item) = item {
            collect_marker_aliases(&use_item.tree, &mut Vec::new(), &mut aliases);
        }
    }
    aliases
}

fn collect_marker_aliases(tree: &UseTree, prefix: &mut Vec<String>, out: &mut Vec<String>) {
    match tree {
        UseTree::Path(path) => {
            prefix.push(path.ident.to_string());
            collect_marker_aliases(&path.tree, prefix, out);
            prefix.pop();
        }
        UseTree::Name(name) => {
            if prefix == &["rpcgen_protocol"] && name.ident == "Service" {
                out.push("Service".to_string());
            }
        }
        UseTree::Rename(rename) => {
            if prefix == &["rpcgen_protocol"] && rename.ident == "Service" {
                out.push(rename.rename.to_string());
            }
        }
        UseTree::Glob(_) => {
            if prefix == &["rpcgen_protocol"] {
                out.push("Service".to_string());
            }
        }
        UseTree::Group(group) => {
            for tree in &group.items {
                collect_marker_aliases(tree, prefix, out);
            }
        }
    }
}

fn is_marker_type(ty: &syn::Type, aliases: &[String]) -> bool {
    let syn::Type::Path(type_path) = ty else {
        return false;
    };
    if type_path.qself.is_some() {
        return false;
    }
    let segments = &type_path.path.segments;
    if segments.len() == 2 {
        return segments[0].ident == "rpcgen_protocol" && segments[1].ident == "Service";
    }
    if segments.len() == 1 {
        let ident = segments[0].ident.to_string();
        return aliases.contains(&ident);
    }
    false
}

fn impl_target_name(self_ty: &syn::Type) -> Option<String> {
    if let syn::Type::Path(type_path) = self_ty
        && type_path.qself.is_none()
        && let Some(ident) = type_path.path.get_ident()
    {
        return Some(ident.to_string());
    }
    None
}

/// Admit one pub method if it has a `&self` receiver; reject patterns we
/// cannot name parameters from.
fn admit_method(
    service: &str,
    method: &syn::ImplItemFn,
) -> Result<Option<RawMethod>, ExtractError> {
    let name = method.sig.ident.to_string();

    let mut inputs = method.sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            tracing::debug!(
                service,
                method = %name,
                "skipping pub fn without a shared `&self` receiver"
            );
            return Ok(None);
        }
    }

    let mut params = Vec::new();
    for input in inputs {
        let FnArg::Typed(pat_type) = input else {
            continue;
        };
        let Pat::Ident(pat_ident) = pat_type.pat.as_ref() else {
            return Err(ExtractError::mismatch(
                service,
                &name,
                "parameters must be plain identifiers, not patterns",
            ));
        };
        params.push(RawParam {
            name: pat_ident.ident.to_string(),
            ty: (*pat_type.ty).clone(),
        });
    }

    Ok(Some(RawMethod {
        name,
        doc: doc_lines(&method.attrs),
        params,
        output: method.sig.output.clone(),
        is_async: method.sig.asyncness.is_some(),
    }))
}

/// Pull `///` lines out of attributes, one string per line, leading space
/// stripped.
pub fn doc_lines(attrs: &[syn::Attribute]) -> Vec<String> {
    let mut lines = Vec::new();
    for attr in attrs {
        if attr.path().is_ident("doc")
            && let Ok(value) = attr.meta.require_name_value()
            && let syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(lit_str),
                ..
            }) = &value.value
        {
            let text = lit_str.value();
            lines.push(text.strip_prefix(' ').unwrap_or(&text).to_string());
        }
    }
    lines
}
