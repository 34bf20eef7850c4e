//! The metadata model: everything the generators need, and nothing about
//! how it was parsed.
//!
//! A [`PackageInfo`] is built once per run by the scanner and interpreter,
//! then consumed read-only by both generators. Ordering everywhere is
//! declaration order; nothing is sorted, so regeneration over unchanged
//! source is byte-identical.

use std::path::PathBuf;

use serde_json::Value;

use crate::error::{DefinitionKind, ExtractError};

/// Semantic classification of a declared type, used to validate default
/// literals and to describe parameters. The exact declared tokens travel
/// alongside as [`syn::Type`]; this enum never drives code emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Unit,
    Bool,
    /// Signed integers of any width.
    Integer,
    /// Unsigned integers of any width.
    Unsigned,
    Float,
    String,
    /// `Vec<T>`.
    Array(Box<TypeKind>),
    /// `Option<T>`; implies the parameter is optional.
    Option(Box<TypeKind>),
    /// Any other path type, referred to by name and serialized as a JSON
    /// object (structs, maps, enums with struct-like representations).
    Named(String),
}

impl TypeKind {
    /// Classify a declared type. `None` means the type cannot take part in
    /// an RPC signature (references, closures, trait objects, non-unit
    /// tuples); callers turn that into a spec mismatch naming the culprit.
    pub fn classify(ty: &syn::Type) -> Option<TypeKind> {
        match ty {
            syn::Type::Tuple(tuple) if tuple.elems.is_empty() => Some(TypeKind::Unit),
            syn::Type::Path(type_path) if type_path.qself.is_none() => {
                let segment = type_path.path.segments.last()?;
                let ident = segment.ident.to_string();
                match ident.as_str() {
                    "bool" => Some(TypeKind::Bool),
                    "i8" | "i16" | "i32" | "i64" | "isize" => Some(TypeKind::Integer),
                    "u8" | "u16" | "u32" | "u64" | "usize" => Some(TypeKind::Unsigned),
                    "f32" | "f64" => Some(TypeKind::Float),
                    "String" => Some(TypeKind::String),
                    "Vec" => Some(TypeKind::Array(Box::new(Self::classify(generic_arg(
                        segment,
                    )?)?))),
                    "Option" => Some(TypeKind::Option(Box::new(Self::classify(generic_arg(
                        segment,
                    )?)?))),
                    _ => Some(TypeKind::Named(ident)),
                }
            }
            _ => None,
        }
    }

    /// Names of user types this kind refers to, for definitions collection.
    pub fn named_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeKind::Named(name) => out.push(name),
            TypeKind::Array(inner) | TypeKind::Option(inner) => inner.named_refs(out),
            _ => {}
        }
    }

    /// Whether a default literal is representable as this type.
    pub fn admits(&self, literal: &Value) -> bool {
        match (self, literal) {
            (TypeKind::Option(_), Value::Null) => true,
            (TypeKind::Option(inner), other) => inner.admits(other),
            (TypeKind::Bool, Value::Bool(_)) => true,
            (TypeKind::Integer, Value::Number(n)) => n.is_i64(),
            (TypeKind::Unsigned, Value::Number(n)) => n.is_u64(),
            (TypeKind::Float, Value::Number(_)) => true,
            (TypeKind::String, Value::String(_)) => true,
            (TypeKind::Array(inner), Value::Array(items)) => {
                items.iter().all(|item| inner.admits(item))
            }
            (TypeKind::Named(_), Value::Object(_)) => true,
            _ => false,
        }
    }
}

fn generic_arg(segment: &syn::PathSegment) -> Option<&syn::Type> {
    if let syn::PathArguments::AngleBracketed(args) = &segment.arguments
        && let Some(syn::GenericArgument::Type(inner)) = args.args.first()
    {
        return Some(inner);
    }
    None
}

/// One method argument.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    /// The declared type, verbatim.
    pub ty: syn::Type,
    pub kind: TypeKind,
    pub optional: bool,
    /// Present iff `optional`.
    pub default: Option<Value>,
    pub description: String,
}

/// The declared return shape of a method.
#[derive(Debug, Clone)]
pub struct ReturnType {
    /// The success type: the `T` in `Result<T, ServiceError>`, or the whole
    /// type for infallible methods. `None` means the method returns `()`.
    pub ok: Option<syn::Type>,
    /// Whether the declaration was a `Result`.
    pub fallible: bool,
}

/// A declared application error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSpec {
    pub code: i64,
    pub description: String,
}

/// One remotely callable operation.
#[derive(Debug, Clone)]
pub struct Method {
    /// Declared identifier, e.g. `multiply`.
    pub name: String,
    /// Wire name, e.g. `Arith.multiply`.
    pub rpc_name: String,
    pub summary: String,
    pub return_doc: String,
    pub params: Vec<Param>,
    pub ret: ReturnType,
    pub errors: Vec<ErrorSpec>,
    pub is_async: bool,
}

/// One RPC-bearing type and its admitted methods.
#[derive(Debug, Clone)]
pub struct Service {
    pub name: String,
    pub summary: String,
    pub methods: Vec<Method>,
}

/// A struct defined in the scanned file and referenced by a signature.
/// Re-emitted into the client module so it compiles stand-alone.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    pub summary: String,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: syn::Type,
}

/// The root of one generation run.
#[derive(Debug, Clone)]
pub struct PackageInfo {
    pub source_path: PathBuf,
    /// File stem of the source; the module name generated code refers back
    /// to (`use super::<module_name>::...`).
    pub module_name: String,
    pub services: Vec<Service>,
    pub type_defs: Vec<TypeDef>,
}

impl PackageInfo {
    pub fn method_count(&self) -> usize {
        self.services.iter().map(|s| s.methods.len()).sum()
    }
}

/// Final assembly: cross-cutting validation over individually valid parts.
///
/// Per-method validation has already happened; this pass only checks the
/// invariants that span services. Declaration order is preserved.
pub fn assemble(
    source_path: PathBuf,
    module_name: String,
    services: Vec<Service>,
    type_defs: Vec<TypeDef>,
) -> Result<PackageInfo, ExtractError> {
    if services.is_empty() {
        return Err(ExtractError::NoServicesFound { path: source_path });
    }

    let mut seen_services: Vec<&str> = Vec::new();
    for service in &services {
        if seen_services.contains(&service.name.as_str()) {
            return Err(ExtractError::DuplicateDefinition {
                kind: DefinitionKind::Service,
                name: service.name.clone(),
            });
        }
        seen_services.push(&service.name);

        let mut seen_methods: Vec<&str> = Vec::new();
        for method in &service.methods {
            if seen_methods.contains(&method.name.as_str()) {
                return Err(ExtractError::DuplicateDefinition {
                    kind: DefinitionKind::Method,
                    name: method.rpc_name.clone(),
                });
            }
            seen_methods.push(&method.name);
        }
    }

    Ok(PackageInfo {
        source_path,
        module_name,
        services,
        type_defs,
    })
}
