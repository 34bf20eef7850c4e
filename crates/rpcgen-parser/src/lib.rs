//! # Service extraction
//!
//! Turns one annotated Rust source file into a [`PackageInfo`]: the scanner
//! finds marker-bearing structs and their candidate methods, the annotation
//! interpreter merges doc directives with signature ground truth, and
//! assembly validates the cross-cutting invariants. Extraction either
//! produces a fully valid model or fails with an [`ExtractError`]; nothing
//! partial ever reaches the generators.

pub mod annotation;
pub mod error;
pub mod model;
pub mod scan;

use std::path::Path;

pub use error::{DefinitionKind, ExtractError};
pub use model::{
    ErrorSpec, FieldDef, Method, PackageInfo, Param, ReturnType, Service, TypeDef, TypeKind,
};

/// Extract a package model from a file on disk.
pub fn extract_file(path: &Path) -> Result<PackageInfo, ExtractError> {
    let source = std::fs::read_to_string(path)?;
    extract_source(path, &source)
}

/// Extract a package model from source text. `path` is used for error
/// reporting and for deriving the module name.
pub fn extract_source(path: &Path, source: &str) -> Result<PackageInfo, ExtractError> {
    let file = syn::parse_file(source).map_err(|err| {
        let start = err.span().start();
        ExtractError::SourceSyntax {
            path: path.to_path_buf(),
            line: start.line,
            column: start.column,
            message: err.to_string(),
        }
    })?;

    let outcome = scan::scan(&file)?;
    tracing::debug!(
        services = outcome.services.len(),
        structs = outcome.structs.len(),
        "scanned {}",
        path.display()
    );

    let mut services = Vec::with_capacity(outcome.services.len());
    for raw in outcome.services {
        services.push(annotation::interpret(raw)?);
    }

    let type_defs = collect_type_defs(&services, &outcome.structs);
    let module_name = module_name_of(path);
    model::assemble(path.to_path_buf(), module_name, services, type_defs)
}

fn module_name_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "generated".to_string())
}

/// Resolve the named types signatures refer to against the structs defined
/// in the file, transitively, in order of first reference. Types defined
/// elsewhere are left to their import paths.
fn collect_type_defs(services: &[Service], structs: &[scan::RawStruct]) -> Vec<TypeDef> {
    fn push_refs(kind: &TypeKind, wanted: &mut Vec<String>) {
        let mut names = Vec::new();
        kind.named_refs(&mut names);
        for name in names {
            if !wanted.iter().any(|w| w == name) {
                wanted.push(name.to_string());
            }
        }
    }

    let mut wanted: Vec<String> = Vec::new();

    for service in services {
        for method in &service.methods {
            for param in &method.params {
                push_refs(&param.kind, &mut wanted);
            }
            if let Some(ok) = &method.ret.ok
                && let Some(kind) = TypeKind::classify(ok)
            {
                push_refs(&kind, &mut wanted);
            }
        }
    }

    let mut defs = Vec::new();
    let mut index = 0;
    while index < wanted.len() {
        let name = wanted[index].clone();
        index += 1;
        let Some(raw) = structs.iter().find(|s| s.name == name) else {
            continue;
        };
        for (_, field_ty) in &raw.fields {
            if let Some(kind) = TypeKind::classify(field_ty) {
                push_refs(&kind, &mut wanted);
            }
        }
        defs.push(TypeDef {
            name: raw.name.clone(),
            summary: annotation::summarize(&raw.doc),
            fields: raw
                .fields
                .iter()
                .map(|(name, ty)| FieldDef {
                    name: name.clone(),
                    ty: ty.clone(),
                })
                .collect(),
        });
    }
    defs
}
