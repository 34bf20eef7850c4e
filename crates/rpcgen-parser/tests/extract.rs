//! End-to-end extraction over realistic annotated sources.

use std::path::Path;

use rpcgen_parser::{ExtractError, extract_source};

const CATALOG: &str = r#"
use rpcgen_protocol::{Service, ServiceError};

/// Item lookup and maintenance.
pub struct Catalog {
    rpc: Service,
}

/// A single catalog entry.
pub struct Item {
    pub sku: String,
    pub price_cents: u64,
}

impl Catalog {
    /// Fetch one item by SKU.
    ///
    /// rpc:sku the item identifier
    /// rpc:404 no such item
    /// rpc:return the matching item
    pub async fn get(&self, sku: String) -> Result<Item, ServiceError> {
        unimplemented!()
    }

    /// List a page of items.
    ///
    /// rpc:limit=25 page size
    /// rpc:after cursor from the previous page
    pub fn list(&self, after: Option<String>, limit: u32) -> Vec<Item> {
        unimplemented!()
    }
}

/// Health checks, kept deliberately tiny.
pub struct Probe {
    rpc: Service,
}

impl Probe {
    pub fn ping(&self) {}
}
"#;

fn extract(source: &str) -> Result<rpcgen_parser::PackageInfo, ExtractError> {
    extract_source(Path::new("/srv/app/src/catalog.rs"), source)
}

#[test]
fn full_extraction_shape() {
    let info = extract(CATALOG).unwrap();

    assert_eq!(info.module_name, "catalog");
    let names: Vec<_> = info.services.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Catalog", "Probe"]);
    assert_eq!(info.services[0].summary, "Item lookup and maintenance.");

    let get = &info.services[0].methods[0];
    assert_eq!(get.rpc_name, "Catalog.get");
    assert!(get.is_async);
    assert!(get.ret.fallible);
    assert_eq!(get.errors.len(), 1);
    assert_eq!(get.errors[0].code, 404);
    assert_eq!(get.return_doc, "the matching item");
    assert_eq!(get.params[0].description, "the item identifier");
    assert!(!get.params[0].optional);

    let list = &info.services[0].methods[1];
    assert!(list.params[0].optional, "Option<_> param is optional");
    assert!(list.params[1].optional, "defaulted param is optional");
    assert_eq!(list.params[1].default, Some(serde_json::json!(25)));
    assert!(!list.ret.fallible);

    let ping = &info.services[1].methods[0];
    assert!(ping.params.is_empty());
    assert!(ping.ret.ok.is_none());
}

#[test]
fn referenced_types_are_collected() {
    let info = extract(CATALOG).unwrap();
    assert_eq!(info.type_defs.len(), 1);
    assert_eq!(info.type_defs[0].name, "Item");
    assert_eq!(info.type_defs[0].summary, "A single catalog entry.");
    let fields: Vec<_> = info.type_defs[0]
        .fields
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(fields, ["sku", "price_cents"]);
}

#[test]
fn syntax_error_carries_location() {
    let err = extract("pub struct {").unwrap_err();
    let ExtractError::SourceSyntax { path, line, .. } = err else {
        panic!("expected SourceSyntax, got {err}");
    };
    assert!(path.ends_with("catalog.rs"));
    assert_eq!(line, 1);
}

#[test]
fn no_services_is_distinguished_from_crash() {
    let err = extract("pub struct Plain { x: i64 }").unwrap_err();
    assert!(matches!(err, ExtractError::NoServicesFound { .. }));
}

#[test]
fn duplicate_services_across_modules_are_rejected() {
    let source = r#"
        mod a {
            use rpcgen_protocol::Service;
            pub struct Dup { rpc: Service }
        }
        mod b {
            use rpcgen_protocol::Service;
            pub struct Dup { rpc: Service }
        }
    "#;
    let err = extract(source).unwrap_err();
    let ExtractError::DuplicateDefinition { name, .. } = err else {
        panic!("expected DuplicateDefinition, got {err}");
    };
    assert_eq!(name, "Dup");
}

#[test]
fn documented_ghost_parameter_fails_extraction() {
    let source = r#"
        use rpcgen_protocol::Service;
        pub struct Svc { rpc: Service }
        impl Svc {
            /// rpc:nope missing from the signature
            pub fn run(&self, a: i64) -> i64 { a }
        }
    "#;
    let err = extract(source).unwrap_err();
    let ExtractError::SpecMismatch { service, method, detail } = err else {
        panic!("expected SpecMismatch, got {err}");
    };
    assert_eq!(service, "Svc");
    assert_eq!(method, "run");
    assert!(detail.contains("nope"));
}

#[test]
fn optional_before_required_fails_extraction() {
    let source = r#"
        use rpcgen_protocol::Service;
        pub struct Svc { rpc: Service }
        impl Svc {
            pub fn run(&self, a: Option<i64>, b: i64) -> i64 { b }
        }
    "#;
    assert!(matches!(
        extract(source),
        Err(ExtractError::SpecMismatch { .. })
    ));
}
