//! The doc-directive grammar and its merge with signature ground truth.
//!
//! Parameter and return types always come from the declared signature; doc
//! directives only add what the signature cannot express: optionality,
//! default literals, descriptions, and declared error codes.
//!
//! # Grammar
//!
//! Inside a method's doc comment, every line starting with `rpc:` is a
//! directive; every other line contributes to the summary.
//!
//! ```text
//! rpc:<code> <description>            declared error code (integer literal)
//! rpc:<param>=<json-literal> [desc]   parameter becomes optional with a default
//! rpc:<param> <description>           description for a required parameter
//! rpc:return <description>            return-value description
//! ```
//!
//! The default literal is parsed as exactly one JSON value; whatever
//! follows it on the line is the description. A signature parameter typed
//! `Option<T>` is implicitly optional with default `null`; a directive may
//! replace that default.
//!
//! This grammar is part of the tool's external contract. Malformed
//! directives are never skipped: a line that starts with `rpc:` either
//! parses or fails the whole method.

use serde_json::Value;

use crate::error::ExtractError;
use crate::model::{ErrorSpec, Method, Param, ReturnType, Service, TypeKind};
use crate::scan::{RawMethod, RawService};

/// Interpret every admitted method of one scanned service.
pub fn interpret(raw: RawService) -> Result<Service, ExtractError> {
    let mut methods = Vec::with_capacity(raw.methods.len());
    for method in raw.methods {
        methods.push(interpret_method(&raw.name, method)?);
    }
    Ok(Service {
        summary: summarize(&raw.doc),
        name: raw.name,
        methods,
    })
}

#[derive(Debug, PartialEq)]
enum Directive {
    ErrorCode { code: i64, description: String },
    ParamDefault { name: String, default: Value, description: String },
    ParamDoc { name: String, description: String },
    ReturnDoc(String),
}

fn interpret_method(service: &str, raw: RawMethod) -> Result<Method, ExtractError> {
    let mismatch =
        |detail: String| ExtractError::mismatch(service, raw.name.as_str(), detail);

    // Signature ground truth first.
    let mut params = Vec::with_capacity(raw.params.len());
    for raw_param in &raw.params {
        let Some(kind) = TypeKind::classify(&raw_param.ty) else {
            return Err(mismatch(format!(
                "parameter '{}' has a type unsupported in RPC signatures",
                raw_param.name
            )));
        };
        let implicit_optional = matches!(kind, TypeKind::Option(_));
        params.push(Param {
            name: raw_param.name.clone(),
            ty: raw_param.ty.clone(),
            kind,
            optional: implicit_optional,
            default: implicit_optional.then(|| Value::Null),
            description: String::new(),
        });
    }

    // Then the doc block.
    let mut summary_lines = Vec::new();
    let mut return_doc = String::new();
    let mut errors: Vec<ErrorSpec> = Vec::new();
    let mut documented: Vec<String> = Vec::new();

    for line in &raw.doc {
        let trimmed = line.trim();
        let Some(body) = trimmed.strip_prefix("rpc:") else {
            summary_lines.push(line.clone());
            continue;
        };
        match parse_directive(body).map_err(&mismatch)? {
            Directive::ErrorCode { code, description } => {
                if errors.iter().any(|e| e.code == code) {
                    return Err(mismatch(format!("error code {code} declared twice")));
                }
                if (-32768..=-32000).contains(&code) {
                    return Err(mismatch(format!(
                        "error code {code} lies in the JSON-RPC reserved range"
                    )));
                }
                errors.push(ErrorSpec { code, description });
            }
            Directive::ReturnDoc(text) => {
                if !return_doc.is_empty() {
                    return Err(mismatch("duplicate rpc:return directive".to_string()));
                }
                return_doc = text;
            }
            Directive::ParamDefault {
                name,
                default,
                description,
            } => {
                let param = find_param(&mut params, &name)
                    .ok_or_else(|| mismatch(format!(
                        "documented parameter '{name}' does not exist in the signature"
                    )))?;
                if documented.contains(&name) {
                    return Err(mismatch(format!("parameter '{name}' documented twice")));
                }
                if !param.kind.admits(&default) {
                    return Err(mismatch(format!(
                        "default {default} is not representable as the declared type of '{name}'"
                    )));
                }
                param.optional = true;
                param.default = Some(default);
                param.description = description;
                documented.push(name);
            }
            Directive::ParamDoc { name, description } => {
                let param = find_param(&mut params, &name)
                    .ok_or_else(|| mismatch(format!(
                        "documented parameter '{name}' does not exist in the signature"
                    )))?;
                if documented.contains(&name) {
                    return Err(mismatch(format!("parameter '{name}' documented twice")));
                }
                param.description = description;
                documented.push(name);
            }
        }
    }

    // Positional-call safety: optionals must form a suffix.
    let mut first_optional: Option<&str> = None;
    for param in &params {
        if param.optional {
            first_optional.get_or_insert(&param.name);
        } else if let Some(optional_name) = first_optional {
            return Err(mismatch(format!(
                "required parameter '{}' follows optional parameter '{optional_name}'",
                param.name
            )));
        }
    }

    let ret = interpret_return(service, &raw.name, &raw.output)?;
    if !ret.fallible && !errors.is_empty() {
        return Err(mismatch(
            "declares error codes but does not return Result".to_string(),
        ));
    }

    Ok(Method {
        rpc_name: format!("{service}.{}", raw.name),
        name: raw.name,
        summary: summarize(&summary_lines),
        return_doc,
        params,
        ret,
        errors,
        is_async: raw.is_async,
    })
}

fn find_param<'a>(params: &'a mut [Param], name: &str) -> Option<&'a mut Param> {
    params.iter_mut().find(|p| p.name == name)
}

/// Parse one directive body (the text after `rpc:`).
fn parse_directive(body: &str) -> Result<Directive, String> {
    let body = body.trim_start();
    if body.is_empty() {
        return Err("empty rpc: directive".to_string());
    }

    // Integer token: a declared error code.
    if body.starts_with('-') || body.starts_with(|c: char| c.is_ascii_digit()) {
        let token_end = body.find(char::is_whitespace).unwrap_or(body.len());
        let (token, rest) = body.split_at(token_end);
        let code: i64 = token
            .parse()
            .map_err(|_| format!("malformed error code '{token}'"))?;
        return Ok(Directive::ErrorCode {
            code,
            description: rest.trim().to_string(),
        });
    }

    // Identifier token: a parameter name or the `return` keyword.
    let ident_end = body
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(body.len());
    let (ident, rest) = body.split_at(ident_end);
    if ident.is_empty() {
        return Err(format!("malformed directive 'rpc:{body}'"));
    }

    if let Some(literal_text) = rest.strip_prefix('=') {
        if ident == "return" {
            return Err("'return' cannot carry a default".to_string());
        }
        let mut stream = serde_json::Deserializer::from_str(literal_text).into_iter::<Value>();
        let default = match stream.next() {
            Some(Ok(value)) => value,
            _ => {
                return Err(format!(
                    "default for '{ident}' is not a JSON literal: '{}'",
                    literal_text.trim()
                ));
            }
        };
        let description = literal_text[stream.byte_offset()..].trim().to_string();
        return Ok(Directive::ParamDefault {
            name: ident.to_string(),
            default,
            description,
        });
    }

    if ident == "return" {
        return Ok(Directive::ReturnDoc(rest.trim().to_string()));
    }
    Ok(Directive::ParamDoc {
        name: ident.to_string(),
        description: rest.trim().to_string(),
    })
}

/// Return shape: `()`, `T`, or `Result<T, ServiceError>`.
fn interpret_return(
    service: &str,
    method: &str,
    output: &syn::ReturnType,
) -> Result<ReturnType, ExtractError> {
    let ty = match output {
        syn::ReturnType::Default => {
            return Ok(ReturnType {
                ok: None,
                fallible: false,
            });
        }
        syn::ReturnType::Type(_, ty) => ty.as_ref(),
    };

    if let syn::Type::Path(type_path) = ty
        && type_path.qself.is_none()
        && let Some(segment) = type_path.path.segments.last()
        && segment.ident == "Result"
    {
        let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
            return Err(ExtractError::mismatch(
                service,
                method,
                "Result return type without type arguments",
            ));
        };
        let mut types = args.args.iter().filter_map(|arg| match arg {
            syn::GenericArgument::Type(t) => Some(t),
            _ => None,
        });
        let (Some(ok), Some(err)) = (types.next(), types.next()) else {
            return Err(ExtractError::mismatch(
                service,
                method,
                "Result return type must name both its Ok and Err types",
            ));
        };
        if !is_service_error(err) {
            return Err(ExtractError::mismatch(
                service,
                method,
                "fallible methods must use rpcgen_protocol::ServiceError as the error type",
            ));
        }
        return Ok(ReturnType {
            ok: (!is_unit(ok)).then(|| ok.clone()),
            fallible: true,
        });
    }

    Ok(ReturnType {
        ok: (!is_unit(ty)).then(|| ty.clone()),
        fallible: false,
    })
}

fn is_unit(ty: &syn::Type) -> bool {
    matches!(ty, syn::Type::Tuple(tuple) if tuple.elems.is_empty())
}

fn is_service_error(ty: &syn::Type) -> bool {
    if let syn::Type::Path(type_path) = ty
        && let Some(segment) = type_path.path.segments.last()
    {
        return segment.ident == "ServiceError";
    }
    false
}

/// First paragraph of a doc block, joined to one line.
pub fn summarize(lines: &[String]) -> String {
    let mut out = String::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !out.is_empty() {
                break;
            }
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(trimmed);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{RawMethod, RawParam};
    use serde_json::json;

    fn method_with(doc: &[&str], params: &[(&str, &str)], output: &str) -> RawMethod {
        RawMethod {
            name: "probe".to_string(),
            doc: doc.iter().map(|s| s.to_string()).collect(),
            params: params
                .iter()
                .map(|(name, ty)| RawParam {
                    name: name.to_string(),
                    ty: syn::parse_str(ty).unwrap(),
                })
                .collect(),
            output: syn::parse_str(&format!("-> {output}")).unwrap(),
            is_async: false,
        }
    }

    fn interpret_one(raw: RawMethod) -> Result<Method, ExtractError> {
        interpret_method("Svc", raw)
    }

    #[test]
    fn directive_forms_parse() {
        assert_eq!(
            parse_directive(" 409 already exists").unwrap(),
            Directive::ErrorCode {
                code: 409,
                description: "already exists".into()
            }
        );
        assert_eq!(
            parse_directive("limit=25 page size").unwrap(),
            Directive::ParamDefault {
                name: "limit".into(),
                default: json!(25),
                description: "page size".into()
            }
        );
        assert_eq!(
            parse_directive("query the search string").unwrap(),
            Directive::ParamDoc {
                name: "query".into(),
                description: "the search string".into()
            }
        );
        assert_eq!(
            parse_directive("return the created id").unwrap(),
            Directive::ReturnDoc("the created id".into())
        );
    }

    #[test]
    fn default_literal_may_contain_spaces() {
        let Directive::ParamDefault { default, description, .. } =
            parse_directive(r#"tags=["a", "b"] labels to apply"#).unwrap()
        else {
            panic!()
        };
        assert_eq!(default, json!(["a", "b"]));
        assert_eq!(description, "labels to apply");
    }

    #[test]
    fn malformed_directives_are_errors() {
        assert!(parse_directive("").is_err());
        assert!(parse_directive("12x not a code").is_err());
        assert!(parse_directive("name=not-json").is_err());
        assert!(parse_directive("return=3").is_err());
    }

    #[test]
    fn undocumented_param_is_required_with_empty_description() {
        let method = interpret_one(method_with(&["Adds."], &[("a", "i64")], "i64")).unwrap();
        assert!(!method.params[0].optional);
        assert_eq!(method.params[0].description, "");
        assert_eq!(method.summary, "Adds.");
    }

    #[test]
    fn directive_for_unknown_param_is_mismatch() {
        let err =
            interpret_one(method_with(&["rpc:ghost spooky"], &[("a", "i64")], "i64")).unwrap_err();
        assert!(matches!(err, ExtractError::SpecMismatch { .. }));
    }

    #[test]
    fn default_marks_param_optional() {
        let method = interpret_one(method_with(
            &["rpc:b=2 exponent"],
            &[("a", "i64"), ("b", "i64")],
            "i64",
        ))
        .unwrap();
        assert!(method.params[1].optional);
        assert_eq!(method.params[1].default, Some(json!(2)));
        assert_eq!(method.params[1].description, "exponent");
    }

    #[test]
    fn option_param_is_implicitly_optional_with_null_default() {
        let method =
            interpret_one(method_with(&[], &[("a", "i64"), ("b", "Option<String>")], "i64"))
                .unwrap();
        assert!(method.params[1].optional);
        assert_eq!(method.params[1].default, Some(Value::Null));
    }

    #[test]
    fn optional_before_required_is_mismatch() {
        let err = interpret_one(method_with(
            &["rpc:a=1 first"],
            &[("a", "i64"), ("b", "i64")],
            "i64",
        ))
        .unwrap_err();
        let ExtractError::SpecMismatch { detail, .. } = err else {
            panic!()
        };
        assert!(detail.contains("'b'"));
        assert!(detail.contains("'a'"));
    }

    #[test]
    fn default_type_mismatch_is_error() {
        let err = interpret_one(method_with(
            &[r#"rpc:a="nope" bad default"#],
            &[("a", "i64")],
            "i64",
        ))
        .unwrap_err();
        assert!(matches!(err, ExtractError::SpecMismatch { .. }));
    }

    #[test]
    fn reserved_error_codes_are_rejected() {
        let err = interpret_one(method_with(
            &["rpc:-32601 shadowing the protocol"],
            &[],
            "Result<i64, ServiceError>",
        ))
        .unwrap_err();
        let ExtractError::SpecMismatch { detail, .. } = err else {
            panic!()
        };
        assert!(detail.contains("reserved"));
    }

    #[test]
    fn duplicate_error_code_is_mismatch() {
        let err = interpret_one(method_with(
            &["rpc:409 first", "rpc:409 second"],
            &[],
            "Result<i64, ServiceError>",
        ))
        .unwrap_err();
        assert!(matches!(err, ExtractError::SpecMismatch { .. }));
    }

    #[test]
    fn error_codes_on_infallible_method_are_mismatch() {
        let err = interpret_one(method_with(&["rpc:409 conflict"], &[], "i64")).unwrap_err();
        assert!(matches!(err, ExtractError::SpecMismatch { .. }));
    }

    #[test]
    fn fallible_return_must_use_service_error() {
        let err =
            interpret_one(method_with(&[], &[], "Result<i64, String>")).unwrap_err();
        let ExtractError::SpecMismatch { detail, .. } = err else {
            panic!()
        };
        assert!(detail.contains("ServiceError"));

        let ok = interpret_one(method_with(
            &[],
            &[],
            "Result<i64, rpcgen_protocol::ServiceError>",
        ))
        .unwrap();
        assert!(ok.ret.fallible);
    }

    #[test]
    fn unit_returns_have_no_ok_type() {
        let implicit = interpret_one(method_with(&[], &[], "()")).unwrap();
        assert!(implicit.ret.ok.is_none());

        let fallible =
            interpret_one(method_with(&[], &[], "Result<(), ServiceError>")).unwrap();
        assert!(fallible.ret.ok.is_none());
        assert!(fallible.ret.fallible);
    }

    #[test]
    fn summary_takes_first_paragraph() {
        let lines: Vec<String> = ["Adds two", "numbers.", "", "Second paragraph."]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(summarize(&lines), "Adds two numbers.");
    }
}
