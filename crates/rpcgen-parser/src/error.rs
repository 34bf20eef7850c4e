use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// What kind of name collided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Service,
    Method,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionKind::Service => write!(f, "service"),
            DefinitionKind::Method => write!(f, "method"),
        }
    }
}

/// Every way extraction can fail. All variants abort the run: a dispatcher
/// generated from incomplete metadata would misroute calls at runtime, so
/// there is no partial output and no best-effort fallback.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The input is not syntactically valid Rust.
    #[error("{path}:{line}:{column}: syntax error: {message}")]
    SourceSyntax {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// Annotation text and the declared signature disagree.
    #[error("{service}.{method}: {detail}")]
    SpecMismatch {
        service: String,
        method: String,
        detail: String,
    },

    /// Two services or two methods share a name.
    #[error("duplicate {kind} definition '{name}'")]
    DuplicateDefinition { kind: DefinitionKind, name: String },

    /// The file parsed but declares no service-marked types.
    #[error("no services found in {path}")]
    NoServicesFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub(crate) fn mismatch(
        service: impl Into<String>,
        method: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        ExtractError::SpecMismatch {
            service: service.into(),
            method: method.into(),
            detail: detail.into(),
        }
    }
}
