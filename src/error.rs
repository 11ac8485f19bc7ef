use std::path::PathBuf;
use thiserror::Error;

/// All possible errors when building type graphs
#[derive(Error, Debug)]
pub enum TypeGraphError {
    #[error("Cannot resolve reference `{name}`{}", format_namespace(.namespace.as_deref()))]
    UnresolvableReference {
        name: String,
        namespace: Option<String>,
    },

    #[error("Type `{ty}` cannot be inspected: {reason}")]
    UninspectableType { ty: String, reason: String },

    #[error("Invalid type expression `{expr}`: {reason}")]
    InvalidTypeExpr { expr: String, reason: String },

    #[error("Type `{0}` is already defined")]
    AlreadyDefined(String),

    #[error("Unknown type id {0}")]
    UnknownType(u32),

    #[error("failed to load schema {}", .path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: Box<TypeGraphError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TypeGraphError {
    pub fn unresolvable(name: impl Into<String>, namespace: Option<&str>) -> Self {
        TypeGraphError::UnresolvableReference {
            name: name.into(),
            namespace: namespace.map(str::to_owned),
        }
    }

    pub fn schema(path: impl Into<PathBuf>, source: TypeGraphError) -> Self {
        TypeGraphError::Schema {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn invalid_expr(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        TypeGraphError::InvalidTypeExpr {
            expr: expr.into(),
            reason: reason.into(),
        }
    }
}

fn format_namespace(namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) => format!(" in namespace `{ns}`"),
        None => String::new(),
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, TypeGraphError>;
