use std::fmt;

use thiserror::Error;

use crate::wire::Stage;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported type graph version: {0}")]
    UnsupportedVersion(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unresolved type reference: {0}")]
    UnknownType(String),

    #[error("type `{0}` is not a model")]
    NotAModel(String),

    #[error("model `{model}` has no property `{property}`")]
    UnknownProperty { model: String, property: String },
}

/// Causes that abort conversion of a single operation.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("multipart request bodies are not supported")]
    MultipartBody,

    #[error("binary payloads are not supported ({0})")]
    BinaryPayload(String),

    #[error("error response `{status}` does not match a known error format")]
    UnsupportedErrorFormat { status: String },

    #[error("{location} is required but resolved to no schema")]
    MissingSchema { location: String },
}

/// Which traversal of an operation stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Host,
    Request,
    Responses,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassKind::Host => write!(f, "host parameters"),
            PassKind::Request => write!(f, "request"),
            PassKind::Responses => write!(f, "responses"),
        }
    }
}

/// A fatal conversion failure, attributed to one operation.
#[derive(Debug, Error)]
#[error("operation `{operation}` failed in {stage} {pass}: {source}")]
pub struct OperationError {
    pub operation: String,
    pub stage: Stage,
    pub pass: PassKind,
    #[source]
    pub source: ConvertError,
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("no input declares api version `{0}`")]
    UnknownApiVersion(String),
}
