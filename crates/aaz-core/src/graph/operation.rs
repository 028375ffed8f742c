use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::types::{CollectionFormat, Constraints, TypeRef};

/// Service-level metadata.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    #[serde(default)]
    pub title: String,
    pub api_version: Option<String>,
    pub server: Option<ServerDecl>,
}

/// The service host template, e.g. `{endpoint}/contoso`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerDecl {
    pub url: String,
    #[serde(default)]
    pub parameters: IndexMap<String, HostParameterDecl>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostParameterDecl {
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    pub description: Option<String>,
    #[serde(default)]
    pub allow_reserved: bool,
}

/// HTTP verb of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpVerb {
    Get,
    Put,
    Post,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "get",
            HttpVerb::Put => "put",
            HttpVerb::Post => "post",
            HttpVerb::Delete => "delete",
            HttpVerb::Patch => "patch",
            HttpVerb::Head => "head",
            HttpVerb::Options => "options",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One HTTP operation as resolved by the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpOperation {
    pub name: String,
    /// Interface or namespace the operation is declared in.
    #[serde(default)]
    pub container: String,
    pub verb: HttpVerb,
    pub path: String,
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<HttpParameter>,
    pub body: Option<RequestBodyDecl>,
    #[serde(default)]
    pub responses: Vec<ResponseDecl>,
    pub lro: Option<LroDecl>,
    /// Shared routes keep their query string in the resource id.
    #[serde(default)]
    pub shared_route: bool,
}

/// Where a request parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpParameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    #[serde(default)]
    pub optional: bool,
    pub description: Option<String>,
    pub default: Option<serde_json::Value>,
    pub collection_format: Option<CollectionFormat>,
    #[serde(default)]
    pub allow_reserved: bool,
    #[serde(flatten)]
    pub constraints: Constraints,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBodyDecl {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    #[serde(default)]
    pub content_types: Vec<String>,
    #[serde(default)]
    pub optional: bool,
    /// True when the body is declared through an explicit `@body` property.
    #[serde(default)]
    pub explicit: bool,
    pub description: Option<String>,
}

/// Status codes of a response: a single code, an inclusive range, or `*`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StatusCodes {
    Code(u16),
    Range { start: u16, end: u16 },
    Wildcard(String),
}

impl fmt::Display for StatusCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCodes::Code(code) => write!(f, "{code}"),
            StatusCodes::Range { start, end } => write!(f, "{start}-{end}"),
            StatusCodes::Wildcard(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDecl {
    pub status: Option<StatusCodes>,
    #[serde(rename = "type")]
    pub type_ref: Option<TypeRef>,
    pub description: Option<String>,
    #[serde(default)]
    pub headers: Vec<ResponseHeaderDecl>,
    #[serde(default)]
    pub content_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseHeaderDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: Option<TypeRef>,
}

/// Long-running-operation metadata.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LroDecl {
    pub final_state_via: Option<String>,
}
