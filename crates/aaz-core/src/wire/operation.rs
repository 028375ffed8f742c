use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use super::schema::{Schema, SchemaBase};
use crate::graph::{HttpVerb, Visibility};

/// The slot an operation's schema is emitted under in a path item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Read,
    Create,
    Update,
}

impl Stage {
    /// Stages produced for a verb, in emission order.
    pub fn for_verb(verb: HttpVerb) -> &'static [Stage] {
        match verb {
            HttpVerb::Get | HttpVerb::Head => &[Stage::Read],
            HttpVerb::Delete | HttpVerb::Post => &[Stage::Create],
            HttpVerb::Put => &[Stage::Create, Stage::Update],
            HttpVerb::Patch => &[Stage::Update],
            HttpVerb::Options => &[],
        }
    }

    /// Request payloads of a stage are projected under this visibility.
    pub fn visibility(&self) -> Visibility {
        match self {
            Stage::Read => Visibility::Read,
            Stage::Create => Visibility::Create,
            Stage::Update => Visibility::Update,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Read => "read",
            Stage::Create => "create",
            Stage::Update => "update",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations of one route, keyed by verb.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct PathItem {
    pub verbs: IndexMap<HttpVerb, VerbOperations>,
}

impl PathItem {
    pub fn get(&self, verb: HttpVerb) -> Option<&VerbOperations> {
        self.verbs.get(&verb)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerbOperations {
    pub operation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pageable: Option<Pageable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<OperationSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<OperationSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<OperationSchema>,
}

impl VerbOperations {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            pageable: None,
            read: None,
            create: None,
            update: None,
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&OperationSchema> {
        match stage {
            Stage::Read => self.read.as_ref(),
            Stage::Create => self.create.as_ref(),
            Stage::Update => self.update.as_ref(),
        }
    }

    pub fn set_stage(&mut self, stage: Stage, schema: OperationSchema) {
        match stage {
            Stage::Read => self.read = Some(schema),
            Stage::Create => self.create = Some(schema),
            Stage::Update => self.update = Some(schema),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pageable {
    pub next_link_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSchema {
    pub operation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_running: Option<LongRunning>,
    pub http: HttpAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LongRunning {
    pub final_state_via: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpAction {
    pub path: String,
    pub request: HttpRequest,
    pub responses: Vec<HttpResponse>,
    #[serde(skip_serializing_if = "ClsDefinitions::is_empty")]
    pub cls_definitions: ClsDefinitions,
}

/// Shared schema bodies that were hoisted out of the tree and are referenced by name.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ClsDefinitions {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub request: IndexMap<String, SchemaBase>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub responses: IndexMap<String, SchemaBase>,
}

impl ClsDefinitions {
    pub fn is_empty(&self) -> bool {
        self.request.is_empty() && self.responses.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    pub method: HttpVerb,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<RequestArgs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<RequestArgs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
}

/// Parameters of one location, split into variable params and constants.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RequestArgs {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub consts: Vec<Schema>,
}

impl RequestArgs {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.consts.is_empty()
    }

    pub fn param(&self, name: &str) -> Option<&Schema> {
        self.params
            .iter()
            .chain(self.consts.iter())
            .find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestHeader {
    #[serde(flatten)]
    pub args: RequestArgs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBody {
    pub json: RequestJson,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestJson {
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<Vec<u16>>,
    #[serde(skip_serializing_if = "super::schema::is_false")]
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<ResponseHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ResponseBody>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResponseHeader {
    pub items: Vec<ResponseHeaderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseHeaderItem {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseBody {
    pub json: ResponseJson,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub var: Option<String>,
    pub schema: SchemaBase,
}

/// One version of a resource, as listed by `list-resources`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceVersion {
    pub version: String,
    pub path: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceEntry {
    pub id: String,
    pub versions: Vec<ResourceVersion>,
}

/// The operations of one resource at one version, as emitted by `get-resources-operations`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOperations {
    pub id: String,
    pub path: String,
    pub version: String,
    pub path_item: PathItem,
}
