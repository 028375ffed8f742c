use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::operation::{HttpOperation, ServiceInfo};
use crate::error::ResolveError;

/// The host-supplied semantic type graph for one service version.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypeGraph {
    pub version: String,

    #[serde(default)]
    pub service: ServiceInfo,

    /// Declarations keyed by a graph-unique id. The insertion index is the `TypeId`.
    #[serde(default)]
    pub types: IndexMap<String, TypeNode>,

    #[serde(default)]
    pub operations: Vec<HttpOperation>,
}

/// Stable identity of a declaration inside one `TypeGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub usize);

/// API lifecycle context a payload is projected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Read,
    Create,
    Update,
    Delete,
    Query,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Read => "read",
            Visibility::Create => "create",
            Visibility::Update => "update",
            Visibility::Delete => "delete",
            Visibility::Query => "query",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to a type: a declaration/builtin name or an inline literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeRef {
    Named(String),
    Literal { literal: serde_json::Value },
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::Literal { literal } => write!(f, "{literal}"),
        }
    }
}

/// A declaration in the type graph.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeNode {
    Scalar(ScalarDecl),
    Model(ModelDecl),
    Array(ArrayDecl),
    Union(UnionDecl),
    Enum(EnumDecl),
    Property(PropertyRefDecl),
}

impl TypeNode {
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeNode::Scalar(_) => "scalar",
            TypeNode::Model(_) => "model",
            TypeNode::Array(_) => "array",
            TypeNode::Union(_) => "union",
            TypeNode::Enum(_) => "enum",
            TypeNode::Property(_) => "property",
        }
    }
}

/// Constraint and encoding annotations attached to a scalar, property or parameter.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Constraints {
    pub pattern: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub min_value_exclusive: Option<f64>,
    pub max_value_exclusive: Option<f64>,
    pub multiple_of: Option<f64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: Option<bool>,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
    /// `@format` annotation, e.g. `uuid` or `arm-id`.
    pub format: Option<String>,
    /// `@encode` annotation, e.g. `rfc7231` or `base64url`.
    pub encode: Option<String>,
    pub secret: bool,
}

/// A user-declared scalar, optionally extending another scalar.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarDecl {
    #[serde(default)]
    pub name: String,
    pub base: Option<String>,
    #[serde(flatten)]
    pub constraints: Constraints,
}

/// An object model (record shape), possibly part of an inheritance hierarchy.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDecl {
    #[serde(default)]
    pub name: String,
    pub base: Option<String>,
    #[serde(default)]
    pub properties: IndexMap<String, PropertyDecl>,
    /// Name of the discriminator property declared on this model.
    pub discriminator: Option<String>,
    #[serde(default)]
    pub derived: Vec<String>,
    /// Value type of a `Record<T>` index signature.
    pub indexer: Option<TypeRef>,
    /// True for template declarations (never concrete).
    #[serde(default)]
    pub template: bool,
    #[serde(default)]
    pub template_args: Vec<TypeRef>,
    /// Managed identity payloads map to `IdentityObject`.
    #[serde(default)]
    pub identity: bool,
    pub paged: Option<PagedDecl>,
    #[serde(flatten)]
    pub constraints: Constraints,
}

/// Paging metadata attached to a page model.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedDecl {
    #[serde(default)]
    pub next_link_segments: Vec<String>,
    #[serde(default)]
    pub item_segments: Vec<String>,
}

/// A property declared on a model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDecl {
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    #[serde(default)]
    pub optional: bool,
    /// Visibilities the property is present in; absent means all.
    pub visibility: Option<Vec<Visibility>>,
    pub description: Option<String>,
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub client_flatten: bool,
    pub collection_format: Option<CollectionFormat>,
    #[serde(flatten)]
    pub constraints: Constraints,
}

impl PropertyDecl {
    pub fn is_visible(&self, visibility: Visibility) -> bool {
        match &self.visibility {
            None => true,
            Some(list) => list.contains(&visibility),
        }
    }
}

/// An array (list) type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayDecl {
    #[serde(default)]
    pub name: String,
    pub item: TypeRef,
    #[serde(flatten)]
    pub constraints: Constraints,
}

/// A union of types or literals.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnionDecl {
    #[serde(default)]
    pub name: String,
    pub variants: Vec<TypeRef>,
}

/// An enumeration with ordered members.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDecl {
    #[serde(default)]
    pub name: String,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnumMember {
    pub name: String,
    /// Explicit member value; defaults to the member name.
    pub value: Option<serde_json::Value>,
}

impl EnumMember {
    pub fn resolved_value(&self) -> serde_json::Value {
        self.value
            .clone()
            .unwrap_or_else(|| serde_json::Value::String(self.name.clone()))
    }
}

/// A reference to a property of a model, used as a type (`Model.prop`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PropertyRefDecl {
    pub model: String,
    pub property: String,
}

/// How an array parameter is serialized into a single string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionFormat {
    Csv,
    Ssv,
    Tsv,
    Pipes,
    Multi,
    Simple,
    Form,
}

/// Scalars known to the host without a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinScalar {
    String,
    Url,
    Bytes,
    Boolean,
    Integer,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    SafeInt,
    Numeric,
    Float,
    Float32,
    Float64,
    Decimal,
    Decimal128,
    PlainDate,
    PlainTime,
    UtcDateTime,
    OffsetDateTime,
    Duration,
    Uuid,
    ArmResourceIdentifier,
    AzureLocation,
}

impl BuiltinScalar {
    pub fn from_name(name: &str) -> Option<Self> {
        let scalar = match name {
            "string" => BuiltinScalar::String,
            "url" => BuiltinScalar::Url,
            "bytes" => BuiltinScalar::Bytes,
            "boolean" => BuiltinScalar::Boolean,
            "integer" => BuiltinScalar::Integer,
            "int8" => BuiltinScalar::Int8,
            "int16" => BuiltinScalar::Int16,
            "int32" => BuiltinScalar::Int32,
            "int64" => BuiltinScalar::Int64,
            "uint8" => BuiltinScalar::Uint8,
            "uint16" => BuiltinScalar::Uint16,
            "uint32" => BuiltinScalar::Uint32,
            "uint64" => BuiltinScalar::Uint64,
            "safeint" => BuiltinScalar::SafeInt,
            "numeric" => BuiltinScalar::Numeric,
            "float" => BuiltinScalar::Float,
            "float32" => BuiltinScalar::Float32,
            "float64" => BuiltinScalar::Float64,
            "decimal" => BuiltinScalar::Decimal,
            "decimal128" => BuiltinScalar::Decimal128,
            "plainDate" => BuiltinScalar::PlainDate,
            "plainTime" => BuiltinScalar::PlainTime,
            "utcDateTime" => BuiltinScalar::UtcDateTime,
            "offsetDateTime" => BuiltinScalar::OffsetDateTime,
            "duration" => BuiltinScalar::Duration,
            "uuid" => BuiltinScalar::Uuid,
            "armResourceIdentifier" => BuiltinScalar::ArmResourceIdentifier,
            "azureLocation" => BuiltinScalar::AzureLocation,
            _ => return None,
        };
        Some(scalar)
    }
}

/// Host intrinsics that are not scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    Null,
    Never,
    Void,
    Unknown,
}

impl Intrinsic {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(Intrinsic::Null),
            "never" => Some(Intrinsic::Never),
            "void" => Some(Intrinsic::Void),
            "unknown" => Some(Intrinsic::Unknown),
            _ => None,
        }
    }
}

/// What a `TypeRef` points at.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'g> {
    Declared(TypeId, &'g TypeNode),
    Builtin(BuiltinScalar),
    Intrinsic(Intrinsic),
    Literal(&'g serde_json::Value),
}

impl TypeGraph {
    /// Resolve a type reference against declarations, builtins and intrinsics.
    /// Declarations shadow builtins of the same name.
    pub fn resolve<'g>(&'g self, type_ref: &'g TypeRef) -> Result<Resolved<'g>, ResolveError> {
        match type_ref {
            TypeRef::Literal { literal } => Ok(Resolved::Literal(literal)),
            TypeRef::Named(name) => self.resolve_name(name),
        }
    }

    pub fn resolve_name(&self, name: &str) -> Result<Resolved<'_>, ResolveError> {
        if let Some((index, _, node)) = self.types.get_full(name) {
            return Ok(Resolved::Declared(TypeId(index), node));
        }
        if let Some(scalar) = BuiltinScalar::from_name(name) {
            return Ok(Resolved::Builtin(scalar));
        }
        if let Some(intrinsic) = Intrinsic::from_name(name) {
            return Ok(Resolved::Intrinsic(intrinsic));
        }
        Err(ResolveError::UnknownType(name.to_string()))
    }

    /// Look up a declaration by its id. Ids are only minted by this graph.
    pub fn node(&self, id: TypeId) -> &TypeNode {
        &self.types[id.0]
    }

    /// The graph key a declaration was registered under.
    pub fn key(&self, id: TypeId) -> &str {
        self.types
            .get_index(id.0)
            .map(|(key, _)| key.as_str())
            .unwrap_or_default()
    }

    pub fn model(&self, id: TypeId) -> Option<&ModelDecl> {
        match self.node(id) {
            TypeNode::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn model_by_name(&self, name: &str) -> Result<(TypeId, &ModelDecl), ResolveError> {
        match self.resolve_name(name)? {
            Resolved::Declared(id, TypeNode::Model(model)) => Ok((id, model)),
            _ => Err(ResolveError::NotAModel(name.to_string())),
        }
    }

    /// The declared name of a model, falling back to its graph key for anonymous models.
    pub fn model_name(&self, id: TypeId) -> &str {
        match self.model(id) {
            Some(model) if !model.name.is_empty() => &model.name,
            _ => self.key(id),
        }
    }
}
