use serde::ser::Error as _;
use serde::{Serialize, Serializer};

use crate::graph::CollectionFormat;

/// Index of a pending schema record in the pass-scoped cls table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClsId(pub(crate) usize);

/// A schema carrying a name: an object property, a parameter or a body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub name: String,
    #[serde(flatten)]
    pub base: SchemaBase,
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub secret: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub skip_url_encoding: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub client_flatten: bool,
}

impl Schema {
    pub fn new(name: impl Into<String>, base: SchemaBase) -> Self {
        Self {
            name: name.into(),
            base,
            required: false,
            description: None,
            secret: false,
            skip_url_encoding: false,
            client_flatten: false,
        }
    }
}

/// An unnamed schema node: array items, response bodies, record values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaBase {
    #[serde(flatten)]
    pub kind: SchemaKind,
    #[serde(skip_serializing_if = "is_false")]
    pub read_only: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub nullable: bool,
    #[serde(rename = "const", skip_serializing_if = "is_false")]
    pub is_const: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<SchemaDefault>,
}

impl SchemaBase {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            read_only: false,
            nullable: false,
            is_const: false,
            default: None,
        }
    }

    pub fn type_name(&self) -> String {
        self.kind.type_name()
    }
}

impl From<SchemaKind> for SchemaBase {
    fn from(kind: SchemaKind) -> Self {
        SchemaBase::new(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDefault {
    pub value: serde_json::Value,
}

/// The closed set of wire node kinds, serialized with a `type` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    String(StringSchema),
    Integer(IntegerSchema),
    Float(FloatSchema),
    Boolean(BooleanSchema),
    Object(ObjectSchema),
    Array(ArraySchema),
    Cls(ClsName),
}

impl SchemaKind {
    /// The serialized `type` tag.
    pub fn type_name(&self) -> String {
        match self {
            SchemaKind::String(s) => s.string_type.as_str().to_string(),
            SchemaKind::Integer(i) => i.integer_type.as_str().to_string(),
            SchemaKind::Float(f) => f.float_type.as_str().to_string(),
            SchemaKind::Boolean(_) => "boolean".to_string(),
            SchemaKind::Object(o) if o.identity => "IdentityObject".to_string(),
            SchemaKind::Object(_) => "object".to_string(),
            SchemaKind::Array(_) => "array".to_string(),
            SchemaKind::Cls(cls) => format!("@{}", cls.name.as_deref().unwrap_or_default()),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            SchemaKind::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectSchema> {
        match self {
            SchemaKind::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Attach enum items; only string and integer kinds carry enums.
    pub fn set_enum(&mut self, items: SchemaEnum) -> bool {
        match self {
            SchemaKind::String(s) => s.enum_items = Some(items),
            SchemaKind::Integer(i) => i.enum_items = Some(items),
            _ => return false,
        }
        true
    }
}

#[derive(Serialize)]
struct Tagged<'a, T: Serialize> {
    #[serde(rename = "type")]
    type_name: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

impl Serialize for SchemaKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let type_name = self.type_name();
        match self {
            SchemaKind::String(body) => Tagged { type_name: &type_name, body }.serialize(serializer),
            SchemaKind::Integer(body) => Tagged { type_name: &type_name, body }.serialize(serializer),
            SchemaKind::Float(body) => Tagged { type_name: &type_name, body }.serialize(serializer),
            SchemaKind::Boolean(body) => Tagged { type_name: &type_name, body }.serialize(serializer),
            SchemaKind::Object(body) => Tagged { type_name: &type_name, body }.serialize(serializer),
            SchemaKind::Array(body) => Tagged { type_name: &type_name, body }.serialize(serializer),
            SchemaKind::Cls(cls) => {
                if cls.name.is_none() {
                    return Err(S::Error::custom("class reference was never finalized"));
                }
                Tagged {
                    type_name: &type_name,
                    body: &BooleanSchema {},
                }
                .serialize(serializer)
            }
        }
    }
}

/// The name slot of a shareable schema. `name` is filled in at finalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ClsName {
    pub(crate) id: Option<ClsId>,
    pub name: Option<String>,
}

impl ClsName {
    pub(crate) fn pending(id: ClsId) -> Self {
        Self { id: Some(id), name: None }
    }

    /// A reference to a definition that lives outside the pass, e.g. an error format.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    fn is_unnamed(slot: &Option<ClsName>) -> bool {
        !matches!(slot, Some(ClsName { name: Some(_), .. }))
    }
}

impl Serialize for ClsName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.name {
            Some(name) => serializer.serialize_str(name),
            None => serializer.serialize_none(),
        }
    }
}

/// Variants of the string family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringType {
    String,
    Byte,
    Uuid,
    Password,
    Date,
    DateTime,
    Time,
    Duration,
    ResourceId,
    ResourceLocation,
}

impl StringType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StringType::String => "string",
            StringType::Byte => "byte",
            StringType::Uuid => "uuid",
            StringType::Password => "password",
            StringType::Date => "date",
            StringType::DateTime => "date-time",
            StringType::Time => "time",
            StringType::Duration => "duration",
            StringType::ResourceId => "ResourceId",
            StringType::ResourceLocation => "ResourceLocation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerType {
    Integer,
    Integer32,
    Integer64,
}

impl IntegerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegerType::Integer => "integer",
            IntegerType::Integer32 => "integer32",
            IntegerType::Integer64 => "integer64",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatType {
    Float,
    Float32,
    Float64,
}

impl FloatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FloatType::Float => "float",
            FloatType::Float32 => "float32",
            FloatType::Float64 => "float64",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringSchema {
    #[serde(skip)]
    pub string_type: StringType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<StringFormat>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_items: Option<SchemaEnum>,
}

impl StringSchema {
    pub fn new(string_type: StringType) -> Self {
        Self {
            string_type,
            format: None,
            enum_items: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegerSchema {
    #[serde(skip)]
    pub integer_type: IntegerType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<IntegerFormat>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_items: Option<SchemaEnum>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloatSchema {
    #[serde(skip)]
    pub float_type: FloatType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<FloatFormat>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BooleanSchema {}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSchema {
    /// Serialized as `IdentityObject` instead of `object`.
    #[serde(skip)]
    pub identity: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ObjectFormat>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discriminators: Vec<Discriminator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_props: Option<AdditionalProps>,
    #[serde(skip_serializing_if = "ClsName::is_unnamed")]
    pub cls: Option<ClsName>,
}

impl ObjectSchema {
    pub fn prop(&self, name: &str) -> Option<&Schema> {
        self.props.iter().find(|p| p.name == name)
    }
}

/// One variant of a discriminated object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discriminator {
    pub property: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ObjectFormat>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discriminators: Vec<Discriminator>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Box<SchemaBase>>,
    #[serde(skip_serializing_if = "is_false")]
    pub any_type: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArraySchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ArrayFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Box<SchemaBase>>,
}

/// Ordered enumeration values.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SchemaEnum {
    pub items: Vec<EnumItem>,
}

impl SchemaEnum {
    pub fn from_values(values: impl IntoIterator<Item = serde_json::Value>) -> Self {
        Self {
            items: values.into_iter().map(|value| EnumItem { value }).collect(),
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &serde_json::Value> {
        self.items.iter().map(|i| &i.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumItem {
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegerFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "is_false")]
    pub exclusive_maximum: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub exclusive_minimum: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "is_false")]
    pub unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub str_format: Option<CollectionFormat>,
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_tag_comes_from_the_family_variant() {
        let node = SchemaBase::new(SchemaKind::String(StringSchema::new(StringType::DateTime)));
        assert_eq!(serde_json::to_value(&node).unwrap(), json!({"type": "date-time"}));

        let identity = SchemaKind::Object(ObjectSchema {
            identity: true,
            ..Default::default()
        });
        assert_eq!(identity.type_name(), "IdentityObject");
    }

    #[test]
    fn named_schema_flattens_base_fields() {
        let mut schema = Schema::new(
            "count",
            SchemaBase::new(SchemaKind::Integer(IntegerSchema {
                integer_type: IntegerType::Integer32,
                format: Some(IntegerFormat {
                    minimum: Some(1),
                    ..Default::default()
                }),
                enum_items: None,
            })),
        );
        schema.required = true;
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "name": "count",
                "type": "integer32",
                "format": {"minimum": 1},
                "required": true
            })
        );
    }

    #[test]
    fn unfinalized_class_references_fail_to_serialize() {
        let node = SchemaBase::new(SchemaKind::Cls(ClsName::pending(ClsId(0))));
        assert!(serde_json::to_value(&node).is_err());

        let node = SchemaBase::new(SchemaKind::Cls(ClsName::named("ODataV4Format")));
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"type": "@ODataV4Format"})
        );
    }

    #[test]
    fn cls_slot_is_omitted_until_named() {
        let mut object = ObjectSchema {
            cls: Some(ClsName::pending(ClsId(3))),
            ..Default::default()
        };
        let node = SchemaBase::new(SchemaKind::Object(object.clone()));
        assert_eq!(serde_json::to_value(&node).unwrap(), json!({"type": "object"}));

        object.cls = Some(ClsName {
            id: Some(ClsId(3)),
            name: Some("Widget".to_string()),
        });
        let node = SchemaBase::new(SchemaKind::Object(object));
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"type": "object", "cls": "Widget"})
        );
    }
}
