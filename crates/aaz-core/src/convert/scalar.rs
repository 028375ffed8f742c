use std::collections::HashSet;

use crate::error::ResolveError;
use crate::graph::{BuiltinScalar, Constraints, Resolved, TypeGraph, TypeId, TypeNode};
use crate::wire::{
    BooleanSchema, FloatSchema, FloatType, IntegerSchema, IntegerType, SchemaKind, StringSchema,
    StringType,
};

/// A scalar reference unwound to its builtin root. `layers` holds the
/// constraints of every declared scalar on the way, most derived first.
#[derive(Debug, Clone)]
pub struct ScalarChain<'g> {
    pub builtin: BuiltinScalar,
    pub layers: Vec<&'g Constraints>,
}

impl<'g> ScalarChain<'g> {
    /// Unwind a declared scalar through its `base` links.
    pub fn declared(graph: &'g TypeGraph, id: TypeId) -> Result<Self, ResolveError> {
        let mut layers = Vec::new();
        let mut seen = HashSet::new();
        let mut current = id;
        loop {
            let TypeNode::Scalar(decl) = graph.node(current) else {
                return Err(ResolveError::UnknownType(graph.key(current).to_string()));
            };
            layers.push(&decl.constraints);
            if !seen.insert(current) {
                return Err(ResolveError::UnknownType(graph.key(current).to_string()));
            }

            let Some(base) = &decl.base else {
                let name = if decl.name.is_empty() { graph.key(current) } else { decl.name.as_str() };
                let builtin = BuiltinScalar::from_name(name).unwrap_or_else(|| {
                    log::debug!("scalar `{name}` has no known root, mapping it to string");
                    BuiltinScalar::String
                });
                return Ok(Self { builtin, layers });
            };

            match graph.resolve_name(base)? {
                Resolved::Builtin(builtin) => return Ok(Self { builtin, layers }),
                Resolved::Declared(next, TypeNode::Scalar(_)) => current = next,
                _ => return Err(ResolveError::UnknownType(base.clone())),
            }
        }
    }

    pub fn builtin(builtin: BuiltinScalar) -> Self {
        Self {
            builtin,
            layers: Vec::new(),
        }
    }

    /// The first non-empty value of `pick` across the call site, then the chain.
    fn first<T>(
        &self,
        site: &[&'g Constraints],
        pick: impl Fn(&'g Constraints) -> Option<T>,
    ) -> Option<T> {
        site.iter()
            .chain(self.layers.iter())
            .find_map(|layer| pick(*layer))
    }

    pub fn is_secret(&self, site: &[&'g Constraints]) -> bool {
        site.iter().chain(self.layers.iter()).any(|c| c.secret)
    }
}

/// Map a scalar to its wire kind. Format records are left empty for the harvester.
pub fn map_scalar<'g>(chain: &ScalarChain<'g>, site: &[&'g Constraints]) -> SchemaKind {
    let mut kind = natural_kind(chain.builtin);

    if let Some(encoding) = chain.first(site, |c| c.encode.as_deref()) {
        if let Some(encoded) = apply_encoding(chain.builtin, encoding) {
            kind = encoded;
        }
    }

    if let SchemaKind::String(string) = &mut kind {
        if string.string_type == StringType::String {
            if let Some(format) = chain.first(site, |c| c.format.as_deref()) {
                match string_format_override(format) {
                    Some(string_type) => string.string_type = string_type,
                    None => log::debug!("ignoring unknown string format `{format}`"),
                }
            }
        }
    }

    kind
}

fn natural_kind(builtin: BuiltinScalar) -> SchemaKind {
    use BuiltinScalar as B;
    match builtin {
        B::String | B::Url => string(StringType::String),
        B::Bytes => string(StringType::Byte),
        B::Uuid => string(StringType::Uuid),
        B::PlainDate => string(StringType::Date),
        B::PlainTime => string(StringType::Time),
        B::UtcDateTime | B::OffsetDateTime => string(StringType::DateTime),
        B::Duration => string(StringType::Duration),
        B::ArmResourceIdentifier => string(StringType::ResourceId),
        B::AzureLocation => string(StringType::ResourceLocation),
        B::Boolean => SchemaKind::Boolean(BooleanSchema {}),
        B::Integer => integer(IntegerType::Integer),
        B::Int8 | B::Int16 | B::Int32 | B::Uint8 | B::Uint16 => integer(IntegerType::Integer32),
        B::Int64 | B::Uint32 | B::Uint64 | B::SafeInt => integer(IntegerType::Integer64),
        B::Numeric | B::Float | B::Decimal | B::Decimal128 => float(FloatType::Float),
        B::Float32 => float(FloatType::Float32),
        B::Float64 => float(FloatType::Float64),
    }
}

fn is_temporal(builtin: BuiltinScalar) -> bool {
    matches!(
        builtin,
        BuiltinScalar::PlainDate
            | BuiltinScalar::PlainTime
            | BuiltinScalar::UtcDateTime
            | BuiltinScalar::OffsetDateTime
            | BuiltinScalar::Duration
    )
}

/// Wire kind for an `@encode` annotation; `None` keeps the natural kind.
fn apply_encoding(builtin: BuiltinScalar, encoding: &str) -> Option<SchemaKind> {
    if is_temporal(builtin) {
        return match encoding {
            "rfc3339" | "iso8601" => None,
            "rfc7231" => Some(string(StringType::String)),
            "unixTimestamp" => Some(integer(IntegerType::Integer64)),
            "seconds" => Some(float(FloatType::Float)),
            other => {
                log::debug!("unrecognized temporal encoding `{other}`, keeping {builtin:?}");
                None
            }
        };
    }
    if builtin == BuiltinScalar::Bytes && !matches!(encoding, "base64" | "base64url") {
        log::debug!("unrecognized bytes encoding `{encoding}`");
    }
    None
}

fn string_format_override(format: &str) -> Option<StringType> {
    let string_type = match format {
        "uuid" => StringType::Uuid,
        "password" => StringType::Password,
        "arm-id" | "resource-id" => StringType::ResourceId,
        "date" => StringType::Date,
        "date-time" => StringType::DateTime,
        "duration" => StringType::Duration,
        "byte" => StringType::Byte,
        "time" => StringType::Time,
        _ => return None,
    };
    Some(string_type)
}

fn string(string_type: StringType) -> SchemaKind {
    SchemaKind::String(StringSchema::new(string_type))
}

fn integer(integer_type: IntegerType) -> SchemaKind {
    SchemaKind::Integer(IntegerSchema {
        integer_type,
        format: None,
        enum_items: None,
    })
}

fn float(float_type: FloatType) -> SchemaKind {
    SchemaKind::Float(FloatSchema {
        float_type,
        format: None,
    })
}
