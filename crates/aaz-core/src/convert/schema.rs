use serde_json::Value;

use super::cls::ClsTable;
use super::format::harvest_format;
use super::scalar::{ScalarChain, map_scalar};
use super::visibility::{EffectiveProperty, effective_payload};
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::error::ConvertError;
use crate::graph::{
    ArrayDecl, CollectionFormat, Constraints, EnumDecl, Intrinsic, ModelDecl, Resolved, TypeGraph,
    TypeId, TypeNode, TypeRef, UnionDecl, Visibility,
};
use crate::wire::{
    AdditionalProps, ArraySchema, BooleanSchema, ClsName, FloatSchema, FloatType, IntegerSchema,
    IntegerType, ObjectSchema, Schema, SchemaBase, SchemaDefault, SchemaEnum, SchemaKind,
    StringSchema, StringType,
};

/// Values threaded through every recursive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertContext {
    pub visibility: Visibility,
    pub collection_format: Option<CollectionFormat>,
}

impl ConvertContext {
    pub fn new(visibility: Visibility) -> Self {
        Self {
            visibility,
            collection_format: None,
        }
    }

    pub fn with_collection_format(self, collection_format: Option<CollectionFormat>) -> Self {
        Self {
            collection_format,
            ..self
        }
    }
}

/// Converts type-graph nodes into wire schema nodes for one traversal pass.
pub struct SchemaConverter<'a> {
    pub(crate) graph: &'a TypeGraph,
    pub(crate) cls: &'a mut ClsTable,
    pub(crate) diagnostics: &'a mut Diagnostics,
    /// Diagnostic target, usually the operation id.
    pub(crate) target: &'a str,
}

impl<'a> SchemaConverter<'a> {
    pub fn new(
        graph: &'a TypeGraph,
        cls: &'a mut ClsTable,
        diagnostics: &'a mut Diagnostics,
        target: &'a str,
    ) -> Self {
        Self {
            graph,
            cls,
            diagnostics,
            target,
        }
    }

    /// Convert a type reference. `site` carries constraints of the referencing
    /// property or parameter, most specific first. `None` means the type has no
    /// wire representation (`never`, `void`, or an unsupported shape).
    pub fn convert(
        &mut self,
        type_ref: &'a TypeRef,
        ctx: ConvertContext,
        site: &[&'a Constraints],
    ) -> Result<Option<SchemaBase>, ConvertError> {
        match self.graph.resolve(type_ref)? {
            Resolved::Literal(value) => Ok(self.literal(value)),
            Resolved::Builtin(builtin) => Ok(Some(self.scalar(&ScalarChain::builtin(builtin), site))),
            Resolved::Intrinsic(intrinsic) => Ok(self.intrinsic(intrinsic, type_ref)),
            Resolved::Declared(id, node) => self.declared(id, node, ctx, site),
        }
    }

    /// Convert a model property into a named schema.
    pub fn convert_property(
        &mut self,
        property: &EffectiveProperty<'a>,
        ctx: ConvertContext,
    ) -> Result<Option<Schema>, ConvertError> {
        let decl = property.decl;
        let ctx = ctx.with_collection_format(decl.collection_format);
        let Some(mut base) = self.convert(&decl.type_ref, ctx, &[&decl.constraints])? else {
            return Ok(None);
        };
        base.read_only |= property.read_only;
        if base.default.is_none() {
            base.default = decl.default.clone().map(|value| SchemaDefault { value });
        }

        let mut schema = Schema::new(property.name, base);
        schema.required = property.required;
        schema.description = decl.description.clone();
        schema.secret = self.is_secret(&decl.type_ref, &decl.constraints);
        schema.client_flatten = decl.client_flatten;
        Ok(Some(schema))
    }

    /// True when the call site or any scalar on the type's chain is marked secret.
    pub fn is_secret(&self, type_ref: &'a TypeRef, site: &'a Constraints) -> bool {
        if site.secret {
            return true;
        }
        match self.graph.resolve(type_ref) {
            Ok(Resolved::Declared(id, TypeNode::Scalar(_))) => ScalarChain::declared(self.graph, id)
                .map(|chain| chain.is_secret(&[]))
                .unwrap_or(false),
            _ => false,
        }
    }

    fn declared(
        &mut self,
        id: TypeId,
        node: &'a TypeNode,
        ctx: ConvertContext,
        site: &[&'a Constraints],
    ) -> Result<Option<SchemaBase>, ConvertError> {
        match node {
            TypeNode::Scalar(_) => {
                let chain = ScalarChain::declared(self.graph, id)?;
                Ok(Some(self.scalar(&chain, site)))
            }
            TypeNode::Model(model) if is_record(model) => self.record(model, ctx, site).map(Some),
            TypeNode::Model(_) => self.model(id, ctx, site).map(Some),
            TypeNode::Array(array) => self.array(array, ctx, site).map(Some),
            TypeNode::Union(union) => self.union(union, ctx, site),
            TypeNode::Enum(decl) => Ok(self.enumeration(decl, site)),
            TypeNode::Property(reference) => {
                let (_, model) = self.graph.model_by_name(&reference.model)?;
                let property = model.properties.get(&reference.property).ok_or_else(|| {
                    crate::error::ResolveError::UnknownProperty {
                        model: reference.model.clone(),
                        property: reference.property.clone(),
                    }
                })?;
                let mut layers = site.to_vec();
                layers.push(&property.constraints);
                let ctx = ctx.with_collection_format(ctx.collection_format.or(property.collection_format));
                self.convert(&property.type_ref, ctx, &layers)
            }
        }
    }

    fn scalar(&mut self, chain: &ScalarChain<'a>, site: &[&'a Constraints]) -> SchemaBase {
        let mut kind = map_scalar(chain, site);
        harvest_format(
            &mut kind,
            site.iter().copied().chain(chain.layers.iter().copied()),
            None,
        );
        SchemaBase::new(kind)
    }

    fn literal(&mut self, value: &Value) -> Option<SchemaBase> {
        let Some(mut kind) = kind_for_values(std::slice::from_ref(value)) else {
            self.diagnostics.report(
                DiagnosticCode::UnsupportedType,
                self.target,
                format!("literal `{value}` has no wire representation"),
            );
            return None;
        };
        kind.set_enum(SchemaEnum::from_values([value.clone()]));
        let mut base = SchemaBase::new(kind);
        base.is_const = true;
        base.default = Some(SchemaDefault {
            value: value.clone(),
        });
        Some(base)
    }

    fn intrinsic(&mut self, intrinsic: Intrinsic, type_ref: &TypeRef) -> Option<SchemaBase> {
        match intrinsic {
            Intrinsic::Never | Intrinsic::Void => None,
            Intrinsic::Unknown => Some(any_object()),
            Intrinsic::Null => {
                self.diagnostics.report(
                    DiagnosticCode::UnsupportedType,
                    self.target,
                    format!("`{type_ref}` cannot be used on its own"),
                );
                None
            }
        }
    }

    fn enumeration(&mut self, decl: &'a EnumDecl, site: &[&'a Constraints]) -> Option<SchemaBase> {
        let values: Vec<Value> = decl.members.iter().map(|m| m.resolved_value()).collect();
        let Some(mut kind) = kind_for_values(&values) else {
            self.diagnostics.report(
                DiagnosticCode::UnsupportedType,
                self.target,
                format!("enum `{}` mixes value kinds", decl.name),
            );
            return None;
        };
        self.attach_enum(&mut kind, values, &decl.name);
        harvest_format(&mut kind, site.iter().copied(), None);
        Some(SchemaBase::new(kind))
    }

    /// Nullable unions collapse to their single variant; unions of literals,
    /// enums and at most one scalar of the same family become an enum.
    fn union(
        &mut self,
        decl: &'a UnionDecl,
        ctx: ConvertContext,
        site: &[&'a Constraints],
    ) -> Result<Option<SchemaBase>, ConvertError> {
        let mut nullable = false;
        let mut variants = Vec::new();
        for variant in &decl.variants {
            match self.graph.resolve(variant)? {
                Resolved::Intrinsic(Intrinsic::Null) => nullable = true,
                Resolved::Literal(Value::Null) => nullable = true,
                resolved => variants.push((variant, resolved)),
            }
        }

        if variants.is_empty() {
            self.diagnostics.report(
                DiagnosticCode::UnionNull,
                self.target,
                format!("union `{}` only contains null", decl.name),
            );
            return Ok(None);
        }

        let converted = if let [(variant, _)] = variants.as_slice() {
            self.convert(*variant, ctx, site)?
        } else {
            self.enum_union(decl, &variants, site)
        };
        Ok(converted.map(|mut base| {
            base.nullable |= nullable;
            base
        }))
    }

    fn enum_union(
        &mut self,
        decl: &UnionDecl,
        variants: &[(&'a TypeRef, Resolved<'a>)],
        site: &[&'a Constraints],
    ) -> Option<SchemaBase> {
        let mut values = Vec::new();
        let mut scalar: Option<SchemaBase> = None;
        for (variant, resolved) in variants {
            match resolved {
                Resolved::Literal(value) => values.push((*value).clone()),
                Resolved::Declared(_, TypeNode::Enum(e)) => {
                    values.extend(e.members.iter().map(|m| m.resolved_value()))
                }
                Resolved::Builtin(builtin) if scalar.is_none() => {
                    scalar = Some(self.scalar(&ScalarChain::builtin(*builtin), site));
                }
                Resolved::Declared(id, TypeNode::Scalar(_)) if scalar.is_none() => {
                    match ScalarChain::declared(self.graph, *id) {
                        Ok(chain) => scalar = Some(self.scalar(&chain, site)),
                        Err(_) => return self.unsupported_union(decl, variant),
                    }
                }
                _ => return self.unsupported_union(decl, variant),
            }
        }

        let mut base = match scalar {
            Some(base) => base,
            None => SchemaBase::new(kind_for_values(&values)?),
        };
        if !values.iter().all(|v| value_fits(&base.kind, v)) {
            return self.unsupported_union(decl, variants[0].0);
        }
        if !values.is_empty() {
            self.attach_enum(&mut base.kind, values, &decl.name);
        }
        Some(base)
    }

    /// Enum values on a kind that cannot carry them are dropped with a diagnostic.
    fn attach_enum(&mut self, kind: &mut SchemaKind, values: Vec<Value>, owner: &str) {
        if !kind.set_enum(SchemaEnum::from_values(values)) {
            self.diagnostics.report(
                DiagnosticCode::UnsupportedType,
                self.target,
                format!("`{owner}` values cannot be enumerated on a `{}` schema", kind.type_name()),
            );
        }
    }

    fn unsupported_union(&mut self, decl: &UnionDecl, variant: &TypeRef) -> Option<SchemaBase> {
        self.diagnostics.report(
            DiagnosticCode::UnionUnsupported,
            self.target,
            format!("union `{}` has unsupported variant `{variant}`", decl.name),
        );
        None
    }

    fn array(
        &mut self,
        decl: &'a ArrayDecl,
        ctx: ConvertContext,
        site: &[&'a Constraints],
    ) -> Result<SchemaBase, ConvertError> {
        let item = self.convert(&decl.item, ctx.with_collection_format(None), &[])?;
        let mut kind = SchemaKind::Array(ArraySchema {
            format: None,
            item: item.map(Box::new),
        });
        harvest_format(
            &mut kind,
            site.iter().copied().chain([&decl.constraints]),
            ctx.collection_format,
        );
        Ok(SchemaBase::new(kind))
    }

    /// `Record<T>`: an object with only additional properties.
    fn record(
        &mut self,
        model: &'a ModelDecl,
        ctx: ConvertContext,
        site: &[&'a Constraints],
    ) -> Result<SchemaBase, ConvertError> {
        let mut kind = SchemaKind::Object(ObjectSchema {
            additional_props: self.additional_props(model, ctx)?,
            ..Default::default()
        });
        harvest_format(&mut kind, site.iter().copied().chain([&model.constraints]), None);
        Ok(SchemaBase::new(kind))
    }

    fn additional_props(
        &mut self,
        model: &'a ModelDecl,
        ctx: ConvertContext,
    ) -> Result<Option<AdditionalProps>, ConvertError> {
        let Some(indexer) = &model.indexer else {
            return Ok(None);
        };
        if let Ok(Resolved::Intrinsic(Intrinsic::Unknown)) = self.graph.resolve(indexer) {
            return Ok(Some(AdditionalProps {
                item: None,
                any_type: true,
            }));
        }
        let item = self.convert(indexer, ctx.with_collection_format(None), &[])?;
        Ok(Some(AdditionalProps {
            item: item.map(Box::new),
            any_type: false,
        }))
    }

    /// Object models go through the cls table: the first visit of a
    /// `(model, visibility)` pair builds the body, later visits get a reference.
    pub fn model(
        &mut self,
        id: TypeId,
        ctx: ConvertContext,
        site: &[&'a Constraints],
    ) -> Result<SchemaBase, ConvertError> {
        let cls = self.cls.get_or_create(id, ctx.visibility);
        if self.cls.note_visit(cls) > 1 {
            return Ok(SchemaBase::new(SchemaKind::Cls(ClsName::pending(cls))));
        }

        let mut object = self.object_body(id, ctx)?;
        object.cls = Some(ClsName::pending(cls));
        let mut kind = SchemaKind::Object(object);
        let model_constraints = self.graph.model(id).map(|m| &m.constraints);
        harvest_format(&mut kind, site.iter().copied().chain(model_constraints), None);

        let body = SchemaBase::new(kind);
        self.cls.store(cls, body.clone());
        Ok(body)
    }

    fn object_body(&mut self, id: TypeId, ctx: ConvertContext) -> Result<ObjectSchema, ConvertError> {
        let graph = self.graph;
        let Some(model) = graph.model(id) else {
            return Err(crate::error::ResolveError::NotAModel(graph.key(id).to_string()).into());
        };
        let payload = effective_payload(graph, id, ctx.visibility)?;

        let mut object = ObjectSchema {
            identity: model.identity,
            ..Default::default()
        };
        for property in &payload.properties {
            if let Some(schema) = self.convert_property(property, ctx)? {
                object.props.push(schema);
            }
        }
        object.additional_props = self.additional_props(model, ctx)?;
        if let Some(discriminator) = &model.discriminator {
            self.flatten_discriminators(id, discriminator, ctx, &mut object.props, &mut object.discriminators)?;
        }
        Ok(object)
    }
}

fn is_record(model: &ModelDecl) -> bool {
    model.indexer.is_some() && model.properties.is_empty() && model.base.is_none()
}

fn any_object() -> SchemaBase {
    SchemaBase::new(SchemaKind::Object(ObjectSchema {
        additional_props: Some(AdditionalProps {
            item: None,
            any_type: true,
        }),
        ..Default::default()
    }))
}

/// The natural wire kind of a set of literal values, if they share one.
fn kind_for_values(values: &[Value]) -> Option<SchemaKind> {
    if values.iter().all(Value::is_string) {
        Some(SchemaKind::String(StringSchema::new(StringType::String)))
    } else if values.iter().all(|v| v.is_i64() || v.is_u64()) {
        Some(SchemaKind::Integer(IntegerSchema {
            integer_type: IntegerType::Integer,
            format: None,
            enum_items: None,
        }))
    } else if values.iter().all(Value::is_number) {
        Some(SchemaKind::Float(FloatSchema {
            float_type: FloatType::Float,
            format: None,
        }))
    } else if values.iter().all(Value::is_boolean) {
        Some(SchemaKind::Boolean(BooleanSchema {}))
    } else {
        None
    }
}

fn value_fits(kind: &SchemaKind, value: &Value) -> bool {
    match kind {
        SchemaKind::String(_) => value.is_string(),
        SchemaKind::Integer(_) => value.is_i64() || value.is_u64(),
        SchemaKind::Float(_) => value.is_number(),
        SchemaKind::Boolean(_) => value.is_boolean(),
        _ => false,
    }
}
