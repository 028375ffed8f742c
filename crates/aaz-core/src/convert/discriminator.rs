use std::collections::HashSet;

use serde_json::Value;

use super::format::object_format;
use super::schema::{ConvertContext, SchemaConverter};
use super::visibility::{ancestry, collect_properties, discriminator_names};
use crate::error::ConvertError;
use crate::graph::{ModelDecl, Resolved, TypeGraph, TypeId, TypeNode, TypeRef};
use crate::wire::{Discriminator, Schema, SchemaBase, SchemaEnum, SchemaKind, StringSchema, StringType};

impl<'a> SchemaConverter<'a> {
    /// Attach one variant per concrete derived model of `host` and make the
    /// discriminator property a required string enum over the variant values.
    pub(crate) fn flatten_discriminators(
        &mut self,
        host: TypeId,
        property: &'a str,
        ctx: ConvertContext,
        props: &mut Vec<Schema>,
        discriminators: &mut Vec<Discriminator>,
    ) -> Result<(), ConvertError> {
        let mut visited = HashSet::from([host]);
        *discriminators = self.variants(host, property, ctx, &mut visited)?;
        attach_discriminator_property(props, property, discriminators);
        Ok(())
    }

    fn variants(
        &mut self,
        host: TypeId,
        property: &'a str,
        ctx: ConvertContext,
        visited: &mut HashSet<TypeId>,
    ) -> Result<Vec<Discriminator>, ConvertError> {
        let graph = self.graph;
        let Some(host_model) = graph.model(host) else {
            return Ok(Vec::new());
        };

        let mut variants = Vec::new();
        for derived in &host_model.derived {
            let (id, model) = graph.model_by_name(derived)?;
            if !visited.insert(id) {
                continue;
            }
            if model.template {
                log::debug!("skipping template `{derived}` as a variant of `{}`", graph.model_name(host));
                continue;
            }
            let Some(value) = discriminator_value(graph, model, property) else {
                log::debug!(
                    "skipping `{derived}`: no single string value for discriminator `{property}`"
                );
                continue;
            };

            // Properties declared between the host and the variant itself.
            let chain = ancestry(graph, id)?;
            let below_host: Vec<TypeId> = match chain.iter().position(|&t| t == host) {
                Some(index) => chain[index + 1..].to_vec(),
                None => vec![id],
            };
            let required_names = discriminator_names(graph, &chain);
            let mut props = Vec::new();
            for effective in collect_properties(graph, &below_host, &required_names, ctx.visibility) {
                if effective.name == property {
                    continue;
                }
                if let Some(schema) = self.convert_property(&effective, ctx)? {
                    props.push(schema);
                }
            }

            let mut nested = Vec::new();
            if let Some(own) = model.discriminator.as_deref().filter(|own| *own != property) {
                nested = self.variants(id, own, ctx, visited)?;
                attach_discriminator_property(&mut props, own, &nested);
            }

            variants.push(Discriminator {
                property: property.to_string(),
                value,
                format: object_format([&model.constraints]),
                props,
                discriminators: nested,
            });
        }
        Ok(variants)
    }
}

/// Reuse the declared discriminator property or synthesize a string one,
/// then mark it required with the variant values as its enum.
fn attach_discriminator_property(props: &mut Vec<Schema>, property: &str, variants: &[Discriminator]) {
    let index = match props.iter().position(|p| p.name == property) {
        Some(index) => index,
        None => {
            let string = SchemaBase::new(SchemaKind::String(StringSchema::new(StringType::String)));
            props.push(Schema::new(property, string));
            props.len() - 1
        }
    };
    let schema = &mut props[index];
    schema.required = true;
    if !variants.is_empty() {
        let values = variants.iter().map(|v| Value::String(v.value.clone()));
        schema.base.kind.set_enum(SchemaEnum::from_values(values));
    }
}

/// The literal a derived model pins its discriminator property to. Enums and
/// unions count only when they narrow to exactly one string.
fn discriminator_value(graph: &TypeGraph, model: &ModelDecl, property: &str) -> Option<String> {
    let decl = model.properties.get(property)?;
    single_string(graph, &decl.type_ref)
}

fn single_string(graph: &TypeGraph, type_ref: &TypeRef) -> Option<String> {
    match graph.resolve(type_ref).ok()? {
        Resolved::Literal(Value::String(value)) => Some(value.clone()),
        Resolved::Declared(_, TypeNode::Enum(decl)) => match decl.members.as_slice() {
            [member] => member.resolved_value().as_str().map(str::to_string),
            _ => None,
        },
        Resolved::Declared(_, TypeNode::Union(decl)) => match decl.variants.as_slice() {
            [variant] => single_string(graph, variant),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::convert::cls::ClsTable;
    use crate::convert::schema::{ConvertContext, SchemaConverter};
    use crate::diagnostics::Diagnostics;
    use crate::graph::{TypeGraph, Visibility};
    use crate::wire::{SchemaBase, Stage};

    const GRAPH: &str = r#"
version: "1.0"
types:
  Shape:
    kind: model
    name: Shape
    discriminator: kind
    derived: [Circle, Square, Polygon, Template, Loose]
    properties:
      name: { type: string, optional: true }
  Circle:
    kind: model
    name: Circle
    base: Shape
    properties:
      kind: { type: { literal: circle } }
      radius: { type: float64 }
  Square:
    kind: model
    name: Square
    base: Shape
    properties:
      kind: { type: { literal: square } }
      side: { type: int32, optional: true }
  Polygon:
    kind: model
    name: Polygon
    base: Shape
    discriminator: corners
    derived: [Triangle]
    properties:
      kind: { type: { literal: polygon } }
      corners: { type: string }
  Triangle:
    kind: model
    name: Triangle
    base: Polygon
    properties:
      corners: { type: { literal: three } }
      right: { type: boolean, optional: true }
  Template:
    kind: model
    name: Template
    base: Shape
    template: true
    properties:
      kind: { type: { literal: template } }
  Loose:
    kind: model
    name: Loose
    base: Shape
    properties:
      kind: { type: string }
"#;

    fn convert_shape(graph: &TypeGraph) -> SchemaBase {
        let mut table = ClsTable::new();
        let mut diagnostics = Diagnostics::new();
        let (id, _) = graph.model_by_name("Shape").unwrap();
        let mut converter = SchemaConverter::new(graph, &mut table, &mut diagnostics, "test");
        let mut base = converter
            .model(id, ConvertContext::new(Visibility::Read), &[])
            .unwrap();
        table.finalize(graph, Stage::Read);
        table.resolve(&mut base);
        base
    }

    #[test]
    fn variants_follow_declared_order_and_skip_unresolvable_values() {
        let graph = crate::graph::from_yaml(GRAPH).unwrap();
        let shape = convert_shape(&graph);
        insta::assert_json_snapshot!(shape, @r#"
        {
          "type": "object",
          "props": [
            {
              "name": "name",
              "type": "string"
            },
            {
              "name": "kind",
              "type": "string",
              "enum": {
                "items": [
                  {
                    "value": "circle"
                  },
                  {
                    "value": "square"
                  },
                  {
                    "value": "polygon"
                  }
                ]
              },
              "required": true
            }
          ],
          "discriminators": [
            {
              "property": "kind",
              "value": "circle",
              "props": [
                {
                  "name": "radius",
                  "type": "float64",
                  "required": true
                }
              ]
            },
            {
              "property": "kind",
              "value": "square",
              "props": [
                {
                  "name": "side",
                  "type": "integer32"
                }
              ]
            },
            {
              "property": "kind",
              "value": "polygon",
              "props": [
                {
                  "name": "corners",
                  "type": "string",
                  "enum": {
                    "items": [
                      {
                        "value": "three"
                      }
                    ]
                  },
                  "required": true
                }
              ],
              "discriminators": [
                {
                  "property": "corners",
                  "value": "three",
                  "props": [
                    {
                      "name": "right",
                      "type": "boolean"
                    }
                  ]
                }
              ]
            }
          ]
        }
        "#);
    }

    #[test]
    fn synthesized_discriminator_property_is_required_string() {
        let graph = crate::graph::from_yaml(
            r#"
version: "1.0"
types:
  Pet:
    kind: model
    name: Pet
    discriminator: kind
    derived: [Dog, Cat]
  Dog:
    kind: model
    name: Dog
    base: Pet
    properties:
      kind: { type: { literal: d1 } }
  Cat:
    kind: model
    name: Cat
    base: Pet
    properties:
      kind: { type: { literal: d2 } }
"#,
        )
        .unwrap();
        let mut table = ClsTable::new();
        let mut diagnostics = Diagnostics::new();
        let (id, _) = graph.model_by_name("Pet").unwrap();
        let mut converter = SchemaConverter::new(&graph, &mut table, &mut diagnostics, "test");
        let mut pet = converter
            .model(id, ConvertContext::new(Visibility::Create), &[])
            .unwrap();
        table.finalize(&graph, Stage::Create);
        table.resolve(&mut pet);
        assert_eq!(
            serde_json::to_value(&pet).unwrap(),
            json!({
                "type": "object",
                "props": [{
                    "name": "kind",
                    "type": "string",
                    "required": true,
                    "enum": {"items": [{"value": "d1"}, {"value": "d2"}]}
                }],
                "discriminators": [
                    {"property": "kind", "value": "d1"},
                    {"property": "kind", "value": "d2"}
                ]
            })
        );
    }

    #[test]
    fn variant_object_bounds_become_its_format() {
        let graph = crate::graph::from_yaml(
            r#"
version: "1.0"
types:
  Pet:
    kind: model
    name: Pet
    discriminator: kind
    derived: [Dog]
  Dog:
    kind: model
    name: Dog
    base: Pet
    maxProperties: 4
    minProperties: 1
    properties:
      kind: { type: { literal: d1 } }
"#,
        )
        .unwrap();
        let mut table = ClsTable::new();
        let mut diagnostics = Diagnostics::new();
        let (id, _) = graph.model_by_name("Pet").unwrap();
        let mut converter = SchemaConverter::new(&graph, &mut table, &mut diagnostics, "test");
        let pet = converter
            .model(id, ConvertContext::new(Visibility::Read), &[])
            .unwrap();
        let value = serde_json::to_value(&pet).unwrap();
        assert_eq!(
            value["discriminators"][0],
            json!({
                "property": "kind",
                "value": "d1",
                "format": {"maxProperties": 4, "minProperties": 1}
            })
        );
    }
}
