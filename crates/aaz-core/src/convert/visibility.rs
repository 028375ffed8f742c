use crate::error::ResolveError;
use crate::graph::{PropertyDecl, TypeGraph, TypeId, Visibility};

/// A property as it appears on the wire for one visibility.
#[derive(Debug, Clone, Copy)]
pub struct EffectiveProperty<'g> {
    pub name: &'g str,
    pub decl: &'g PropertyDecl,
    /// The model that declares the property.
    pub owner: TypeId,
    pub required: bool,
    pub read_only: bool,
}

/// The effective shape of a model for one visibility.
#[derive(Debug, Clone)]
pub struct EffectivePayload<'g> {
    pub model: TypeId,
    pub properties: Vec<EffectiveProperty<'g>>,
}

/// The model and its bases, root first.
pub fn ancestry(graph: &TypeGraph, id: TypeId) -> Result<Vec<TypeId>, ResolveError> {
    let mut chain = vec![id];
    let mut current = id;
    while let Some(base) = graph.model(current).and_then(|m| m.base.as_deref()) {
        let (base_id, _) = graph.model_by_name(base)?;
        if chain.contains(&base_id) {
            break;
        }
        chain.push(base_id);
        current = base_id;
    }
    chain.reverse();
    Ok(chain)
}

/// Compute the properties of `id` visible under `visibility`, inherited ones first.
///
/// Hidden properties are dropped, not made optional. A property is required when
/// declared non-optional or when it carries the discriminator of any model in the
/// ancestry. Nothing is cached: every visibility is resolved from the declarations.
pub fn effective_payload<'g>(
    graph: &'g TypeGraph,
    id: TypeId,
    visibility: Visibility,
) -> Result<EffectivePayload<'g>, ResolveError> {
    let chain = ancestry(graph, id)?;
    let discriminators = discriminator_names(graph, &chain);
    let properties = collect_properties(graph, &chain, &discriminators, visibility);
    Ok(EffectivePayload { model: id, properties })
}

/// Properties declared by the models in `chain` (root first). A redeclared
/// property replaces the inherited one in place.
pub fn collect_properties<'g>(
    graph: &'g TypeGraph,
    chain: &[TypeId],
    discriminators: &[&str],
    visibility: Visibility,
) -> Vec<EffectiveProperty<'g>> {
    let mut properties: Vec<EffectiveProperty<'g>> = Vec::new();
    for &owner in chain {
        let Some(model) = graph.model(owner) else {
            continue;
        };
        for (name, decl) in &model.properties {
            let existing = properties.iter().position(|p| p.name == name.as_str());
            if !decl.is_visible(visibility) {
                if let Some(index) = existing {
                    properties.remove(index);
                }
                continue;
            }
            let property = EffectiveProperty {
                name: name.as_str(),
                decl,
                owner,
                required: !decl.optional || discriminators.contains(&name.as_str()),
                read_only: visibility == Visibility::Read && is_read_only(decl),
            };
            match existing {
                Some(index) => properties[index] = property,
                None => properties.push(property),
            }
        }
    }
    properties
}

pub fn discriminator_names<'g>(graph: &'g TypeGraph, chain: &[TypeId]) -> Vec<&'g str> {
    chain
        .iter()
        .filter_map(|&id| graph.model(id)?.discriminator.as_deref())
        .collect()
}

fn is_read_only(decl: &PropertyDecl) -> bool {
    matches!(decl.visibility.as_deref(), Some([Visibility::Read]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> TypeGraph {
        crate::graph::from_yaml(
            r#"
version: "1.0"
types:
  Resource:
    kind: model
    name: Resource
    properties:
      id: { type: string, visibility: [read] }
      name: { type: string, visibility: [read, create] }
  Widget:
    kind: model
    name: Widget
    base: Resource
    discriminator: kind
    properties:
      kind: { type: string, optional: true }
      color: { type: string, optional: true, visibility: [create, update] }
      weight: { type: int32 }
"#,
        )
        .unwrap()
    }

    fn names<'g>(payload: &EffectivePayload<'g>) -> Vec<&'g str> {
        payload.properties.iter().map(|p| p.name).collect()
    }

    #[test]
    fn inherited_properties_come_first() {
        let g = graph();
        let (id, _) = g.model_by_name("Widget").unwrap();
        let read = effective_payload(&g, id, Visibility::Read).unwrap();
        assert_eq!(names(&read), vec!["id", "name", "kind", "weight"]);
    }

    #[test]
    fn hidden_properties_are_dropped_per_visibility() {
        let g = graph();
        let (id, _) = g.model_by_name("Widget").unwrap();
        let create = effective_payload(&g, id, Visibility::Create).unwrap();
        assert_eq!(names(&create), vec!["name", "kind", "color", "weight"]);
        let update = effective_payload(&g, id, Visibility::Update).unwrap();
        assert_eq!(names(&update), vec!["kind", "color", "weight"]);
    }

    #[test]
    fn discriminator_is_always_required() {
        let g = graph();
        let (id, _) = g.model_by_name("Widget").unwrap();
        let update = effective_payload(&g, id, Visibility::Update).unwrap();
        let kind = update.properties.iter().find(|p| p.name == "kind").unwrap();
        assert!(kind.required);
        let color = update.properties.iter().find(|p| p.name == "color").unwrap();
        assert!(!color.required);
    }

    #[test]
    fn read_only_only_in_read_context() {
        let g = graph();
        let (id, _) = g.model_by_name("Widget").unwrap();
        let read = effective_payload(&g, id, Visibility::Read).unwrap();
        assert!(read.properties[0].read_only);
        assert!(!read.properties[1].read_only);
    }
}
