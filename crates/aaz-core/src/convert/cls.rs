use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use super::naming::{cls_base_name, unique_name};
use crate::graph::{TypeGraph, TypeId, Visibility};
use crate::wire::{ClsId, ClsName, Discriminator, Schema, SchemaBase, SchemaKind, Stage};

/// Bookkeeping for one `(model, visibility)` pair within a traversal pass.
#[derive(Debug, Clone)]
pub struct PendingSchema {
    pub type_id: TypeId,
    pub visibility: Visibility,
    pub count: usize,
    pub name: Option<String>,
    pub body: Option<SchemaBase>,
}

/// Reference-counting table of object schemas for a single traversal pass.
///
/// The first visit of a key builds the schema inline; every later visit,
/// including re-entry while the first build is still running, yields a
/// class-reference placeholder. `finalize` then names the records seen at
/// least twice and `resolve` writes those names into the converted tree.
#[derive(Debug, Default)]
pub struct ClsTable {
    records: IndexMap<(TypeId, Visibility), PendingSchema>,
    finalized: bool,
}

impl ClsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, type_id: TypeId, visibility: Visibility) -> ClsId {
        let entry = self.records.entry((type_id, visibility));
        let index = entry.index();
        entry.or_insert_with(|| PendingSchema {
            type_id,
            visibility,
            count: 0,
            name: None,
            body: None,
        });
        ClsId(index)
    }

    /// Count one more occurrence and return the new count.
    pub fn note_visit(&mut self, cls: ClsId) -> usize {
        match self.records.get_index_mut(cls.0) {
            Some((_, record)) => {
                record.count += 1;
                record.count
            }
            None => 0,
        }
    }

    pub fn store(&mut self, cls: ClsId, body: SchemaBase) {
        if let Some((_, record)) = self.records.get_index_mut(cls.0) {
            record.body = Some(body);
        }
    }

    pub fn record(&self, cls: ClsId) -> Option<&PendingSchema> {
        self.records.get_index(cls.0).map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Assign names in discovery order: records seen fewer than twice stay
    /// inline, the rest get a deterministic definition name.
    pub fn finalize(&mut self, graph: &TypeGraph, stage: Stage) {
        let mut visibilities: HashMap<TypeId, HashSet<Visibility>> = HashMap::new();
        for record in self.records.values().filter(|r| r.count >= 2) {
            visibilities
                .entry(record.type_id)
                .or_default()
                .insert(record.visibility);
        }

        let mut used = HashSet::new();
        for record in self.records.values_mut() {
            if record.count < 2 {
                record.name = None;
                continue;
            }
            let mut name = cls_base_name(graph, record.type_id);
            let shared = visibilities.get(&record.type_id).is_some_and(|v| v.len() > 1);
            if shared && record.visibility != stage.visibility() {
                name.push('_');
                name.push_str(record.visibility.as_str());
            }
            if record.visibility != Visibility::Read && stage != Stage::Read {
                name.push('_');
                name.push_str(stage.as_str());
            }
            record.name = Some(unique_name(&name, &mut used));
        }
        self.finalized = true;
    }

    /// Named definitions, in discovery order, with names resolved inside them.
    pub fn definitions(&self) -> IndexMap<String, SchemaBase> {
        let mut definitions = IndexMap::new();
        for record in self.records.values() {
            if let (Some(name), Some(body)) = (&record.name, &record.body) {
                let mut body = body.clone();
                self.resolve(&mut body);
                definitions.insert(name.clone(), body);
            }
        }
        definitions
    }

    /// Write finalized names into class slots and references of a converted tree.
    pub fn resolve(&self, node: &mut SchemaBase) {
        debug_assert!(self.finalized, "resolve called before finalize");
        self.resolve_kind(&mut node.kind);
    }

    pub fn resolve_schema(&self, schema: &mut Schema) {
        self.resolve(&mut schema.base);
    }

    fn resolve_kind(&self, kind: &mut SchemaKind) {
        match kind {
            SchemaKind::Cls(cls) => self.resolve_name(cls),
            SchemaKind::Object(object) => {
                if let Some(cls) = &mut object.cls {
                    self.resolve_name(cls);
                }
                for prop in &mut object.props {
                    self.resolve_schema(prop);
                }
                for discriminator in &mut object.discriminators {
                    self.resolve_discriminator(discriminator);
                }
                if let Some(item) = object.additional_props.as_mut().and_then(|a| a.item.as_mut()) {
                    self.resolve(item);
                }
            }
            SchemaKind::Array(array) => {
                if let Some(item) = &mut array.item {
                    self.resolve(item);
                }
            }
            SchemaKind::String(_) | SchemaKind::Integer(_) | SchemaKind::Float(_) | SchemaKind::Boolean(_) => {}
        }
    }

    fn resolve_discriminator(&self, discriminator: &mut Discriminator) {
        for prop in &mut discriminator.props {
            self.resolve_schema(prop);
        }
        for nested in &mut discriminator.discriminators {
            self.resolve_discriminator(nested);
        }
    }

    fn resolve_name(&self, cls: &mut ClsName) {
        if let Some(id) = cls.id {
            cls.name = self.record(id).and_then(|r| r.name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ObjectSchema;

    fn graph() -> TypeGraph {
        crate::graph::from_yaml(
            r#"
version: "1.0"
types:
  Widget: { kind: model, name: Widget }
  Gadget: { kind: model, name: Gadget }
"#,
        )
        .unwrap()
    }

    #[test]
    fn records_are_keyed_by_type_and_visibility() {
        let mut table = ClsTable::new();
        let a = table.get_or_create(TypeId(0), Visibility::Read);
        let b = table.get_or_create(TypeId(0), Visibility::Create);
        let c = table.get_or_create(TypeId(0), Visibility::Read);
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(table.note_visit(a), 1);
        assert_eq!(table.note_visit(a), 2);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn only_repeated_records_are_named() {
        let g = graph();
        let mut table = ClsTable::new();
        let widget = table.get_or_create(TypeId(0), Visibility::Read);
        let gadget = table.get_or_create(TypeId(1), Visibility::Read);
        table.note_visit(widget);
        table.note_visit(widget);
        table.note_visit(gadget);
        table.finalize(&g, Stage::Read);
        assert_eq!(table.record(widget).unwrap().name.as_deref(), Some("Widget"));
        assert_eq!(table.record(gadget).unwrap().name, None);
    }

    #[test]
    fn names_carry_visibility_and_stage_suffixes() {
        let g = graph();
        let mut table = ClsTable::new();
        let create = table.get_or_create(TypeId(0), Visibility::Create);
        let query = table.get_or_create(TypeId(0), Visibility::Query);
        for id in [create, create, query, query] {
            table.note_visit(id);
        }
        table.finalize(&g, Stage::Create);
        assert_eq!(table.record(create).unwrap().name.as_deref(), Some("Widget_create"));
        assert_eq!(table.record(query).unwrap().name.as_deref(), Some("Widget_query_create"));
    }

    #[test]
    fn resolve_fills_slots_and_references() {
        let g = graph();
        let mut table = ClsTable::new();
        let widget = table.get_or_create(TypeId(0), Visibility::Read);
        table.note_visit(widget);
        table.note_visit(widget);
        let body = SchemaBase::new(SchemaKind::Object(ObjectSchema {
            cls: Some(ClsName::pending(widget)),
            ..Default::default()
        }));
        table.store(widget, body.clone());
        table.finalize(&g, Stage::Read);

        let mut reference = SchemaBase::new(SchemaKind::Cls(ClsName::pending(widget)));
        table.resolve(&mut reference);
        assert_eq!(reference.type_name(), "@Widget");

        let definitions = table.definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(
            serde_json::to_value(&definitions["Widget"]).unwrap(),
            serde_json::json!({"type": "object", "cls": "Widget"})
        );
    }
}
