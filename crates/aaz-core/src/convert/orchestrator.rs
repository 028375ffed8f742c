use std::collections::HashSet;

use super::naming::operation_id;
use super::operation::OperationAssembler;
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::error::OperationError;
use crate::graph::{HttpOperation, PagedDecl, Resolved, TypeGraph, TypeId, TypeNode, TypeRef};
use crate::wire::{Pageable, PathItem, Stage, VerbOperations};

const DEFAULT_NEXT_LINK_NAME: &str = "nextLink";
const DEFAULT_ITEM_NAME: &str = "value";

/// Convert one operation into its verb slot of `path_item`.
///
/// Each stage of the verb (`create` then `update` for PUT) runs its own
/// request and response passes; nothing carries over between them.
pub fn convert_operation(
    graph: &TypeGraph,
    operation: &HttpOperation,
    path_item: &mut PathItem,
    diagnostics: &mut Diagnostics,
) -> Result<(), OperationError> {
    let id = operation_id(&operation.container, &operation.name);
    let stages = Stage::for_verb(operation.verb);
    if stages.is_empty() {
        diagnostics.report(
            DiagnosticCode::UnexpectedVerb,
            &id,
            format!("verb `{}` is not expected", operation.verb),
        );
        return Ok(());
    }

    log::debug!("converting {} {} as {id}", operation.verb, operation.path);
    let assembler = OperationAssembler::new(graph, operation, id.clone(), diagnostics)?;
    let mut verb_operations = VerbOperations::new(id);
    verb_operations.pageable = pageable(graph, operation);
    for &stage in stages {
        let schema = assembler.assemble(stage, diagnostics)?;
        verb_operations.set_stage(stage, schema);
    }
    path_item.verbs.insert(operation.verb, verb_operations);
    Ok(())
}

/// Paging metadata of the first response model that carries it, directly,
/// through its base, or through a template argument.
pub fn pageable(graph: &TypeGraph, operation: &HttpOperation) -> Option<Pageable> {
    operation
        .responses
        .iter()
        .filter_map(|response| response.type_ref.as_ref())
        .find_map(|type_ref| find_paged(graph, type_ref, &mut HashSet::new()))
        .map(|paged| Pageable {
            next_link_name: paged
                .next_link_segments
                .last()
                .cloned()
                .unwrap_or_else(|| DEFAULT_NEXT_LINK_NAME.to_string()),
            item_name: paged
                .item_segments
                .last()
                .filter(|name| name.as_str() != DEFAULT_ITEM_NAME)
                .cloned(),
        })
}

fn find_paged<'g>(
    graph: &'g TypeGraph,
    type_ref: &TypeRef,
    visited: &mut HashSet<TypeId>,
) -> Option<&'g PagedDecl> {
    let TypeRef::Named(name) = type_ref else {
        return None;
    };
    let Ok(Resolved::Declared(id, TypeNode::Model(model))) = graph.resolve_name(name) else {
        return None;
    };
    if !visited.insert(id) {
        return None;
    }
    if let Some(paged) = &model.paged {
        return Some(paged);
    }
    if let Some(base) = model.base.as_deref() {
        if let Ok((_, base_model)) = graph.model_by_name(base) {
            if let Some(paged) = &base_model.paged {
                return Some(paged);
            }
        }
    }
    model
        .template_args
        .iter()
        .find_map(|arg| find_paged(graph, arg, visited))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPH: &str = r#"
version: "1.0"
types:
  Widget:
    kind: model
    name: Widget
    properties:
      name: { type: string }
  WidgetPage:
    kind: model
    name: Page
    templateArgs: [Widget]
    paged:
      nextLinkSegments: [nextPage]
      itemSegments: [items]
  Wrapper:
    kind: model
    name: Wrapper
    templateArgs: [WidgetPage]
operations:
  - name: list
    container: Widgets
    verb: get
    path: /widgets
    responses:
      - { status: 200, type: Wrapper }
  - name: get
    container: Widgets
    verb: get
    path: /widgets/{name}
    responses:
      - { status: 200, type: Widget }
  - name: options
    container: Widgets
    verb: options
    path: /widgets
"#;

    #[test]
    fn paging_is_found_through_template_arguments() {
        let graph = crate::graph::from_yaml(GRAPH).unwrap();
        let paged = pageable(&graph, &graph.operations[0]).unwrap();
        assert_eq!(paged.next_link_name, "nextPage");
        assert_eq!(paged.item_name.as_deref(), Some("items"));
        assert!(pageable(&graph, &graph.operations[1]).is_none());
    }

    #[test]
    fn unexpected_verbs_are_reported_and_skipped() {
        let graph = crate::graph::from_yaml(GRAPH).unwrap();
        let mut path_item = PathItem::default();
        let mut diagnostics = Diagnostics::new();
        convert_operation(&graph, &graph.operations[2], &mut path_item, &mut diagnostics).unwrap();
        assert!(path_item.verbs.is_empty());
        assert!(diagnostics.has(DiagnosticCode::UnexpectedVerb));
    }
}
