use indexmap::IndexMap;

use crate::convert::convert_operation;
use crate::convert::naming::{resource_id, resource_path};
use crate::diagnostics::Diagnostics;
use crate::error::EmitError;
use crate::graph::TypeGraph;
use crate::wire::{PathItem, ResourceEntry, ResourceOperations, ResourceVersion};
use crate::{EmittedFile, Emitter};

/// Version label for graphs that declare no `service.apiVersion`.
pub const UNVERSIONED: &str = "unversioned";

pub const RESOURCES_FILE: &str = "resources.json";
pub const RESOURCES_OPERATIONS_FILE: &str = "resources_operations.json";

fn api_version(graph: &TypeGraph) -> &str {
    graph.service.api_version.as_deref().unwrap_or(UNVERSIONED)
}

/// Group every operation of every graph by resource id, one version entry
/// per graph that addresses the resource.
pub fn list_resources(graphs: &[TypeGraph]) -> Vec<ResourceEntry> {
    let mut resources: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
    for graph in graphs {
        let version = api_version(graph);
        for operation in &graph.operations {
            let path = resource_path(&operation.path, operation.shared_route);
            resources
                .entry(resource_id(path))
                .or_default()
                .insert(version.to_string(), path.to_string());
        }
    }

    resources
        .into_iter()
        .map(|(id, versions)| ResourceEntry {
            versions: versions
                .into_iter()
                .map(|(version, path)| ResourceVersion {
                    version,
                    path,
                    id: id.clone(),
                })
                .collect(),
            id,
        })
        .collect()
}

/// Convert the operations of the requested resources. Resources without any
/// matching operation are left out; the rest keep the requested order.
pub fn get_resources_operations(
    graph: &TypeGraph,
    resources: &[String],
    diagnostics: &mut Diagnostics,
) -> Result<Vec<ResourceOperations>, EmitError> {
    let version = api_version(graph);
    let mut found: IndexMap<&str, (String, PathItem)> = resources
        .iter()
        .map(|id| (id.as_str(), (String::new(), PathItem::default())))
        .collect();

    for operation in &graph.operations {
        let path = resource_path(&operation.path, operation.shared_route);
        let id = resource_id(path);
        let Some((resource_path, path_item)) = found.get_mut(id.as_str()) else {
            continue;
        };
        if resource_path.is_empty() {
            *resource_path = path.to_string();
        }
        convert_operation(graph, operation, path_item, diagnostics)?;
    }

    Ok(found
        .into_iter()
        .filter(|(_, (_, path_item))| !path_item.verbs.is_empty())
        .map(|(id, (path, path_item))| ResourceOperations {
            id: id.to_string(),
            path,
            version: version.to_string(),
            path_item,
        })
        .collect())
}

/// Writes `resources.json` listing every resource and its versions.
#[derive(Debug, Default)]
pub struct ListResourcesEmitter;

impl Emitter for ListResourcesEmitter {
    type Error = EmitError;

    fn emit(
        &self,
        graphs: &[TypeGraph],
        _diagnostics: &mut Diagnostics,
    ) -> Result<Vec<EmittedFile>, Self::Error> {
        let entries = list_resources(graphs);
        log::info!("listed {} resources", entries.len());
        Ok(vec![EmittedFile {
            path: RESOURCES_FILE.to_string(),
            content: serde_json::to_string_pretty(&entries)?,
        }])
    }
}

/// Writes `resources_operations.json` for the selected resources of one API version.
#[derive(Debug, Default)]
pub struct ResourcesOperationsEmitter {
    /// Graph to convert, matched against `service.apiVersion`. The first
    /// graph is used when unset.
    pub api_version: Option<String>,
    pub resources: Vec<String>,
}

impl ResourcesOperationsEmitter {
    fn select<'g>(&self, graphs: &'g [TypeGraph]) -> Result<Option<&'g TypeGraph>, EmitError> {
        match &self.api_version {
            Some(version) => graphs
                .iter()
                .find(|graph| graph.service.api_version.as_deref() == Some(version.as_str()))
                .map(Some)
                .ok_or_else(|| EmitError::UnknownApiVersion(version.clone())),
            None => Ok(graphs.first()),
        }
    }
}

impl Emitter for ResourcesOperationsEmitter {
    type Error = EmitError;

    fn emit(
        &self,
        graphs: &[TypeGraph],
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<EmittedFile>, Self::Error> {
        let operations = match self.select(graphs)? {
            Some(graph) => get_resources_operations(graph, &self.resources, diagnostics)?,
            None => Vec::new(),
        };
        log::info!(
            "converted {} of {} requested resources",
            operations.len(),
            self.resources.len()
        );
        Ok(vec![EmittedFile {
            path: RESOURCES_OPERATIONS_FILE.to_string(),
            content: serde_json::to_string_pretty(&operations)?,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::HttpVerb;

    fn graph(version: &str) -> TypeGraph {
        crate::graph::from_yaml(&format!(
            r#"
version: "1.0"
service:
  title: Widgets
  apiVersion: "{version}"
types:
  Widget:
    kind: model
    name: Widget
    properties:
      name: {{ type: string }}
operations:
  - name: get
    container: Widgets
    verb: get
    path: /subscriptions/{{subscriptionId}}/widgets/{{widgetName}}
    responses:
      - {{ status: 200, type: Widget }}
  - name: delete
    container: Widgets
    verb: delete
    path: /subscriptions/{{subscriptionId}}/widgets/{{widgetName}}
    responses:
      - {{ status: 200 }}
      - {{ status: 204 }}
  - name: action
    container: Widgets
    verb: post
    path: /subscriptions/{{subscriptionId}}/widgets/{{widgetName}}?action=restart
    sharedRoute: true
    responses:
      - {{ status: 200 }}
"#
        ))
        .unwrap()
    }

    #[test]
    fn resources_are_grouped_across_versions() {
        let entries = list_resources(&[graph("2024-01-01"), graph("2025-01-01")]);
        assert_eq!(entries.len(), 2);

        let widget = &entries[0];
        assert_eq!(widget.id, "/subscriptions/{}/widgets/{}");
        let versions: Vec<_> = widget.versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(versions, ["2024-01-01", "2025-01-01"]);
        assert_eq!(
            widget.versions[0].path,
            "/subscriptions/{subscriptionId}/widgets/{widgetName}"
        );

        assert_eq!(entries[1].id, "/subscriptions/{}/widgets/{}?action=restart");
    }

    #[test]
    fn requested_resources_collect_their_verbs() {
        let graph = graph("2024-01-01");
        let mut diagnostics = Diagnostics::new();
        let operations = get_resources_operations(
            &graph,
            &[
                "/subscriptions/{}/widgets/{}".to_string(),
                "/subscriptions/{}/gadgets/{}".to_string(),
            ],
            &mut diagnostics,
        )
        .unwrap();

        assert_eq!(operations.len(), 1);
        let widget = &operations[0];
        assert_eq!(widget.version, "2024-01-01");
        assert_eq!(widget.path, "/subscriptions/{subscriptionId}/widgets/{widgetName}");
        let verbs: Vec<_> = widget.path_item.verbs.keys().copied().collect();
        assert_eq!(verbs, [HttpVerb::Get, HttpVerb::Delete]);
        assert_eq!(
            widget.path_item.get(HttpVerb::Get).unwrap().operation_id,
            "Widgets_Get"
        );
    }

    #[test]
    fn emitter_selects_graph_by_api_version() {
        let graphs = [graph("2024-01-01"), graph("2025-01-01")];
        let emitter = ResourcesOperationsEmitter {
            api_version: Some("2023-01-01".to_string()),
            resources: vec!["/subscriptions/{}/widgets/{}".to_string()],
        };
        let err = emitter.emit(&graphs, &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, EmitError::UnknownApiVersion(v) if v == "2023-01-01"));

        let emitter = ResourcesOperationsEmitter {
            api_version: Some("2025-01-01".to_string()),
            ..emitter
        };
        let files = emitter.emit(&graphs, &mut Diagnostics::new()).unwrap();
        assert_eq!(files[0].path, RESOURCES_OPERATIONS_FILE);
        let value: serde_json::Value = serde_json::from_str(&files[0].content).unwrap();
        assert_eq!(value[0]["version"], "2025-01-01");
        assert_eq!(value[0]["pathItem"]["get"]["operationId"], "Widgets_Get");
    }
}
