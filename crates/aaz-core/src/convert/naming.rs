use std::collections::HashSet;

use heck::ToPascalCase;

use crate::graph::{Resolved, TypeGraph, TypeId, TypeRef};

/// Base name of a shared definition: the declared model name, followed by the
/// names of its template arguments for instantiated templates (`Page<Widget>` -> `PageWidget`).
pub fn cls_base_name(graph: &TypeGraph, id: TypeId) -> String {
    let mut name = pascal_identifier(graph.model_name(id));
    if let Some(model) = graph.model(id) {
        for arg in &model.template_args {
            if let TypeRef::Named(arg) = arg {
                let arg_name = match graph.resolve_name(arg) {
                    Ok(Resolved::Declared(arg_id, _)) if graph.model(arg_id).is_some() => {
                        cls_base_name(graph, arg_id)
                    }
                    _ => pascal_identifier(arg),
                };
                name.push_str(&arg_name);
            }
        }
    }
    name
}

/// Keep identifiers that are already alphanumeric, only upper-casing the first
/// letter; run anything else through heck.
pub fn pascal_identifier(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return upper_first(name);
    }
    let pascal = name.to_pascal_case();
    if pascal.is_empty() {
        return "Unnamed".to_string();
    }
    pascal
}

pub fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Claim `base` in `used_names`, appending a numeric suffix on collision.
pub fn unique_name(base: &str, used_names: &mut HashSet<String>) -> String {
    if used_names.insert(base.to_string()) {
        return base.to_string();
    }
    let mut i = 2;
    loop {
        let candidate = format!("{base}{i}");
        if used_names.insert(candidate.clone()) {
            return candidate;
        }
        i += 1;
    }
}

/// `Widgets` + `createOrUpdate` -> `Widgets_CreateOrUpdate`.
pub fn operation_id(container: &str, name: &str) -> String {
    if container.is_empty() {
        return upper_first(name);
    }
    format!("{container}_{}", upper_first(name))
}

/// Strip the query string, together with a slash directly before it.
pub fn path_without_query(path: &str) -> &str {
    match path.find('?') {
        Some(index) => {
            let head = &path[..index];
            head.strip_suffix('/').unwrap_or(head)
        }
        None => path,
    }
}

/// The route a resource is addressed by. Shared routes keep their query string.
pub fn resource_path(path: &str, shared_route: bool) -> &str {
    if shared_route {
        path
    } else {
        path_without_query(path)
    }
}

/// Normalize a resource path into a resource id: every `{param}` placeholder
/// becomes `{}` except a whole first segment, and the path part is lowercased.
pub fn resource_id(path: &str) -> String {
    let (url, query) = match path.split_once('?') {
        Some((url, query)) => (url, Some(query)),
        None => (path, None),
    };

    let parts: Vec<String> = url
        .split('/')
        .enumerate()
        .map(|(idx, part)| {
            if idx == 0 || (idx == 1 && is_whole_placeholder(part)) {
                part.to_string()
            } else {
                replace_placeholders(part)
            }
        })
        .collect();

    let mut id = parts.join("/").to_lowercase();
    if let Some(query) = query {
        id.push('?');
        id.push_str(query);
    }
    id
}

fn is_whole_placeholder(segment: &str) -> bool {
    segment.len() >= 2
        && segment.starts_with('{')
        && segment.ends_with('}')
        && !segment[1..segment.len() - 1].contains(['{', '}'])
}

fn replace_placeholders(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find(['{', '}']) {
            Some(end) if after.as_bytes()[end] == b'}' => {
                out.push_str(&rest[..start]);
                out.push_str("{}");
                rest = &after[end + 1..];
            }
            Some(end) => {
                out.push_str(&rest[..start + 1 + end]);
                rest = &after[end..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}
