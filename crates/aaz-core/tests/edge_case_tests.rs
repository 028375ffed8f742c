use aaz_core::convert::convert_operation;
use aaz_core::diagnostics::{DiagnosticCode, Diagnostics};
use aaz_core::error::{ConvertError, OperationError, PassKind};
use aaz_core::graph::{self, TypeGraph};
use aaz_core::wire::{PathItem, Stage};
use serde_json::json;

const EDGE_CASES: &str = include_str!("fixtures/edge-cases.yaml");

fn edge_cases() -> TypeGraph {
    graph::from_yaml(EDGE_CASES).unwrap()
}

fn run(graph: &TypeGraph, container: &str, name: &str) -> (Result<PathItem, OperationError>, Diagnostics) {
    let operation = graph
        .operations
        .iter()
        .find(|op| op.container == container && op.name == name)
        .expect("operation should exist");
    let mut path_item = PathItem::default();
    let mut diagnostics = Diagnostics::new();
    let result = convert_operation(graph, operation, &mut path_item, &mut diagnostics).map(|_| path_item);
    (result, diagnostics)
}

#[test]
fn multipart_request_body_is_fatal() {
    let graph = edge_cases();
    let (result, _) = run(&graph, "Files", "upload");
    let err = result.unwrap_err();

    assert_eq!(err.operation, "Files_Upload");
    assert_eq!(err.stage, Stage::Create);
    assert_eq!(err.pass, PassKind::Request);
    assert!(matches!(err.source, ConvertError::MultipartBody));
}

#[test]
fn bytes_request_body_is_fatal() {
    let graph = edge_cases();
    let (result, _) = run(&graph, "Files", "uploadRaw");
    let err = result.unwrap_err();

    assert_eq!(err.stage, Stage::Create);
    assert!(matches!(err.source, ConvertError::BinaryPayload(_)));
}

#[test]
fn binary_response_is_fatal() {
    let graph = edge_cases();
    let (result, _) = run(&graph, "Files", "download");
    let err = result.unwrap_err();

    assert_eq!(err.stage, Stage::Read);
    assert_eq!(err.pass, PassKind::Responses);
    assert!(matches!(err.source, ConvertError::BinaryPayload(ref detail) if detail == "application/octet-stream"));
}

#[test]
fn unknown_error_envelope_is_fatal() {
    let graph = edge_cases();
    let (result, _) = run(&graph, "Things", "get");
    let err = result.unwrap_err();

    assert!(matches!(
        err.source,
        ConvertError::UnsupportedErrorFormat { ref status } if status == "404"
    ));
    assert_eq!(
        err.to_string(),
        "operation `Things_Get` failed in read responses: error response `404` does not match a known error format"
    );
}

#[test]
fn irregular_responses_are_reported_and_kept_going() {
    let graph = edge_cases();
    let (result, diagnostics) = run(&graph, "Things", "check");
    let path_item = result.unwrap();

    for code in [
        DiagnosticCode::DuplicatedSuccess2xx,
        DiagnosticCode::DuplicatedSuccess202,
        DiagnosticCode::DuplicatedRedirect,
        DiagnosticCode::MissingStatusCodes,
        DiagnosticCode::UnsupportedStatusCodeRange,
    ] {
        assert!(diagnostics.has(code), "expected {code}");
    }
    assert!(!diagnostics.has(DiagnosticCode::DuplicateBodyTypes));

    let head = path_item.verbs.values().next().unwrap();
    let read = serde_json::to_value(head.read.as_ref().unwrap()).unwrap();
    let responses = read["http"]["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 4);
    assert_eq!(responses[0]["statusCode"], json!([200, 201]));
    assert_eq!(
        responses[0]["body"]["json"]["schema"]["props"][0]["name"],
        "label"
    );
    assert_eq!(responses[1]["statusCode"], json!([202]));
    assert_eq!(responses[2]["statusCode"], json!([301]));
    assert_eq!(responses[3]["isError"], true);
    assert_eq!(
        responses[3]["body"]["json"]["schema"]["type"],
        "@ODataV4Format"
    );
}

#[test]
fn explicit_body_is_not_flattened() {
    let graph = edge_cases();
    let (result, _) = run(&graph, "Things", "update");
    let path_item = result.unwrap();
    let patch = path_item.verbs.values().next().unwrap();

    assert!(patch.read.is_none());
    assert!(patch.create.is_none());
    let update = serde_json::to_value(patch.update.as_ref().unwrap()).unwrap();
    let body = &update["http"]["request"]["body"]["json"]["schema"];
    assert_eq!(body["name"], "body");
    assert!(body.get("clientFlatten").is_none());
}

#[test]
fn unsupported_graph_versions_are_rejected() {
    let err = graph::from_yaml("version: \"2.0\"\n").unwrap_err();
    assert_eq!(err.to_string(), "unsupported type graph version: 2.0");
}

#[test]
fn required_parameter_without_schema_is_fatal() {
    let graph = edge_cases();
    let (result, diagnostics) = run(&graph, "Things", "purge");
    let err = result.unwrap_err();

    assert!(diagnostics.has(DiagnosticCode::UnionNull));
    assert_eq!(err.pass, PassKind::Request);
    assert!(matches!(
        err.source,
        ConvertError::MissingSchema { ref location } if location == "parameter `name`"
    ));
}

#[test]
fn never_parameters_are_dropped() {
    let graph = edge_cases();
    let (result, _) = run(&graph, "Things", "archive");
    let path_item = result.unwrap();
    let post = path_item.verbs.values().next().unwrap();

    let create = serde_json::to_value(post.create.as_ref().unwrap()).unwrap();
    let request = &create["http"]["request"];
    assert!(request.get("path").is_none());
    assert_eq!(request["query"]["params"][0]["name"], "reason");
}

#[test]
fn shared_success_body_is_converted_once() {
    let graph = edge_cases();
    let (result, diagnostics) = run(&graph, "Things", "build");
    let path_item = result.unwrap();
    let post = path_item.verbs.values().next().unwrap();

    assert!(!diagnostics.has(DiagnosticCode::DuplicatedSuccess2xx));
    let create = serde_json::to_value(post.create.as_ref().unwrap()).unwrap();
    let responses = create["http"]["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["statusCode"], json!([200, 201]));

    let gadget = &responses[0]["body"]["json"]["schema"];
    assert_eq!(gadget["type"], "object");
    assert!(gadget.get("cls").is_none());
    assert!(create["http"].get("clsDefinitions").is_none());
}
