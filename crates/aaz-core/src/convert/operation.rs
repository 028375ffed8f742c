use std::collections::HashMap;

use super::cls::ClsTable;
use super::naming::path_without_query;
use super::schema::{ConvertContext, SchemaConverter};
use super::visibility::effective_payload;
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::error::{ConvertError, OperationError, PassKind};
use crate::graph::{
    BuiltinScalar, HttpOperation, HttpParameter, HttpVerb, Intrinsic, ParameterLocation, Resolved,
    ResponseDecl, StatusCodes, TypeGraph, TypeId, TypeNode, TypeRef, Visibility,
};
use crate::wire::{
    ClsDefinitions, ClsName, HttpAction, HttpRequest, HttpResponse, LongRunning, OperationSchema,
    RequestArgs, RequestBody, RequestHeader, RequestJson, ResponseBody, ResponseHeader,
    ResponseHeaderItem, ResponseJson, Schema, SchemaBase, SchemaDefault, SchemaKind, Stage,
};

const DEFAULT_FINAL_STATE_VIA: &str = "azure-async-operation";
const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";
const RESPONSE_VAR: &str = "$Instance";

/// Builds the per-stage operation schema of one HTTP operation.
pub struct OperationAssembler<'a> {
    graph: &'a TypeGraph,
    operation: &'a HttpOperation,
    operation_id: String,
    /// Service host parameters, converted once for the whole operation.
    host_params: Vec<Schema>,
}

impl<'a> OperationAssembler<'a> {
    pub fn new(
        graph: &'a TypeGraph,
        operation: &'a HttpOperation,
        operation_id: String,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, OperationError> {
        let host_params = host_parameters(graph, &operation_id, diagnostics).map_err(|source| {
            OperationError {
                operation: operation_id.clone(),
                stage: Stage::for_verb(operation.verb).first().copied().unwrap_or(Stage::Read),
                pass: PassKind::Host,
                source,
            }
        })?;
        Ok(Self {
            graph,
            operation,
            operation_id,
            host_params,
        })
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Run the request pass and the response pass of one stage, each with its own cls table.
    pub fn assemble(
        &self,
        stage: Stage,
        diagnostics: &mut Diagnostics,
    ) -> Result<OperationSchema, OperationError> {
        let fail = |pass: PassKind| {
            move |source: ConvertError| OperationError {
                operation: self.operation_id.clone(),
                stage,
                pass,
                source,
            }
        };

        let mut request_table = ClsTable::new();
        let mut request = self
            .request(stage, &mut request_table, diagnostics)
            .map_err(fail(PassKind::Request))?;
        request_table.finalize(self.graph, stage);
        resolve_request(&request_table, &mut request);

        let mut response_table = ClsTable::new();
        let mut responses = self
            .responses(&mut response_table, diagnostics)
            .map_err(fail(PassKind::Responses))?;
        response_table.finalize(self.graph, stage);
        for response in &mut responses {
            if let Some(body) = &mut response.body {
                response_table.resolve(&mut body.json.schema);
            }
        }

        let long_running = match (&self.operation.lro, self.operation.verb) {
            (Some(lro), verb) if verb != HttpVerb::Get => Some(LongRunning {
                final_state_via: lro
                    .final_state_via
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FINAL_STATE_VIA.to_string()),
            }),
            _ => None,
        };

        Ok(OperationSchema {
            operation_id: self.operation_id.clone(),
            description: self.operation.description.clone(),
            long_running,
            http: HttpAction {
                path: path_without_query(&self.operation.path).to_string(),
                request,
                responses,
                cls_definitions: ClsDefinitions {
                    request: request_table.definitions(),
                    responses: response_table.definitions(),
                },
            },
        })
    }

    fn request(
        &self,
        stage: Stage,
        table: &mut ClsTable,
        diagnostics: &mut Diagnostics,
    ) -> Result<HttpRequest, ConvertError> {
        let mut converter = SchemaConverter::new(self.graph, table, diagnostics, &self.operation_id);

        let mut path = RequestArgs {
            params: self.host_params.clone(),
            consts: Vec::new(),
        };
        let mut query = RequestArgs::default();
        let mut header = RequestHeader::default();

        for param in &self.operation.parameters {
            if param.location == ParameterLocation::Header {
                let name = param.name.to_ascii_lowercase();
                if name == "content-type" || name == "accept" {
                    continue;
                }
                if name == CLIENT_REQUEST_ID_HEADER {
                    header.client_request_id = Some(param.name.clone());
                    continue;
                }
            }
            let Some(schema) = convert_parameter(&mut converter, param)? else {
                continue;
            };
            let args = match param.location {
                ParameterLocation::Path => &mut path,
                ParameterLocation::Query => &mut query,
                ParameterLocation::Header => &mut header.args,
            };
            if schema.base.is_const {
                args.consts.push(schema);
            } else {
                args.params.push(schema);
            }
        }
        for args in [&mut path, &mut query, &mut header.args] {
            args.params.sort_by(|a, b| a.name.cmp(&b.name));
            args.consts.sort_by(|a, b| a.name.cmp(&b.name));
        }

        let body = self.request_body(&mut converter, stage)?;

        Ok(HttpRequest {
            method: self.operation.verb,
            path: non_empty(path),
            query: non_empty(query),
            header: if header.args.is_empty() && header.client_request_id.is_none() {
                None
            } else {
                Some(header)
            },
            body,
        })
    }

    fn request_body<'c>(
        &'c self,
        converter: &mut SchemaConverter<'c>,
        stage: Stage,
    ) -> Result<Option<RequestBody>, ConvertError> {
        let Some(body) = &self.operation.body else {
            return Ok(None);
        };
        check_content_types(&body.content_types)?;
        if is_bytes(self.graph, &body.type_ref) {
            return Err(ConvertError::BinaryPayload("bytes request body".to_string()));
        }

        let ctx = ConvertContext::new(stage.visibility());
        let Some(base) = converter.convert(&body.type_ref, ctx, &[])? else {
            if body.optional {
                return Ok(None);
            }
            return Err(ConvertError::MissingSchema {
                location: "request body".to_string(),
            });
        };

        let bare_object = matches!(base.kind, SchemaKind::Object(_) | SchemaKind::Cls(_));
        let mut schema = Schema::new(body.name.as_deref().unwrap_or("body"), base);
        schema.required = !body.optional;
        schema.description = body.description.clone();
        schema.client_flatten = !body.explicit && bare_object;
        Ok(Some(RequestBody {
            json: RequestJson { schema },
        }))
    }

    /// Classify responses into, in order: other 2xx, 202, 204, redirect, errors.
    fn responses(
        &self,
        table: &mut ClsTable,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<HttpResponse>, ConvertError> {
        let graph = self.graph;
        let target = self.operation_id.as_str();
        let mut buckets = ResponseBuckets::default();
        let mut seen_bodies: HashMap<String, Option<&TypeRef>> = HashMap::new();

        for decl in &self.operation.responses {
            let Some(status) = &decl.status else {
                diagnostics.report(DiagnosticCode::MissingStatusCodes, target, "response has no status code");
                continue;
            };
            let Some(class) = classify(status) else {
                diagnostics.report(
                    DiagnosticCode::UnsupportedStatusCodeRange,
                    target,
                    format!("cannot classify status `{status}`"),
                );
                continue;
            };

            let key = status.to_string();
            match seen_bodies.get(&key) {
                Some(previous) if *previous != decl.type_ref.as_ref() => diagnostics.report(
                    DiagnosticCode::DuplicateBodyTypes,
                    target,
                    format!("status `{key}` is declared with different bodies"),
                ),
                _ => {}
            }
            seen_bodies.insert(key.clone(), decl.type_ref.as_ref());

            check_content_types(&decl.content_types)?;
            if decl.type_ref.as_ref().is_some_and(|t| is_bytes(graph, t)) {
                return Err(ConvertError::BinaryPayload(format!("bytes response body for `{key}`")));
            }

            let is_error = matches!(class, StatusClass::Error(_));
            let body = if is_error {
                error_body(graph, decl, &key)?
            } else if buckets.keeps_existing_body(&class, decl.type_ref.as_ref()) {
                None
            } else {
                let mut converter = SchemaConverter::new(graph, table, diagnostics, target);
                match &decl.type_ref {
                    Some(type_ref) => converter.convert(type_ref, ConvertContext::new(Visibility::Read), &[])?,
                    None => None,
                }
            };

            let response = HttpResponse {
                status_code: None,
                is_error,
                description: decl.description.clone(),
                header: response_header(decl),
                body: body.map(|schema| ResponseBody {
                    json: ResponseJson {
                        var: if is_error { None } else { Some(RESPONSE_VAR.to_string()) },
                        schema,
                    },
                }),
            };
            buckets.place(class, response, decl.type_ref.as_ref(), target, diagnostics);
        }

        Ok(buckets.into_ordered())
    }
}

/// Convert the service host parameters with a scratch cls table.
fn host_parameters(
    graph: &TypeGraph,
    operation_id: &str,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<Schema>, ConvertError> {
    let Some(server) = &graph.service.server else {
        return Ok(Vec::new());
    };

    for name in template_parameters(&server.url) {
        if !server.parameters.contains_key(name) {
            diagnostics.report(
                DiagnosticCode::MissingHostParameter,
                operation_id,
                format!("host template parameter `{name}` has no binding"),
            );
        }
    }

    let mut table = ClsTable::new();
    let mut converter = SchemaConverter::new(graph, &mut table, diagnostics, operation_id);
    let mut params = Vec::new();
    for (name, decl) in &server.parameters {
        let Some(base) = converter.convert(&decl.type_ref, ConvertContext::new(Visibility::Query), &[])? else {
            continue;
        };
        let mut schema = Schema::new(name.clone(), base);
        schema.required = true;
        schema.description = decl.description.clone();
        schema.skip_url_encoding = decl.allow_reserved;
        params.push(schema);
    }
    table.finalize(graph, Stage::Read);
    for param in &mut params {
        table.resolve_schema(param);
    }
    Ok(params)
}

fn template_parameters(url: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = url;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        names.push(&after[..end]);
        rest = &after[end + 1..];
    }
    names
}

fn convert_parameter<'a>(
    converter: &mut SchemaConverter<'a>,
    param: &'a HttpParameter,
) -> Result<Option<Schema>, ConvertError> {
    // `never` parameters cannot be sent and are left out of the request.
    if matches!(
        converter.graph.resolve(&param.type_ref)?,
        Resolved::Intrinsic(Intrinsic::Never)
    ) {
        return Ok(None);
    }
    let ctx = ConvertContext::new(Visibility::Query).with_collection_format(param.collection_format);
    let required = param.location == ParameterLocation::Path || !param.optional;
    let Some(mut base) = converter.convert(&param.type_ref, ctx, &[&param.constraints])? else {
        if required {
            return Err(ConvertError::MissingSchema {
                location: format!("parameter `{}`", param.name),
            });
        }
        return Ok(None);
    };
    if base.default.is_none() {
        base.default = param.default.clone().map(|value| SchemaDefault { value });
    }
    let mut schema = Schema::new(param.name.clone(), base);
    schema.required = required;
    schema.description = param.description.clone();
    schema.secret = converter.is_secret(&param.type_ref, &param.constraints);
    schema.skip_url_encoding = param.allow_reserved;
    Ok(Some(schema))
}

fn non_empty(args: RequestArgs) -> Option<RequestArgs> {
    if args.is_empty() { None } else { Some(args) }
}

fn resolve_request(table: &ClsTable, request: &mut HttpRequest) {
    let locations = [
        request.path.as_mut(),
        request.query.as_mut(),
        request.header.as_mut().map(|h| &mut h.args),
    ];
    for args in locations.into_iter().flatten() {
        for schema in args.params.iter_mut().chain(args.consts.iter_mut()) {
            table.resolve_schema(schema);
        }
    }
    if let Some(body) = &mut request.body {
        table.resolve_schema(&mut body.json.schema);
    }
}

fn check_content_types(content_types: &[String]) -> Result<(), ConvertError> {
    for content_type in content_types {
        let lower = content_type.to_ascii_lowercase();
        if lower.starts_with("multipart/") {
            return Err(ConvertError::MultipartBody);
        }
        if lower == "application/octet-stream" {
            return Err(ConvertError::BinaryPayload(content_type.clone()));
        }
    }
    Ok(())
}

fn is_bytes(graph: &TypeGraph, type_ref: &TypeRef) -> bool {
    match graph.resolve(type_ref) {
        Ok(Resolved::Builtin(BuiltinScalar::Bytes)) => true,
        Ok(Resolved::Declared(id, TypeNode::Scalar(_))) => {
            super::scalar::ScalarChain::declared(graph, id)
                .is_ok_and(|chain| chain.builtin == BuiltinScalar::Bytes)
        }
        _ => false,
    }
}

fn response_header(decl: &ResponseDecl) -> Option<ResponseHeader> {
    if decl.headers.is_empty() {
        return None;
    }
    Some(ResponseHeader {
        items: decl
            .headers
            .iter()
            .map(|h| ResponseHeaderItem { name: h.name.clone() })
            .collect(),
    })
}

#[derive(Debug, Clone, PartialEq)]
enum StatusClass {
    Success(u16),
    Accepted,
    NoContent,
    Redirect(u16),
    /// An error response; `None` for `default`, wildcards and ranges.
    Error(Option<u16>),
}

fn classify(status: &StatusCodes) -> Option<StatusClass> {
    match status {
        StatusCodes::Code(code) => classify_code(*code),
        StatusCodes::Range { start, end } => {
            if start <= end && *start >= 400 && *end <= 599 {
                Some(StatusClass::Error(None))
            } else {
                None
            }
        }
        StatusCodes::Wildcard(raw) => match raw.as_str() {
            "*" | "default" => Some(StatusClass::Error(None)),
            other => other.parse::<u16>().ok().and_then(classify_code),
        },
    }
}

fn classify_code(code: u16) -> Option<StatusClass> {
    match code {
        202 => Some(StatusClass::Accepted),
        204 => Some(StatusClass::NoContent),
        200..=299 => Some(StatusClass::Success(code)),
        300..=399 => Some(StatusClass::Redirect(code)),
        100..=599 => Some(StatusClass::Error(Some(code))),
        _ => None,
    }
}

#[derive(Default)]
struct ResponseBuckets<'g> {
    success: Option<(HttpResponse, Option<&'g TypeRef>)>,
    accepted: Option<HttpResponse>,
    no_content: Option<HttpResponse>,
    redirect: Option<HttpResponse>,
    errors: Vec<HttpResponse>,
}

impl<'g> ResponseBuckets<'g> {
    /// Whether placing a response of `class` would leave the bucket's body as is.
    fn keeps_existing_body(&self, class: &StatusClass, body_type: Option<&TypeRef>) -> bool {
        match class {
            StatusClass::Success(_) => self
                .success
                .as_ref()
                .is_some_and(|(_, existing_type)| *existing_type == body_type),
            StatusClass::Accepted => self.accepted.is_some(),
            StatusClass::NoContent => self.no_content.is_some(),
            StatusClass::Redirect(_) => self.redirect.is_some(),
            StatusClass::Error(_) => false,
        }
    }

    fn place(
        &mut self,
        class: StatusClass,
        mut response: HttpResponse,
        body_type: Option<&'g TypeRef>,
        target: &str,
        diagnostics: &mut Diagnostics,
    ) {
        match class {
            StatusClass::Success(code) => match &mut self.success {
                Some((existing, existing_type)) => {
                    if *existing_type != body_type {
                        diagnostics.report(
                            DiagnosticCode::DuplicatedSuccess2xx,
                            target,
                            format!("2xx responses disagree on body type, `{code}` wins"),
                        );
                        existing.body = response.body;
                        existing.header = response.header;
                        *existing_type = body_type;
                    }
                    let codes = existing.status_code.get_or_insert_with(Vec::new);
                    if !codes.contains(&code) {
                        codes.push(code);
                    }
                }
                None => {
                    response.status_code = Some(vec![code]);
                    self.success = Some((response, body_type));
                }
            },
            StatusClass::Accepted => {
                response.status_code = Some(vec![202]);
                keep_first(&mut self.accepted, response, DiagnosticCode::DuplicatedSuccess202, target, diagnostics);
            }
            StatusClass::NoContent => {
                response.status_code = Some(vec![204]);
                keep_first(&mut self.no_content, response, DiagnosticCode::DuplicatedSuccess204, target, diagnostics);
            }
            StatusClass::Redirect(code) => {
                response.status_code = Some(vec![code]);
                keep_first(&mut self.redirect, response, DiagnosticCode::DuplicatedRedirect, target, diagnostics);
            }
            StatusClass::Error(code) => {
                response.status_code = code.map(|c| vec![c]);
                self.errors.push(response);
            }
        }
    }

    fn into_ordered(self) -> Vec<HttpResponse> {
        let mut ordered = Vec::new();
        ordered.extend(self.success.map(|(response, _)| response));
        ordered.extend(self.accepted);
        ordered.extend(self.no_content);
        ordered.extend(self.redirect);
        ordered.extend(self.errors);
        ordered
    }
}

fn keep_first(
    slot: &mut Option<HttpResponse>,
    response: HttpResponse,
    code: DiagnosticCode,
    target: &str,
    diagnostics: &mut Diagnostics,
) {
    if slot.is_some() {
        diagnostics.report(code, target, "keeping the first declared response");
    } else {
        *slot = Some(response);
    }
}

const ODATA_V4_FIELDS: &[&str] = &["code", "message", "target", "details", "innererror"];
const MGMT_FIELDS: &[&str] = &["code", "message", "target", "details", "additionalinfo"];

/// Error bodies are referenced by envelope name instead of being converted.
fn error_body(graph: &TypeGraph, decl: &ResponseDecl, status: &str) -> Result<Option<SchemaBase>, ConvertError> {
    let Some(type_ref) = &decl.type_ref else {
        return Ok(None);
    };
    match graph.resolve(type_ref)? {
        Resolved::Intrinsic(_) => return Ok(None),
        Resolved::Declared(id, TypeNode::Model(_)) => {
            if let Some(format) = error_format(graph, id)? {
                return Ok(Some(SchemaBase::new(SchemaKind::Cls(ClsName::named(format)))));
            }
        }
        _ => {}
    }
    Err(ConvertError::UnsupportedErrorFormat {
        status: status.to_string(),
    })
}

fn error_format(graph: &TypeGraph, id: TypeId) -> Result<Option<&'static str>, ConvertError> {
    let payload = effective_payload(graph, id, Visibility::Read)?;
    let names: Vec<String> = payload
        .properties
        .iter()
        .map(|p| p.name.to_ascii_lowercase())
        .collect();

    if let [only] = payload.properties.as_slice() {
        if names[0] == "error" {
            if let Ok(Resolved::Declared(inner, TypeNode::Model(_))) = graph.resolve(&only.decl.type_ref) {
                if inner != id {
                    return error_format(graph, inner);
                }
            }
            return Ok(None);
        }
    }

    let has = |field: &str| names.iter().any(|n| n == field);
    if !has("code") || !has("message") {
        return Ok(None);
    }
    let within = |allowed: &[&str]| names.iter().all(|n| allowed.contains(&n.as_str()));
    if has("additionalinfo") && within(MGMT_FIELDS) {
        return Ok(Some("MgmtErrorFormat"));
    }
    if within(ODATA_V4_FIELDS) {
        return Ok(Some("ODataV4Format"));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert_eq!(classify(&StatusCodes::Code(200)), Some(StatusClass::Success(200)));
        assert_eq!(classify(&StatusCodes::Code(202)), Some(StatusClass::Accepted));
        assert_eq!(classify(&StatusCodes::Code(204)), Some(StatusClass::NoContent));
        assert_eq!(classify(&StatusCodes::Code(302)), Some(StatusClass::Redirect(302)));
        assert_eq!(classify(&StatusCodes::Code(404)), Some(StatusClass::Error(Some(404))));
        assert_eq!(
            classify(&StatusCodes::Wildcard("*".to_string())),
            Some(StatusClass::Error(None))
        );
        assert_eq!(
            classify(&StatusCodes::Range { start: 400, end: 599 }),
            Some(StatusClass::Error(None))
        );
        assert_eq!(classify(&StatusCodes::Range { start: 500, end: 400 }), None);
        assert_eq!(classify(&StatusCodes::Range { start: 200, end: 299 }), None);
        assert_eq!(classify(&StatusCodes::Wildcard("2XX".to_string())), None);
    }

    #[test]
    fn host_template_parameters() {
        assert_eq!(template_parameters("{endpoint}/contoso/{region}"), vec!["endpoint", "region"]);
        assert!(template_parameters("https://example.com").is_empty());
    }

    #[test]
    fn error_envelopes() {
        let graph = crate::graph::from_yaml(
            r#"
version: "1.0"
types:
  ErrorResponse:
    kind: model
    name: ErrorResponse
    properties:
      error: { type: ErrorDetail }
  ErrorDetail:
    kind: model
    name: ErrorDetail
    properties:
      code: { type: string }
      message: { type: string }
      target: { type: string, optional: true }
      details: { type: ErrorDetails, optional: true }
      additionalInfo: { type: string, optional: true }
  ErrorDetails:
    kind: array
    item: ErrorDetail
  ODataError:
    kind: model
    name: ODataError
    properties:
      code: { type: string }
      message: { type: string }
      innererror: { type: unknown, optional: true }
  Custom:
    kind: model
    name: Custom
    properties:
      reason: { type: string }
"#,
        )
        .unwrap();
        let id = |name: &str| graph.model_by_name(name).unwrap().0;
        assert_eq!(error_format(&graph, id("ErrorResponse")).unwrap(), Some("MgmtErrorFormat"));
        assert_eq!(error_format(&graph, id("ODataError")).unwrap(), Some("ODataV4Format"));
        assert_eq!(error_format(&graph, id("Custom")).unwrap(), None);
    }
}
