//! Transport-neutral JSON boundary over the service layer.
//!
//! A [`Router`] maps `(method, path)` pairs to service calls and turns every
//! [`CoreError`] into a status code plus a `{"code", "message", "fields"?}`
//! body. Host HTTP glue only needs to build an [`ApiRequest`] and write out
//! the [`ApiResponse`].

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::RequestContext;
use crate::core::{CoreError, PimServices};
use crate::model::{FromTemplate, NewBlock, ProjectFields};
use crate::validate::FieldErrors;
use crate::version::API_NAMESPACE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            _ => Err(format!("unsupported method '{s}'")),
        }
    }
}

/// One request crossing the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            token: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

/// Status code and JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    #[must_use]
    pub const fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    #[must_use]
    pub const fn created(body: Value) -> Self {
        Self::new(201, body)
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Error body sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

/// A failed call, ready to be rendered as a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub body: ErrorBody,
}

impl ApiError {
    fn new(status: u16, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code: code.to_string(),
                message: message.into(),
                fields: None,
            },
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, "bad_request", message)
    }

    fn no_route(path: &str) -> Self {
        Self::new(404, "no_route", format!("No route matches '{path}'"))
    }

    fn method_not_allowed(method: Method, path: &str) -> Self {
        Self::new(
            405,
            "method_not_allowed",
            format!("{method} is not allowed on '{path}'"),
        )
    }

    #[must_use]
    pub fn into_response(self) -> ApiResponse {
        let body = serde_json::to_value(&self.body).unwrap_or_else(|_| {
            json!({"code": self.body.code, "message": self.body.message})
        });
        ApiResponse::new(self.status, body)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { fields } => Self {
                status: 400,
                body: ErrorBody {
                    code: "validation".to_string(),
                    message: format!("Validation failed: {fields}"),
                    fields: Some(fields),
                },
            },
            CoreError::InvalidTemplate { .. } => Self::new(400, "invalid_template", err.to_string()),
            CoreError::ProjectNotFound { .. } | CoreError::TemplateNotFound { .. } => {
                Self::new(404, "not_found", err.to_string())
            }
            CoreError::Unauthenticated { .. } => Self::new(401, "unauthenticated", err.to_string()),
            CoreError::Forbidden { .. } => Self::new(403, "forbidden", err.to_string()),
            CoreError::NotInitialized { .. } | CoreError::Internal(_) => {
                tracing::error!(error = %format!("{err:#}"), "internal error while serving request");
                Self::new(500, "internal_error", "An internal error occurred")
            }
        }
    }
}

type ApiResult = Result<ApiResponse, ApiError>;

/// Everything a handler needs from one matched request.
struct Call<'r> {
    request: RequestContext,
    raw_id: Option<&'r str>,
    body: Option<&'r Value>,
}

impl Call<'_> {
    fn id(&self) -> Result<i64, ApiError> {
        let raw = self
            .raw_id
            .ok_or_else(|| ApiError::bad_request("Missing id in path"))?;
        raw.parse()
            .map_err(|_| ApiError::bad_request(format!("Invalid id '{raw}'")))
    }

    fn body<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body = self
            .body
            .ok_or_else(|| ApiError::bad_request("Request body is required"))?;
        T::deserialize(body).map_err(|e| ApiError::bad_request(format!("Malformed body: {e}")))
    }
}

type Handler = fn(&PimServices, &Call<'_>) -> ApiResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Literal(&'static str),
    Id,
}

/// Whether a route resolves the caller before touching path or body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Authenticated,
}

struct Route {
    method: Method,
    access: Access,
    segments: Vec<Segment>,
    handler: Handler,
}

/// `(method, pattern, access, handler)`; `{id}` captures an integer path
/// segment.
const ROUTES: &[(Method, &str, Access, Handler)] = &[
    (Method::Get, "/public", Access::Public, public_info),
    (Method::Get, "/auth-status", Access::Public, auth_status),
    (Method::Get, "/user/profile", Access::Authenticated, profile),
    (Method::Get, "/admin/stats", Access::Authenticated, admin_stats),
    (Method::Get, "/projects", Access::Authenticated, list_projects),
    (Method::Post, "/projects", Access::Authenticated, create_project),
    (Method::Get, "/projects/{id}", Access::Authenticated, get_project),
    (Method::Put, "/projects/{id}", Access::Authenticated, update_project),
    (Method::Delete, "/projects/{id}", Access::Authenticated, delete_project),
    (Method::Get, "/projects/{id}/blocks", Access::Authenticated, list_blocks),
    (Method::Post, "/projects/{id}/blocks", Access::Authenticated, create_block),
    (
        Method::Post,
        "/projects/{id}/blocks/from-template",
        Access::Authenticated,
        create_block_from_template,
    ),
    (Method::Get, "/block-templates", Access::Authenticated, list_templates),
    (Method::Get, "/block-templates/{id}", Access::Authenticated, get_template),
];

fn parse_pattern(pattern: &'static str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| if s == "{id}" { Segment::Id } else { Segment::Literal(s) })
        .collect()
}

/// Dispatches [`ApiRequest`]s to the service layer.
pub struct Router {
    services: PimServices,
    routes: Vec<Route>,
}

impl Router {
    #[must_use]
    pub fn new(services: PimServices) -> Self {
        let routes = ROUTES
            .iter()
            .map(|&(method, pattern, access, handler)| Route {
                method,
                access,
                segments: parse_pattern(pattern),
                handler,
            })
            .collect();
        Self { services, routes }
    }

    #[must_use]
    pub const fn services(&self) -> &PimServices {
        &self.services
    }

    /// Handle one request. Never panics and never returns a transport error;
    /// every failure is an error response.
    #[tracing::instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub fn dispatch(&self, request: &ApiRequest) -> ApiResponse {
        let response = match self.route(request) {
            Ok(response) => response,
            Err(err) => err.into_response(),
        };
        tracing::debug!(status = response.status, "request handled");
        response
    }

    fn route(&self, request: &ApiRequest) -> ApiResult {
        let path = strip_namespace(&request.path);
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut path_matched = false;
        for route in &self.routes {
            let Some(raw_id) = match_segments(&route.segments, &parts) else {
                continue;
            };
            path_matched = true;
            if route.method != request.method {
                continue;
            }
            let call = Call {
                request: RequestContext {
                    bearer_token: request.token.clone(),
                },
                raw_id,
                body: request.body.as_ref(),
            };
            // Credentials are checked before the id or body is parsed, so an
            // anonymous caller always sees 401.
            if route.access == Access::Authenticated {
                self.services.authenticate(&call.request)?;
            }
            return (route.handler)(&self.services, &call);
        }

        if path_matched {
            Err(ApiError::method_not_allowed(request.method, &request.path))
        } else {
            Err(ApiError::no_route(&request.path))
        }
    }
}

/// Accept both `/projects` and `/project-info-manager/v1/projects`.
fn strip_namespace(path: &str) -> &str {
    let trimmed = path.trim_start_matches('/');
    trimmed
        .strip_prefix(API_NAMESPACE)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .unwrap_or(trimmed)
}

/// `None` when the shape differs, otherwise the raw `{id}` segment (if the
/// pattern has one). The id is parsed by the handler.
fn match_segments<'p>(segments: &[Segment], parts: &[&'p str]) -> Option<Option<&'p str>> {
    if segments.len() != parts.len() {
        return None;
    }
    let mut raw_id = None;
    for (segment, part) in segments.iter().zip(parts) {
        match segment {
            Segment::Literal(lit) if lit == part => {}
            Segment::Literal(_) => return None,
            Segment::Id => raw_id = Some(*part),
        }
    }
    Some(raw_id)
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::from(CoreError::Internal(anyhow::Error::new(e))))
}

// ============================================================================
// Handlers
// ============================================================================

fn public_info(services: &PimServices, _call: &Call<'_>) -> ApiResult {
    Ok(ApiResponse::ok(to_json(&services.status().public_info())?))
}

fn auth_status(services: &PimServices, call: &Call<'_>) -> ApiResult {
    Ok(ApiResponse::ok(to_json(
        &services.status().auth_status(&call.request),
    )?))
}

fn profile(services: &PimServices, call: &Call<'_>) -> ApiResult {
    let principal = services.status().profile(&call.request)?;
    Ok(ApiResponse::ok(to_json(&principal)?))
}

fn admin_stats(services: &PimServices, call: &Call<'_>) -> ApiResult {
    let stats = services.status().admin_stats(&call.request)?;
    Ok(ApiResponse::ok(to_json(&stats)?))
}

fn list_projects(services: &PimServices, call: &Call<'_>) -> ApiResult {
    let projects = services.projects().list(&call.request)?;
    Ok(ApiResponse::ok(to_json(&projects)?))
}

fn create_project(services: &PimServices, call: &Call<'_>) -> ApiResult {
    let fields: ProjectFields = call.body()?;
    let project = services.projects().create(&call.request, &fields)?;
    Ok(ApiResponse::created(to_json(&project)?))
}

fn get_project(services: &PimServices, call: &Call<'_>) -> ApiResult {
    let project = services.projects().get(&call.request, call.id()?)?;
    Ok(ApiResponse::ok(to_json(&project)?))
}

fn update_project(services: &PimServices, call: &Call<'_>) -> ApiResult {
    let fields: ProjectFields = call.body()?;
    let project = services
        .projects()
        .update(&call.request, call.id()?, &fields)?;
    Ok(ApiResponse::ok(to_json(&project)?))
}

fn delete_project(services: &PimServices, call: &Call<'_>) -> ApiResult {
    let id = call.id()?;
    services.projects().delete(&call.request, id)?;
    Ok(ApiResponse::ok(json!({"deleted": true, "id": id})))
}

fn list_blocks(services: &PimServices, call: &Call<'_>) -> ApiResult {
    let blocks = services.blocks().list(&call.request, call.id()?)?;
    Ok(ApiResponse::ok(to_json(&blocks)?))
}

fn create_block(services: &PimServices, call: &Call<'_>) -> ApiResult {
    let block: NewBlock = call.body()?;
    let created = services.blocks().create(&call.request, call.id()?, &block)?;
    Ok(ApiResponse::created(to_json(&created)?))
}

fn create_block_from_template(services: &PimServices, call: &Call<'_>) -> ApiResult {
    let from: FromTemplate = call.body()?;
    let created = services
        .blocks()
        .create_from_template(&call.request, call.id()?, &from)?;
    Ok(ApiResponse::created(to_json(&created)?))
}

fn list_templates(services: &PimServices, call: &Call<'_>) -> ApiResult {
    let templates = services.templates().list(&call.request)?;
    Ok(ApiResponse::ok(to_json(&templates)?))
}

fn get_template(services: &PimServices, call: &Call<'_>) -> ApiResult {
    let template = services.templates().get(&call.request, call.id()?)?;
    Ok(ApiResponse::ok(to_json(&template)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::services;

    fn router() -> Router {
        Router::new(services())
    }

    fn as_role(req: ApiRequest, role: &str) -> ApiRequest {
        req.with_token(Some(role.to_string()))
    }

    fn create_project(router: &Router, name: &str) -> i64 {
        let res = router.dispatch(&as_role(
            ApiRequest::post("/projects", json!({"meeting_name": name})),
            "editor",
        ));
        assert_eq!(res.status, 201, "{}", res.body);
        res.body["id"].as_i64().unwrap()
    }

    #[test]
    fn test_public_needs_no_token() {
        let res = router().dispatch(&ApiRequest::get("/public"));
        assert_eq!(res.status, 200);
        assert_eq!(res.body["service"], "project-info-manager");
    }

    #[test]
    fn test_namespace_prefix_accepted() {
        let res = router().dispatch(&ApiRequest::get("/project-info-manager/v1/public"));
        assert_eq!(res.status, 200);
    }

    #[test]
    fn test_auth_status_never_fails() {
        let router = router();
        let res = router.dispatch(&ApiRequest::get("/auth-status"));
        assert_eq!(res.status, 200);
        assert_eq!(res.body["is_logged_in"], false);

        let res = router.dispatch(&as_role(ApiRequest::get("/auth-status"), "author"));
        assert_eq!(res.body["is_logged_in"], true);
        assert_eq!(res.body["role"], "author");
    }

    #[test]
    fn test_protected_routes_require_token() {
        let router = router();
        let requests = [
            ApiRequest::get("/user/profile"),
            ApiRequest::get("/admin/stats"),
            ApiRequest::get("/projects"),
            ApiRequest::post("/projects", json!({"meeting_name": "X"})),
            ApiRequest::get("/projects/1"),
            ApiRequest::put("/projects/1", json!({})),
            ApiRequest::delete("/projects/1"),
            ApiRequest::get("/projects/1/blocks"),
            ApiRequest::post("/projects/1/blocks", json!({"title": "t"})),
            ApiRequest::post("/projects/1/blocks/from-template", json!({"template_id": 1})),
            ApiRequest::get("/block-templates"),
            ApiRequest::get("/block-templates/1"),
        ];
        for request in requests {
            let res = router.dispatch(&request);
            assert_eq!(res.status, 401, "{} {}", request.method, request.path);
            assert_eq!(res.body["code"], "unauthenticated");
        }
    }

    #[test]
    fn test_read_only_role_gets_403_on_mutation() {
        let router = router();
        let id = create_project(&router, "Kickoff");

        let res = router.dispatch(&as_role(ApiRequest::get("/projects"), "subscriber"));
        assert_eq!(res.status, 200);

        let res = router.dispatch(&as_role(
            ApiRequest::put(format!("/projects/{id}"), json!({"client_name": "Acme"})),
            "subscriber",
        ));
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "forbidden");

        let res = router.dispatch(&as_role(
            ApiRequest::delete(format!("/projects/{id}")),
            "contributor",
        ));
        assert_eq!(res.status, 403);
    }

    #[test]
    fn test_admin_stats_forbidden_for_editor() {
        let router = router();
        let res = router.dispatch(&as_role(ApiRequest::get("/admin/stats"), "editor"));
        assert_eq!(res.status, 403);

        let res = router.dispatch(&as_role(ApiRequest::get("/admin/stats"), "administrator"));
        assert_eq!(res.status, 200);
        assert_eq!(res.body["projects"], 0);
    }

    #[test]
    fn test_validation_error_has_field_map() {
        let router = router();
        let res = router.dispatch(&as_role(
            ApiRequest::post(
                "/projects",
                json!({"meeting_name": "Q3", "start_date": "2024-05-10", "end_date": "2024-05-01"}),
            ),
            "editor",
        ));
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "validation");
        assert!(res.body["fields"]["end_date"].is_string());

        let list = router.dispatch(&as_role(ApiRequest::get("/projects"), "editor"));
        assert_eq!(list.body, json!([]));
    }

    #[test]
    fn test_project_crud() {
        let router = router();
        let id = create_project(&router, "Kickoff");

        let res = router.dispatch(&as_role(
            ApiRequest::put(format!("/projects/{id}"), json!({"status": "active"})),
            "editor",
        ));
        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "active");
        assert_eq!(res.body["meeting_name"], "Kickoff");

        let res = router.dispatch(&as_role(ApiRequest::delete(format!("/projects/{id}")), "editor"));
        assert_eq!(res.status, 200);
        assert_eq!(res.body, json!({"deleted": true, "id": id}));

        let res = router.dispatch(&as_role(ApiRequest::get(format!("/projects/{id}")), "editor"));
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "not_found");
    }

    #[test]
    fn test_blocks_routes() {
        let router = router();
        let id = create_project(&router, "Kickoff");

        let res = router.dispatch(&as_role(
            ApiRequest::post(
                format!("/projects/{id}/blocks"),
                json!({"title": "Scope", "type": "custom", "elements": [
                    {"key": "Goal", "value": "Launch", "type": "text"}
                ]}),
            ),
            "editor",
        ));
        assert_eq!(res.status, 201, "{}", res.body);
        assert_eq!(res.body["type"], "custom");

        let res = router.dispatch(&as_role(
            ApiRequest::post(format!("/projects/{id}/blocks"), json!({"title": "V", "type": 999})),
            "editor",
        ));
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "invalid_template");

        let templates = router.dispatch(&as_role(ApiRequest::get("/block-templates"), "editor"));
        let template_id = templates.body[0]["id"].as_i64().unwrap();
        let res = router.dispatch(&as_role(
            ApiRequest::post(
                format!("/projects/{id}/blocks/from-template"),
                json!({"template_id": template_id}),
            ),
            "editor",
        ));
        assert_eq!(res.status, 201);
        assert_eq!(res.body["type"], template_id);
        assert_eq!(res.body["elements"], templates.body[0]["elements"]);

        let res = router.dispatch(&as_role(ApiRequest::get(format!("/projects/{id}/blocks")), "subscriber"));
        assert_eq!(res.body.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_requests() {
        let router = router();
        let res = router.dispatch(&as_role(ApiRequest::get("/projects/abc"), "editor"));
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "bad_request");

        let res = router.dispatch(&as_role(
            ApiRequest::post("/projects", json!({"attendees_expected": "many"})),
            "editor",
        ));
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "bad_request");

        let res = router.dispatch(&as_role(ApiRequest::new(Method::Post, "/projects"), "editor"));
        assert_eq!(res.status, 400);
    }

    #[test]
    fn test_anonymous_malformed_requests_get_401() {
        let router = router();
        let requests = [
            ApiRequest::get("/projects/abc"),
            ApiRequest::put("/projects/abc", json!({})),
            ApiRequest::post("/projects", json!({"attendees_expected": "many"})),
            ApiRequest::new(Method::Post, "/projects"),
            ApiRequest::post("/projects/x/blocks", json!("not an object")),
        ];
        for request in requests {
            let res = router.dispatch(&request);
            assert_eq!(res.status, 401, "{} {}", request.method, request.path);
            assert_eq!(res.body["code"], "unauthenticated");
        }

        let res = router.dispatch(&ApiRequest::get("/projects/abc").with_token(Some("bogus".to_string())));
        assert_eq!(res.status, 401);
    }

    #[test]
    fn test_unknown_path_and_wrong_method() {
        let router = router();
        let res = router.dispatch(&ApiRequest::get("/nothing/here"));
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "no_route");

        let res = router.dispatch(&ApiRequest::delete("/block-templates"));
        assert_eq!(res.status, 405);
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let err = ApiError::from(CoreError::Internal(anyhow::anyhow!("disk on fire at /var/x")));
        assert_eq!(err.status, 500);
        assert_eq!(err.body.message, "An internal error occurred");
    }
}
