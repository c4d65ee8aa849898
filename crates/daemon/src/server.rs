//! HTTP front
//!
//! Mounts REST route entries and JSON-RPC endpoints on an axum router and
//! bridges axum requests to the binding layer's request/response ports.

use axum::body::{to_bytes, Body};
use axum::extract::{FromRequestParts, Path, Request};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, on, post, MethodFilter, MethodRouter};
use anyhow::{bail, Result};
use axum::{Json, Router};
use bindery_api_rpc::JsonRpcRouter;
use bindery_core::application::{dispatch, ContextOptions};
use bindery_core::domain::{MethodDescriptor, RemoteError, RouteEntry};
use bindery_core::port::{BufferedResponse, CapturedRequest};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// Largest request body read into memory
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Path of the route table listing
const ROUTES_PATH: &str = "/_routes";

/// Build the application router
///
/// Fails instead of letting axum panic when two routes would be ambiguous:
/// the same path with different parameter names, a verb mounted twice on
/// one path (`ALL` overlaps every verb), or a REST path taken by a
/// JSON-RPC endpoint or the route listing.
pub fn build_router(
    routes: Vec<RouteEntry>,
    rpc: JsonRpcRouter,
    options: ContextOptions,
) -> Result<Router> {
    let table = Json(serde_json::to_value(&routes)?);
    let mut mounted = MountedPaths::default();
    mounted.reserve(ROUTES_PATH)?;

    // Entries sharing a path share one method router
    let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();
    for entry in &routes {
        let path = to_axum_path(&entry.path);
        mounted.claim(&path, &entry.verb)?;
        let endpoint = rest_endpoint(&entry.verb, Arc::clone(&entry.descriptor), options.clone());
        debug!(verb = %entry.verb, path = %path, method = %entry.method, "Mounting REST route");

        let merged = match by_path.remove(&path) {
            Some(existing) => existing.merge(endpoint),
            None => endpoint,
        };
        by_path.insert(path, merged);
    }

    let mut router = Router::new().route(ROUTES_PATH, get(move || async move { table }));
    for (path, endpoint) in by_path {
        router = router.route(&path, endpoint);
    }

    for path in rpc.paths() {
        mounted.reserve(&path)?;
        debug!(path = %path, "Mounting JSON-RPC endpoint");
        let rpc = rpc.clone();
        let endpoint = path.clone();
        router = router.route(
            &path,
            post(move |body: String| async move {
                match rpc.handle(&endpoint, &body).await {
                    Some((status, reply)) => (status_code(status), Json(reply)).into_response(),
                    None => StatusCode::NOT_FOUND.into_response(),
                }
            }),
        );
    }

    Ok(router)
}

/// Paths already handed to the router, keyed by parameter shape
#[derive(Debug, Default)]
struct MountedPaths {
    /// shape -> (axum path, verbs mounted there; `None` for every verb)
    shapes: HashMap<String, (String, Vec<Option<MethodFilter>>)>,
    /// shape of the path before a capture -> capture as first mounted
    captures: HashMap<String, String>,
}

impl MountedPaths {
    /// Mount `verb` on `path`; same-path entries with distinct verbs merge
    fn claim(&mut self, path: &str, verb: &str) -> Result<()> {
        self.check_captures(path)?;
        let filter = verb_filter(verb);
        // Captures agree, so an equal shape means an equal path
        let (_, verbs) = self
            .shapes
            .entry(axum_shape(path))
            .or_insert_with(|| (path.to_string(), Vec::new()));

        let overlaps = verbs
            .iter()
            .any(|mounted| mounted.is_none() || filter.is_none() || *mounted == filter);
        if overlaps {
            bail!("Route conflict: {} {} is already handled", verb, path);
        }
        verbs.push(filter);
        Ok(())
    }

    /// Take a path for exclusive use
    fn reserve(&mut self, path: &str) -> Result<()> {
        let shape = axum_shape(path);
        if let Some((existing, _)) = self.shapes.get(&shape) {
            bail!("Route conflict: {} is already mounted as {}", path, existing);
        }
        self.check_captures(path)?;
        self.shapes.insert(shape, (path.to_string(), vec![None]));
        Ok(())
    }

    /// Captures at the same position under the same prefix must share a name
    fn check_captures(&mut self, path: &str) -> Result<()> {
        let mut prefix = String::new();
        for segment in path.split('/') {
            if segment.starts_with('{') {
                let first = self
                    .captures
                    .entry(prefix.clone())
                    .or_insert_with(|| segment.to_string());
                if first.as_str() != segment {
                    bail!(
                        "Route conflict: {} captures {} where another route captures {}",
                        path,
                        segment,
                        first
                    );
                }
                prefix.push_str("{}");
            } else {
                prefix.push_str(segment);
            }
            prefix.push('/');
        }
        Ok(())
    }
}

/// `/widgets/{id}` -> `/widgets/{}`
fn axum_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| if segment.starts_with('{') { "{}" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

fn rest_endpoint(
    verb: &str,
    method: Arc<MethodDescriptor>,
    options: ContextOptions,
) -> MethodRouter {
    let handler = move |request: Request| {
        let method = Arc::clone(&method);
        let options = options.clone();
        async move { handle_rest(method, options, request).await }
    };

    match verb_filter(verb) {
        Some(filter) => on(filter, handler),
        None => any(handler),
    }
}

/// Method filter for a route verb; `None` matches every verb
fn verb_filter(verb: &str) -> Option<MethodFilter> {
    match verb.to_ascii_uppercase().as_str() {
        "GET" => Some(MethodFilter::GET),
        "POST" => Some(MethodFilter::POST),
        "PUT" => Some(MethodFilter::PUT),
        "PATCH" => Some(MethodFilter::PATCH),
        "DELETE" | "DEL" => Some(MethodFilter::DELETE),
        "HEAD" => Some(MethodFilter::HEAD),
        "OPTIONS" => Some(MethodFilter::OPTIONS),
        _ => None,
    }
}

/// `/widgets/:id` -> `/widgets/{id}`
pub fn to_axum_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Run one REST request through the binding layer
pub async fn handle_rest(
    method: Arc<MethodDescriptor>,
    options: ContextOptions,
    request: Request,
) -> Response {
    let span = info_span!(
        "request",
        id = %Uuid::new_v4(),
        verb = %request.method(),
        path = %request.uri().path(),
        method = %method.string_name,
    );

    async move {
        let captured = match capture(request).await {
            Ok(captured) => captured,
            Err(err) => return bad_request(err),
        };

        let mut res = BufferedResponse::new();
        dispatch::handle(method, &captured, &mut res, options).await;
        into_response(res)
    }
    .instrument(span)
    .await
}

/// Copy an axum request into the binding layer's request model
async fn capture(request: Request) -> std::result::Result<CapturedRequest, RemoteError> {
    let (mut parts, body) = request.into_parts();

    let params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
        .await
        .map(|Path(params)| params)
        .unwrap_or_default();

    let mut captured = CapturedRequest::new(parts.method.as_str(), &parts.uri.to_string());
    captured.params = params;
    captured.query = parse_query(parts.uri.query().unwrap_or_default());
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            captured = captured.with_header(name.as_str(), value);
        }
    }

    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| RemoteError::new(format!("Failed to read request body: {}", e)))?;
    let content_type = captured.headers.get("content-type").cloned();
    captured.body = parse_body(content_type.as_deref(), &bytes)?;

    Ok(captured)
}

/// Query string to fields; repeated keys become arrays
pub fn parse_query(query: &str) -> HashMap<String, Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
    let mut fields: HashMap<String, Value> = HashMap::new();
    for (key, value) in pairs {
        match fields.get_mut(&key) {
            Some(Value::Array(items)) => items.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                fields.insert(key, Value::String(value));
            }
        }
    }
    fields
}

/// Parse a JSON or urlencoded body; other media types are not parsed
pub fn parse_body(
    content_type: Option<&str>,
    bytes: &[u8],
) -> std::result::Result<Option<Value>, RemoteError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let media = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match media.as_str() {
        "application/json" => serde_json::from_slice(bytes)
            .map(Some)
            .map_err(|e| RemoteError::new(format!("Malformed JSON body: {}", e))),
        "application/x-www-form-urlencoded" => {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)
                .map_err(|e| RemoteError::new(format!("Malformed form body: {}", e)))?;
            let fields: Map<String, Value> = pairs
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            Ok(Some(Value::Object(fields)))
        }
        _ => Ok(None),
    }
}

fn bad_request(err: RemoteError) -> Response {
    warn!(error = %err.message, "Rejecting unreadable request");
    let err = err.with_name("BadRequestError").with_status(400);
    let body = json!({ "error": err.detail(400, false) });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Turn the buffered response into an axum response
pub fn into_response(res: BufferedResponse) -> Response {
    let mut response = Response::new(Body::from(res.body().unwrap_or_default().to_string()));
    *response.status_mut() = status_code(res.status_code());

    for (name, value) in res.headers() {
        // Body length is recomputed by the server
        if name.eq_ignore_ascii_case(header::CONTENT_LENGTH.as_str()) {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => warn!(header = %name, "Dropping invalid response header"),
        }
    }

    if !res.is_ended() {
        warn!(status = res.status_code(), "Response was never ended");
    }
    response
}
