//! HTTP Binding Context
//!
//! Created once per inbound request for one method descriptor. It
//! extracts the argument mapping from the request, drives the invocation
//! and finalizes the response through the negotiated body writer.
//!
//! Lifecycle: `new` (arguments built, coercion failures reported as
//! `Err`), any number of `invoke` calls (shared constructor, then the
//! method), `set_return_arg_by_name` / `apply_result`, then `done`, which
//! consumes the context so finalization runs exactly once.

use crate::application::coercion::coerce;
use crate::application::negotiator::{
    resolve, ContextOptions, ResponseFormat, FORMAT_PARAM, UNACCEPTABLE,
};
use crate::application::xml::{self, NULL_DOCUMENT};
use crate::domain::{
    ArgMap, ArgumentSpec, HandleKind, HttpSource, MethodDescriptor, RemoteValue, ReturnTarget,
};
use crate::error::{BindingError, Result};
use crate::port::http::{HttpRequest, HttpResponse};
use crate::port::invoker::{CallContext, Receiver};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where an extracted argument value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgOrigin {
    Formatter,
    Handle,
    Body,
    BodyField,
    Path,
    Query,
    Header,
    Missing,
}

/// Per-request binding context
pub struct HttpContext<'a> {
    req: &'a dyn HttpRequest,
    res: &'a mut dyn HttpResponse,
    method: Arc<MethodDescriptor>,
    options: ContextOptions,
    args: ArgMap,
    ctor_args: Option<ArgMap>,
    result: Option<RemoteValue>,
    supported_types: Vec<String>,
}

impl<'a> HttpContext<'a> {
    /// Create the context and build the method's argument mapping
    pub fn new(
        req: &'a dyn HttpRequest,
        res: &'a mut dyn HttpResponse,
        method: Arc<MethodDescriptor>,
        options: ContextOptions,
    ) -> Result<Self> {
        let supported_types = options.supported_types();
        let mut ctx = Self {
            req,
            res,
            method: Arc::clone(&method),
            options,
            args: ArgMap::new(),
            ctor_args: None,
            result: Some(RemoteValue::object()),
            supported_types,
        };
        ctx.args = ctx.build_args(&method.accepts)?;
        Ok(ctx)
    }

    pub fn request(&self) -> &dyn HttpRequest {
        self.req
    }

    pub fn method(&self) -> &Arc<MethodDescriptor> {
        &self.method
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    pub fn args(&self) -> &ArgMap {
        &self.args
    }

    pub fn ctor_args(&self) -> Option<&ArgMap> {
        self.ctor_args.as_ref()
    }

    /// Accumulated result, `None` once a root return set it to undefined
    pub fn result(&self) -> Option<&RemoteValue> {
        self.result.as_ref()
    }

    pub fn supported_types(&self) -> &[String] {
        &self.supported_types
    }

    /// Build an argument mapping from the request for the given specs
    ///
    /// Every spec yields a key, `Undefined` when nothing was found.
    pub fn build_args(&self, accepts: &[ArgumentSpec]) -> Result<ArgMap> {
        let json_body = self.has_json_body();
        let mut args = ArgMap::new();

        for spec in accepts {
            let name = spec.lookup_name();
            let (value, origin) = match &spec.http {
                Some(source) => self.arg_from_source(source, name),
                None => self.arg_by_name(name),
            };

            // JSON bodies keep their types; handles and formatter output are opaque
            let sloppy = match origin {
                ArgOrigin::Formatter | ArgOrigin::Handle => false,
                ArgOrigin::Body | ArgOrigin::BodyField => !json_body,
                _ => true,
            };
            let value = if sloppy {
                coerce(value, spec.value_type).map_err(|source| BindingError::Coercion {
                    arg: spec.arg.clone(),
                    source,
                })?
            } else {
                value
            };

            args.insert(spec.arg.clone(), value);
        }

        Ok(args)
    }

    fn arg_from_source(&self, source: &HttpSource, name: &str) -> (RemoteValue, ArgOrigin) {
        match source {
            HttpSource::Formatter(formatter) => (formatter.call(self), ArgOrigin::Formatter),
            HttpSource::Body => (lift(self.req.body()), ArgOrigin::Body),
            HttpSource::Form => (lift(self.body_field(name)), ArgOrigin::BodyField),
            HttpSource::Query => (lift(self.req.query(name)), ArgOrigin::Query),
            HttpSource::Path => (self.req.param(name).into(), ArgOrigin::Path),
            HttpSource::Header => (self.req.header(name).into(), ArgOrigin::Header),
            HttpSource::RawRequest => (RemoteValue::Handle(HandleKind::Request), ArgOrigin::Handle),
            HttpSource::RawResponse => {
                (RemoteValue::Handle(HandleKind::Response), ArgOrigin::Handle)
            }
            HttpSource::RawContext => (RemoteValue::Handle(HandleKind::Context), ArgOrigin::Handle),
        }
    }

    /// Positional lookup: path, then body field, then query, then header
    fn arg_by_name(&self, name: &str) -> (RemoteValue, ArgOrigin) {
        if let Some(value) = self.req.param(name) {
            return (value.into(), ArgOrigin::Path);
        }
        if let Some(value) = self.body_field(name) {
            return (value.into(), ArgOrigin::BodyField);
        }
        if let Some(value) = self.req.query(name) {
            return (value.into(), ArgOrigin::Query);
        }
        match self.req.header(name) {
            Some(value) => (value.into(), ArgOrigin::Header),
            None => (RemoteValue::Undefined, ArgOrigin::Missing),
        }
    }

    fn body_field(&self, name: &str) -> Option<&Value> {
        self.req.body().and_then(|body| body.get(name))
    }

    fn has_json_body(&self) -> bool {
        self.req.body().is_some()
            && self
                .req
                .header("content-type")
                .and_then(|ct| ct.split(';').next())
                .map(|ct| ct.trim().eq_ignore_ascii_case("application/json"))
                .unwrap_or(false)
    }

    /// Invoke `method` against `receiver`
    ///
    /// With `is_ctor`, arguments are built from the method's own specs and
    /// kept as the constructor arguments; a coercion failure is returned as
    /// the invocation error. On failure, a declared `error_status` is applied
    /// unless the status was already moved off its default.
    pub async fn invoke(
        &mut self,
        receiver: Receiver,
        method: &MethodDescriptor,
        is_ctor: bool,
    ) -> Result<RemoteValue> {
        let args = if is_ctor {
            let args = self.build_args(&method.accepts)?;
            self.ctor_args = Some(args.clone());
            args
        } else {
            self.args.clone()
        };

        debug!(method = %method.string_name, is_ctor, "Invoking remote method");

        let default_error_status = method.http.error_status;
        match method.invoker.invoke(receiver, args, &mut *self).await {
            Ok(value) => Ok(value),
            Err(err) => {
                if let Some(fallback) = default_error_status {
                    if matches!(self.res.status(), None | Some(200)) {
                        self.res
                            .set_status(err.effective_status().unwrap_or(fallback));
                    }
                }
                Err(err.into())
            }
        }
    }

    /// Route one return value to the body, the status or a header
    pub fn set_return_arg_by_name(&mut self, name: &str, value: RemoteValue) {
        let Some(spec) = self.method.return_spec(name).cloned() else {
            warn!(
                method = %self.method.string_name,
                arg = %name,
                "Cannot set return value without a return description"
            );
            return;
        };

        if spec.root {
            self.result = Some(value).filter(RemoteValue::is_defined);
            return;
        }

        match spec.http {
            Some(ReturnTarget::Status) => match value.as_i64().and_then(|s| u16::try_from(s).ok()) {
                Some(status) => self.res.set_status(status),
                None => warn!(arg = %name, "Ignoring non-numeric status return value"),
            },
            Some(ReturnTarget::Header { header }) => {
                let header = header.as_deref().unwrap_or(name);
                self.res.set_header(header, &value.to_text());
            }
            None => match &mut self.result {
                Some(RemoteValue::Object(fields)) => {
                    fields.insert(name.to_string(), value);
                }
                Some(_) => {
                    warn!(arg = %name, "Result was replaced by a root value, dropping field")
                }
                None => {
                    let mut fields = ArgMap::new();
                    fields.insert(name.to_string(), value);
                    self.result = Some(RemoteValue::Object(fields));
                }
            },
        }
    }

    /// Distribute an invocation result over the declared return specs
    ///
    /// A single declared return receives the whole result; with several,
    /// an object result is split by key.
    pub fn apply_result(&mut self, result: RemoteValue) {
        let method = Arc::clone(&self.method);
        let returns = &method.returns;
        match (returns.len(), result) {
            (0, _) => {}
            (1, value) => {
                let name = returns[0].arg.clone();
                self.set_return_arg_by_name(&name, value);
            }
            (_, RemoteValue::Object(fields)) => {
                for (name, value) in fields {
                    self.set_return_arg_by_name(&name, value);
                }
            }
            (_, other) if other.is_undefined() => {}
            _ => warn!(
                method = %method.string_name,
                "Non-object result for a method with several return values"
            ),
        }
    }

    /// Finalize the response
    ///
    /// Default status, accept token (`_format` override first), content
    /// type unless already set, body or 204, end.
    pub fn done(self) {
        let HttpContext {
            req,
            res,
            method,
            result,
            supported_types,
            ..
        } = self;

        if let Some(status) = method.http.status {
            res.set_status(status);
        }

        let mut accepts = req
            .accepts(&supported_types)
            .unwrap_or_else(|| UNACCEPTABLE.to_string());
        match req.query(FORMAT_PARAM) {
            None => {}
            Some(Value::String(format)) if format.is_empty() => {}
            Some(Value::String(format)) => {
                let format = format.to_lowercase();
                accepts = if supported_types.iter().any(|t| t.eq_ignore_ascii_case(&format)) {
                    format
                } else {
                    UNACCEPTABLE.to_string()
                };
            }
            Some(_) => accepts = UNACCEPTABLE.to_string(),
        }

        let negotiated = resolve(Some(accepts.as_str()));
        if res.header("content-type").is_none() {
            res.set_header("Content-Type", negotiated.content_type);
        }

        match &result {
            Some(data) => match negotiated.format {
                ResponseFormat::Json => send_json(res, data),
                ResponseFormat::Jsonp => send_jsonp(req, res, data),
                ResponseFormat::Xml => send_xml(res, data),
                ResponseFormat::NotAcceptable => send_not_acceptable(res),
            },
            None => {
                if matches!(res.status(), None | Some(200)) {
                    res.set_status(204);
                }
            }
        }

        res.end();
        debug!(
            method = %method.string_name,
            accepts = %accepts,
            status = res.status().unwrap_or(200),
            "Response finalized"
        );
    }
}

impl CallContext for HttpContext<'_> {
    fn protocol(&self) -> &'static str {
        "rest"
    }

    fn request(&self) -> Option<&dyn HttpRequest> {
        Some(self.req)
    }

    fn response(&mut self) -> Option<&mut dyn HttpResponse> {
        Some(&mut *self.res)
    }
}

fn lift(value: Option<&Value>) -> RemoteValue {
    value.map(RemoteValue::from).unwrap_or_default()
}

fn send_json(res: &mut dyn HttpResponse, data: &RemoteValue) {
    res.send(data.to_json().to_string());
}

fn send_jsonp(req: &dyn HttpRequest, res: &mut dyn HttpResponse, data: &RemoteValue) {
    let body = data.to_json().to_string();
    let callback = req
        .query("callback")
        .and_then(Value::as_str)
        .filter(|cb| is_valid_callback(cb));
    match callback {
        Some(cb) => {
            res.set_header("Content-Type", "text/javascript");
            res.set_header("X-Content-Type-Options", "nosniff");
            res.send(format!(
                "/**/ typeof {cb} === 'function' && {cb}({body});"
            ));
        }
        None => res.send(body),
    }
}

fn is_valid_callback(callback: &str) -> bool {
    !callback.is_empty()
        && callback
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '[' | ']'))
}

fn send_xml(res: &mut dyn HttpResponse, data: &RemoteValue) {
    match data {
        RemoteValue::Null => {
            res.set_header("Content-Length", "7");
            res.send(NULL_DOCUMENT.to_string());
        }
        RemoteValue::Undefined => {}
        data => match xml::to_xml(data) {
            Ok(document) => res.send(document),
            Err(err) => {
                warn!(error = %err, "XML rendering failed");
                res.set_status(500);
                res.send(format!("{}\n{}", err, data.to_json()));
            }
        },
    }
}

fn send_not_acceptable(res: &mut dyn HttpResponse) {
    res.set_status(406);
    res.send("Not Acceptable".to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Formatter, RemoteError, ReturnSpec, ValueType};
    use crate::port::http::{BufferedResponse, CapturedRequest};
    use crate::port::invoker::mocks::RecordingInvoker;
    use crate::port::invoker::FnInvoker;
    use serde_json::json;

    fn method_with(args: Vec<ArgumentSpec>) -> Arc<MethodDescriptor> {
        let mut method = MethodDescriptor::new(
            "probe",
            Arc::new(RecordingInvoker::returning(RemoteValue::Undefined)),
        );
        method.accepts = args;
        Arc::new(method)
    }

    fn build(req: &CapturedRequest, args: Vec<ArgumentSpec>) -> Result<ArgMap> {
        let mut res = BufferedResponse::new();
        let ctx = HttpContext::new(req, &mut res, method_with(args), ContextOptions::default())?;
        Ok(ctx.args().clone())
    }

    #[test]
    fn test_positional_precedence_path_body_query_header() {
        let spec = || vec![ArgumentSpec::new("id", ValueType::String)];
        let full = CapturedRequest::new("GET", "/x")
            .with_param("id", "from-path")
            .with_body(json!({"id": "from-body"}))
            .with_query("id", "from-query")
            .with_header("id", "from-header");
        assert_eq!(build(&full, spec()).unwrap()["id"], "from-path".into());

        let no_path = CapturedRequest {
            params: Default::default(),
            ..full.clone()
        };
        assert_eq!(build(&no_path, spec()).unwrap()["id"], "from-body".into());

        let query_header = CapturedRequest::new("GET", "/x")
            .with_query("id", "from-query")
            .with_header("id", "from-header");
        assert_eq!(build(&query_header, spec()).unwrap()["id"], "from-query".into());

        let header_only = CapturedRequest::new("GET", "/x").with_header("ID", "from-header");
        assert_eq!(build(&header_only, spec()).unwrap()["id"], "from-header".into());
    }

    #[test]
    fn test_missing_args_present_as_undefined() {
        let req = CapturedRequest::new("GET", "/x");
        let args = build(
            &req,
            vec![
                ArgumentSpec::new("a", ValueType::Number),
                ArgumentSpec::new("b", ValueType::Object).from_source(HttpSource::Query),
            ],
        )
        .unwrap();

        assert_eq!(args.len(), 2);
        assert_eq!(args["a"], RemoteValue::Undefined);
        assert_eq!(args["b"], RemoteValue::Undefined);
    }

    #[test]
    fn test_query_values_coerced() {
        let req = CapturedRequest::new("GET", "/x")
            .with_query("limit", "10")
            .with_query("active", "true");
        let args = build(
            &req,
            vec![
                ArgumentSpec::new("limit", ValueType::Number),
                ArgumentSpec::new("active", ValueType::Boolean),
            ],
        )
        .unwrap();

        assert_eq!(args["limit"], RemoteValue::from(10i64));
        assert_eq!(args["active"], RemoteValue::Bool(true));
    }

    #[test]
    fn test_json_body_not_coerced() {
        let req = CapturedRequest::new("POST", "/x").with_json_body(json!({"code": "007"}));
        let args = build(&req, vec![ArgumentSpec::new("code", ValueType::Number)]).unwrap();
        assert_eq!(args["code"], RemoteValue::from("007"));

        // same body without the JSON content type is sloppy
        let req = CapturedRequest::new("POST", "/x").with_body(json!({"code": "007"}));
        let args = build(&req, vec![ArgumentSpec::new("code", ValueType::Number)]).unwrap();
        assert_eq!(args["code"], RemoteValue::from(7i64));
    }

    #[test]
    fn test_handles_and_formatters_never_coerced() {
        let req = CapturedRequest::new("GET", "/x").with_query("n", "5");
        let args = build(
            &req,
            vec![
                ArgumentSpec::new("req", ValueType::Object).from_source(HttpSource::RawRequest),
                ArgumentSpec::new("ctx", ValueType::Object).from_source(HttpSource::RawContext),
                ArgumentSpec::new("n", ValueType::Number).from_source(HttpSource::Formatter(
                    Formatter::new(|ctx| lift(ctx.request().query("n"))),
                )),
            ],
        )
        .unwrap();

        assert_eq!(args["req"], RemoteValue::Handle(HandleKind::Request));
        assert_eq!(args["ctx"], RemoteValue::Handle(HandleKind::Context));
        assert_eq!(args["n"], RemoteValue::from("5"));
    }

    #[test]
    fn test_tagged_sources() {
        let req = CapturedRequest::new("PUT", "/x")
            .with_param("id", "3")
            .with_json_body(json!({"name": "gear"}))
            .with_header("X-Api-Key", "k");
        let args = build(
            &req,
            vec![
                ArgumentSpec::new("id", ValueType::Number).from_source(HttpSource::Path),
                ArgumentSpec::new("data", ValueType::Object).from_source(HttpSource::Body),
                ArgumentSpec::new("key", ValueType::String)
                    .named("x-api-key")
                    .from_source(HttpSource::Header),
            ],
        )
        .unwrap();

        assert_eq!(args["id"], RemoteValue::from(3i64));
        assert_eq!(args["data"], RemoteValue::from(json!({"name": "gear"})));
        assert_eq!(args["key"], RemoteValue::from("k"));
    }

    #[test]
    fn test_malformed_object_reported_as_error() {
        let req = CapturedRequest::new("GET", "/x").with_query("filter", "{broken");
        let err = build(&req, vec![ArgumentSpec::new("filter", ValueType::Object)]).unwrap_err();
        assert!(matches!(err, BindingError::Coercion { ref arg, .. } if arg == "filter"));
    }

    #[tokio::test]
    async fn test_error_status_applied_on_failure() {
        let req = CapturedRequest::new("GET", "/x");
        let mut res = BufferedResponse::new();
        let method = Arc::new(
            MethodDescriptor::new(
                "fail",
                Arc::new(RecordingInvoker::failing(RemoteError::new("nope"))),
            )
            .with_error_status(409),
        );

        let mut ctx =
            HttpContext::new(&req, &mut res, Arc::clone(&method), ContextOptions::default())
                .unwrap();
        let err = ctx.invoke(Receiver::Static, &method, false).await.unwrap_err();
        drop(ctx);

        assert!(matches!(err, BindingError::Remote(_)));
        assert_eq!(res.status(), Some(409));
    }

    #[tokio::test]
    async fn test_error_own_status_wins_over_default() {
        let req = CapturedRequest::new("GET", "/x");
        let mut res = BufferedResponse::new();
        let method = Arc::new(
            MethodDescriptor::new(
                "fail",
                Arc::new(RecordingInvoker::failing(
                    RemoteError::new("gone").with_status_code(410),
                )),
            )
            .with_error_status(409),
        );

        let mut ctx =
            HttpContext::new(&req, &mut res, Arc::clone(&method), ContextOptions::default())
                .unwrap();
        assert!(ctx.invoke(Receiver::Static, &method, false).await.is_err());
        drop(ctx);

        assert_eq!(res.status(), Some(410));
    }

    #[tokio::test]
    async fn test_ctor_args_built_separately() {
        let req = CapturedRequest::new("GET", "/widgets/4").with_param("id", "4");
        let mut res = BufferedResponse::new();
        let ctor = MethodDescriptor::new(
            "sharedCtor",
            Arc::new(FnInvoker::sync(|_, args| Ok(args["id"].clone()))),
        )
        .with_arg(ArgumentSpec::new("id", ValueType::Number).from_source(HttpSource::Path));
        let method = method_with(vec![]);

        let mut ctx = HttpContext::new(&req, &mut res, method, ContextOptions::default()).unwrap();
        let instance = ctx.invoke(Receiver::Static, &ctor, true).await.unwrap();

        assert_eq!(instance, RemoteValue::from(4i64));
        assert_eq!(ctx.ctor_args().unwrap()["id"], RemoteValue::from(4i64));
        assert!(ctx.args().is_empty());
    }

    fn finish(
        req: &CapturedRequest,
        method: MethodDescriptor,
        options: ContextOptions,
        fill: impl FnOnce(&mut HttpContext<'_>),
    ) -> BufferedResponse {
        let mut res = BufferedResponse::new();
        let mut ctx = HttpContext::new(req, &mut res, Arc::new(method), options).unwrap();
        fill(&mut ctx);
        ctx.done();
        res
    }

    fn returning(specs: Vec<ReturnSpec>) -> MethodDescriptor {
        let mut method = MethodDescriptor::new(
            "get",
            Arc::new(RecordingInvoker::returning(RemoteValue::Undefined)),
        );
        method.returns = specs;
        method
    }

    #[test]
    fn test_return_routing_status_header_and_body() {
        let req = CapturedRequest::new("GET", "/x");
        let method = returning(vec![
            ReturnSpec::new("code", ValueType::Number).to_status(),
            ReturnSpec::new("etag", ValueType::String).to_header(Some("ETag")),
            ReturnSpec::new("location", ValueType::String).to_header(None),
            ReturnSpec::new("name", ValueType::String),
        ]);

        let res = finish(&req, method, ContextOptions::default(), |ctx| {
            ctx.set_return_arg_by_name("code", 201i64.into());
            ctx.set_return_arg_by_name("etag", "abc".into());
            ctx.set_return_arg_by_name("location", "/w/1".into());
            ctx.set_return_arg_by_name("name", "gear".into());
            ctx.set_return_arg_by_name("unknown", "ignored".into());
        });

        assert_eq!(res.status(), Some(201));
        assert_eq!(res.header("etag"), Some("abc"));
        assert_eq!(res.header("location"), Some("/w/1"));
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.body(), Some(r#"{"name":"gear"}"#));
        assert!(res.is_ended());
    }

    #[test]
    fn test_root_return_replaces_result() {
        let req = CapturedRequest::new("GET", "/x");
        let method = returning(vec![ReturnSpec::new("data", ValueType::Array).root()]);

        let res = finish(&req, method, ContextOptions::default(), |ctx| {
            ctx.apply_result(RemoteValue::from(json!([1, 2])));
        });

        assert_eq!(res.body(), Some("[1,2]"));
    }

    #[test]
    fn test_undefined_root_yields_204() {
        let req = CapturedRequest::new("DELETE", "/x");
        let method = returning(vec![ReturnSpec::new("data", ValueType::Any).root()]);

        let res = finish(&req, method, ContextOptions::default(), |ctx| {
            ctx.apply_result(RemoteValue::Undefined);
        });

        assert_eq!(res.status(), Some(204));
        assert_eq!(res.body(), None);
    }

    #[test]
    fn test_explicit_status_survives_204_fallback() {
        let req = CapturedRequest::new("DELETE", "/x");
        let method = returning(vec![
            ReturnSpec::new("data", ValueType::Any).root(),
            ReturnSpec::new("code", ValueType::Number).to_status(),
        ]);

        let res = finish(&req, method, ContextOptions::default(), |ctx| {
            ctx.set_return_arg_by_name("code", 202i64.into());
            ctx.set_return_arg_by_name("data", RemoteValue::Undefined);
        });

        assert_eq!(res.status(), Some(202));
        assert_eq!(res.body(), None);
    }

    #[test]
    fn test_default_status_applied_first() {
        let req = CapturedRequest::new("POST", "/x");
        let res = finish(
            &req,
            returning(vec![]).with_status(201),
            ContextOptions::default(),
            |_| {},
        );

        assert_eq!(res.status(), Some(201));
        assert_eq!(res.body(), Some("{}"));
    }

    #[test]
    fn test_preset_content_type_not_overridden() {
        let req = CapturedRequest::new("GET", "/x");
        let method = returning(vec![
            ReturnSpec::new("type", ValueType::String).to_header(Some("Content-Type"))
        ]);

        let res = finish(&req, method, ContextOptions::default(), |ctx| {
            ctx.set_return_arg_by_name("type", "text/csv".into());
        });

        assert_eq!(res.header("content-type"), Some("text/csv"));
    }

    #[test]
    fn test_xml_null_document() {
        let req = CapturedRequest::new("GET", "/x").with_header("Accept", "application/xml");
        let method = returning(vec![ReturnSpec::new("data", ValueType::Any).root()]);

        let res = finish(&req, method, ContextOptions::default().with_xml(), |ctx| {
            ctx.apply_result(RemoteValue::Null);
        });

        assert_eq!(res.body(), Some("<null/>"));
        assert_eq!(res.header("content-length"), Some("7"));
        assert_eq!(res.header("content-type"), Some("application/xml"));
    }

    #[test]
    fn test_xml_failure_becomes_500() {
        let req = CapturedRequest::new("GET", "/x").with_query("_format", "xml");
        let method = returning(vec![ReturnSpec::new("data", ValueType::Object).root()]);

        let res = finish(&req, method, ContextOptions::default().with_xml(), |ctx| {
            ctx.apply_result(RemoteValue::from(json!({"bad name": 1})));
        });

        assert_eq!(res.status(), Some(500));
        let body = res.body().unwrap();
        assert!(body.contains("Invalid XML element name"));
        assert!(body.contains(r#"{"bad name":1}"#));
    }

    #[test]
    fn test_format_override_cannot_enable_xml() {
        let req = CapturedRequest::new("GET", "/x").with_query("_format", "xml");
        let res = finish(&req, returning(vec![]), ContextOptions::default(), |_| {});

        assert_eq!(res.status(), Some(406));
        assert_eq!(res.header("content-type"), Some("text/plain"));
        assert_eq!(res.body(), Some("Not Acceptable"));
    }

    #[test]
    fn test_non_string_format_override_is_406() {
        let req = CapturedRequest::new("GET", "/x").with_query("_format", json!(["json"]));
        let res = finish(&req, returning(vec![]), ContextOptions::default(), |_| {});
        assert_eq!(res.status(), Some(406));
    }

    #[test]
    fn test_format_override_beats_accept_header() {
        let req = CapturedRequest::new("GET", "/x")
            .with_header("Accept", "application/json")
            .with_query("_format", "XML");
        let res = finish(&req, returning(vec![]), ContextOptions::default().with_xml(), |_| {});

        assert_eq!(res.header("content-type"), Some("application/xml"));
        assert!(res.body().unwrap().contains("<response"));
    }

    #[test]
    fn test_unacceptable_accept_header() {
        let req = CapturedRequest::new("GET", "/x").with_header("Accept", "image/png");
        let res = finish(&req, returning(vec![]), ContextOptions::default(), |_| {});
        assert_eq!(res.status(), Some(406));
    }

    #[test]
    fn test_jsonp_with_callback() {
        let req = CapturedRequest::new("GET", "/x")
            .with_header("Accept", "text/javascript")
            .with_query("callback", "handle");
        let res = finish(&req, returning(vec![]), ContextOptions::default(), |_| {});

        assert_eq!(res.header("content-type"), Some("text/javascript"));
        assert_eq!(
            res.body(),
            Some("/**/ typeof handle === 'function' && handle({});")
        );
    }

    #[test]
    fn test_jsonp_without_callback_is_json() {
        let req = CapturedRequest::new("GET", "/x")
            .with_header("Accept", "application/javascript")
            .with_query("callback", "alert(1)");
        let res = finish(&req, returning(vec![]), ContextOptions::default(), |_| {});

        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.body(), Some("{}"));
    }
}
