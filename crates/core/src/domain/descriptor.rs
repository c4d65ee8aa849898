// Remote Method Descriptors
// Declarative description of a remotely callable method and its transport mapping

use crate::application::http_context::HttpContext;
use crate::domain::value::RemoteValue;
use crate::error::{BindingError, Result};
use crate::port::invoker::MethodInvoker;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Semantic type tag of an argument or return value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
    Buffer,
    #[default]
    Any,
}

/// Identity of the callable behind a method, assigned at registration
///
/// Aliased methods share a token, which is how the route table collapses them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FnToken(u64);

static NEXT_FN_TOKEN: AtomicU64 = AtomicU64::new(1);

impl FnToken {
    pub fn next() -> Self {
        FnToken(NEXT_FN_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// Custom argument extractor run against the binding context
#[derive(Clone)]
pub struct Formatter(Arc<dyn Fn(&HttpContext<'_>) -> RemoteValue + Send + Sync>);

impl Formatter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&HttpContext<'_>) -> RemoteValue + Send + Sync + 'static,
    {
        Formatter(Arc::new(f))
    }

    pub fn call(&self, ctx: &HttpContext<'_>) -> RemoteValue {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Formatter(..)")
    }
}

/// Where an argument is read from in an HTTP request
#[derive(Debug, Clone)]
pub enum HttpSource {
    Formatter(Formatter),
    /// Entire parsed body
    Body,
    /// Body field by name
    Form,
    Query,
    Path,
    /// Header by name, case-insensitive
    Header,
    RawRequest,
    RawResponse,
    RawContext,
}

impl HttpSource {
    pub fn tag(&self) -> &'static str {
        match self {
            HttpSource::Formatter(_) => "formatter",
            HttpSource::Body => "body",
            HttpSource::Form => "form",
            HttpSource::Query => "query",
            HttpSource::Path => "path",
            HttpSource::Header => "header",
            HttpSource::RawRequest => "req",
            HttpSource::RawResponse => "res",
            HttpSource::RawContext => "context",
        }
    }
}

impl Serialize for HttpSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("source", self.tag())?;
        map.end()
    }
}

/// One declared parameter of a method
#[derive(Debug, Clone, Serialize)]
pub struct ArgumentSpec {
    /// Key in the argument mapping
    pub arg: String,
    /// Lookup name in the request, defaults to `arg`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ArgumentSpec {
    pub fn new(arg: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            arg: arg.into(),
            name: None,
            value_type,
            http: None,
            description: None,
        }
    }

    pub fn from_source(mut self, source: HttpSource) -> Self {
        self.http = Some(source);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn lookup_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.arg)
    }
}

/// Where a return value goes besides the response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "lowercase")]
pub enum ReturnTarget {
    Status,
    Header {
        #[serde(skip_serializing_if = "Option::is_none")]
        header: Option<String>,
    },
}

/// One declared return value of a method
#[derive(Debug, Clone, Serialize)]
pub struct ReturnSpec {
    pub arg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Value replaces the whole response body
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub root: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<ReturnTarget>,
}

impl ReturnSpec {
    pub fn new(arg: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            arg: arg.into(),
            name: None,
            value_type,
            root: false,
            http: None,
        }
    }

    pub fn root(mut self) -> Self {
        self.root = true;
        self
    }

    pub fn to_status(mut self) -> Self {
        self.http = Some(ReturnTarget::Status);
        self
    }

    pub fn to_header(mut self, header: Option<&str>) -> Self {
        self.http = Some(ReturnTarget::Header {
            header: header.map(str::to_string),
        });
        self
    }

    pub fn matches(&self, name: &str) -> bool {
        self.arg == name || self.name.as_deref() == Some(name)
    }
}

/// Documented error outcome of a method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

/// Verb + path pair at class, constructor or method level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTemplate {
    pub verb: String,
    pub path: String,
}

impl RouteTemplate {
    pub fn new(verb: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            verb: verb.into().to_uppercase(),
            path: path.into(),
        }
    }
}

/// Transport configuration of a method
#[derive(Debug, Clone, Default)]
pub struct HttpConfig {
    pub routes: Vec<RouteTemplate>,
    /// Status applied before the response is finalized
    pub status: Option<u16>,
    /// Status applied when the method fails
    pub error_status: Option<u16>,
}

/// Remote method descriptor
#[derive(Clone)]
pub struct MethodDescriptor {
    pub name: String,
    /// Display name, e.g. `Widget.find` or `Widget.prototype.rename`
    pub string_name: String,
    pub is_static: bool,
    pub accepts: Vec<ArgumentSpec>,
    pub returns: Vec<ReturnSpec>,
    pub errors: Vec<ErrorSpec>,
    pub http: HttpConfig,
    /// Required for instance methods
    pub shared_ctor: Option<Arc<MethodDescriptor>>,
    pub fn_token: FnToken,
    pub invoker: Arc<dyn MethodInvoker>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl MethodDescriptor {
    /// New static method with a fresh callable identity
    pub fn new(name: impl Into<String>, invoker: Arc<dyn MethodInvoker>) -> Self {
        let name = name.into();
        Self {
            string_name: name.clone(),
            name,
            is_static: true,
            accepts: Vec::new(),
            returns: Vec::new(),
            errors: Vec::new(),
            http: HttpConfig::default(),
            shared_ctor: None,
            fn_token: FnToken::next(),
            invoker,
            description: None,
            notes: None,
        }
    }

    pub fn instance(mut self) -> Self {
        self.is_static = false;
        self
    }

    pub fn with_shared_ctor(mut self, ctor: Arc<MethodDescriptor>) -> Self {
        self.shared_ctor = Some(ctor);
        self
    }

    pub fn with_arg(mut self, spec: ArgumentSpec) -> Self {
        self.accepts.push(spec);
        self
    }

    pub fn with_return(mut self, spec: ReturnSpec) -> Self {
        self.returns.push(spec);
        self
    }

    pub fn with_error(mut self, status: Option<u16>, message: impl Into<String>) -> Self {
        self.errors.push(ErrorSpec {
            status,
            message: message.into(),
        });
        self
    }

    pub fn with_route(mut self, verb: &str, path: &str) -> Self {
        self.http.routes.push(RouteTemplate::new(verb, path));
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http.status = Some(status);
        self
    }

    pub fn with_error_status(mut self, status: u16) -> Self {
        self.http.error_status = Some(status);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Same callable under another name
    pub fn alias(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn return_spec(&self, name: &str) -> Option<&ReturnSpec> {
        self.returns.iter().find(|spec| spec.matches(name))
    }

    /// Argument names must be unique: they key the argument mapping
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for spec in &self.accepts {
            if !seen.insert(spec.arg.as_str()) {
                return Err(BindingError::Config(format!(
                    "{} declares argument '{}' twice",
                    self.string_name, spec.arg
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("string_name", &self.string_name)
            .field("is_static", &self.is_static)
            .field("accepts", &self.accepts)
            .field("returns", &self.returns)
            .field("http", &self.http)
            .field("fn_token", &self.fn_token)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::invoker::FnInvoker;
    use serde_json::json;

    fn noop() -> Arc<dyn MethodInvoker> {
        Arc::new(FnInvoker::sync(|_, _| Ok(RemoteValue::Undefined)))
    }

    #[test]
    fn test_alias_shares_fn_token() {
        let find = MethodDescriptor::new("find", noop());
        let all = find.alias("all");

        assert_eq!(all.name, "all");
        assert_eq!(all.fn_token, find.fn_token);
        assert_ne!(MethodDescriptor::new("other", noop()).fn_token, find.fn_token);
    }

    #[test]
    fn test_validate_rejects_duplicate_args() {
        let method = MethodDescriptor::new("create", noop())
            .with_arg(ArgumentSpec::new("data", ValueType::Object))
            .with_arg(ArgumentSpec::new("data", ValueType::String));

        assert!(matches!(method.validate(), Err(BindingError::Config(_))));
    }

    #[test]
    fn test_return_spec_lookup_by_arg_or_name() {
        let method = MethodDescriptor::new("count", noop()).with_return(ReturnSpec {
            name: Some("total".to_string()),
            ..ReturnSpec::new("count", ValueType::Number)
        });

        assert!(method.return_spec("count").is_some());
        assert!(method.return_spec("total").is_some());
        assert!(method.return_spec("missing").is_none());
    }

    #[test]
    fn test_argument_spec_serializes_source_tag() {
        let spec = ArgumentSpec::new("id", ValueType::Number).from_source(HttpSource::Path);
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({"arg": "id", "type": "number", "http": {"source": "path"}})
        );

        let spec = ArgumentSpec::new("limit", ValueType::Number);
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({"arg": "limit", "type": "number"})
        );
    }
}
