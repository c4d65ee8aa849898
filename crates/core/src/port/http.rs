// HTTP Port - request/response abstraction of the hosting server

use crate::application::negotiator::negotiate;
use serde_json::Value;
use std::collections::HashMap;

/// Inbound request as seen by the binding layer
pub trait HttpRequest: Send + Sync {
    /// HTTP verb, for diagnostics
    fn method(&self) -> &str;

    fn url(&self) -> &str;

    /// Route parameter
    fn param(&self, name: &str) -> Option<&str>;

    /// Query-string field (a string, or an array for repeated keys)
    fn query(&self, name: &str) -> Option<&Value>;

    /// Parsed body, if any
    fn body(&self) -> Option<&Value>;

    /// Header lookup, case-insensitive
    fn header(&self, name: &str) -> Option<&str>;

    /// Best supported token for the `Accept` header, `None` if nothing fits
    fn accepts(&self, supported: &[String]) -> Option<String> {
        negotiate(self.header("accept"), supported)
    }
}

/// Outbound response as seen by the binding layer
///
/// Status and headers use last-write semantics.
pub trait HttpResponse: Send + Sync {
    /// `None` until a status is written
    fn status(&self) -> Option<u16>;

    fn set_status(&mut self, status: u16);

    fn header(&self, name: &str) -> Option<&str>;

    fn set_header(&mut self, name: &str, value: &str);

    fn send(&mut self, body: String);

    fn end(&mut self);
}

/// Request captured from the hosting server
#[derive(Debug, Clone, Default)]
pub struct CapturedRequest {
    pub method: String,
    pub url: String,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, Value>,
    pub body: Option<Value>,
    /// Keys stored lowercase
    pub headers: HashMap<String, String>,
}

impl CapturedRequest {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_uppercase(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_query(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.query.insert(name.to_string(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// JSON body with `content-type: application/json`
    pub fn with_json_body(self, body: Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(body)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }
}

impl HttpRequest for CapturedRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    fn query(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Response buffered in memory until the host writes it out
#[derive(Debug, Clone, Default)]
pub struct BufferedResponse {
    status: Option<u16>,
    headers: Vec<(String, String)>,
    body: Option<String>,
    ended: bool,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status actually sent: 200 unless written
    pub fn status_code(&self) -> u16 {
        self.status.unwrap_or(200)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl HttpResponse for BufferedResponse {
    fn status(&self) -> Option<u16> {
        self.status
    }

    fn set_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    fn send(&mut self, body: String) {
        self.body = Some(body);
    }

    fn end(&mut self) {
        self.ended = true;
    }
}
