// Remote Error - business error reported by an invoked method

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Error reported by a remote method through its completion
///
/// Mirrors the loosely-typed error objects methods report: a name, a
/// message, optional HTTP status hints and any number of extra fields that
/// are surfaced to clients for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, rename = "statusCode", skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            name: "Error".to_string(),
            message: message.into(),
            ..Default::default()
        }
    }

    /// Build from any Rust error; the source chain becomes the stack
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut stack = format!("Error: {}", err);
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push_str(&format!("\n    caused by: {}", cause));
            source = cause.source();
        }
        Self {
            stack: Some(stack),
            ..Self::new(err.to_string())
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// `status`, then `statusCode`
    pub fn effective_status(&self) -> Option<u16> {
        self.status.or(self.status_code)
    }

    /// Diagnostic envelope shared by the REST and JSON-RPC error paths
    ///
    /// Extra fields are copied after the fixed ones and may shadow them,
    /// except `status`, which always reports the status actually sent.
    pub fn detail(&self, status: u16, expose_stack: bool) -> Value {
        let mut data = Map::new();
        data.insert("name".to_string(), Value::from(self.name.clone()));
        let message = if self.message.is_empty() {
            "An unknown error occurred".to_string()
        } else {
            self.message.clone()
        };
        data.insert("message".to_string(), Value::from(message));
        if let Some(code) = self.status_code {
            data.insert("statusCode".to_string(), Value::from(code));
        }
        for (key, value) in &self.fields {
            data.insert(key.clone(), value.clone());
        }
        data.insert("status".to_string(), Value::from(status));
        if expose_stack {
            if let Some(stack) = &self.stack {
                data.insert("stack".to_string(), Value::from(stack.clone()));
            }
        }
        Value::Object(data)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for RemoteError {}

impl From<&str> for RemoteError {
    fn from(message: &str) -> Self {
        RemoteError::new(message)
    }
}

impl From<String> for RemoteError {
    fn from(message: String) -> Self {
        RemoteError::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_effective_status_prefers_status() {
        let err = RemoteError::new("boom").with_status(404).with_status_code(410);
        assert_eq!(err.effective_status(), Some(404));

        let err = RemoteError::new("boom").with_status_code(410);
        assert_eq!(err.effective_status(), Some(410));

        assert_eq!(RemoteError::new("boom").effective_status(), None);
    }

    #[test]
    fn test_detail_copies_fields_and_hides_stack() {
        let err = RemoteError::new("not here")
            .with_name("NotFound")
            .with_field("code", "MODEL_NOT_FOUND")
            .with_stack("NotFound: not here");

        let detail = err.detail(404, false);
        assert_eq!(
            detail,
            json!({
                "name": "NotFound",
                "message": "not here",
                "status": 404,
                "code": "MODEL_NOT_FOUND"
            })
        );

        let detail = err.detail(404, true);
        assert_eq!(detail["stack"], json!("NotFound: not here"));
    }

    #[test]
    fn test_from_error_renders_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = RemoteError::from_error(&io);
        assert_eq!(err.message, "disk gone");
        assert!(err.stack.unwrap().starts_with("Error: disk gone"));
    }
}
