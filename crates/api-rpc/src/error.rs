//! RPC Error Handling
//!
//! Every JSON-RPC failure, whatever its origin, goes through
//! [`error_envelope`] and leaves the process in the same fixed shape.

use crate::types::{ErrorBody, ErrorEnvelope, JSONRPC_VERSION};
use bindery_core::domain::RemoteError;
use bindery_core::BindingError;
use jsonrpsee::types::ErrorObjectOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// JSON-RPC Error Codes
pub mod code {
    /// Implementation-defined server error, used for every failure
    pub const SERVER_ERROR: i32 = -32000;
}

pub const SERVER_ERROR_MESSAGE: &str = "Server error";

/// Adapter setup failures
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Failed to register JSON-RPC method {method}: {reason}")]
    Registration { method: String, reason: String },

    #[error(transparent)]
    Binding(#[from] BindingError),
}

/// Failure reaching the shared error hook
#[derive(Debug, Clone)]
pub enum RpcFault {
    /// Bare message, e.g. a protocol error raised by the dispatch library
    Message(String),
    /// Structured error reported by a method
    Remote(RemoteError),
}

impl RpcFault {
    /// Structured form: bare messages become errors with status 500
    fn into_remote(self) -> RemoteError {
        match self {
            RpcFault::Remote(err) => err,
            RpcFault::Message(message) => RemoteError::new(message)
                .with_status(500)
                .with_status_code(500),
        }
    }
}

/// Carry a method failure through the dispatch library
///
/// The whole structured error rides in `data` so the hook can rebuild it.
pub fn to_rpc_error(err: BindingError) -> ErrorObjectOwned {
    let remote = err.into_remote();
    ErrorObjectOwned::owned(code::SERVER_ERROR, remote.message.clone(), Some(remote))
}

/// Recover the fault behind an error object produced by the dispatch library
///
/// Unstructured `data` (e.g. the parse detail of an invalid-params error)
/// is kept as a `detail` field.
pub fn fault_from_error_object(error: &Value) -> RpcFault {
    let data = error.get("data").filter(|data| !data.is_null());
    if let Some(remote) = data.and_then(|data| RemoteError::deserialize(data).ok()) {
        return RpcFault::Remote(remote);
    }

    let message = RpcFault::Message(
        error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    );
    match data {
        Some(detail) => RpcFault::Remote(message.into_remote().with_field("detail", detail.clone())),
        None => message,
    }
}

/// Shared error hook: HTTP status plus the fixed error envelope
///
/// Status is `statusCode`, then `status`, then 500. The detail carries the
/// error name, message and every extra field; the stack only when exposed.
pub fn error_envelope(fault: RpcFault, expose_stack: bool) -> (u16, Value) {
    let err = fault.into_remote();
    let status = err.status_code.or(err.status).unwrap_or(500);

    warn!(
        name = %err.name,
        status,
        error = %err.message,
        stack = err.stack.as_deref().unwrap_or(""),
        "JSON-RPC call failed"
    );

    let envelope = ErrorEnvelope {
        jsonrpc: JSONRPC_VERSION,
        error: ErrorBody {
            code: code::SERVER_ERROR,
            message: SERVER_ERROR_MESSAGE,
            data: err.detail(status, expose_stack),
        },
        id: None,
    };
    // Serializing plain strings, numbers and JSON values cannot fail
    let body = serde_json::to_value(&envelope).unwrap_or(Value::Null);
    (status, body)
}
