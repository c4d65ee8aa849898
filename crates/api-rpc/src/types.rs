//! JSON-RPC Wire Types
//!
//! Fixed error envelope shared by every JSON-RPC endpoint.

use serde::Serialize;
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// `{jsonrpc, error, id: null}`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub jsonrpc: &'static str,
    pub error: ErrorBody,
    /// Always `null`: the failing request's id is not echoed back
    pub id: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: i32,
    pub message: &'static str,
    pub data: Value,
}
