//! JSON-RPC Router
//!
//! Routes a raw request body to the dispatch module of its endpoint and
//! normalizes every error response through the shared hook.

use crate::adapter::RpcAdapterConfig;
use crate::error::{error_envelope, fault_from_error_object, RpcFault};
use jsonrpsee::RpcModule;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

#[derive(Clone)]
pub struct JsonRpcRouter {
    endpoints: HashMap<String, RpcModule<()>>,
    config: RpcAdapterConfig,
}

impl JsonRpcRouter {
    pub fn new(endpoints: HashMap<String, RpcModule<()>>, config: RpcAdapterConfig) -> Self {
        Self { endpoints, config }
    }

    /// Endpoint paths, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.endpoints.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Dispatch a request body posted to `path`
    ///
    /// `None` when no endpoint lives at `path`; otherwise the HTTP status
    /// and the JSON-RPC response.
    pub async fn handle(&self, path: &str, body: &str) -> Option<(u16, Value)> {
        let module = self.endpoints.get(path)?;
        debug!(endpoint = %path, "JSON-RPC request");
        Some(self.dispatch(module, body).await)
    }

    async fn dispatch(&self, module: &RpcModule<()>, body: &str) -> (u16, Value) {
        let expose_stack = self.config.expose_stack;

        let (response, _subscriptions) = match module.raw_json_request(body, 1).await {
            Ok(reply) => reply,
            Err(err) => {
                return error_envelope(
                    RpcFault::Message(format!("Parse error: {}", err)),
                    expose_stack,
                )
            }
        };

        match serde_json::from_str::<Value>(&response.to_string()) {
            Ok(reply) => match reply.get("error") {
                Some(error) => error_envelope(fault_from_error_object(error), expose_stack),
                None => (200, reply),
            },
            Err(err) => error_envelope(RpcFault::Message(err.to_string()), expose_stack),
        }
    }
}
