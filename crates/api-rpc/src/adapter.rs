//! JSON-RPC Adapter
//!
//! Exposes every class of a registry as a JSON-RPC endpoint at
//! `/<className>/jsonrpc`, one method per plain method name.

use crate::error::{to_rpc_error, RpcError};
use crate::router::JsonRpcRouter;
use crate::shim;
use bindery_core::application::route_table::{self, RouteTemplates};
use bindery_core::domain::{MethodDescriptor, RouteEntry, RouteTemplate, SharedClass};
use bindery_core::port::Registry;
use jsonrpsee::RpcModule;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{debug, info, warn};

/// Adapter configuration
#[derive(Debug, Clone)]
pub struct RpcAdapterConfig {
    /// Include error stacks in the error envelope
    pub expose_stack: bool,
}

impl Default for RpcAdapterConfig {
    fn default() -> Self {
        Self { expose_stack: true }
    }
}

/// Endpoint path of a class
pub fn endpoint_path(class: &SharedClass) -> String {
    format!("/{}/jsonrpc", class.name)
}

/// Every class and method is reachable at `POST /<name>`
#[derive(Debug, Clone, Copy, Default)]
pub struct NameRoutes;

impl RouteTemplates for NameRoutes {
    fn class_routes(&self, class: &SharedClass) -> Vec<RouteTemplate> {
        vec![RouteTemplate::new("POST", format!("/{}", class.name))]
    }

    fn method_routes(&self, method: &MethodDescriptor) -> Vec<RouteTemplate> {
        vec![RouteTemplate::new("POST", format!("/{}", method.name))]
    }
}

pub struct JsonRpcAdapter {
    registry: Arc<dyn Registry>,
    config: RpcAdapterConfig,
}

impl JsonRpcAdapter {
    pub fn new(registry: Arc<dyn Registry>, config: RpcAdapterConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &RpcAdapterConfig {
        &self.config
    }

    /// Route table of the registry under the adapter's default templates
    pub fn all_routes(&self) -> Result<Vec<RouteEntry>, RpcError> {
        Ok(route_table::build(&self.registry.classes(), &NameRoutes)?)
    }

    /// Build one dispatch module per class
    ///
    /// Methods are registered under their plain name. When a static and an
    /// instance method share a name, the first registered one is kept.
    pub fn create_handler(&self) -> Result<JsonRpcRouter, RpcError> {
        let mut endpoints = HashMap::new();

        for class in self.registry.classes() {
            let path = endpoint_path(&class);
            let mut module = RpcModule::new(());
            let mut registered = HashSet::new();

            for method in class.methods() {
                if !registered.insert(method.name.clone()) {
                    warn!(
                        method = %method.string_name,
                        "JSON-RPC method name already taken, skipping"
                    );
                    continue;
                }
                register(&mut module, method)?;
                debug!(endpoint = %path, method = %method.name, "JSON-RPC method registered");
            }

            info!(endpoint = %path, methods = registered.len(), "JSON-RPC endpoint ready");
            endpoints.insert(path, module);
        }

        Ok(JsonRpcRouter::new(endpoints, self.config.clone()))
    }
}

/// Method names as `&'static str`, leaked at most once per distinct name
fn intern(name: &str) -> &'static str {
    static NAMES: OnceLock<Mutex<HashSet<&'static str>>> = OnceLock::new();

    let mut names = NAMES
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    match names.get(name) {
        Some(interned) => *interned,
        None => {
            let interned: &'static str = Box::leak(name.to_owned().into_boxed_str());
            names.insert(interned);
            interned
        }
    }
}

fn register(module: &mut RpcModule<()>, method: &Arc<MethodDescriptor>) -> Result<(), RpcError> {
    let name = intern(&method.name);
    let target = Arc::clone(method);

    module
        .register_async_method(name, move |params, _, _| {
            let target = Arc::clone(&target);
            async move {
                let params: Value = params.parse()?;
                shim::call(target, params)
                    .await
                    .map(|result| result.to_json())
                    .map_err(to_rpc_error)
            }
        })
        .map_err(|e| RpcError::Registration {
            method: method.string_name.clone(),
            reason: e.to_string(),
        })?;
    Ok(())
}
