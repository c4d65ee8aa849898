//! Variadic Method Shim
//!
//! Turns JSON-RPC params (positional array or named object) into the
//! argument mapping of a method, resolves the receiver and invokes it.

use bindery_core::domain::{ArgMap, MethodDescriptor, RemoteValue};
use bindery_core::port::{CallContext, HttpRequest, HttpResponse, Receiver};
use bindery_core::{BindingError, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Invocation context of a JSON-RPC call: no HTTP objects are exposed
pub struct RpcCallContext;

impl CallContext for RpcCallContext {
    fn protocol(&self) -> &'static str {
        "jsonrpc"
    }

    fn request(&self) -> Option<&dyn HttpRequest> {
        None
    }

    fn response(&mut self) -> Option<&mut dyn HttpResponse> {
        None
    }
}

/// Positional parameter names of a method
///
/// Declared argument names, or `param0..paramN` sized to the invoker's
/// arity when the method declares none.
pub fn param_names(method: &MethodDescriptor) -> Vec<String> {
    if method.accepts.is_empty() {
        (0..method.invoker.arity())
            .map(|i| format!("param{}", i))
            .collect()
    } else {
        method.accepts.iter().map(|spec| spec.arg.clone()).collect()
    }
}

/// Name every supplied parameter
///
/// Arrays are matched to `names` by position (extra entries are dropped);
/// objects are taken as they are.
pub fn name_params(params: Value, names: &[String]) -> Map<String, Value> {
    match params {
        Value::Array(items) => names.iter().cloned().zip(items).collect(),
        Value::Object(fields) => fields,
        _ => Map::new(),
    }
}

fn args_for(names: &[String], named: &Map<String, Value>) -> ArgMap {
    names
        .iter()
        .map(|name| (name.clone(), RemoteValue::from(named.get(name))))
        .collect()
}

/// Invoke `method` with JSON-RPC params
///
/// Instance methods run the shared constructor first, with its own
/// arguments looked up by name among the same params.
pub async fn call(method: Arc<MethodDescriptor>, params: Value) -> Result<RemoteValue> {
    let named = name_params(params, &param_names(&method));
    let mut ctx = RpcCallContext;

    let receiver = if method.is_static {
        Receiver::Static
    } else {
        let ctor = method
            .shared_ctor
            .as_ref()
            .ok_or_else(|| BindingError::MissingSharedCtor {
                method: method.string_name.clone(),
            })?;
        let ctor_args = args_for(&param_names(ctor), &named);
        let instance = ctor
            .invoker
            .invoke(Receiver::Static, ctor_args, &mut ctx)
            .await?;
        Receiver::Instance(instance)
    };

    debug!(method = %method.string_name, "Invoking remote method over JSON-RPC");
    let args = args_for(&param_names(&method), &named);
    let result = method.invoker.invoke(receiver, args, &mut ctx).await?;
    Ok(result)
}
