// REST Dispatch
// Runs one request through the binding context: build, invoke, finalize

use crate::application::http_context::HttpContext;
use crate::application::negotiator::ContextOptions;
use crate::domain::MethodDescriptor;
use crate::error::{BindingError, Result};
use crate::port::http::{HttpRequest, HttpResponse};
use crate::port::invoker::Receiver;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

/// Handle a REST request for `method`
///
/// Instance methods first run the shared constructor; its result is the
/// receiver. Failures are answered with a JSON error body.
pub async fn handle(
    method: Arc<MethodDescriptor>,
    req: &dyn HttpRequest,
    res: &mut dyn HttpResponse,
    options: ContextOptions,
) {
    let expose_stack = options.expose_stack;
    let outcome = run(Arc::clone(&method), req, &mut *res, options).await;
    if let Err(err) = outcome {
        write_error(&method, req, res, err, expose_stack);
    }
}

async fn run(
    method: Arc<MethodDescriptor>,
    req: &dyn HttpRequest,
    res: &mut dyn HttpResponse,
    options: ContextOptions,
) -> Result<()> {
    let mut ctx = HttpContext::new(req, res, Arc::clone(&method), options)?;

    let receiver = if method.is_static {
        Receiver::Static
    } else {
        let ctor = method
            .shared_ctor
            .as_ref()
            .ok_or_else(|| BindingError::MissingSharedCtor {
                method: method.string_name.clone(),
            })?;
        Receiver::Instance(ctx.invoke(Receiver::Static, ctor, true).await?)
    };

    let result = ctx.invoke(receiver, &method, false).await?;
    ctx.apply_result(result);
    ctx.done();
    Ok(())
}

/// Write `{"error": detail}`; the error's own status wins over a status
/// already set on the response, then 500
fn write_error(
    method: &MethodDescriptor,
    req: &dyn HttpRequest,
    res: &mut dyn HttpResponse,
    err: BindingError,
    expose_stack: bool,
) {
    let status = err
        .status()
        .or(res.status().filter(|s| *s != 200))
        .unwrap_or(500);

    if status >= 500 {
        error!(
            method = %method.string_name,
            verb = %req.method(),
            url = %req.url(),
            error = %err,
            "Request failed"
        );
    } else {
        warn!(
            method = %method.string_name,
            verb = %req.method(),
            url = %req.url(),
            error = %err,
            "Request rejected"
        );
    }

    let detail = err.into_remote().detail(status, expose_stack);
    res.set_status(status);
    res.set_header("Content-Type", "application/json");
    res.send(json!({ "error": detail }).to_string());
    res.end();
}
