// Port Layer - Interfaces for external collaborators

pub mod http; // Hosting server request/response
pub mod invoker; // Registry-provided invocation contract
pub mod registry;

// Re-exports
pub use http::{BufferedResponse, CapturedRequest, HttpRequest, HttpResponse};
pub use invoker::{CallContext, FnInvoker, MethodInvoker, Receiver};
pub use registry::Registry;
