// Domain Layer - Descriptors, values and route entries

pub mod class;
pub mod descriptor;
pub mod error;
pub mod route;
pub mod value;

// Re-exports
pub use class::SharedClass;
pub use descriptor::{
    ArgumentSpec, ErrorSpec, FnToken, Formatter, HttpConfig, HttpSource, MethodDescriptor,
    ReturnSpec, ReturnTarget, RouteTemplate, ValueType,
};
pub use error::RemoteError;
pub use route::RouteEntry;
pub use value::{format_date, ArgMap, HandleKind, Model, RemoteValue};
