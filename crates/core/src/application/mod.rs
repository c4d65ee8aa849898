// Application Layer - Binding, negotiation and routing

pub mod coercion;
pub mod dispatch; // REST end-to-end
pub mod http_context;
pub mod negotiator;
pub mod registry;
pub mod route_table;
pub mod xml;

// Re-exports
pub use http_context::HttpContext;
pub use negotiator::{negotiate, ContextOptions, ResponseFormat};
pub use registry::RemoteObjects;
pub use route_table::{compose_path, path_shape, DeclaredRoutes, RouteTemplates};
