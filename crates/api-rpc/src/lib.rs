//! JSON-RPC API Layer
//!
//! Exposes registry classes over JSON-RPC 2.0, one endpoint per class,
//! with a single error envelope for every failure.

pub mod adapter;
pub mod error;
pub mod router;
pub mod shim;
pub mod types;

pub use adapter::{JsonRpcAdapter, RpcAdapterConfig};
pub use error::RpcError;
pub use router::JsonRpcRouter;
