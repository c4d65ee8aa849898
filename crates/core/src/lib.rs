// Bindery Core - Remote method bindings for HTTP and JSON-RPC
// NO hosting-server dependencies: transports reach the core through the port layer

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{BindingError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
