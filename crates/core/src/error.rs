// Central Error Type for the Binding Layer

use crate::domain::RemoteError;
use thiserror::Error;

/// Binding-layer error type
#[derive(Error, Debug)]
pub enum BindingError {
    /// Malformed structured input for a declared argument
    #[error("Invalid value for argument '{arg}': {source}")]
    Coercion {
        arg: String,
        #[source]
        source: serde_json::Error,
    },

    /// Business error reported by the invoked method
    #[error("{0}")]
    Remote(#[from] RemoteError),

    #[error("Duplicate route: {verb} {path}")]
    RouteConflict { verb: String, path: String },

    #[error("Instance method {method} has no shared constructor")]
    MissingSharedCtor { method: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BindingError {
    /// HTTP status this error maps to when nothing more specific is known
    pub fn status(&self) -> Option<u16> {
        match self {
            BindingError::Coercion { .. } => Some(400),
            BindingError::Remote(err) => err.effective_status(),
            _ => None,
        }
    }

    /// Flatten into the loosely-typed error shape clients see
    pub fn into_remote(self) -> RemoteError {
        match self {
            BindingError::Remote(err) => err,
            BindingError::Coercion { arg, source } => {
                RemoteError::new(format!("Invalid value for argument '{}': {}", arg, source))
                    .with_name("BadArgumentError")
                    .with_status(400)
                    .with_field("arg", arg)
            }
            other => RemoteError::from_error(&other),
        }
    }
}

/// Result type alias using BindingError
pub type Result<T> = std::result::Result<T, BindingError>;
