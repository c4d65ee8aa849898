// Route Entry - one normalized (verb, path) binding to a method

use crate::domain::descriptor::{ArgumentSpec, ErrorSpec, MethodDescriptor, ReturnSpec};
use serde::Serialize;
use std::sync::Arc;

/// Route table row. Empty accepts/returns/errors are omitted, never `[]`.
#[derive(Debug, Clone, Serialize)]
pub struct RouteEntry {
    pub verb: String,
    pub path: String,
    /// Display name of the target method
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts: Option<Vec<ArgumentSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<Vec<ReturnSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorSpec>>,
    #[serde(skip)]
    pub descriptor: Arc<MethodDescriptor>,
}

impl RouteEntry {
    pub fn new(verb: &str, path: String, method: &Arc<MethodDescriptor>) -> Self {
        Self {
            verb: verb.to_uppercase(),
            path,
            method: method.string_name.clone(),
            description: method.description.clone(),
            notes: method.notes.clone(),
            accepts: non_empty(&method.accepts),
            returns: non_empty(&method.returns),
            errors: non_empty(&method.errors),
            descriptor: Arc::clone(method),
        }
    }
}

fn non_empty<T: Clone>(items: &[T]) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items.to_vec())
    }
}
