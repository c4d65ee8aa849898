// Route Table Builder
// Flattens classes and methods into (verb, path) route entries

use crate::domain::{FnToken, MethodDescriptor, RouteEntry, RouteTemplate, SharedClass};
use crate::error::{BindingError, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Source of route templates for classes and methods
///
/// Each adapter decides what a class or method without declared routes
/// is mounted at.
pub trait RouteTemplates: Send + Sync {
    fn class_routes(&self, class: &SharedClass) -> Vec<RouteTemplate>;

    fn method_routes(&self, method: &MethodDescriptor) -> Vec<RouteTemplate>;
}

/// Declared routes, falling back to `POST /<name>`
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredRoutes;

impl RouteTemplates for DeclaredRoutes {
    fn class_routes(&self, class: &SharedClass) -> Vec<RouteTemplate> {
        if class.routes.is_empty() {
            vec![RouteTemplate::new("POST", format!("/{}", class.name))]
        } else {
            class.routes.clone()
        }
    }

    fn method_routes(&self, method: &MethodDescriptor) -> Vec<RouteTemplate> {
        if method.http.routes.is_empty() {
            vec![RouteTemplate::new("POST", format!("/{}", method.name))]
        } else {
            method.http.routes.clone()
        }
    }
}

/// Build the route table
///
/// For every class route, methods sharing a callable (aliases) are emitted
/// once, under the first name registered. Static methods mount at
/// `class + method`, instance methods once per constructor route at
/// `class + ctor + method`. Two entries with the same verb and path shape
/// (paths differing only in parameter names count as the same), or an
/// instance method without a shared constructor, fail the build.
pub fn build(
    classes: &[Arc<SharedClass>],
    templates: &dyn RouteTemplates,
) -> Result<Vec<RouteEntry>> {
    let mut routes = Vec::new();
    let mut seen = HashSet::new();

    for class in classes {
        for class_route in templates.class_routes(class) {
            let root = class_route.path.as_str();
            let mut emitted: HashSet<FnToken> = HashSet::new();

            for method in class.methods() {
                if !emitted.insert(method.fn_token) {
                    debug!(method = %method.string_name, "Skipping aliased method");
                    continue;
                }

                for route in templates.method_routes(method) {
                    if method.is_static {
                        let path = compose_path(root, &route.path);
                        push_route(&mut routes, &mut seen, &route.verb, path, method)?;
                        continue;
                    }

                    let ctor = method.shared_ctor.as_ref().ok_or_else(|| {
                        BindingError::MissingSharedCtor {
                            method: method.string_name.clone(),
                        }
                    })?;
                    for ctor_route in templates.method_routes(ctor) {
                        let relative = format!("{}{}", ctor_route.path, route.path);
                        let path = compose_path(root, &relative);
                        push_route(&mut routes, &mut seen, &route.verb, path, method)?;
                    }
                }
            }
        }
    }

    Ok(routes)
}

fn push_route(
    routes: &mut Vec<RouteEntry>,
    seen: &mut HashSet<(String, String)>,
    verb: &str,
    path: String,
    method: &Arc<MethodDescriptor>,
) -> Result<()> {
    let verb = verb.to_uppercase();
    if !seen.insert((verb.clone(), path_shape(&path))) {
        return Err(BindingError::RouteConflict { verb, path });
    }

    debug!(verb = %verb, path = %path, method = %method.string_name, "Route added");
    routes.push(RouteEntry::new(&verb, path, method));
    Ok(())
}

/// Path with every `:param` segment reduced to `:`
///
/// Two paths with the same shape match the same requests whatever their
/// parameter names.
pub fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| if segment.starts_with(':') { ":" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a class root and a method-relative path
///
/// `/` and `//` mean the class root itself. Runs of slashes collapse and a
/// trailing slash is dropped, except for the root path.
pub fn compose_path(root: &str, path: &str) -> String {
    let joined = if path == "/" || path == "//" {
        root.to_string()
    } else {
        format!("{}{}", root, path)
    };

    let mut normalized = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }

    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}
