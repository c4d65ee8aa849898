// Shared Class - a named group of remote methods

use crate::domain::descriptor::{MethodDescriptor, RouteTemplate};
use crate::error::{BindingError, Result};
use std::sync::Arc;

/// Remotely exposed class: class-level routes, optional shared constructor, methods
#[derive(Debug, Clone)]
pub struct SharedClass {
    pub name: String,
    pub routes: Vec<RouteTemplate>,
    pub shared_ctor: Option<Arc<MethodDescriptor>>,
    methods: Vec<Arc<MethodDescriptor>>,
}

impl SharedClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routes: Vec::new(),
            shared_ctor: None,
            methods: Vec::new(),
        }
    }

    pub fn with_route(mut self, verb: &str, path: &str) -> Self {
        self.routes.push(RouteTemplate::new(verb, path));
        self
    }

    /// Set the class constructor
    ///
    /// Instance methods already registered that have no constructor, or
    /// that inherited the previous class one, take the new constructor.
    pub fn with_shared_ctor(mut self, ctor: MethodDescriptor) -> Self {
        let mut ctor = ctor;
        ctor.string_name = format!("{}.{}", self.name, ctor.name);
        let ctor = Arc::new(ctor);
        let previous = self.shared_ctor.replace(Arc::clone(&ctor));

        for method in self.methods.iter_mut().filter(|m| !m.is_static) {
            let inherited = match (&method.shared_ctor, &previous) {
                (None, _) => true,
                (Some(own), Some(previous)) => Arc::ptr_eq(own, previous),
                (Some(_), None) => false,
            };
            if inherited {
                Arc::make_mut(method).shared_ctor = Some(Arc::clone(&ctor));
            }
        }
        self
    }

    /// Register a method
    ///
    /// Instance methods without their own constructor inherit the class one.
    /// Names are unique per class and staticness.
    pub fn add_method(&mut self, method: MethodDescriptor) -> Result<Arc<MethodDescriptor>> {
        let mut method = method;
        if self.find(&method.name, method.is_static).is_some() {
            return Err(BindingError::Config(format!(
                "{} already defines {} method '{}'",
                self.name,
                if method.is_static { "static" } else { "instance" },
                method.name
            )));
        }

        method.string_name = if method.is_static {
            format!("{}.{}", self.name, method.name)
        } else {
            format!("{}.prototype.{}", self.name, method.name)
        };
        if !method.is_static && method.shared_ctor.is_none() {
            method.shared_ctor = self.shared_ctor.clone();
        }
        method.validate()?;

        let method = Arc::new(method);
        self.methods.push(Arc::clone(&method));
        Ok(method)
    }

    pub fn with_method(mut self, method: MethodDescriptor) -> Result<Self> {
        self.add_method(method)?;
        Ok(self)
    }

    /// Expose an existing method under a second name (same callable identity)
    pub fn alias(&mut self, existing: &str, alias: &str) -> Result<Arc<MethodDescriptor>> {
        let target = self
            .methods
            .iter()
            .find(|m| m.name == existing)
            .cloned()
            .ok_or_else(|| {
                BindingError::Config(format!("{} has no method '{}'", self.name, existing))
            })?;
        self.add_method(target.alias(alias))
    }

    pub fn methods(&self) -> &[Arc<MethodDescriptor>] {
        &self.methods
    }

    pub fn find(&self, name: &str, is_static: bool) -> Option<&Arc<MethodDescriptor>> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.is_static == is_static)
    }

    /// Lookup by plain name, static methods first
    pub fn method(&self, name: &str) -> Option<&Arc<MethodDescriptor>> {
        self.find(name, true).or_else(|| self.find(name, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RemoteValue;
    use crate::port::invoker::FnInvoker;

    fn method(name: &str) -> MethodDescriptor {
        MethodDescriptor::new(name, Arc::new(FnInvoker::sync(|_, _| Ok(RemoteValue::Null))))
    }

    #[test]
    fn test_add_method_sets_string_name_and_ctor() {
        let mut class = SharedClass::new("Widget").with_shared_ctor(method("sharedCtor"));
        let find = class.add_method(method("find")).unwrap();
        let rename = class.add_method(method("rename").instance()).unwrap();

        assert_eq!(find.string_name, "Widget.find");
        assert_eq!(rename.string_name, "Widget.prototype.rename");
        assert_eq!(rename.shared_ctor.as_ref().unwrap().name, "sharedCtor");
        assert!(find.shared_ctor.is_none());
    }

    #[test]
    fn test_duplicate_name_rejected_per_staticness() {
        let mut class = SharedClass::new("Widget");
        class.add_method(method("find")).unwrap();

        assert!(class.add_method(method("find")).is_err());
        assert!(class.add_method(method("find").instance()).is_ok());
    }

    #[test]
    fn test_alias_keeps_identity() {
        let mut class = SharedClass::new("Widget");
        let find = class.add_method(method("find")).unwrap();
        let all = class.alias("find", "all").unwrap();

        assert_eq!(all.fn_token, find.fn_token);
        assert_eq!(class.methods().len(), 2);
        assert!(class.alias("missing", "x").is_err());
    }

    #[test]
    fn test_ctor_reaches_methods_added_before_it() {
        let own_ctor = Arc::new(method("own"));
        let class = SharedClass::new("Widget")
            .with_method(method("get").instance())
            .unwrap()
            .with_method(method("special").instance().with_shared_ctor(Arc::clone(&own_ctor)))
            .unwrap()
            .with_method(method("count"))
            .unwrap()
            .with_shared_ctor(method("sharedCtor"));

        let ctor_name = |name: &str| {
            class
                .method(name)
                .and_then(|m| m.shared_ctor.as_ref())
                .map(|c| c.name.clone())
        };
        assert_eq!(ctor_name("get").as_deref(), Some("sharedCtor"));
        assert_eq!(ctor_name("special").as_deref(), Some("own"));
        assert_eq!(ctor_name("count"), None);

        let replaced = class.with_shared_ctor(method("rebuilt"));
        let get = replaced.method("get").unwrap();
        assert_eq!(get.shared_ctor.as_ref().unwrap().name, "rebuilt");
    }
}
