// In-Memory Registry
// Holds the shared classes exposed by the transport adapters

use crate::domain::SharedClass;
use crate::error::{BindingError, Result};
use crate::port::registry::Registry;
use std::sync::Arc;
use tracing::info;

/// Registry of remote classes, populated at startup and read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct RemoteObjects {
    classes: Vec<Arc<SharedClass>>,
}

impl RemoteObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class. Class names are unique.
    pub fn add_class(&mut self, class: SharedClass) -> Result<Arc<SharedClass>> {
        if self.classes.iter().any(|c| c.name == class.name) {
            return Err(BindingError::Config(format!(
                "Class '{}' is already registered",
                class.name
            )));
        }

        info!(
            class = %class.name,
            methods = class.methods().len(),
            "Remote class registered"
        );
        let class = Arc::new(class);
        self.classes.push(Arc::clone(&class));
        Ok(class)
    }

    pub fn with_class(mut self, class: SharedClass) -> Result<Self> {
        self.add_class(class)?;
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Registry for RemoteObjects {
    fn classes(&self) -> Vec<Arc<SharedClass>> {
        self.classes.clone()
    }
}
