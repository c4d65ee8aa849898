// Registry Port - source of shared classes and their method descriptors

use crate::domain::SharedClass;
use std::sync::Arc;

/// Owner of the remotely exposed classes
pub trait Registry: Send + Sync {
    /// Classes in registration order
    fn classes(&self) -> Vec<Arc<SharedClass>>;

    fn class(&self, name: &str) -> Option<Arc<SharedClass>> {
        self.classes().into_iter().find(|c| c.name == name)
    }
}
