//! Loaded plugin instances.
//!
//! The host never knows the concrete type behind a plugin. It sees a
//! [`PluginInstance`] that can report which operations it provides, which
//! is all the capability check needs. Callers that know the concrete type
//! downcast the handle they get back from the registry.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A materialized plugin.
pub trait PluginInstance: Any + Send + Sync {
    /// Names of the operations this instance provides.
    fn operations(&self) -> Vec<String>;

    /// Whether the instance provides `operation`.
    fn provides(&self, operation: &str) -> bool {
        self.operations().iter().any(|op| op == operation)
    }
}

/// Shared handle to a loaded plugin instance.
pub type InstanceHandle = Arc<dyn PluginInstance>;

impl dyn PluginInstance {
    /// Borrow the instance as its concrete type.
    #[must_use]
    pub fn downcast_ref<T: PluginInstance>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }

    /// Whether the instance is of concrete type `T`.
    #[must_use]
    pub fn is<T: PluginInstance>(&self) -> bool {
        let any: &dyn Any = self;
        any.is::<T>()
    }
}

impl fmt::Debug for dyn PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginInstance")
            .field("operations", &self.operations())
            .finish_non_exhaustive()
    }
}

/// Convert a handle into an `Arc` of its concrete type.
///
/// Returns `None` if the instance is not a `T`.
#[must_use]
pub fn downcast_arc<T: PluginInstance>(handle: InstanceHandle) -> Option<Arc<T>> {
    let any: Arc<dyn Any + Send + Sync> = handle;
    any.downcast::<T>().ok()
}
