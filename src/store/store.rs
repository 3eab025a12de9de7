use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::InjectError;
use crate::module::Snapshot;

/// Callback invoked when a module changes.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// What the injection layer needs from a store.
///
/// Implementations own module registration, action dispatch and the
/// lifecycle of lazily-loaded modules. `load_module` must be safe to call
/// repeatedly for the same name while a load is in flight.
pub trait ModuleStore: Send + Sync {
    /// Whether `name` is currently loaded.
    fn has_module(&self, name: &str) -> bool;

    /// The current snapshot of `name`, if loaded.
    fn get_module(&self, name: &str) -> Option<Snapshot>;

    /// Every module name the store knows how to provide, loaded or not.
    fn module_names(&self) -> Vec<String>;

    /// Start (or join) the load of a lazily-loadable module.
    fn load_module(&self, name: &str) -> BoxFuture<'static, Result<(), InjectError>>;

    /// Register `listener` for changes of `name`. Dropping the returned
    /// guard unsubscribes.
    fn subscribe(&self, name: &str, listener: Listener) -> Subscription;
}

/// RAII guard for a store subscription.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap the closure that cancels the registration.
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancel now instead of on drop.
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
