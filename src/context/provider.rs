use std::cell::RefCell;
use std::sync::Arc;

use crate::store::ModuleStore;

// Thread-local stack of provided stores
thread_local! {
    static STORE_STACK: RefCell<Vec<Arc<dyn ModuleStore>>> = const { RefCell::new(Vec::new()) };
}

/// Scoped store provider.
///
/// Code running inside [`StoreProvider::scope`] sees the provided store as
/// the ambient one. Consumers created there pick it up ahead of their
/// injector's fallback accessor.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use modinject::context::StoreProvider;
/// use modinject::store::{MemoryStore, ModuleStore};
///
/// let store: Arc<dyn ModuleStore> = Arc::new(MemoryStore::new());
/// assert!(StoreProvider::current().is_none());
///
/// StoreProvider::scope(store, || {
///     assert!(StoreProvider::current().is_some());
/// });
/// // The store is no longer provided here
/// assert!(StoreProvider::current().is_none());
/// ```
pub struct StoreProvider;

impl StoreProvider {
    /// Run `f` with `store` as the current store.
    ///
    /// Scopes nest; the innermost one wins. The store is popped even if `f`
    /// panics.
    pub fn scope<F, R>(store: Arc<dyn ModuleStore>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        STORE_STACK.with(|stack| {
            stack.borrow_mut().push(store);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        STORE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// The innermost provided store on this thread, if any.
    pub fn current() -> Option<Arc<dyn ModuleStore>> {
        STORE_STACK.with(|stack| stack.borrow().last().cloned())
    }
}
