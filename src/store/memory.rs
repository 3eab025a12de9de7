use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use futures::future::{self, BoxFuture, FutureExt, Shared};

use super::{Listener, ModuleStore, Subscription};
use crate::error::InjectError;
use crate::module::{Module, Snapshot};

type Loader = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Module>> + Send + Sync>;
type PendingLoad = Shared<BoxFuture<'static, Result<(), InjectError>>>;

#[derive(Default)]
struct Inner {
    modules: HashMap<String, Snapshot>,
    loaders: HashMap<String, Loader>,
    pending: HashMap<String, PendingLoad>,
    listeners: HashMap<String, Vec<(usize, Listener)>>,
}

/// A thread-safe in-memory module store.
///
/// Modules are either inserted directly or registered as lazy loaders that
/// run on the first `load_module` call. Every change swaps in a fresh
/// snapshot and notifies that module's listeners.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    next_id: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a loaded module.
    pub fn insert_module(&self, name: impl Into<String>, module: Module) -> Snapshot {
        let name = name.into();
        let snapshot = module.into_snapshot();
        self.write().modules.insert(name.clone(), Arc::clone(&snapshot));
        self.notify(&name);
        snapshot
    }

    /// Update a loaded module using a function. The module gets a new
    /// snapshot even if `f` leaves it untouched.
    pub fn update_module<F>(&self, name: &str, f: F) -> Option<Snapshot>
    where
        F: FnOnce(&mut Module),
    {
        let snapshot = {
            let mut inner = self.write();
            let current = inner.modules.get(name)?;
            let mut module = Module::clone(current);
            f(&mut module);
            let snapshot = module.into_snapshot();
            inner.modules.insert(name.to_string(), Arc::clone(&snapshot));
            snapshot
        };
        self.notify(name);
        Some(snapshot)
    }

    /// Unload a module. A registered loader stays available for reloading.
    pub fn remove_module(&self, name: &str) -> Option<Snapshot> {
        let removed = self.write().modules.remove(name);
        if removed.is_some() {
            self.notify(name);
        }
        removed
    }

    /// Register a lazily-loadable module.
    pub fn register_lazy<F, Fut>(&self, name: impl Into<String>, loader: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Module>> + Send + 'static,
    {
        let loader: Loader = Arc::new(move || loader().boxed());
        self.write().loaders.insert(name.into(), loader);
    }

    /// Number of loads currently in flight.
    pub fn pending_loads(&self) -> usize {
        self.read().pending.len()
    }

    fn finish_load(&self, name: &str, result: anyhow::Result<Module>) -> Result<(), InjectError> {
        let outcome = {
            let mut inner = self.write();
            inner.pending.remove(name);
            match result {
                Ok(module) => {
                    inner.modules.insert(name.to_string(), module.into_snapshot());
                    Ok(())
                }
                Err(err) => Err(InjectError::load_failed(name, format!("{err:#}"))),
            }
        };
        if outcome.is_ok() {
            self.notify(name);
        }
        outcome
    }

    /// Notify all listeners of `name`. Listeners run without the lock held,
    /// so they may read the store.
    fn notify(&self, name: &str) {
        let listeners: Vec<Listener> = self
            .read()
            .listeners
            .get(name)
            .map(|l| l.iter().map(|(_, f)| Arc::clone(f)).collect())
            .unwrap_or_default();
        for listener in listeners {
            listener();
        }
    }
}

impl ModuleStore for MemoryStore {
    fn has_module(&self, name: &str) -> bool {
        self.read().modules.contains_key(name)
    }

    fn get_module(&self, name: &str) -> Option<Snapshot> {
        self.read().modules.get(name).cloned()
    }

    fn module_names(&self) -> Vec<String> {
        let inner = self.read();
        let mut names: Vec<String> = inner
            .modules
            .keys()
            .chain(inner.loaders.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn load_module(&self, name: &str) -> BoxFuture<'static, Result<(), InjectError>> {
        let mut inner = self.write();
        if inner.modules.contains_key(name) {
            return future::ready(Ok(())).boxed();
        }
        if let Some(pending) = inner.pending.get(name) {
            return pending.clone().boxed();
        }
        let Some(loader) = inner.loaders.get(name).cloned() else {
            return future::ready(Err(InjectError::UnknownModule(name.to_string()))).boxed();
        };

        let weak = Arc::downgrade(&self.inner);
        let next_id = Arc::clone(&self.next_id);
        let owned = name.to_string();
        let load = async move {
            let result = loader().await;
            match weak.upgrade() {
                Some(inner) => MemoryStore { inner, next_id }.finish_load(&owned, result),
                None => Err(InjectError::load_failed(owned, "store dropped during load")),
            }
        }
        .boxed()
        .shared();
        inner.pending.insert(name.to_string(), load.clone());
        load.boxed()
    }

    fn subscribe(&self, name: &str, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.write()
            .listeners
            .entry(name.to_string())
            .or_default()
            .push((id, listener));

        let inner: Weak<RwLock<Inner>> = Arc::downgrade(&self.inner);
        let name = name.to_string();
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                let mut inner = inner.write().unwrap_or_else(PoisonError::into_inner);
                if let Some(listeners) = inner.listeners.get_mut(&name) {
                    listeners.retain(|(listener_id, _)| *listener_id != id);
                    if listeners.is_empty() {
                        inner.listeners.remove(&name);
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn counter_module(count: i64) -> Module {
        Module::builder().state("count", count).build()
    }

    #[test]
    fn insert_and_get() {
        let store = MemoryStore::new();
        assert!(!store.has_module("counter"));

        let snapshot = store.insert_module("counter", counter_module(1));

        assert!(store.has_module("counter"));
        assert!(Arc::ptr_eq(&store.get_module("counter").unwrap(), &snapshot));
    }

    #[test]
    fn update_swaps_snapshot() {
        let store = MemoryStore::new();
        let before = store.insert_module("counter", counter_module(1));

        let after = store
            .update_module("counter", |m| {
                m.state.insert("count".into(), 2.into());
            })
            .unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.state["count"], 2.into());
        assert!(store.update_module("missing", |_| {}).is_none());
    }

    #[test]
    fn subscribe_notifies_until_dropped() {
        let store = MemoryStore::new();
        store.insert_module("counter", counter_module(0));

        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();
        let sub = store.subscribe(
            "counter",
            Arc::new(move || {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        store.update_module("counter", |_| {});
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        // Other modules do not notify this listener.
        store.insert_module("other", counter_module(0));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        drop(sub);
        store.update_module("counter", |_| {});
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn last_unsubscribe_drops_listener_entry() {
        let store = MemoryStore::new();
        let first = store.subscribe("counter", Arc::new(|| {}));
        let second = store.subscribe("counter", Arc::new(|| {}));

        drop(first);
        assert_eq!(store.read().listeners["counter"].len(), 1);

        second.unsubscribe();
        assert!(store.read().listeners.is_empty());
    }

    #[test]
    fn removed_module_reloads_through_loader() {
        let store = MemoryStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        store.register_lazy("user", move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            async { Ok(counter_module(1)) }
        });
        block_on(store.load_module("user")).unwrap();

        let notified = Arc::new(AtomicUsize::new(0));
        let notified_clone = notified.clone();
        let _sub = store.subscribe(
            "user",
            Arc::new(move || {
                notified_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(store.remove_module("user").is_some());
        assert!(!store.has_module("user"));
        assert_eq!(store.module_names(), vec!["user".to_string()]);
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        // Removing again is a no-op and stays quiet.
        assert!(store.remove_module("user").is_none());
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        block_on(store.load_module("user")).unwrap();
        assert!(store.has_module("user"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn lazy_load_inserts_module() {
        let store = MemoryStore::new();
        store.register_lazy("user", || async { Ok(counter_module(7)) });

        assert!(!store.has_module("user"));
        assert_eq!(store.module_names(), vec!["user".to_string()]);

        block_on(store.load_module("user")).unwrap();

        assert!(store.has_module("user"));
        assert_eq!(store.pending_loads(), 0);
    }

    #[test]
    fn concurrent_loads_share_one_loader_call() {
        let store = MemoryStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        store.register_lazy("user", move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            async { Ok(counter_module(1)) }
        });

        let first = store.load_module("user");
        let second = store.load_module("user");
        assert_eq!(store.pending_loads(), 1);

        block_on(async {
            first.await.unwrap();
            second.await.unwrap();
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_load_reports_reason() {
        let store = MemoryStore::new();
        store.register_lazy("user", || async { Err(anyhow::anyhow!("network")) });

        let err = block_on(store.load_module("user")).unwrap_err();

        assert_eq!(err, InjectError::load_failed("user", "network"));
        assert!(!store.has_module("user"));
        assert_eq!(store.pending_loads(), 0);
    }

    #[test]
    fn unknown_module_cannot_load() {
        let store = MemoryStore::new();
        let err = block_on(store.load_module("cart")).unwrap_err();
        assert_eq!(err, InjectError::UnknownModule("cart".into()));
    }
}
