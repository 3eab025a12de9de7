use std::sync::Arc;

use super::{Consumer, InjectOptions, Spawn, TokioSpawner};
use crate::context::StoreProvider;
use crate::store::ModuleStore;

/// Fallback used when no store is passed in or provided.
pub type StoreAccessor = Arc<dyn Fn() -> Arc<dyn ModuleStore> + Send + Sync>;

/// Factory for [`Consumer`]s sharing one configuration.
#[derive(Clone)]
pub struct Injector {
    accessor: StoreAccessor,
    options: InjectOptions,
    spawner: Arc<dyn Spawn>,
}

/// Create an injector.
///
/// `accessor` supplies the store for consumers that are given none
/// explicitly and are not inside a [`StoreProvider`] scope.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use modinject::{create_inject, InjectOptions, MemoryStore, Module, ModuleStore};
///
/// let store = MemoryStore::new();
/// store.insert_module("counter", Module::builder().state("count", 1).build());
///
/// let shared: Arc<dyn ModuleStore> = Arc::new(store);
/// let injector = create_inject(move || Arc::clone(&shared), InjectOptions::default());
///
/// let mut consumer = injector.consumer();
/// let (value, loading, error) = consumer.inject("counter", None).into_tuple();
/// assert!(value.is_some());
/// assert!(!loading);
/// assert!(error.is_none());
/// ```
pub fn create_inject<F>(accessor: F, options: InjectOptions) -> Injector
where
    F: Fn() -> Arc<dyn ModuleStore> + Send + Sync + 'static,
{
    Injector {
        accessor: Arc::new(accessor),
        options,
        spawner: Arc::new(TokioSpawner::default()),
    }
}

impl Injector {
    /// Replace the executor used for background loads.
    pub fn with_spawner<S>(mut self, spawner: S) -> Self
    where
        S: Spawn + 'static,
    {
        self.spawner = Arc::new(spawner);
        self
    }

    /// A consumer bound to the provided store, or the accessor's.
    pub fn consumer(&self) -> Consumer {
        self.consumer_with(None)
    }

    /// A consumer bound to `store` if given, else the provided store, else
    /// the accessor's.
    pub fn consumer_with(&self, store: Option<Arc<dyn ModuleStore>>) -> Consumer {
        let store = store
            .or_else(StoreProvider::current)
            .unwrap_or_else(|| (self.accessor)());
        Consumer::new(store, self.options.clone(), Arc::clone(&self.spawner))
    }
}
