use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::FutureExt;

use super::tracker::{lock, ModuleTrack, SharedTrack};
use super::{InjectOptions, Spawn};
use crate::dependency::Dependency;
use crate::error::InjectError;
use crate::module::{FlatModule, Snapshot};
use crate::store::{Listener, ModuleStore, Subscription};

/// The value handed to a consumer for one module.
#[derive(Clone, Debug)]
pub enum Injected {
    Module(Snapshot),
    Flat(Arc<FlatModule>),
}

impl Injected {
    /// The snapshot, if this is not a flat view.
    pub fn as_module(&self) -> Option<&Snapshot> {
        match self {
            Injected::Module(m) => Some(m),
            Injected::Flat(_) => None,
        }
    }

    /// The flat view, if this is one.
    pub fn as_flat(&self) -> Option<&Arc<FlatModule>> {
        match self {
            Injected::Flat(f) => Some(f),
            Injected::Module(_) => None,
        }
    }

    /// Reference identity. A consumer only needs to recompute when this
    /// returns `false` against its previous value.
    pub fn ptr_eq(&self, other: &Injected) -> bool {
        match (self, other) {
            (Injected::Module(a), Injected::Module(b)) => Arc::ptr_eq(a, b),
            (Injected::Flat(a), Injected::Flat(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Result of one poll: the value (if any), whether the module is loading,
/// and the sticky error recorded for it.
#[derive(Clone, Debug)]
pub struct Injection {
    pub value: Option<Injected>,
    pub loading: bool,
    pub error: Option<InjectError>,
}

impl Injection {
    /// The snapshot, when not in flat mode.
    pub fn module(&self) -> Option<&Snapshot> {
        self.value.as_ref().and_then(Injected::as_module)
    }

    /// The merged view, in flat mode.
    pub fn flat(&self) -> Option<&Arc<FlatModule>> {
        self.value.as_ref().and_then(Injected::as_flat)
    }

    /// Split into `(value, loading, error)`.
    pub fn into_tuple(self) -> (Option<Injected>, bool, Option<InjectError>) {
        (self.value, self.loading, self.error)
    }
}

/// One observer of the store, such as a mounted UI component.
///
/// Holds a tracking record per module name it has polled. Records are
/// never shared between consumers and are dropped with the consumer; a
/// load that completes afterwards is ignored.
pub struct Consumer {
    store: Arc<dyn ModuleStore>,
    options: InjectOptions,
    spawner: Arc<dyn Spawn>,
    tracks: HashMap<String, SharedTrack>,
    on_settled: Option<Listener>,
}

impl Consumer {
    pub(crate) fn new(
        store: Arc<dyn ModuleStore>,
        options: InjectOptions,
        spawner: Arc<dyn Spawn>,
    ) -> Self {
        Self {
            store,
            options,
            spawner,
            tracks: HashMap::new(),
            on_settled: None,
        }
    }

    /// The store this consumer reads from.
    pub fn store(&self) -> &Arc<dyn ModuleStore> {
        &self.store
    }

    /// Called after a load this consumer triggered settles, successfully or
    /// not. Failures are not announced by the store, so a binding layer
    /// re-polls from here to pick up the error.
    pub fn on_settled<F>(&mut self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_settled = Some(Arc::new(f));
    }

    /// Subscribe to store changes of `name`.
    pub fn subscribe(&self, name: &str, listener: Listener) -> Subscription {
        self.store.subscribe(name, listener)
    }

    /// Poll module `name`.
    ///
    /// With `dep` given, a new snapshot whose declared values are shallowly
    /// equal to the previous one's is not surfaced: the previous reference
    /// is returned instead. Absent modules trigger a background load when
    /// the store knows how to provide them.
    pub fn inject(&mut self, name: &str, dep: Option<&Dependency>) -> Injection {
        let track = Arc::clone(
            self.tracks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(ModuleTrack::default()))),
        );

        let snapshot = if self.store.has_module(name) {
            self.select_loaded(name, dep, &track)
        } else {
            self.request_load(name, &track);
            None
        };

        let mut guard = lock(&track);
        let loading = guard
            .loading
            .unwrap_or_else(|| !self.store.has_module(name));
        let value = snapshot.map(|snapshot| {
            if self.options.flat {
                Injected::Flat(guard.flat(&snapshot))
            } else {
                Injected::Module(snapshot)
            }
        });
        Injection {
            value,
            loading,
            error: guard.error.clone(),
        }
    }

    /// Forget the error and loading state recorded for `name`, so the next
    /// poll may trigger a fresh load.
    pub fn reset(&mut self, name: &str) {
        if let Some(track) = self.tracks.get(name) {
            let mut track = lock(track);
            track.error = None;
            track.loading = None;
        }
    }

    fn select_loaded(
        &self,
        name: &str,
        dep: Option<&Dependency>,
        track: &SharedTrack,
    ) -> Option<Snapshot> {
        let mut track = lock(track);
        if track.loading == Some(true) {
            track.loading = Some(false);
        }
        track.error = None;
        let current = self.store.get_module(name)?;
        Some(track.select(current, dep))
    }

    fn request_load(&self, name: &str, track: &SharedTrack) {
        {
            let mut guard = lock(track);
            if guard.error.is_some() {
                return;
            }
            if guard.loading != Some(true) {
                guard.loading = Some(true);
            }
            if !self.store.module_names().iter().any(|known| known == name) {
                if self.options.unknown_module_error {
                    guard.error = Some(InjectError::UnknownModule(name.to_string()));
                    guard.loading = Some(false);
                }
                return;
            }
            if guard.in_flight {
                return;
            }
            guard.in_flight = true;
        }

        tracing::debug!("loading module {}", name);
        let load = self.store.load_module(name);
        let weak = Arc::downgrade(track);
        let on_settled = self.on_settled.clone();
        let module = name.to_string();
        self.spawner.spawn(
            async move {
                let result = load.await;
                let Some(track) = weak.upgrade() else {
                    tracing::debug!("module {} settled after its consumer was dropped", module);
                    return;
                };
                {
                    let mut track = lock(&track);
                    match result {
                        Ok(()) => tracing::debug!("module {} loaded", module),
                        Err(err) => {
                            tracing::warn!("module {} failed to load: {}", module, err);
                            track.error = Some(err);
                        }
                    }
                    track.loading = Some(false);
                    track.in_flight = false;
                }
                if let Some(on_settled) = on_settled {
                    on_settled();
                }
            }
            .boxed(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::create_inject;
    use crate::module::Module;
    use crate::store::MemoryStore;
    use futures::executor::block_on;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Holds spawned loads until the test drives them.
    #[derive(Clone, Default)]
    struct Deferred(Arc<Mutex<Vec<BoxFuture<'static, ()>>>>);

    impl Deferred {
        fn run_all(&self) {
            let tasks = std::mem::take(&mut *self.0.lock().unwrap());
            for task in tasks {
                block_on(task);
            }
        }
    }

    impl Spawn for Deferred {
        fn spawn(&self, task: BoxFuture<'static, ()>) {
            self.0.lock().unwrap().push(task);
        }
    }

    fn consumer(store: &MemoryStore, options: InjectOptions, spawner: Deferred) -> Consumer {
        let shared: Arc<dyn ModuleStore> = Arc::new(store.clone());
        create_inject(move || Arc::clone(&shared), options)
            .with_spawner(spawner)
            .consumer()
    }

    #[test]
    fn loaded_module_is_returned() {
        let store = MemoryStore::new();
        let snapshot = store.insert_module("counter", Module::builder().state("count", 1).build());
        let mut consumer = consumer(&store, InjectOptions::default(), Deferred::default());

        let injection = consumer.inject("counter", None);

        assert!(Arc::ptr_eq(injection.module().unwrap(), &snapshot));
        assert!(!injection.loading);
        assert!(injection.error.is_none());
    }

    #[test]
    fn flat_mode_reuses_view_while_suppressed() {
        let store = MemoryStore::new();
        store.insert_module("counter", Module::builder().state("count", 1).state("x", 0).build());
        let mut consumer = consumer(&store, InjectOptions::flat(), Deferred::default());
        let dep = Dependency::new().state(["count"]);

        let first = consumer.inject("counter", Some(&dep)).value.unwrap();
        store.update_module("counter", |m| {
            m.state.insert("x".into(), 1.into());
        });
        let second = consumer.inject("counter", Some(&dep)).value.unwrap();

        assert!(first.ptr_eq(&second));
        assert!(first.as_flat().unwrap().contains_key("count"));
    }

    #[test]
    fn sticky_error_until_reset() {
        let store = MemoryStore::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        store.register_lazy("user", move || {
            let attempt = attempts_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(anyhow::anyhow!("network"))
                } else {
                    Ok(Module::builder().state("name", "A").build())
                }
            }
        });
        let spawner = Deferred::default();
        let mut consumer = consumer(&store, InjectOptions::default(), spawner.clone());

        consumer.inject("user", None);
        spawner.run_all();

        let failed = consumer.inject("user", None);
        assert!(failed.value.is_none());
        assert!(!failed.loading);
        assert_eq!(failed.error, Some(InjectError::load_failed("user", "network")));
        spawner.run_all();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        consumer.reset("user");
        let retrying = consumer.inject("user", None);
        assert!(retrying.loading);
        assert!(retrying.error.is_none());
        spawner.run_all();

        let loaded = consumer.inject("user", None);
        assert!(loaded.module().is_some());
        assert!(!loaded.loading);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn error_clears_once_module_is_present() {
        let store = MemoryStore::new();
        store.register_lazy("user", || async { Err(anyhow::anyhow!("network")) });
        let spawner = Deferred::default();
        let mut consumer = consumer(&store, InjectOptions::default(), spawner.clone());

        consumer.inject("user", None);
        spawner.run_all();
        assert!(consumer.inject("user", None).error.is_some());

        store.insert_module("user", Module::default());
        let injection = consumer.inject("user", None);
        assert!(injection.module().is_some());
        assert!(injection.error.is_none());
    }

    #[test]
    fn unknown_module_error_option() {
        let store = MemoryStore::new();
        let options = InjectOptions {
            unknown_module_error: true,
            ..InjectOptions::default()
        };
        let spawner = Deferred::default();
        let mut consumer = consumer(&store, options, spawner.clone());

        let (value, loading, error) = consumer.inject("cart", None).into_tuple();

        assert!(value.is_none());
        assert!(!loading);
        assert_eq!(error, Some(InjectError::UnknownModule("cart".into())));
        assert!(spawner.0.lock().unwrap().is_empty());
    }

    #[test]
    fn on_settled_fires_after_load() {
        let store = MemoryStore::new();
        store.register_lazy("user", || async { Ok(Module::default()) });
        let spawner = Deferred::default();
        let mut consumer = consumer(&store, InjectOptions::default(), spawner.clone());
        let settled = Arc::new(AtomicUsize::new(0));
        let settled_clone = settled.clone();
        consumer.on_settled(move || {
            settled_clone.fetch_add(1, Ordering::SeqCst);
        });

        consumer.inject("user", None);
        assert_eq!(settled.load(Ordering::SeqCst), 0);
        spawner.run_all();

        assert_eq!(settled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn repeated_polls_share_one_completion() {
        let store = MemoryStore::new();
        store.register_lazy("user", || async { Ok(Module::default()) });
        let spawner = Deferred::default();
        let mut consumer = consumer(&store, InjectOptions::default(), spawner.clone());
        let settled = Arc::new(AtomicUsize::new(0));
        let settled_clone = settled.clone();
        consumer.on_settled(move || {
            settled_clone.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..3 {
            assert!(consumer.inject("user", None).loading);
        }
        assert_eq!(spawner.0.lock().unwrap().len(), 1);
        spawner.run_all();

        assert_eq!(settled.load(Ordering::SeqCst), 1);
        assert!(consumer.inject("user", None).module().is_some());
    }

    #[test]
    fn dropped_consumer_ignores_completion() {
        let store = MemoryStore::new();
        store.register_lazy("user", || async { Err(anyhow::anyhow!("network")) });
        let spawner = Deferred::default();
        let settled = Arc::new(AtomicUsize::new(0));
        {
            let mut consumer = consumer(&store, InjectOptions::default(), spawner.clone());
            let settled_clone = settled.clone();
            consumer.on_settled(move || {
                settled_clone.fetch_add(1, Ordering::SeqCst);
            });
            consumer.inject("user", None);
        }

        spawner.run_all();

        assert_eq!(settled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn records_are_per_consumer() {
        let store = MemoryStore::new();
        store.insert_module("counter", Module::builder().state("count", 1).state("x", 0).build());
        let dep = Dependency::new().state(["count"]);
        let mut a = consumer(&store, InjectOptions::default(), Deferred::default());
        let first = a.inject("counter", Some(&dep));

        let updated = store
            .update_module("counter", |m| {
                m.state.insert("x".into(), 1.into());
            })
            .unwrap();
        let mut b = consumer(&store, InjectOptions::default(), Deferred::default());

        assert!(Arc::ptr_eq(a.inject("counter", Some(&dep)).module().unwrap(), first.module().unwrap()));
        assert!(Arc::ptr_eq(b.inject("counter", Some(&dep)).module().unwrap(), &updated));
    }
}
