use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::dependency::{resolve, values_equal, Dependency};
use crate::error::InjectError;
use crate::module::{FlatModule, Snapshot};
use crate::value::Value;

/// Resolved dependency values for the tracked snapshot.
struct DepCache {
    dep: Dependency,
    values: Vec<Value>,
}

/// What one consumer knows about one module name.
#[derive(Default)]
pub(crate) struct ModuleTrack {
    last: Option<Snapshot>,
    deps: Option<DepCache>,
    flat: Option<(Snapshot, Arc<FlatModule>)>,
    /// `None` until a poll or a load completion sets it.
    pub(crate) loading: Option<bool>,
    /// A load started by this record has not settled yet.
    pub(crate) in_flight: bool,
    pub(crate) error: Option<InjectError>,
}

pub(crate) type SharedTrack = Arc<Mutex<ModuleTrack>>;

pub(crate) fn lock(track: &SharedTrack) -> MutexGuard<'_, ModuleTrack> {
    track.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ModuleTrack {
    /// Decide which snapshot the consumer sees given the store's `current`.
    ///
    /// Returns the previously tracked reference when `current` is the same
    /// object, or when `dep` resolves to shallowly equal values on both.
    pub(crate) fn select(&mut self, current: Snapshot, dep: Option<&Dependency>) -> Snapshot {
        if let Some(last) = self.last.clone() {
            if Arc::ptr_eq(&last, &current) {
                return last;
            }
            if let Some(dep) = dep {
                let next = resolve(&current, dep);
                if values_equal(self.last_values(&last, dep), &next) {
                    tracing::trace!("dependencies unchanged, keeping previous snapshot");
                    return last;
                }
                self.deps = Some(DepCache {
                    dep: dep.clone(),
                    values: next,
                });
                self.last = Some(Arc::clone(&current));
                return current;
            }
        }
        self.deps = None;
        self.last = Some(Arc::clone(&current));
        current
    }

    /// Values of `dep` for the tracked snapshot, reusing the cache when it
    /// was computed for the same declaration.
    fn last_values(&mut self, last: &Snapshot, dep: &Dependency) -> &[Value] {
        let fresh = !matches!(&self.deps, Some(cache) if cache.dep.same_declaration(dep));
        if fresh {
            self.deps = Some(DepCache {
                dep: dep.clone(),
                values: resolve(last, dep),
            });
        }
        self.deps.as_ref().map_or(&[], |cache| cache.values.as_slice())
    }

    /// Flat view of `snapshot`, rebuilt only when the reference changes.
    pub(crate) fn flat(&mut self, snapshot: &Snapshot) -> Arc<FlatModule> {
        if let Some((source, flat)) = &self.flat {
            if Arc::ptr_eq(source, snapshot) {
                return Arc::clone(flat);
            }
        }
        let flat = Arc::new(snapshot.flatten());
        self.flat = Some((Arc::clone(snapshot), Arc::clone(&flat)));
        flat
    }
}
