use std::fmt;
use std::sync::Arc;

use crate::module::Module;
use crate::value::{get_value_from_state, Map, Path, Value};

/// Custom projection of a module's state.
pub type Getter = Arc<dyn Fn(&Map) -> Value + Send + Sync>;

/// One declared dependency on the `state` slice.
#[derive(Clone)]
pub enum StateDep {
    Path(Path),
    Getter(Getter),
}

impl fmt::Debug for StateDep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateDep::Path(path) => f.debug_tuple("Path").field(path).finish(),
            StateDep::Getter(_) => f.write_str("Getter(..)"),
        }
    }
}

/// The parts of a module a consumer cares about.
///
/// An absent slice contributes nothing. Passing a declaration at all turns
/// on suppression: a declaration with no entries never reports a change.
#[derive(Clone, Debug, Default)]
pub struct Dependency {
    pub state: Option<Vec<StateDep>>,
    pub maps: Option<Vec<Path>>,
}

impl Dependency {
    /// An empty declaration with both slices absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Depend on nothing: the first snapshot seen is kept for good.
    pub fn none() -> Self {
        Self {
            state: Some(Vec::new()),
            maps: Some(Vec::new()),
        }
    }

    /// Depend on the state value at `path`.
    pub fn state(mut self, path: impl Into<Path>) -> Self {
        self.state
            .get_or_insert_with(Vec::new)
            .push(StateDep::Path(path.into()));
        self
    }

    /// Depend on a custom projection of the state.
    pub fn state_with<F>(mut self, getter: F) -> Self
    where
        F: Fn(&Map) -> Value + Send + Sync + 'static,
    {
        self.state
            .get_or_insert_with(Vec::new)
            .push(StateDep::Getter(Arc::new(getter)));
        self
    }

    /// Depend on the maps value at `path`.
    pub fn maps(mut self, path: impl Into<Path>) -> Self {
        self.maps.get_or_insert_with(Vec::new).push(path.into());
        self
    }

    /// Whether both declarations resolve identically for any module.
    /// Getters only match when they are the same `Arc`.
    pub fn same_declaration(&self, other: &Dependency) -> bool {
        let state_eq = match (&self.state, &other.state) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|pair| match pair {
                        (StateDep::Path(x), StateDep::Path(y)) => x == y,
                        (StateDep::Getter(x), StateDep::Getter(y)) => Arc::ptr_eq(x, y),
                        _ => false,
                    })
            }
            _ => false,
        };
        state_eq && self.maps == other.maps
    }
}

/// Resolve `dep` against `module`: state entries first, then maps entries,
/// each in declaration order.
pub fn resolve(module: &Module, dep: &Dependency) -> Vec<Value> {
    let state_len = dep.state.as_ref().map_or(0, Vec::len);
    let maps_len = dep.maps.as_ref().map_or(0, Vec::len);
    let mut values = Vec::with_capacity(state_len + maps_len);

    for entry in dep.state.iter().flatten() {
        values.push(match entry {
            StateDep::Path(path) => get_value_from_state(&module.state, path),
            StateDep::Getter(getter) => getter(&module.state),
        });
    }
    for path in dep.maps.iter().flatten() {
        values.push(get_value_from_state(&module.maps, path));
    }
    values
}

/// Ordered, shallow, element-wise comparison of two resolved lists.
pub fn values_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same(y))
}
