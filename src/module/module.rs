use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::value::{Map, Value};

/// Shared reference to a module's current contents.
///
/// Identity (`Arc::ptr_eq`) is the change signal: the store swaps in a new
/// `Arc` on every transition of that module.
pub type Snapshot = Arc<Module>;

/// A callable operation exposed by a module.
#[derive(Clone)]
pub struct Action(Arc<dyn Fn(&[Value]) -> Value + Send + Sync>);

impl Action {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }

    /// Whether both handles point at the same function.
    pub fn same(&self, other: &Action) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action(..)")
    }
}

/// The contents of one store module.
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub state: Map,
    pub maps: Map,
    pub actions: BTreeMap<String, Action>,
}

impl Module {
    pub fn builder() -> ModuleBuilder {
        ModuleBuilder::default()
    }

    pub fn into_snapshot(self) -> Snapshot {
        Arc::new(self)
    }
}

/// Fluent construction of a [`Module`].
#[derive(Default)]
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn state(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.module.state.insert(key.into(), value.into());
        self
    }

    /// Replace the whole state slice, typically from a `serde_json` object.
    pub fn state_from(mut self, value: impl Into<Value>) -> Self {
        if let Value::Map(map) = value.into() {
            self.module.state = Arc::unwrap_or_clone(map);
        }
        self
    }

    pub fn map(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.module.maps.insert(key.into(), value.into());
        self
    }

    pub fn action<F>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.module.actions.insert(key.into(), Action::new(f));
        self
    }

    pub fn build(self) -> Module {
        self.module
    }

    pub fn snapshot(self) -> Snapshot {
        Arc::new(self.module)
    }
}
