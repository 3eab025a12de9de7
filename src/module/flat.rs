use std::collections::BTreeMap;

use super::{Action, Module};
use crate::value::Value;

/// One entry of a flattened module.
#[derive(Clone, Debug)]
pub enum FlatEntry {
    Value(Value),
    Action(Action),
}

impl FlatEntry {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FlatEntry::Value(v) => Some(v),
            FlatEntry::Action(_) => None,
        }
    }

    pub fn as_action(&self) -> Option<&Action> {
        match self {
            FlatEntry::Action(a) => Some(a),
            FlatEntry::Value(_) => None,
        }
    }
}

/// State, actions and maps merged into a single keyed view.
pub type FlatModule = BTreeMap<String, FlatEntry>;

impl Module {
    /// Merge the three slices in order state, actions, maps. On a key
    /// collision the later slice wins, so derived values shadow state.
    pub fn flatten(&self) -> FlatModule {
        let mut flat = FlatModule::new();
        for (key, value) in &self.state {
            flat.insert(key.clone(), FlatEntry::Value(value.clone()));
        }
        for (key, action) in &self.actions {
            flat.insert(key.clone(), FlatEntry::Action(action.clone()));
        }
        for (key, value) in &self.maps {
            flat.insert(key.clone(), FlatEntry::Value(value.clone()));
        }
        flat
    }
}
