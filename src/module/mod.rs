//! Module snapshots.
//!
//! A module groups `state`, derived `maps` and callable `actions` under one
//! name. The store hands out [`Snapshot`]s; a new snapshot reference means
//! something in the module changed.

mod flat;
mod module;

pub use flat::{FlatEntry, FlatModule};
pub use module::{Action, Module, ModuleBuilder, Snapshot};
