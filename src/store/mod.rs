//! The store capability consumed by injection, plus an in-memory store.
//!
//! Stores provide named modules, lazy loading and per-module change
//! notification. [`MemoryStore`] is a complete implementation used by the
//! tests and demos.

mod memory;
mod store;

pub use memory::MemoryStore;
pub use store::{Listener, ModuleStore, Subscription};
