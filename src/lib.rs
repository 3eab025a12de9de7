//! # Modinject
//!
//! Named, lazily-loadable store modules with dependency-aware change
//! detection.
//!
//! A store holds modules, each with `state`, derived `maps` and `actions`.
//! Consumers (typically UI components) poll a module by name whenever the
//! store signals a change and get back:
//!
//! - the module snapshot, or nothing while it is not loaded
//! - whether it is loading
//! - the sticky error of its last failed load
//!
//! A consumer may declare which state paths, state getters and maps it reads.
//! When a new snapshot leaves those values shallowly unchanged, the consumer
//! keeps receiving the previous snapshot reference, so it can skip work by
//! comparing references alone.
//!
//! ## Layers
//!
//! - [`value`] - dynamic values and nested path lookup
//! - [`module`] - module snapshots and their flat presentation
//! - [`dependency`] - dependency declarations and their resolution
//! - [`store`] - the store capability and an in-memory store
//! - [`context`] - scoped store provision
//! - [`inject`] - per-consumer tracking, loading and error orchestration

pub mod context;
pub mod dependency;
pub mod error;
pub mod inject;
pub mod module;
pub mod store;
pub mod value;

// Re-export main types for convenience
pub use dependency::{resolve, values_equal, Dependency};
pub use error::InjectError;
pub use inject::{create_inject, Consumer, InjectOptions, Injected, Injection, Injector};
pub use module::{Module, Snapshot};
pub use store::{MemoryStore, ModuleStore, Subscription};
pub use value::{get_value_from_state, reset_path_parser, set_path_parser, Path, Value};
