//! Module injection: what a consumer sees of a module on each poll.
//!
//! An [`Injector`] hands out [`Consumer`]s. Each consumer tracks, per module
//! name, the last snapshot it returned, the resolved dependency values for
//! it, and the loading and error state of lazy loads it started.

mod consumer;
mod injector;
mod options;
mod spawner;
mod tracker;

pub use consumer::{Consumer, Injected, Injection};
pub use injector::{create_inject, Injector, StoreAccessor};
pub use options::InjectOptions;
pub use spawner::{Spawn, TokioSpawner};
