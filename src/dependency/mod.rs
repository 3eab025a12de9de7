//! Dependency declarations and their resolution against a module.

mod dependency;

pub use dependency::{resolve, values_equal, Dependency, Getter, StateDep};
