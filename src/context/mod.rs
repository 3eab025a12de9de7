//! Ambient store context.
//!
//! Provides a thread-local scope through which a store can be handed to
//! consumers without threading it through every call.

mod provider;

pub use provider::StoreProvider;
