//! Dynamic module data.
//!
//! Module state and derived values are trees of [`Value`]s. Composite values
//! are reference-counted, so cloning is cheap and two values can be compared
//! by identity with [`Value::same`].

mod path;
mod value;

pub use path::{get_value_from_state, reset_path_parser, set_path_parser, Path, PathParser, PathSegment};
pub use value::{Map, Value};
