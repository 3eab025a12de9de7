use serde::Deserialize;

/// Behaviour switches for an [`Injector`](super::Injector).
///
/// Deserializable so it can sit inside an application's own config:
///
/// ```
/// use modinject::InjectOptions;
///
/// let opts: InjectOptions = serde_json::from_str(r#"{ "flat": true }"#).unwrap();
/// assert!(opts.flat);
/// assert!(!opts.unknown_module_error);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InjectOptions {
    /// Present modules as one merged state/actions/maps view.
    pub flat: bool,
    /// Report a module the store cannot provide as an error instead of
    /// leaving it loading forever.
    pub unknown_module_error: bool,
}

impl InjectOptions {
    pub fn flat() -> Self {
        Self {
            flat: true,
            ..Self::default()
        }
    }
}
