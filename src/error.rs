//! Errors surfaced through an injection's error slot.

use thiserror::Error;

/// Failures recorded against a module name.
///
/// Errors are cloned into every poll result while they are sticky, so the
/// variants carry owned, comparable data rather than boxed sources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InjectError {
    #[error("failed to load module `{module}`: {reason}")]
    LoadFailed { module: String, reason: String },

    /// Only produced when `InjectOptions::unknown_module_error` is set.
    #[error("module `{0}` is not known to the store")]
    UnknownModule(String),
}

impl InjectError {
    /// A load failure for `module` with a printable reason.
    pub fn load_failed(module: impl Into<String>, reason: impl ToString) -> Self {
        InjectError::LoadFailed {
            module: module.into(),
            reason: reason.to_string(),
        }
    }

    /// Name of the module the error was recorded for.
    pub fn module(&self) -> &str {
        match self {
            InjectError::LoadFailed { module, .. } => module,
            InjectError::UnknownModule(module) => module,
        }
    }
}
