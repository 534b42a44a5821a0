//! What an adapter does with a collaborator failure.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use vsearch_core::{Error, Result};

/// Failure handling applied after an adapter error has been logged.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailurePolicy {
    /// Report success with an empty result.
    #[default]
    Swallow,
    /// Return the error to the caller.
    Propagate,
}

impl FailurePolicy {
    /// Returns the per-call override if present, otherwise `self`.
    pub fn or_override(self, call: Option<FailurePolicy>) -> Self {
        call.unwrap_or(self)
    }

    /// Turns an already logged error into the caller-visible result.
    pub fn recover<T: Default>(self, error: Error) -> Result<T> {
        match self {
            Self::Swallow => Ok(T::default()),
            Self::Propagate => Err(error),
        }
    }
}
