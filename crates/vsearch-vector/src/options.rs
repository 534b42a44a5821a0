//! Per-call options of the adapters.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};
use vsearch_core::{Error, Restriction};

use crate::policy::FailurePolicy;

/// Number of neighbours requested when the caller does not say.
pub const DEFAULT_K: u32 = 10;

/// Largest neighbour count a single query may request.
pub const MAX_K: u32 = 1000;

fn default_k() -> u32 {
    DEFAULT_K
}

/// Options for one indexing call.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerOptions {
    /// Overrides the configured failure policy for this call.
    #[serde(default)]
    pub failure_policy: Option<FailurePolicy>,
}

impl IndexerOptions {
    /// Sets the failure policy for this call.
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = Some(failure_policy);
        self
    }
}

/// Options for one retrieval call.
#[must_use]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RetrieverOptions {
    /// Number of nearest neighbours to request.
    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_k")]
    pub k: u32,

    /// Token restricts applied to the query.
    #[serde(default)]
    pub restricts: Vec<Restriction>,

    /// Overrides the configured failure policy for this call.
    #[serde(default)]
    pub failure_policy: Option<FailurePolicy>,
}

impl Default for RetrieverOptions {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            restricts: Vec::new(),
            failure_policy: None,
        }
    }
}

impl RetrieverOptions {
    /// Creates options requesting `k` neighbours.
    pub fn with_k(k: u32) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    /// Adds a token restrict to the query.
    pub fn with_restrict(mut self, restrict: Restriction) -> Self {
        self.restricts.push(restrict);
        self
    }

    /// Sets the failure policy for this call.
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = Some(failure_policy);
        self
    }
}

/// Converts validation failures into a configuration error.
pub(crate) fn validation_error(context: &str, errors: ValidationErrors) -> Error {
    Error::configuration()
        .with_message(format!("{context}: {errors}"))
        .with_source(errors)
}
