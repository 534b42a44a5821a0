#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for the indexer adapter.
pub const TRACING_TARGET_INDEXER: &str = "vsearch_vector::indexer";

/// Tracing target for the retriever adapter.
pub const TRACING_TARGET_RETRIEVER: &str = "vsearch_vector::retriever";

/// Tracing target for service construction.
pub const TRACING_TARGET_SERVICE: &str = "vsearch_vector::service";

mod config;
mod indexer;
mod options;
mod policy;
mod retriever;
mod service;

pub use crate::config::{DEFAULT_DOCUMENT_ID_FIELD, VectorSearchConfig, VectorSearchOptions};
pub use crate::indexer::Indexer;
pub use crate::options::{DEFAULT_K, IndexerOptions, MAX_K, RetrieverOptions};
pub use crate::policy::FailurePolicy;
pub use crate::retriever::Retriever;
pub use crate::service::{Collaborators, VectorSearch};
