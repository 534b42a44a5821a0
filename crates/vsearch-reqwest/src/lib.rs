#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for the shared HTTP client and query transport.
pub const TRACING_TARGET_CLIENT: &str = "vsearch_reqwest::client";

/// Tracing target for datapoint upserts.
pub const TRACING_TARGET_UPSERT: &str = "vsearch_reqwest::upsert";

/// Tracing target for embedding requests.
pub const TRACING_TARGET_EMBEDDING: &str = "vsearch_reqwest::embedding";

mod client;
mod config;
mod embedding;
mod error;
mod query;
mod upsert;

pub use crate::client::ReqwestClient;
pub use crate::config::{
    DEFAULT_EMBEDDING_MODEL, DEFAULT_TIMEOUT_SECS, ReqwestConfig, VertexEmbedderConfig,
};
pub use crate::embedding::VertexEmbedder;
pub use crate::error::{Error, Result};
pub use crate::upsert::VertexIndexClient;
