#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for document store operations.
pub const TRACING_TARGET_STORE: &str = "vsearch_core::store";

mod auth;
mod document;
mod embedder;
mod error;
mod index;
mod query;
mod store;

#[cfg(feature = "test-utils")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

pub use auth::{AccessToken, StaticTokenProvider, TokenProvider};
pub use document::{Document, RESTRICTS_METADATA_KEY};
pub use embedder::Embedder;
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use index::{
    IndexDatapoint, IndexResource, IndexService, Restriction, UpsertDatapointsRequest,
};
pub use query::{
    FindNeighborsRequest, FindNeighborsResponse, NearestNeighbors, Neighbor, NeighborDatapoint,
    NeighborQuery, NeighborSearch, QUERY_DATAPOINT_ID, QueryDatapoint,
};
pub use store::{DocumentIndexer, DocumentRetriever, InMemoryDocumentStore};
