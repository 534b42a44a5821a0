//! Mock collaborators for testing.
//!
//! Every mock records how often it was called so tests can assert on the
//! calls a flow made, and each one can be switched into a failing mode.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! vsearch-core = { version = "...", features = ["test-utils"] }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use url::Url;

use crate::auth::{AccessToken, TokenProvider};
use crate::document::Document;
use crate::embedder::Embedder;
use crate::error::{Error, Result};
use crate::index::{IndexDatapoint, IndexResource, IndexService};
use crate::query::{
    FindNeighborsRequest, FindNeighborsResponse, NearestNeighbors, Neighbor, NeighborDatapoint,
    NeighborSearch,
};
use crate::store::{DocumentIndexer, DocumentRetriever, InMemoryDocumentStore};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Deterministic embedder deriving vectors from content bytes.
#[derive(Debug)]
pub struct MockEmbedder {
    dimensions: usize,
    fixed: Option<Vec<f32>>,
    failing: bool,
    misaligned: bool,
    calls: AtomicUsize,
}

impl MockEmbedder {
    /// Creates an embedder producing vectors of `dimensions` components.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fixed: None,
            failing: false,
            misaligned: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Creates an embedder returning `vector` for every input.
    pub fn fixed(vector: Vec<f32>) -> Self {
        Self {
            fixed: Some(vector),
            ..Self::new(0)
        }
    }

    /// Makes every call fail with an embedding error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Makes batch calls return one vector fewer than requested.
    pub fn misaligned(mut self) -> Self {
        self.misaligned = true;
        self
    }

    /// Returns the number of `embed` and `embed_many` calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the vector this embedder produces for `content`.
    pub fn vector_for(&self, content: &str) -> Vec<f32> {
        if let Some(vector) = &self.fixed {
            return vector.clone();
        }

        let seed = content
            .bytes()
            .fold(17u32, |acc, byte| acc.wrapping_mul(31).wrapping_add(u32::from(byte)));

        (0..self.dimensions)
            .map(|i| {
                let mixed = seed.wrapping_mul(i as u32 + 1).rotate_left(i as u32 % 32);
                (mixed % 2000) as f32 / 1000.0 - 1.0
            })
            .collect()
    }

    fn check(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(Error::embedding().with_message("mock embedder failure"));
        }
        Ok(())
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(8)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, document: &Document) -> Result<Vec<f32>> {
        self.check()?;
        Ok(self.vector_for(&document.content))
    }

    async fn embed_many(&self, documents: &[Document]) -> Result<Vec<Vec<f32>>> {
        self.check()?;
        let mut vectors: Vec<_> = documents
            .iter()
            .map(|document| self.vector_for(&document.content))
            .collect();
        if self.misaligned {
            vectors.pop();
        }
        Ok(vectors)
    }
}

/// Index service recording every upsert call.
#[derive(Debug, Default)]
pub struct MockIndexService {
    failing: bool,
    upserts: Mutex<Vec<(IndexResource, Vec<IndexDatapoint>)>>,
}

impl MockIndexService {
    /// Creates a service accepting every upsert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every upsert fail with a transport error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Returns the number of upsert calls, failed ones included.
    pub fn calls(&self) -> usize {
        lock(&self.upserts).len()
    }

    /// Returns every upsert call in order.
    pub fn upserts(&self) -> Vec<(IndexResource, Vec<IndexDatapoint>)> {
        lock(&self.upserts).clone()
    }
}

#[async_trait]
impl IndexService for MockIndexService {
    async fn upsert_datapoints(
        &self,
        index: &IndexResource,
        datapoints: &[IndexDatapoint],
    ) -> Result<()> {
        lock(&self.upserts).push((index.clone(), datapoints.to_vec()));
        if self.failing {
            return Err(Error::transport().with_message("503 Service Unavailable"));
        }
        Ok(())
    }
}

/// Neighbour search answering with a fixed ranked list of identifiers.
#[derive(Debug, Default)]
pub struct MockNeighborSearch {
    neighbors: Vec<String>,
    failing: bool,
    requests: Mutex<Vec<(Url, FindNeighborsRequest)>>,
}

impl MockNeighborSearch {
    /// Creates a search returning `ids`, best match first.
    pub fn with_neighbors(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            neighbors: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Makes every call fail with a transport error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Returns the number of calls, failed ones included.
    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Returns the endpoint and body of every call in order.
    pub fn requests(&self) -> Vec<(Url, FindNeighborsRequest)> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl NeighborSearch for MockNeighborSearch {
    async fn find_neighbors(
        &self,
        endpoint: &Url,
        _token: &AccessToken,
        request: &FindNeighborsRequest,
    ) -> Result<FindNeighborsResponse> {
        lock(&self.requests).push((endpoint.clone(), request.clone()));
        if self.failing {
            return Err(Error::transport().with_message("500 Internal Server Error"));
        }

        let limit = request
            .queries
            .first()
            .map_or(0, |query| query.neighbor_count as usize);
        let neighbors = self
            .neighbors
            .iter()
            .take(limit)
            .enumerate()
            .map(|(rank, id)| Neighbor {
                datapoint: NeighborDatapoint {
                    datapoint_id: id.clone(),
                },
                distance: Some(rank as f64 / 10.0),
            })
            .collect();

        Ok(FindNeighborsResponse {
            queries: vec![NearestNeighbors { neighbors }],
        })
    }
}

/// Document store counting calls around an [`InMemoryDocumentStore`].
#[derive(Debug)]
pub struct MockDocumentStore {
    inner: InMemoryDocumentStore,
    failing: bool,
    reversed: bool,
    index_calls: AtomicUsize,
    retrieve_calls: AtomicUsize,
}

impl MockDocumentStore {
    /// Creates an empty store keyed by `id_field`.
    pub fn new(id_field: impl AsRef<str>) -> Self {
        Self {
            inner: InMemoryDocumentStore::new(id_field),
            failing: false,
            reversed: false,
            index_calls: AtomicUsize::new(0),
            retrieve_calls: AtomicUsize::new(0),
        }
    }

    /// Makes every call fail with a store error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Returns retrieved documents in reverse of the requested order.
    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &InMemoryDocumentStore {
        &self.inner
    }

    /// Returns the number of `index_documents` calls.
    pub fn index_calls(&self) -> usize {
        self.index_calls.load(Ordering::SeqCst)
    }

    /// Returns the number of `retrieve_documents` calls.
    pub fn retrieve_calls(&self) -> usize {
        self.retrieve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentIndexer for MockDocumentStore {
    async fn index_documents(&self, documents: &[Document]) -> Result<()> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(Error::store().with_message("mock store failure"));
        }
        self.inner.index_documents(documents).await
    }
}

#[async_trait]
impl DocumentRetriever for MockDocumentStore {
    async fn retrieve_documents(&self, ids: &[String]) -> Result<Vec<Document>> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(Error::store().with_message("mock store failure"));
        }
        let mut documents = self.inner.retrieve_documents(ids).await?;
        if self.reversed {
            documents.reverse();
        }
        Ok(documents)
    }
}

/// Token provider returning a fixed token or failing.
#[derive(Debug)]
pub struct MockTokenProvider {
    token: Option<String>,
    calls: AtomicUsize,
}

impl MockTokenProvider {
    /// Creates a provider returning `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Creates a provider whose every call fails with an authentication error.
    pub fn failing() -> Self {
        Self {
            token: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of token requests.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTokenProvider {
    fn default() -> Self {
        Self::new("mock-token")
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn access_token(&self) -> Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.token
            .as_deref()
            .map(AccessToken::new)
            .ok_or_else(|| Error::authentication().with_message("mock token refresh failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_is_deterministic() {
        let embedder = MockEmbedder::new(4);
        assert_eq!(embedder.vector_for("abc"), embedder.vector_for("abc"));
        assert_ne!(embedder.vector_for("abc"), embedder.vector_for("abd"));
        assert_eq!(embedder.vector_for("").len(), 4);
    }

    #[tokio::test]
    async fn test_misaligned_embedder_drops_a_vector() {
        let embedder = MockEmbedder::new(2).misaligned();
        let vectors = embedder
            .embed_many(&[Document::text("a"), Document::text("b")])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn test_neighbor_search_honours_count() {
        let search = MockNeighborSearch::with_neighbors(["a", "b", "c"]);
        let request = FindNeighborsRequest::single(
            "d",
            crate::query::QueryDatapoint::new(vec![1.0]),
            2,
        );
        let endpoint = Url::parse("https://example.com/find").unwrap();
        let response = search
            .find_neighbors(&endpoint, &AccessToken::new("t"), &request)
            .await
            .unwrap();

        assert_eq!(response.neighbor_ids(), vec!["a", "b"]);
        assert_eq!(search.requests()[0].0, endpoint);
    }
}
