//! Service facade wiring both adapters from one configuration.

use std::sync::Arc;

use vsearch_core::{
    Document, DocumentIndexer, DocumentRetriever, Embedder, IndexService, NeighborSearch, Result,
    TokenProvider,
};

use crate::TRACING_TARGET_SERVICE;
use crate::config::VectorSearchConfig;
use crate::indexer::Indexer;
use crate::options::{IndexerOptions, RetrieverOptions};
use crate::retriever::Retriever;

/// External collaborators injected at construction.
#[derive(Clone)]
pub struct Collaborators {
    /// Produces document and query embeddings.
    pub embedder: Arc<dyn Embedder>,
    /// Supplies bearer tokens for neighbour queries.
    pub token_provider: Arc<dyn TokenProvider>,
    /// Writes datapoints to the index.
    pub index_service: Arc<dyn IndexService>,
    /// Sends neighbour queries to the deployed index.
    pub neighbor_search: Arc<dyn NeighborSearch>,
    /// Registers indexed documents with the document store.
    pub document_indexer: Arc<dyn DocumentIndexer>,
    /// Resolves neighbour identifiers into documents.
    pub document_retriever: Arc<dyn DocumentRetriever>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Vector-search backed indexing and retrieval.
///
/// The service is cheap to clone and can be shared across threads.
///
/// # Example
///
/// ```ignore
/// let search = VectorSearch::new(config, collaborators)?;
///
/// search.index(&documents, IndexerOptions::default()).await?;
/// let matches = search
///     .retrieve(&Document::text("query"), RetrieverOptions::with_k(5))
///     .await?;
/// ```
#[derive(Clone)]
pub struct VectorSearch {
    inner: Arc<VectorSearchInner>,
}

struct VectorSearchInner {
    config: VectorSearchConfig,
    indexer: Indexer,
    retriever: Retriever,
}

impl std::fmt::Debug for VectorSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorSearch")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl VectorSearch {
    /// Validates `config` and builds both adapters.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a field is empty or the query URL
    /// cannot be built.
    pub fn new(config: VectorSearchConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate_config()?;

        let indexer = Indexer::new(&config, &collaborators)?;
        let retriever = Retriever::new(&config, &collaborators)?;

        tracing::info!(
            target: TRACING_TARGET_SERVICE,
            index = %indexer.index_resource(),
            endpoint = %retriever.endpoint(),
            deployed_index_id = %config.vector_search_options.deployed_index_id,
            failure_policy = %config.failure_policy,
            "Vector search service created"
        );

        Ok(Self {
            inner: Arc::new(VectorSearchInner {
                config,
                indexer,
                retriever,
            }),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &VectorSearchConfig {
        &self.inner.config
    }

    /// Returns the indexer adapter.
    pub fn indexer(&self) -> Indexer {
        self.inner.indexer.clone()
    }

    /// Returns the retriever adapter.
    pub fn retriever(&self) -> Retriever {
        self.inner.retriever.clone()
    }

    /// Indexes a batch of documents.
    pub async fn index(&self, documents: &[Document], options: IndexerOptions) -> Result<()> {
        self.inner.indexer.index(documents, options).await
    }

    /// Retrieves the documents nearest to `query`.
    pub async fn retrieve(
        &self,
        query: &Document,
        options: RetrieverOptions,
    ) -> Result<Vec<Document>> {
        self.inner.retriever.retrieve(query, options).await
    }
}
