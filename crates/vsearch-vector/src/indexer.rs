//! Write path: documents into datapoints into the index.

use std::sync::Arc;

use vsearch_core::{
    Document, DocumentIndexer, Embedder, Error, IndexDatapoint, IndexResource, IndexService,
    Restriction, Result,
};

use crate::TRACING_TARGET_INDEXER;
use crate::config::VectorSearchConfig;
use crate::options::IndexerOptions;
use crate::policy::FailurePolicy;
use crate::service::Collaborators;

/// Embeds documents and writes them to the managed index.
///
/// Each call upserts its whole batch in a single request and registers the
/// documents with the document store only once that request succeeded.
#[derive(Clone)]
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    index_service: Arc<dyn IndexService>,
    document_indexer: Arc<dyn DocumentIndexer>,
    index: IndexResource,
    id_field: Arc<str>,
    failure_policy: FailurePolicy,
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("index", &self.index)
            .field("id_field", &self.id_field)
            .field("failure_policy", &self.failure_policy)
            .finish_non_exhaustive()
    }
}

impl Indexer {
    /// Creates an indexer for the configured index.
    pub fn new(config: &VectorSearchConfig, collaborators: &Collaborators) -> Result<Self> {
        config.validate_config()?;

        Ok(Self {
            embedder: collaborators.embedder.clone(),
            index_service: collaborators.index_service.clone(),
            document_indexer: collaborators.document_indexer.clone(),
            index: config.index_resource(),
            id_field: Arc::from(config.document_id_field()),
            failure_policy: config.failure_policy,
        })
    }

    /// Returns the index datapoints are written to.
    pub fn index_resource(&self) -> &IndexResource {
        &self.index
    }

    /// Indexes a batch of documents.
    ///
    /// Failures are logged and then handled by the effective [`FailurePolicy`]:
    /// swallowed failures return `Ok(())`.
    pub async fn index(&self, documents: &[Document], options: IndexerOptions) -> Result<()> {
        if documents.is_empty() {
            tracing::debug!(
                target: TRACING_TARGET_INDEXER,
                index = %self.index,
                "Empty batch, nothing to index"
            );
            return Ok(());
        }

        let policy = self.failure_policy.or_override(options.failure_policy);

        match self.upsert_batch(documents).await {
            Ok(()) => Ok(()),
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_INDEXER,
                    index = %self.index,
                    documents = documents.len(),
                    policy = %policy,
                    error = %error,
                    "Failed to index documents"
                );
                policy.recover(error)
            }
        }
    }

    async fn upsert_batch(&self, documents: &[Document]) -> Result<()> {
        let prepared = self.prepare(documents)?;

        let embeddings = self.embedder.embed_many(documents).await?;
        if embeddings.len() != documents.len() {
            return Err(Error::invalid_input().with_message(format!(
                "embedding count mismatch: expected {}, got {}",
                documents.len(),
                embeddings.len()
            )));
        }

        let datapoints: Vec<_> = prepared
            .into_iter()
            .zip(embeddings)
            .map(|((id, restricts), vector)| {
                IndexDatapoint::new(id, vector).with_restricts(restricts)
            })
            .collect();

        tracing::debug!(
            target: TRACING_TARGET_INDEXER,
            index = %self.index,
            datapoints = datapoints.len(),
            "Upserting datapoints"
        );

        self.index_service
            .upsert_datapoints(&self.index, &datapoints)
            .await?;
        self.document_indexer.index_documents(documents).await?;

        tracing::info!(
            target: TRACING_TARGET_INDEXER,
            index = %self.index,
            documents = documents.len(),
            "Documents indexed"
        );

        Ok(())
    }

    /// Reads the identifier and restricts of every document before any remote call.
    fn prepare(&self, documents: &[Document]) -> Result<Vec<(String, Vec<Restriction>)>> {
        documents
            .iter()
            .enumerate()
            .map(|(position, document)| {
                let id = document.id(&self.id_field).ok_or_else(|| {
                    Error::invalid_input().with_message(format!(
                        "document at position {position} has no usable `{}` identifier",
                        self.id_field
                    ))
                })?;
                Ok((id, document.restricts()?))
            })
            .collect()
    }
}
