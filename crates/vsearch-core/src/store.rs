//! Document store collaborators and an in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::TRACING_TARGET_STORE;
use crate::document::Document;
use crate::error::{Error, Result};

/// Persists documents once their datapoints are in the index.
#[async_trait]
pub trait DocumentIndexer: Send + Sync {
    /// Registers the documents as indexed.
    async fn index_documents(&self, documents: &[Document]) -> Result<()>;
}

/// Resolves neighbour identifiers back into documents.
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Returns the documents for `ids`.
    ///
    /// Unknown identifiers may be skipped. The result order is not relied upon.
    async fn retrieve_documents(&self, ids: &[String]) -> Result<Vec<Document>>;
}

/// Document store kept in process memory, keyed by the identifier field.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone)]
pub struct InMemoryDocumentStore {
    id_field: Arc<str>,
    documents: Arc<RwLock<HashMap<String, Document>>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store reading identifiers from `id_field`.
    pub fn new(id_field: impl AsRef<str>) -> Self {
        Self {
            id_field: Arc::from(id_field.as_ref()),
            documents: Arc::default(),
        }
    }

    /// Creates a store pre-populated with `documents`.
    pub fn with_documents(id_field: impl AsRef<str>, documents: HashMap<String, Document>) -> Self {
        Self {
            id_field: Arc::from(id_field.as_ref()),
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    /// Returns the metadata field holding document identifiers.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Returns the number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Returns `true` if no documents are stored.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Returns a copy of every stored document keyed by identifier.
    pub async fn snapshot(&self) -> HashMap<String, Document> {
        self.documents.read().await.clone()
    }
}

#[async_trait]
impl DocumentIndexer for InMemoryDocumentStore {
    async fn index_documents(&self, documents: &[Document]) -> Result<()> {
        let keyed = documents
            .iter()
            .enumerate()
            .map(|(position, document)| {
                let id = document.id(&self.id_field).ok_or_else(|| {
                    Error::store().with_message(format!(
                        "document at position {position} has no `{}` identifier",
                        self.id_field
                    ))
                })?;
                Ok((id, document.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut stored = self.documents.write().await;
        stored.extend(keyed);

        tracing::trace!(
            target: TRACING_TARGET_STORE,
            count = documents.len(),
            total = stored.len(),
            "Stored documents in memory"
        );

        Ok(())
    }
}

#[async_trait]
impl DocumentRetriever for InMemoryDocumentStore {
    async fn retrieve_documents(&self, ids: &[String]) -> Result<Vec<Document>> {
        let stored = self.documents.read().await;
        let found: Vec<Document> = ids.iter().filter_map(|id| stored.get(id).cloned()).collect();

        if found.len() < ids.len() {
            tracing::debug!(
                target: TRACING_TARGET_STORE,
                requested = ids.len(),
                found = found.len(),
                "Some identifiers have no stored document"
            );
        }

        Ok(found)
    }
}
