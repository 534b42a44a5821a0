//! Document store persisted to a JSON file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use vsearch_core::{
    Document, DocumentIndexer, DocumentRetriever, Error, InMemoryDocumentStore, Result,
};

use crate::TRACING_TARGET_STORE;

/// In-memory document store written back to disk on every indexing call.
///
/// The file holds a single JSON object mapping identifiers to documents.
/// A batch becomes visible to retrieval only after it was saved.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    documents: InMemoryDocumentStore,
    write: Mutex<()>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>, id_field: &str) -> Result<Self> {
        let path = path.into();

        let documents = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let documents: HashMap<String, Document> = serde_json::from_slice(&bytes)
                    .map_err(|e| {
                        Error::store()
                            .with_message(format!("corrupt document store {}", path.display()))
                            .with_source(e)
                    })?;
                InMemoryDocumentStore::with_documents(id_field, documents)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                InMemoryDocumentStore::new(id_field)
            }
            Err(e) => {
                return Err(Error::store()
                    .with_message(format!("failed to read {}", path.display()))
                    .with_source(e));
            }
        };

        let count = documents.len().await;
        tracing::debug!(
            target: TRACING_TARGET_STORE,
            path = %path.display(),
            documents = count,
            "Document store opened"
        );

        Ok(Self {
            path,
            documents,
            write: Mutex::new(()),
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.len().await
    }

    /// Writes `snapshot` to a staging file and renames it over the store file.
    async fn persist(&self, snapshot: &HashMap<String, Document>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;

        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, &bytes).await.map_err(|e| {
            Error::store()
                .with_message(format!("failed to write {}", staging.display()))
                .with_source(e)
        })?;
        tokio::fs::rename(&staging, &self.path).await.map_err(|e| {
            Error::store()
                .with_message(format!("failed to replace {}", self.path.display()))
                .with_source(e)
        })?;

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            path = %self.path.display(),
            documents = snapshot.len(),
            "Document store saved"
        );

        Ok(())
    }
}

#[async_trait]
impl DocumentIndexer for JsonFileStore {
    async fn index_documents(&self, documents: &[Document]) -> Result<()> {
        let _guard = self.write.lock().await;

        // Memory only changes once the merged map is on disk.
        let mut snapshot = self.documents.snapshot().await;
        for (position, document) in documents.iter().enumerate() {
            let id = document.id(self.documents.id_field()).ok_or_else(|| {
                Error::store().with_message(format!(
                    "document at position {position} has no `{}` identifier",
                    self.documents.id_field()
                ))
            })?;
            snapshot.insert(id, document.clone());
        }

        self.persist(&snapshot).await?;
        self.documents.index_documents(documents).await
    }
}

#[async_trait]
impl DocumentRetriever for JsonFileStore {
    async fn retrieve_documents(&self, ids: &[String]) -> Result<Vec<Document>> {
        self.documents.retrieve_documents(ids).await
    }
}
