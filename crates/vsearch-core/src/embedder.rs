//! Embedding collaborator.

use async_trait::async_trait;

use crate::document::Document;
use crate::error::Result;

/// Turns documents into feature vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a single query document.
    async fn embed(&self, document: &Document) -> Result<Vec<f32>>;

    /// Embeds a batch of documents.
    ///
    /// Implementations should return one vector per input, in input order.
    /// Callers verify the count before pairing vectors with documents.
    async fn embed_many(&self, documents: &[Document]) -> Result<Vec<Vec<f32>>>;
}
