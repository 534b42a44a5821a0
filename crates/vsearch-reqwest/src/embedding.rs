//! Text embedder over the publisher model `predict` method.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;
use vsearch_core::{Document, Embedder, Error, Result, TokenProvider};

use crate::TRACING_TARGET_EMBEDDING;
use crate::client::ReqwestClient;
use crate::config::VertexEmbedderConfig;

/// Embedding task hint sent with every instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<Instance<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Parameters>,
}

#[derive(Debug, Serialize)]
struct Instance<'a> {
    content: &'a str,
    task_type: TaskType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters {
    output_dimensionality: u32,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    embeddings: Embeddings,
}

#[derive(Debug, Deserialize)]
struct Embeddings {
    values: Vec<f32>,
}

/// Embeds documents with a hosted text embedding model.
///
/// Documents are embedded as `RETRIEVAL_DOCUMENT`, queries as `RETRIEVAL_QUERY`.
#[derive(Clone)]
pub struct VertexEmbedder {
    client: ReqwestClient,
    tokens: Arc<dyn TokenProvider>,
    project_id: String,
    location: String,
    config: VertexEmbedderConfig,
}

impl std::fmt::Debug for VertexEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexEmbedder")
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VertexEmbedder {
    /// Creates an embedder for the model in `config`, hosted in `project_id` / `location`.
    pub fn new(
        client: ReqwestClient,
        tokens: Arc<dyn TokenProvider>,
        project_id: impl Into<String>,
        location: impl Into<String>,
        config: VertexEmbedderConfig,
    ) -> Self {
        Self {
            client,
            tokens,
            project_id: project_id.into(),
            location: location.into(),
            config,
        }
    }

    /// Returns the `predict` URL of the configured model.
    pub fn predict_url(&self) -> Result<Url> {
        let base = self.client.config().api_base(&self.location)?;
        let url = format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            base.as_str().trim_end_matches('/'),
            self.project_id,
            self.location,
            self.config.model
        );
        Ok(Url::parse(&url)?)
    }

    async fn predict(&self, documents: &[Document], task_type: TaskType) -> Result<Vec<Vec<f32>>> {
        let url = self.predict_url()?;
        let token = self.tokens.access_token().await?;

        let request = PredictRequest {
            instances: documents
                .iter()
                .map(|document| Instance {
                    content: &document.content,
                    task_type,
                })
                .collect(),
            parameters: self
                .config
                .output_dimensionality
                .map(|output_dimensionality| Parameters {
                    output_dimensionality,
                }),
        };

        tracing::debug!(
            target: TRACING_TARGET_EMBEDDING,
            model = %self.config.model,
            instances = documents.len(),
            "Requesting embeddings"
        );

        let response: PredictResponse = self
            .client
            .post_json(&url, &token, &request)
            .await
            .map_err(|e| {
                let source = Error::from(e);
                Error::embedding()
                    .with_message(format!("embedding request failed: {source}"))
                    .with_source(source)
            })?;

        if response.predictions.len() != documents.len() {
            return Err(Error::embedding().with_message(format!(
                "prediction count mismatch: expected {}, got {}",
                documents.len(),
                response.predictions.len()
            )));
        }

        Ok(response
            .predictions
            .into_iter()
            .map(|prediction| prediction.embeddings.values)
            .collect())
    }
}

#[async_trait::async_trait]
impl Embedder for VertexEmbedder {
    async fn embed(&self, document: &Document) -> Result<Vec<f32>> {
        let mut vectors = self
            .predict(std::slice::from_ref(document), TaskType::RetrievalQuery)
            .await?;
        vectors
            .pop()
            .ok_or_else(|| Error::embedding().with_message("no embedding returned"))
    }

    async fn embed_many(&self, documents: &[Document]) -> Result<Vec<Vec<f32>>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        self.predict(documents, TaskType::RetrievalDocument).await
    }
}
