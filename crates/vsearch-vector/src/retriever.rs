//! Read path: query text into ranked documents.

use std::collections::HashMap;
use std::sync::Arc;

use url::Url;
use validator::Validate;
use vsearch_core::{
    Document, DocumentRetriever, Embedder, FindNeighborsRequest, NeighborSearch, QueryDatapoint,
    Result, TokenProvider,
};

use crate::TRACING_TARGET_RETRIEVER;
use crate::config::VectorSearchConfig;
use crate::options::{RetrieverOptions, validation_error};
use crate::policy::FailurePolicy;
use crate::service::Collaborators;

/// Answers a query with the documents nearest to it, best match first.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    token_provider: Arc<dyn TokenProvider>,
    neighbor_search: Arc<dyn NeighborSearch>,
    document_retriever: Arc<dyn DocumentRetriever>,
    endpoint: Url,
    deployed_index_id: String,
    id_field: Arc<str>,
    failure_policy: FailurePolicy,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("endpoint", &self.endpoint)
            .field("deployed_index_id", &self.deployed_index_id)
            .field("id_field", &self.id_field)
            .field("failure_policy", &self.failure_policy)
            .finish_non_exhaustive()
    }
}

impl Retriever {
    /// Creates a retriever for the configured deployed index.
    pub fn new(config: &VectorSearchConfig, collaborators: &Collaborators) -> Result<Self> {
        config.validate_config()?;

        Ok(Self {
            embedder: collaborators.embedder.clone(),
            token_provider: collaborators.token_provider.clone(),
            neighbor_search: collaborators.neighbor_search.clone(),
            document_retriever: collaborators.document_retriever.clone(),
            endpoint: config.find_neighbors_url()?,
            deployed_index_id: config.vector_search_options.deployed_index_id.clone(),
            id_field: Arc::from(config.document_id_field()),
            failure_policy: config.failure_policy,
        })
    }

    /// Returns the `findNeighbors` URL queries are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Retrieves the documents nearest to `query`.
    ///
    /// Invalid options are always returned as a configuration error. Other
    /// failures are logged and then handled by the effective [`FailurePolicy`]:
    /// swallowed failures return an empty list.
    pub async fn retrieve(
        &self,
        query: &Document,
        options: RetrieverOptions,
    ) -> Result<Vec<Document>> {
        options
            .validate()
            .map_err(|e| validation_error("invalid retriever options", e))?;

        let policy = self.failure_policy.or_override(options.failure_policy);

        match self.find_documents(query, &options).await {
            Ok(documents) => Ok(documents),
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_RETRIEVER,
                    endpoint = %self.endpoint,
                    k = options.k,
                    policy = %policy,
                    error = %error,
                    "Failed to retrieve documents"
                );
                policy.recover(error)
            }
        }
    }

    async fn find_documents(
        &self,
        query: &Document,
        options: &RetrieverOptions,
    ) -> Result<Vec<Document>> {
        let vector = self.embedder.embed(query).await?;
        let token = self.token_provider.access_token().await?;

        let datapoint = QueryDatapoint::new(vector).with_restricts(options.restricts.clone());
        let request = FindNeighborsRequest::single(&self.deployed_index_id, datapoint, options.k);

        let response = self
            .neighbor_search
            .find_neighbors(&self.endpoint, &token, &request)
            .await?;

        let ids = response.neighbor_ids();
        tracing::debug!(
            target: TRACING_TARGET_RETRIEVER,
            requested = options.k,
            neighbors = ids.len(),
            "Neighbors found"
        );

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let documents = self.document_retriever.retrieve_documents(&ids).await?;
        Ok(self.rank_by_neighbors(&ids, documents))
    }

    /// Orders documents by neighbour rank; unmatched documents keep their
    /// relative order at the end.
    fn rank_by_neighbors(&self, ids: &[String], documents: Vec<Document>) -> Vec<Document> {
        let mut ranks = HashMap::with_capacity(ids.len());
        for (rank, id) in ids.iter().enumerate() {
            ranks.entry(id.as_str()).or_insert(rank);
        }

        let mut ranked: Vec<(usize, Document)> = documents
            .into_iter()
            .map(|document| {
                let rank = document
                    .id(&self.id_field)
                    .and_then(|id| ranks.get(id.as_str()).copied())
                    .unwrap_or(usize::MAX);
                (rank, document)
            })
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);

        ranked.into_iter().map(|(_, document)| document).collect()
    }
}

#[cfg(test)]
mod tests {
    use vsearch_core::mock::{
        MockDocumentStore, MockEmbedder, MockIndexService, MockNeighborSearch, MockTokenProvider,
    };
    use vsearch_core::{DocumentIndexer, ErrorKind, Restriction};
    use vsearch_reqwest::{ReqwestClient, ReqwestConfig};
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::VectorSearchOptions;

    fn config(public_endpoint: &str) -> VectorSearchConfig {
        VectorSearchConfig::new(
            "proj",
            "us-central1",
            VectorSearchOptions::new("idx", "ep", "deployed_1", public_endpoint),
        )
        .with_project_number("123")
    }

    async fn stored_documents(ids: &[&str]) -> MockDocumentStore {
        let store = MockDocumentStore::new("id");
        let documents: Vec<_> = ids
            .iter()
            .map(|id| Document::text(format!("content of {id}")).with_metadata("id", *id))
            .collect();
        store.inner().index_documents(&documents).await.unwrap();
        store
    }

    struct Fixture {
        embedder: Arc<MockEmbedder>,
        tokens: Arc<MockTokenProvider>,
        search: Arc<MockNeighborSearch>,
        store: Arc<MockDocumentStore>,
        retriever: Retriever,
    }

    fn fixture(
        config: VectorSearchConfig,
        embedder: MockEmbedder,
        tokens: MockTokenProvider,
        search: Arc<dyn NeighborSearch>,
        mock_search: Arc<MockNeighborSearch>,
        store: MockDocumentStore,
    ) -> Fixture {
        let embedder = Arc::new(embedder);
        let tokens = Arc::new(tokens);
        let store = Arc::new(store);
        let collaborators = Collaborators {
            embedder: embedder.clone(),
            token_provider: tokens.clone(),
            index_service: Arc::new(MockIndexService::new()),
            neighbor_search: search,
            document_indexer: store.clone(),
            document_retriever: store.clone(),
        };
        let retriever = Retriever::new(&config, &collaborators).unwrap();

        Fixture {
            embedder,
            tokens,
            search: mock_search,
            store,
            retriever,
        }
    }

    fn mocked(
        config: VectorSearchConfig,
        embedder: MockEmbedder,
        tokens: MockTokenProvider,
        search: MockNeighborSearch,
        store: MockDocumentStore,
    ) -> Fixture {
        let search = Arc::new(search);
        fixture(config, embedder, tokens, search.clone(), search, store)
    }

    fn content(documents: &[Document]) -> Vec<&str> {
        documents.iter().map(|d| d.content.as_str()).collect()
    }

    #[tokio::test]
    async fn test_documents_follow_neighbor_order() {
        let neighbors = ["n3", "n1", "n5", "n2", "n4"];
        let fx = mocked(
            config("vs.example.com"),
            MockEmbedder::new(4),
            MockTokenProvider::default(),
            MockNeighborSearch::with_neighbors(neighbors),
            stored_documents(&["n1", "n2", "n3", "n4", "n5"]).await.reversed(),
        );

        let documents = fx
            .retriever
            .retrieve(&Document::text("query"), RetrieverOptions::with_k(5))
            .await
            .unwrap();

        assert_eq!(
            content(&documents),
            vec![
                "content of n3",
                "content of n1",
                "content of n5",
                "content of n2",
                "content of n4"
            ]
        );

        let requests = fx.search.requests();
        assert_eq!(requests.len(), 1);
        let (endpoint, request) = &requests[0];
        assert_eq!(
            endpoint.as_str(),
            "https://vs.example.com/v1/projects/123/locations/us-central1/indexEndpoints/ep:findNeighbors"
        );
        assert_eq!(request.deployed_index_id, "deployed_1");
        assert_eq!(request.queries.len(), 1);
        assert_eq!(request.queries[0].neighbor_count, 5);
        assert_eq!(request.queries[0].datapoint.datapoint_id, "0");
        assert_eq!(
            request.queries[0].datapoint.feature_vector,
            fx.embedder.vector_for("query")
        );
    }

    #[tokio::test]
    async fn test_k_above_limit_rejected_before_any_call() {
        let fx = mocked(
            config("vs.example.com"),
            MockEmbedder::new(4),
            MockTokenProvider::default(),
            MockNeighborSearch::with_neighbors(["a"]),
            stored_documents(&["a"]).await,
        );

        let error = fx
            .retriever
            .retrieve(&Document::text("query"), RetrieverOptions::with_k(1001))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Configuration);
        assert_eq!(fx.embedder.calls(), 0);
        assert_eq!(fx.tokens.calls(), 0);
        assert_eq!(fx.search.calls(), 0);
        assert_eq!(fx.store.retrieve_calls(), 0);

        let error = fx
            .retriever
            .retrieve(&Document::text("query"), RetrieverOptions::with_k(0))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_http_500_returns_empty_without_store_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = ReqwestClient::new(ReqwestConfig::default()).unwrap();
        let fx = fixture(
            config(&server.uri()),
            MockEmbedder::new(4),
            MockTokenProvider::default(),
            Arc::new(client),
            Arc::new(MockNeighborSearch::default()),
            stored_documents(&["a"]).await,
        );

        let documents = fx
            .retriever
            .retrieve(&Document::text("query"), RetrieverOptions::default())
            .await
            .unwrap();

        assert!(documents.is_empty());
        assert_eq!(fx.store.retrieve_calls(), 0);
    }

    #[tokio::test]
    async fn test_http_500_propagates_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ReqwestClient::new(ReqwestConfig::default()).unwrap();
        let fx = fixture(
            config(&server.uri()),
            MockEmbedder::new(4),
            MockTokenProvider::default(),
            Arc::new(client),
            Arc::new(MockNeighborSearch::default()),
            stored_documents(&["a"]).await,
        );

        let error = fx
            .retriever
            .retrieve(
                &Document::text("query"),
                RetrieverOptions::default().with_failure_policy(FailurePolicy::Propagate),
            )
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Transport);
        assert_eq!(error.message.as_deref(), Some("500 Internal Server Error"));
        assert_eq!(fx.store.retrieve_calls(), 0);
    }

    #[tokio::test]
    async fn test_request_body_matches_fixture() {
        let fixture_body = include_str!("../fixtures/find_neighbors_request.json").trim_end();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1/projects/123/locations/us-central1/indexEndpoints/ep:findNeighbors",
            ))
            .and(header("authorization", "Bearer mock-token"))
            .and(header("content-type", "application/json"))
            .and(body_string(fixture_body))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "nearestNeighbors": [{"neighbors": [{"datapoint": {"datapointId": "a"}}]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ReqwestClient::new(ReqwestConfig::default()).unwrap();
        let fx = fixture(
            config(&server.uri()),
            MockEmbedder::fixed(vec![0.25, -0.5, 1.0]),
            MockTokenProvider::default(),
            Arc::new(client),
            Arc::new(MockNeighborSearch::default()),
            stored_documents(&["a"]).await,
        );

        let documents = fx
            .retriever
            .retrieve(
                &Document::text("query"),
                RetrieverOptions::with_k(5).with_failure_policy(FailurePolicy::Propagate),
            )
            .await
            .unwrap();

        assert_eq!(content(&documents), vec!["content of a"]);
    }

    #[tokio::test]
    async fn test_no_neighbors_skips_store() {
        let fx = mocked(
            config("vs.example.com"),
            MockEmbedder::new(4),
            MockTokenProvider::default(),
            MockNeighborSearch::default(),
            stored_documents(&["a"]).await,
        );

        let documents = fx
            .retriever
            .retrieve(&Document::text("query"), RetrieverOptions::default())
            .await
            .unwrap();

        assert!(documents.is_empty());
        assert_eq!(fx.search.calls(), 1);
        assert_eq!(fx.store.retrieve_calls(), 0);
    }

    #[tokio::test]
    async fn test_token_failure_skips_search() {
        let fx = mocked(
            config("vs.example.com"),
            MockEmbedder::new(4),
            MockTokenProvider::failing(),
            MockNeighborSearch::with_neighbors(["a"]),
            stored_documents(&["a"]).await,
        );

        let error = fx
            .retriever
            .retrieve(
                &Document::text("query"),
                RetrieverOptions::default().with_failure_policy(FailurePolicy::Propagate),
            )
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Authentication);
        assert_eq!(fx.search.calls(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_token_and_search() {
        let fx = mocked(
            config("vs.example.com"),
            MockEmbedder::new(4).failing(),
            MockTokenProvider::default(),
            MockNeighborSearch::with_neighbors(["a"]),
            stored_documents(&["a"]).await,
        );

        let documents = fx
            .retriever
            .retrieve(&Document::text("query"), RetrieverOptions::default())
            .await
            .unwrap();
        assert!(documents.is_empty());

        let error = fx
            .retriever
            .retrieve(
                &Document::text("query"),
                RetrieverOptions::default().with_failure_policy(FailurePolicy::Propagate),
            )
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Embedding);

        assert_eq!(fx.tokens.calls(), 0);
        assert_eq!(fx.search.calls(), 0);
        assert_eq!(fx.store.retrieve_calls(), 0);
    }

    #[tokio::test]
    async fn test_search_failure_skips_store() {
        let fx = mocked(
            config("vs.example.com"),
            MockEmbedder::new(4),
            MockTokenProvider::default(),
            MockNeighborSearch::with_neighbors(["a"]).failing(),
            stored_documents(&["a"]).await,
        );

        let documents = fx
            .retriever
            .retrieve(&Document::text("query"), RetrieverOptions::default())
            .await
            .unwrap();
        assert!(documents.is_empty());

        let error = fx
            .retriever
            .retrieve(
                &Document::text("query"),
                RetrieverOptions::default().with_failure_policy(FailurePolicy::Propagate),
            )
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Transport);

        assert_eq!(fx.search.calls(), 2);
        assert_eq!(fx.store.retrieve_calls(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let fx = mocked(
            config("vs.example.com"),
            MockEmbedder::new(4),
            MockTokenProvider::default(),
            MockNeighborSearch::with_neighbors(["a"]),
            MockDocumentStore::new("id").failing(),
        );

        let documents = fx
            .retriever
            .retrieve(&Document::text("query"), RetrieverOptions::default())
            .await
            .unwrap();

        assert!(documents.is_empty());
        assert_eq!(fx.store.retrieve_calls(), 1);
    }

    #[tokio::test]
    async fn test_restricts_sent_with_query() {
        let fx = mocked(
            config("vs.example.com"),
            MockEmbedder::new(4),
            MockTokenProvider::default(),
            MockNeighborSearch::with_neighbors(["a"]),
            stored_documents(&["a"]).await,
        );

        fx.retriever
            .retrieve(
                &Document::text("query"),
                RetrieverOptions::with_k(3).with_restrict(Restriction::new("lang").allow(["en"])),
            )
            .await
            .unwrap();

        let (_, request) = &fx.search.requests()[0];
        assert_eq!(
            request.queries[0].datapoint.restricts,
            vec![Restriction::new("lang").allow(["en"])]
        );
    }

    #[test]
    fn test_unmatched_documents_rank_last() {
        let fx = mocked(
            config("vs.example.com"),
            MockEmbedder::new(1),
            MockTokenProvider::default(),
            MockNeighborSearch::default(),
            MockDocumentStore::new("id"),
        );
        let ids = vec!["b".to_string(), "a".to_string()];
        let documents = vec![
            Document::text("x").with_metadata("id", "x"),
            Document::text("a").with_metadata("id", "a"),
            Document::text("y"),
            Document::text("b").with_metadata("id", "b"),
        ];

        let ranked = fx.retriever.rank_by_neighbors(&ids, documents);
        assert_eq!(content(&ranked), vec!["b", "a", "x", "y"]);
    }
}
