//! Upsert client for the index service REST API.

use std::sync::Arc;

use serde::Deserialize;
use url::Url;
use vsearch_core::{
    IndexDatapoint, IndexResource, IndexService, TokenProvider, UpsertDatapointsRequest,
};

use crate::TRACING_TARGET_UPSERT;
use crate::client::ReqwestClient;

/// Empty body returned by a successful upsert.
#[derive(Debug, Deserialize)]
struct UpsertDatapointsResponse {}

/// Writes datapoints through `indexes.upsertDatapoints`.
#[derive(Clone)]
pub struct VertexIndexClient {
    client: ReqwestClient,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for VertexIndexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexIndexClient")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl VertexIndexClient {
    /// Creates an upsert client authenticating through `tokens`.
    pub fn new(client: ReqwestClient, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { client, tokens }
    }

    /// Returns the upsert URL for `index`.
    pub fn upsert_url(&self, index: &IndexResource) -> vsearch_core::Result<Url> {
        let base = self.client.config().api_base(index.location())?;
        let url = format!(
            "{}/v1/{}:upsertDatapoints",
            base.as_str().trim_end_matches('/'),
            index.name()
        );
        Ok(Url::parse(&url)?)
    }
}

#[async_trait::async_trait]
impl IndexService for VertexIndexClient {
    async fn upsert_datapoints(
        &self,
        index: &IndexResource,
        datapoints: &[IndexDatapoint],
    ) -> vsearch_core::Result<()> {
        let url = self.upsert_url(index)?;
        let token = self.tokens.access_token().await?;

        tracing::debug!(
            target: TRACING_TARGET_UPSERT,
            index = %index,
            datapoints = datapoints.len(),
            "Upserting datapoints"
        );

        let body = UpsertDatapointsRequest { datapoints };
        let _: UpsertDatapointsResponse = self.client.post_json(&url, &token, &body).await?;

        tracing::info!(
            target: TRACING_TARGET_UPSERT,
            index = %index,
            datapoints = datapoints.len(),
            "Datapoints upserted"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use vsearch_core::mock::MockTokenProvider;
    use vsearch_core::{ErrorKind, Restriction};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::ReqwestConfig;

    fn upsert_client(server: &MockServer, tokens: MockTokenProvider) -> VertexIndexClient {
        let config = ReqwestConfig::default().with_api_endpoint(server.uri());
        let client = ReqwestClient::new(config).unwrap();
        VertexIndexClient::new(client, Arc::new(tokens))
    }

    #[test]
    fn test_upsert_url_uses_regional_host() {
        let client = VertexIndexClient::new(
            ReqwestClient::new(ReqwestConfig::default()).unwrap(),
            Arc::new(MockTokenProvider::default()),
        );
        let index = IndexResource::new("p", "us-east1", "42");

        assert_eq!(
            client.upsert_url(&index).unwrap().as_str(),
            "https://us-east1-aiplatform.googleapis.com/v1/projects/p/locations/us-east1/indexes/42:upsertDatapoints"
        );
    }

    #[tokio::test]
    async fn test_upsert_posts_camel_case_datapoints() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1/projects/p/locations/us-central1/indexes/7:upsertDatapoints",
            ))
            .and(header("authorization", "Bearer mock-token"))
            .and(body_json(serde_json::json!({
                "datapoints": [
                    {"datapointId": "a", "featureVector": [1.0, 0.5]},
                    {
                        "datapointId": "b",
                        "featureVector": [0.0, -1.0],
                        "restricts": [{"namespace": "tag", "allowList": ["x"]}]
                    }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = upsert_client(&server, MockTokenProvider::default());
        let datapoints = vec![
            IndexDatapoint::new("a", vec![1.0, 0.5]),
            IndexDatapoint::new("b", vec![0.0, -1.0])
                .with_restricts(vec![Restriction::new("tag").allow(["x"])]),
        ];

        client
            .upsert_datapoints(&IndexResource::new("p", "us-central1", "7"), &datapoints)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upsert_rejected_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = upsert_client(&server, MockTokenProvider::default());
        let error = client
            .upsert_datapoints(
                &IndexResource::new("p", "l", "i"),
                &[IndexDatapoint::new("a", vec![1.0])],
            )
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Transport);
        assert_eq!(error.message.as_deref(), Some("403 Forbidden"));
    }

    #[tokio::test]
    async fn test_upsert_token_failure_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(0)
            .mount(&server)
            .await;

        let client = upsert_client(&server, MockTokenProvider::failing());
        let error = client
            .upsert_datapoints(
                &IndexResource::new("p", "l", "i"),
                &[IndexDatapoint::new("a", vec![1.0])],
            )
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Authentication);
    }
}
