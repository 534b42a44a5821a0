//! Query transport: `findNeighbors` against a deployed index.

use url::Url;
use vsearch_core::{AccessToken, FindNeighborsRequest, FindNeighborsResponse, NeighborSearch};

use crate::TRACING_TARGET_CLIENT;
use crate::client::ReqwestClient;

#[async_trait::async_trait]
impl NeighborSearch for ReqwestClient {
    async fn find_neighbors(
        &self,
        endpoint: &Url,
        token: &AccessToken,
        request: &FindNeighborsRequest,
    ) -> vsearch_core::Result<FindNeighborsResponse> {
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            endpoint = %endpoint,
            deployed_index_id = %request.deployed_index_id,
            queries = request.queries.len(),
            "Finding neighbors"
        );

        let response: FindNeighborsResponse = self.post_json(endpoint, token, request).await?;

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            results = response.queries.len(),
            "Neighbor search completed"
        );

        Ok(response)
    }
}
