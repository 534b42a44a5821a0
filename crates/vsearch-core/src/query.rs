//! Read side of the vector index: nearest-neighbour wire types and transport.
//!
//! The request body uses the snake_case schema of the public query endpoint.
//! It can carry several queries, although the retriever sends exactly one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::AccessToken;
use crate::error::Result;
use crate::index::Restriction;

/// Placeholder identifier of the query datapoint.
pub const QUERY_DATAPOINT_ID: &str = "0";

/// Body of a `findNeighbors` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindNeighborsRequest {
    /// Deployed index the queries run against.
    pub deployed_index_id: String,
    /// Queries, answered in the same order.
    pub queries: Vec<NeighborQuery>,
}

impl FindNeighborsRequest {
    /// Creates a request with no queries.
    pub fn new(deployed_index_id: impl Into<String>) -> Self {
        Self {
            deployed_index_id: deployed_index_id.into(),
            queries: Vec::new(),
        }
    }

    /// Creates a request holding exactly one query.
    pub fn single(
        deployed_index_id: impl Into<String>,
        datapoint: QueryDatapoint,
        neighbor_count: u32,
    ) -> Self {
        Self::new(deployed_index_id).with_query(NeighborQuery {
            datapoint,
            neighbor_count,
        })
    }

    /// Appends a query.
    pub fn with_query(mut self, query: NeighborQuery) -> Self {
        self.queries.push(query);
        self
    }
}

/// One nearest-neighbour query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborQuery {
    /// The datapoint to find neighbours for.
    pub datapoint: QueryDatapoint,
    /// How many neighbours to return.
    pub neighbor_count: u32,
}

/// The datapoint a query searches around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDatapoint {
    /// Identifier of the query datapoint, not matched against the index.
    pub datapoint_id: String,
    /// Embedding of the query.
    pub feature_vector: Vec<f32>,
    /// Token restricts filtering the candidate neighbours.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restricts: Vec<Restriction>,
}

impl QueryDatapoint {
    /// Creates a query datapoint with the placeholder identifier.
    pub fn new(feature_vector: Vec<f32>) -> Self {
        Self {
            datapoint_id: QUERY_DATAPOINT_ID.to_owned(),
            feature_vector,
            restricts: Vec::new(),
        }
    }

    /// Attaches token restricts.
    pub fn with_restricts(mut self, restricts: Vec<Restriction>) -> Self {
        self.restricts = restricts;
        self
    }
}

/// Response of a `findNeighbors` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindNeighborsResponse {
    /// One result per query, in request order.
    #[serde(default, alias = "nearestNeighbors")]
    pub queries: Vec<NearestNeighbors>,
}

impl FindNeighborsResponse {
    /// Returns the neighbour ids of the first query, best match first.
    pub fn neighbor_ids(&self) -> Vec<String> {
        self.queries
            .first()
            .map(|query| {
                query
                    .neighbors
                    .iter()
                    .map(|neighbor| neighbor.datapoint.datapoint_id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Ranked neighbours of one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearestNeighbors {
    /// Neighbours ordered by similarity.
    #[serde(default)]
    pub neighbors: Vec<Neighbor>,
}

/// A matched datapoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// The matched datapoint.
    pub datapoint: NeighborDatapoint,
    /// Distance to the query, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Datapoint reference inside a neighbour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborDatapoint {
    /// External identifier of the matched document.
    #[serde(alias = "datapointId")]
    pub datapoint_id: String,
}

/// Sends nearest-neighbour queries to a deployed index's public endpoint.
#[async_trait]
pub trait NeighborSearch: Send + Sync {
    /// Performs one `findNeighbors` call.
    async fn find_neighbors(
        &self,
        endpoint: &Url,
        token: &AccessToken,
        request: &FindNeighborsRequest,
    ) -> Result<FindNeighborsResponse>;
}
