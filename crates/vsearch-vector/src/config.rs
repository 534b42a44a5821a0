//! Deployment configuration of the vector-search adapters.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;
use vsearch_core::{IndexResource, Result};

use crate::options::validation_error;
use crate::policy::FailurePolicy;

/// Metadata key holding document identifiers unless configured otherwise.
pub const DEFAULT_DOCUMENT_ID_FIELD: &str = "id";

fn default_document_id_field() -> String {
    DEFAULT_DOCUMENT_ID_FIELD.to_owned()
}

/// Index and endpoint coordinates of the managed vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(rename_all = "camelCase")]
pub struct VectorSearchOptions {
    /// Index id, or full `projects/...` resource name, receiving upserts
    #[cfg_attr(feature = "config", arg(long = "index", env = "VSEARCH_INDEX"))]
    #[validate(length(min = 1))]
    pub index: String,

    /// Index endpoint id hosting the deployed index
    #[cfg_attr(
        feature = "config",
        arg(long = "index-endpoint", env = "VSEARCH_INDEX_ENDPOINT")
    )]
    #[validate(length(min = 1))]
    pub index_endpoint: String,

    /// Deployed index id queries run against
    #[cfg_attr(
        feature = "config",
        arg(long = "deployed-index-id", env = "VSEARCH_DEPLOYED_INDEX_ID")
    )]
    #[validate(length(min = 1))]
    pub deployed_index_id: String,

    /// Public endpoint domain of the index endpoint, `https` unless a scheme is given
    #[cfg_attr(
        feature = "config",
        arg(long = "public-endpoint", env = "VSEARCH_PUBLIC_ENDPOINT")
    )]
    #[validate(length(min = 1))]
    pub public_endpoint: String,

    /// Metadata key holding each document's identifier
    #[cfg_attr(
        feature = "config",
        arg(
            long = "document-id-field",
            env = "VSEARCH_DOCUMENT_ID_FIELD",
            default_value = DEFAULT_DOCUMENT_ID_FIELD
        )
    )]
    #[serde(default = "default_document_id_field")]
    #[validate(length(min = 1))]
    pub document_id_field: String,
}

impl VectorSearchOptions {
    /// Creates options with the default identifier field.
    pub fn new(
        index: impl Into<String>,
        index_endpoint: impl Into<String>,
        deployed_index_id: impl Into<String>,
        public_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            index: index.into(),
            index_endpoint: index_endpoint.into(),
            deployed_index_id: deployed_index_id.into(),
            public_endpoint: public_endpoint.into(),
            document_id_field: default_document_id_field(),
        }
    }

    /// Sets the identifier field.
    #[must_use]
    pub fn with_document_id_field(mut self, document_id_field: impl Into<String>) -> Self {
        self.document_id_field = document_id_field.into();
        self
    }
}

/// Complete configuration of a [`VectorSearch`] deployment.
///
/// Immutable once the service is built.
///
/// [`VectorSearch`]: crate::VectorSearch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(rename_all = "camelCase")]
pub struct VectorSearchConfig {
    /// Cloud project id
    #[cfg_attr(feature = "config", arg(long = "project-id", env = "VSEARCH_PROJECT_ID"))]
    #[validate(length(min = 1))]
    pub project_id: String,

    /// Project number used in query URLs, falls back to the project id
    #[cfg_attr(
        feature = "config",
        arg(long = "project-number", env = "VSEARCH_PROJECT_NUMBER")
    )]
    #[serde(default)]
    #[validate(length(min = 1))]
    pub project_number: Option<String>,

    /// Region of the index and its endpoint
    #[cfg_attr(feature = "config", arg(long = "location", env = "VSEARCH_LOCATION"))]
    #[validate(length(min = 1))]
    pub location: String,

    /// What adapters do after logging a failure
    #[cfg_attr(
        feature = "config",
        arg(
            long = "failure-policy",
            env = "VSEARCH_FAILURE_POLICY",
            default_value = "swallow"
        )
    )]
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Index and endpoint coordinates.
    #[cfg_attr(feature = "config", command(flatten))]
    #[validate(nested)]
    pub vector_search_options: VectorSearchOptions,
}

impl VectorSearchConfig {
    /// Creates a configuration with the default failure policy.
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        vector_search_options: VectorSearchOptions,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            project_number: None,
            location: location.into(),
            failure_policy: FailurePolicy::default(),
            vector_search_options,
        }
    }

    /// Sets the project number used in query URLs.
    #[must_use]
    pub fn with_project_number(mut self, project_number: impl Into<String>) -> Self {
        self.project_number = Some(project_number.into());
        self
    }

    /// Sets the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Checks every field, reporting failures as a configuration error.
    pub fn validate_config(&self) -> Result<()> {
        self.validate()
            .map_err(|e| validation_error("invalid vector search configuration", e))
    }

    /// Returns the project segment of query URLs.
    pub fn project_number(&self) -> &str {
        self.project_number.as_deref().unwrap_or(&self.project_id)
    }

    /// Returns the metadata key holding document identifiers.
    pub fn document_id_field(&self) -> &str {
        &self.vector_search_options.document_id_field
    }

    /// Returns the resource upserts are written to.
    pub fn index_resource(&self) -> IndexResource {
        IndexResource::new(
            &self.project_id,
            self.location.clone(),
            &self.vector_search_options.index,
        )
    }

    /// Returns the `findNeighbors` URL of the deployed index's public endpoint.
    pub fn find_neighbors_url(&self) -> Result<Url> {
        let endpoint = self
            .vector_search_options
            .public_endpoint
            .trim()
            .trim_end_matches('/');
        let base = if endpoint.contains("://") {
            endpoint.to_owned()
        } else {
            format!("https://{endpoint}")
        };

        let url = format!(
            "{base}/v1/projects/{}/locations/{}/indexEndpoints/{}:findNeighbors",
            self.project_number(),
            self.location,
            self.vector_search_options.index_endpoint
        );
        Ok(Url::parse(&url)?)
    }
}
