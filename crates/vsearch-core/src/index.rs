//! Write side of the vector index: datapoints and the upsert collaborator.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Token restrict evaluated by the index service when matching datapoints.
///
/// Serialized in lowerCamelCase; snake_case field names are accepted on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restriction {
    /// Namespace the tokens belong to.
    pub namespace: String,
    /// Tokens a match must carry.
    #[serde(default, alias = "allow_list", skip_serializing_if = "Vec::is_empty")]
    pub allow_list: Vec<String>,
    /// Tokens a match must not carry.
    #[serde(default, alias = "deny_list", skip_serializing_if = "Vec::is_empty")]
    pub deny_list: Vec<String>,
}

impl Restriction {
    /// Creates an empty restriction for the namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Adds tokens to the allow list.
    pub fn allow(mut self, tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allow_list.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Adds tokens to the deny list.
    pub fn deny(mut self, tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.deny_list.extend(tokens.into_iter().map(Into::into));
        self
    }
}

/// Fully qualified name of a vector index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexResource {
    location: String,
    name: String,
}

impl IndexResource {
    /// Resolves an index id within a project and location.
    ///
    /// An `index` that already is a full `projects/...` resource name is kept as is.
    pub fn new(
        project_id: impl AsRef<str>,
        location: impl Into<String>,
        index: impl AsRef<str>,
    ) -> Self {
        let location = location.into();
        let index = index.as_ref();
        let name = if index.starts_with("projects/") {
            index.to_owned()
        } else {
            format!(
                "projects/{}/locations/{}/indexes/{}",
                project_id.as_ref(),
                location,
                index
            )
        };

        Self { location, name }
    }

    /// Returns the region hosting the index.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns the resource name, `projects/{p}/locations/{l}/indexes/{i}`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for IndexResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The unit written to the index: an identifier and its feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDatapoint {
    /// External identifier of the source document.
    pub datapoint_id: String,
    /// Embedding of the source document.
    pub feature_vector: Vec<f32>,
    /// Token restricts attached to the datapoint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restricts: Vec<Restriction>,
}

impl IndexDatapoint {
    /// Creates a datapoint without restricts.
    pub fn new(datapoint_id: impl Into<String>, feature_vector: Vec<f32>) -> Self {
        Self {
            datapoint_id: datapoint_id.into(),
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

/// Body of an `upsertDatapoints` call.
#[derive(Debug, Serialize)]
pub struct UpsertDatapointsRequest<'a> {
    /// Datapoints written in one call, in order.
    pub datapoints: &'a [IndexDatapoint],
}

/// Writes datapoints to a managed vector index.
#[async_trait]
pub trait IndexService: Send + Sync {
    /// Inserts or replaces every datapoint in a single call.
    async fn upsert_datapoints(
        &self,
        index: &IndexResource,
        datapoints: &[IndexDatapoint],
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_resource_from_id() {
        let index = IndexResource::new("my-project", "us-central1", "1234");
        assert_eq!(
            index.name(),
            "projects/my-project/locations/us-central1/indexes/1234"
        );
        assert_eq!(index.location(), "us-central1");
    }

    #[test]
    fn test_index_resource_from_full_name() {
        let full = "projects/p/locations/europe-west4/indexes/99";
        let index = IndexResource::new("ignored", "europe-west4", full);
        assert_eq!(index.to_string(), full);
    }

    #[test]
    fn test_upsert_body_is_camel_case() {
        let datapoints = vec![
            IndexDatapoint::new("a", vec![0.5, 1.0]),
            IndexDatapoint::new("b", vec![-1.0, 0.25])
                .with_restricts(vec![Restriction::new("color").allow(["red"])]),
        ];
        let body = serde_json::to_string(&UpsertDatapointsRequest {
            datapoints: &datapoints,
        })
        .unwrap();

        assert_eq!(
            body,
            r#"{"datapoints":[{"datapointId":"a","featureVector":[0.5,1.0]},{"datapointId":"b","featureVector":[-1.0,0.25],"restricts":[{"namespace":"color","allowList":["red"]}]}]}"#
        );
    }
}
