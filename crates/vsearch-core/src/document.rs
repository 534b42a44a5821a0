//! Documents exchanged with the calling application and the document store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::index::Restriction;

/// Metadata key holding the token restricts of a document.
pub const RESTRICTS_METADATA_KEY: &str = "restricts";

/// A document: opaque text content plus free-form metadata.
///
/// One metadata key, chosen per deployment, carries the document's external
/// identifier. Adapters only ever read documents; they never mutate them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The text content that gets embedded.
    pub content: String,
    /// Arbitrary metadata, including the identifier field.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Document {
    /// Creates a document from text content with empty metadata.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Map::new(),
        }
    }

    /// Adds a single metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns the metadata value under `key`.
    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Reads the external identifier stored under `field`.
    ///
    /// Strings are used verbatim and integers are rendered in decimal. Missing,
    /// null, empty, and non-scalar values yield `None`.
    pub fn id(&self, field: &str) -> Option<String> {
        match self.metadata.get(field)? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) if id.is_i64() || id.is_u64() => Some(id.to_string()),
            _ => None,
        }
    }

    /// Parses the token restricts stored under [`RESTRICTS_METADATA_KEY`].
    pub fn restricts(&self) -> Result<Vec<Restriction>> {
        let Some(value) = self.metadata.get(RESTRICTS_METADATA_KEY) else {
            return Ok(Vec::new());
        };

        serde_json::from_value(value.clone()).map_err(|e| {
            Error::invalid_input()
                .with_message(format!("malformed `{RESTRICTS_METADATA_KEY}` metadata: {e}"))
                .with_source(e)
        })
    }
}

impl From<&str> for Document {
    fn from(content: &str) -> Self {
        Self::text(content)
    }
}

impl From<String> for Document {
    fn from(content: String) -> Self {
        Self::text(content)
    }
}
