//! Reqwest client configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;
use vsearch_core::Result;

/// Default timeout for HTTP requests: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default text embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Configuration for the reqwest HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ReqwestConfig {
    /// HTTP request timeout in seconds, 0 disables it
    #[cfg_attr(
        feature = "config",
        arg(long = "http-timeout", env = "VSEARCH_HTTP_TIMEOUT", default_value = "30")
    )]
    #[serde(default = "default_timeout_secs")]
    pub http_timeout: u64,

    /// User-Agent header to send with requests
    #[cfg_attr(
        feature = "config",
        arg(long = "http-user-agent", env = "VSEARCH_HTTP_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Base URL of the regional API, overriding `https://{location}-aiplatform.googleapis.com`
    #[cfg_attr(
        feature = "config",
        arg(long = "api-endpoint", env = "VSEARCH_API_ENDPOINT")
    )]
    #[serde(default)]
    pub api_endpoint: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ReqwestConfig {
    fn default() -> Self {
        Self {
            http_timeout: default_timeout_secs(),
            user_agent: None,
            api_endpoint: None,
        }
    }
}

impl ReqwestConfig {
    /// Create a new configuration with the specified timeout.
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            http_timeout: timeout_secs,
            ..Self::default()
        }
    }

    /// Returns the effective timeout, or `None` if zero disables it.
    pub fn effective_timeout(&self) -> Option<Duration> {
        (self.http_timeout > 0).then(|| Duration::from_secs(self.http_timeout))
    }

    /// Returns the effective user agent, using default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(Self::default_user_agent)
    }

    /// Returns the default user agent string.
    fn default_user_agent() -> String {
        format!("vsearch/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Returns the base URL of the regional API for `location`.
    pub fn api_base(&self, location: &str) -> Result<Url> {
        let base = match self.api_endpoint.as_deref() {
            Some(endpoint) if !endpoint.trim().is_empty() => endpoint.trim().to_owned(),
            _ => format!("https://{location}-aiplatform.googleapis.com"),
        };
        Ok(Url::parse(&base)?)
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.http_timeout = timeout_secs;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the API endpoint override.
    #[must_use]
    pub fn with_api_endpoint(mut self, api_endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(api_endpoint.into());
        self
    }
}

/// Configuration for the publisher-model text embedder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[serde(rename_all = "camelCase")]
pub struct VertexEmbedderConfig {
    /// Text embedding model id
    #[cfg_attr(
        feature = "config",
        arg(
            long = "embedding-model",
            env = "VSEARCH_EMBEDDING_MODEL",
            default_value = DEFAULT_EMBEDDING_MODEL
        )
    )]
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Requested embedding dimensionality, model default when unset
    #[cfg_attr(
        feature = "config",
        arg(long = "embedding-dimensions", env = "VSEARCH_EMBEDDING_DIMENSIONS")
    )]
    #[serde(default)]
    pub output_dimensionality: Option<u32>,
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_owned()
}

impl Default for VertexEmbedderConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            output_dimensionality: None,
        }
    }
}

impl VertexEmbedderConfig {
    /// Set the model id.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensionality.
    #[must_use]
    pub fn with_output_dimensionality(mut self, dimensions: u32) -> Self {
        self.output_dimensionality = Some(dimensions);
        self
    }
}

#[cfg(test)]
mod tests {
    use vsearch_core::ErrorKind;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReqwestConfig::default();
        assert_eq!(config.http_timeout, 30);
        assert!(config.user_agent.is_none());
        assert_eq!(
            config.effective_timeout(),
            Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        );
    }

    #[test]
    fn test_zero_timeout_disables_timeout() {
        assert_eq!(ReqwestConfig::new(0).effective_timeout(), None);
        assert_eq!(
            ReqwestConfig::new(5).effective_timeout(),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_effective_user_agent() {
        assert!(ReqwestConfig::default().effective_user_agent().starts_with("vsearch/"));

        let config = ReqwestConfig::default().with_user_agent("custom/1.0");
        assert_eq!(config.effective_user_agent(), "custom/1.0");
    }

    #[test]
    fn test_api_base_defaults_to_regional_host() {
        let base = ReqwestConfig::default().api_base("us-central1").unwrap();
        assert_eq!(base.as_str(), "https://us-central1-aiplatform.googleapis.com/");
    }

    #[test]
    fn test_api_base_override() {
        let config = ReqwestConfig::default().with_api_endpoint("http://127.0.0.1:8080");
        assert_eq!(
            config.api_base("ignored").unwrap().as_str(),
            "http://127.0.0.1:8080/"
        );

        let config = ReqwestConfig::default().with_api_endpoint("not a url");
        let error = config.api_base("x").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_embedder_config_defaults() {
        let config = VertexEmbedderConfig::default();
        assert_eq!(config.model, "text-embedding-004");
        assert!(config.output_dimensionality.is_none());
    }
}
