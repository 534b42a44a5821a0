//! Shared reqwest client.

use std::sync::Arc;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;
use vsearch_core::AccessToken;

use crate::TRACING_TARGET_CLIENT;
use crate::config::ReqwestConfig;
use crate::error::{Error, Result};

/// Inner client that holds the HTTP client and configuration.
struct ReqwestClientInner {
    http: Client,
    config: ReqwestConfig,
}

/// Reqwest-based HTTP client shared by the query transport, the upsert
/// client and the embedder.
///
/// Cloning is cheap; clones share the connection pool.
///
/// # Examples
///
/// ```rust,ignore
/// use vsearch_reqwest::{ReqwestClient, ReqwestConfig};
///
/// let client = ReqwestClient::new(ReqwestConfig::default().with_timeout(10))?;
/// let response = client.find_neighbors(&endpoint, &token, &request).await?;
/// ```
#[derive(Clone)]
pub struct ReqwestClient {
    inner: Arc<ReqwestClientInner>,
}

impl std::fmt::Debug for ReqwestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestClient {
    /// Creates a new reqwest client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be built.
    pub fn new(config: ReqwestConfig) -> vsearch_core::Result<Self> {
        let timeout = config.effective_timeout();
        let user_agent = config.effective_user_agent();

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            timeout_ms = timeout.map(|timeout| timeout.as_millis()),
            "Creating reqwest client"
        );

        let mut builder = Client::builder().user_agent(&user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(Error::from)?;

        let inner = ReqwestClientInner { http, config };
        let client = Self {
            inner: Arc::new(inner),
        };

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            "Reqwest client created successfully"
        );

        Ok(client)
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &ReqwestConfig {
        &self.inner.config
    }

    /// Sends `body` as JSON with a bearer token and decodes the JSON answer.
    ///
    /// Non-success statuses are reported before the body is read.
    pub(crate) async fn post_json<B, R>(&self, url: &Url, token: &AccessToken, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)?;

        tracing::trace!(
            target: TRACING_TARGET_CLIENT,
            url = %url,
            bytes = payload.len(),
            "Sending request"
        );

        let response = self
            .inner
            .http
            .post(url.clone())
            .bearer_auth(token.secret())
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                target: TRACING_TARGET_CLIENT,
                url = %url,
                status_code = status.as_u16(),
                "Request rejected"
            );
            return Err(Error::Status(status));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = ReqwestConfig::default();
        let client = ReqwestClient::new(config).unwrap();
        assert!(client.config().user_agent.is_none());
    }

    #[test]
    fn test_client_creation_without_timeout() {
        let client = ReqwestClient::new(ReqwestConfig::new(0)).unwrap();
        assert_eq!(client.config().effective_timeout(), None);
    }
}
