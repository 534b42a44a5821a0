//! Internal error types for vsearch-reqwest.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for vsearch-reqwest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Internal error type for vsearch-reqwest operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(StatusCode),
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<Error> for vsearch_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(e) => {
                if e.is_timeout() {
                    vsearch_core::Error::transport()
                        .with_message("Request timed out")
                        .with_source(e)
                } else if e.is_connect() {
                    vsearch_core::Error::transport()
                        .with_message("Connection failed")
                        .with_source(e)
                } else {
                    vsearch_core::Error::transport()
                        .with_message(e.to_string())
                        .with_source(e)
                }
            }
            Error::Status(status) => vsearch_core::Error::transport().with_message(status.to_string()),
            Error::Serde(e) => vsearch_core::Error::serialization()
                .with_message(e.to_string())
                .with_source(e),
        }
    }
}
