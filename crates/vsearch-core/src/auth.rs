//! Bearer token acquisition.

use std::fmt;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// An OAuth bearer token. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use in an `Authorization` header.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Supplies bearer tokens for calls to the index service.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a token valid for at least the next request.
    async fn access_token(&self) -> Result<AccessToken>;
}

/// Token provider handing out one pre-acquired token.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    /// Creates a provider for the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
        }
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<AccessToken> {
        if self.token.secret().trim().is_empty() {
            return Err(Error::authentication().with_message("no access token configured"));
        }

        Ok(self.token.clone())
    }
}
