//! Bearer-token acquisition seam.
//!
//! OAuth acquisition against the identity platform lives outside this
//! service; the client only needs something that can hand it a current
//! token. Tokens are fetched per call and must never appear in logs or
//! error details.

use async_trait::async_trait;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current access token, or `None` when unavailable. A `None`
    /// short-circuits the whole call as a fatal configuration error.
    async fn access_token(&self) -> Option<String>;
}

/// Reads a pre-acquired token from the environment on every call, so token
/// rotation outside the process is picked up without a restart.
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn access_token(&self) -> Option<String> {
        std::env::var(&self.var).ok().filter(|t| !t.is_empty())
    }
}

/// Fixed token (or fixed absence), for tests and local tooling.
pub struct StaticTokenProvider(pub Option<String>);

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}
