use crate::types::Result;
use async_trait::async_trait;
use std::future::Future;

/// Supplies the bearer token for each connection attempt and poll request.
///
/// `Ok(None)` means "no token"; an error fails the attempt that asked for it.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<Option<String>>;
}

#[async_trait]
impl<F, Fut> TokenProvider for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<String>>> + Send,
{
    async fn access_token(&self) -> Result<Option<String>> {
        (self)().await
    }
}

/// A token fixed at construction
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Resolves a token, treating empty strings as absent
pub(crate) async fn resolve_token(provider: Option<&dyn TokenProvider>) -> Result<Option<String>> {
    let Some(provider) = provider else {
        return Ok(None);
    };
    Ok(provider
        .access_token()
        .await?
        .filter(|token| !token.is_empty()))
}
