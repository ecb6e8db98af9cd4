use super::token_models::Token;
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("No usable token and interactive authorization is disabled; run once with GOOGLE_INTERACTIVE_AUTH=true")]
    SetupRequired,
    #[error("Token refresh failed: {0}")]
    Refresh(String),
    #[error("Authorization failed: {0}")]
    Authorization(String),
    #[error("Service account error: {0}")]
    ServiceAccount(String),
}

/// Where the credential token lives between runs.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns the stored token, or `None` if nothing usable is stored.
    async fn load(&self) -> Result<Option<Token>, AuthError>;
    async fn save(&self, token: &Token) -> Result<(), AuthError>;
}

// Lets callers keep a handle on a store they hand to a provider.
#[async_trait]
impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    async fn load(&self) -> Result<Option<Token>, AuthError> {
        (**self).load().await
    }

    async fn save(&self, token: &Token) -> Result<(), AuthError> {
        (**self).save(token).await
    }
}
