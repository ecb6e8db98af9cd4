// Credential provider for the Google APIs.
//
// Steady state: load the cached token, refresh it when it has expired, save it.
// First run: no token (or missing scopes) means the user has to grant consent,
// which is a separate, optional capability. Without it the provider fails fast
// instead of waiting on a browser, so headless runs never block.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::token_models::{RefreshedToken, Token};
use super::token_store::{AuthError, TokenStore};

/// Mints a new access token from a refresh token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, AuthError>;
}

/// Obtains a brand new token with the user's consent (first-run setup).
#[async_trait]
pub trait InteractiveAuthorizer: Send + Sync {
    async fn authorize(&self, scopes: &[String]) -> Result<Token, AuthError>;
}

/// Anything that can hand out a bearer token for API calls.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

pub struct CredentialProvider<S: TokenStore> {
    store: S,
    refresher: Box<dyn TokenRefresher>,
    authorizer: Option<Box<dyn InteractiveAuthorizer>>,
    scopes: Vec<String>,
    /// Token acquired earlier in this run.
    current: Mutex<Option<Token>>,
}

impl<S: TokenStore> CredentialProvider<S> {
    pub fn new(store: S, refresher: Box<dyn TokenRefresher>, scopes: Vec<String>) -> Self {
        Self {
            store,
            refresher,
            authorizer: None,
            scopes,
            current: Mutex::new(None),
        }
    }

    /// Enables the interactive consent flow for when no usable token exists.
    pub fn with_authorizer(mut self, authorizer: Box<dyn InteractiveAuthorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Returns a token valid for the configured scopes.
    ///
    /// The store is read on first use only. A refreshed or newly authorized
    /// token is saved back before being returned.
    pub async fn acquire(&self) -> Result<Token, AuthError> {
        let mut current = self.current.lock().await;

        if let Some(token) = current.as_ref() {
            if token.is_valid_for(&self.scopes) {
                return Ok(token.clone());
            }
        }

        let cached = match current.take() {
            Some(token) => Some(token),
            None => self.store.load().await?,
        };

        let token = match cached {
            Some(token) if !token.has_scopes(&self.scopes) => {
                tracing::info!("Cached token is missing required scopes, re-authorizing");
                self.authorize_and_save().await?
            }
            Some(token) if !token.is_expired() => {
                tracing::debug!("Using cached token");
                token
            }
            Some(token) => self.refresh_or_authorize(token).await?,
            None => {
                tracing::info!("No cached token found");
                self.authorize_and_save().await?
            }
        };

        *current = Some(token.clone());
        Ok(token)
    }

    async fn refresh_or_authorize(&self, mut token: Token) -> Result<Token, AuthError> {
        let Some(refresh_token) = token.refresh_token.clone() else {
            tracing::info!("Cached token expired and has no refresh token");
            return self.authorize_and_save().await;
        };

        match self.refresher.refresh(&refresh_token).await {
            Ok(refreshed) => {
                token.apply_refresh(refreshed);
                self.store.save(&token).await?;
                tracing::info!("Refreshed access token");
                Ok(token)
            }
            Err(e) if self.authorizer.is_some() => {
                tracing::warn!("Token refresh failed ({}), falling back to authorization", e);
                self.authorize_and_save().await
            }
            Err(e) => Err(e),
        }
    }

    async fn authorize_and_save(&self) -> Result<Token, AuthError> {
        let authorizer = self.authorizer.as_ref().ok_or(AuthError::SetupRequired)?;

        let token = authorizer.authorize(&self.scopes).await?;
        self.store.save(&token).await?;
        tracing::info!("Authorization complete, token saved");
        Ok(token)
    }
}

#[async_trait]
impl<S: TokenStore> AccessTokenSource for CredentialProvider<S> {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.acquire().await?.access_token)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::auth::InMemoryTokenStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

    fn scopes() -> Vec<String> {
        vec![SCOPE.to_string()]
    }

    struct FakeRefresher {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl FakeRefresher {
        fn new(fail: bool) -> (Box<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Box::new(Self {
                    calls: Arc::clone(&calls),
                    fail,
                }),
                calls,
            )
        }
    }

    #[async_trait]
    impl TokenRefresher for FakeRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AuthError::Refresh("invalid_grant".to_string()));
            }
            Ok(RefreshedToken {
                access_token: format!("refreshed-with-{}", refresh_token),
                expires_in: Some(3600),
                refresh_token: None,
            })
        }
    }

    struct FakeAuthorizer {
        calls: Arc<AtomicUsize>,
    }

    impl FakeAuthorizer {
        fn new() -> (Box<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Box::new(Self {
                    calls: Arc::clone(&calls),
                }),
                calls,
            )
        }
    }

    #[async_trait]
    impl InteractiveAuthorizer for FakeAuthorizer {
        async fn authorize(&self, scopes: &[String]) -> Result<Token, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Token::new(
                "authorized",
                Some("fresh-refresh".to_string()),
                Some(3600),
                scopes.to_vec(),
            ))
        }
    }

    #[tokio::test]
    async fn test_valid_cached_token_is_used_as_is() {
        let store = Arc::new(InMemoryTokenStore::with_token(Token::new(
            "cached",
            Some("r".to_string()),
            Some(3600),
            scopes(),
        )));
        let (refresher, refreshes) = FakeRefresher::new(false);
        let provider = CredentialProvider::new(Arc::clone(&store), refresher, scopes());

        let token = provider.acquire().await.unwrap();

        assert_eq!(token.access_token, "cached");
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_saved() {
        let store = Arc::new(InMemoryTokenStore::with_token(Token::new(
            "stale",
            Some("r1".to_string()),
            Some(-100),
            scopes(),
        )));
        let (refresher, refreshes) = FakeRefresher::new(false);
        let (authorizer, authorizations) = FakeAuthorizer::new();
        let provider = CredentialProvider::new(Arc::clone(&store), refresher, scopes())
            .with_authorizer(authorizer);

        let token = provider.acquire().await.unwrap();

        assert_eq!(token.access_token, "refreshed-with-r1");
        assert_eq!(token.refresh_token.as_deref(), Some("r1"));
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(authorizations.load(Ordering::SeqCst), 0);
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.current().await.unwrap().access_token, "refreshed-with-r1");
    }

    #[tokio::test]
    async fn test_missing_token_without_authorizer_requires_setup() {
        let (refresher, _) = FakeRefresher::new(false);
        let provider = CredentialProvider::new(InMemoryTokenStore::new(), refresher, scopes());

        let result = provider.acquire().await;

        assert!(matches!(result, Err(AuthError::SetupRequired)));
    }

    #[tokio::test]
    async fn test_missing_token_runs_authorizer_and_saves() {
        let store = Arc::new(InMemoryTokenStore::new());
        let (refresher, _) = FakeRefresher::new(false);
        let (authorizer, authorizations) = FakeAuthorizer::new();
        let provider = CredentialProvider::new(Arc::clone(&store), refresher, scopes())
            .with_authorizer(authorizer);

        let token = provider.acquire().await.unwrap();

        assert_eq!(token.access_token, "authorized");
        assert_eq!(authorizations.load(Ordering::SeqCst), 1);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_without_refresh_token_requires_setup_when_headless() {
        let store = InMemoryTokenStore::with_token(Token::new("stale", None, Some(-100), scopes()));
        let (refresher, refreshes) = FakeRefresher::new(false);
        let provider = CredentialProvider::new(store, refresher, scopes());

        assert!(matches!(
            provider.acquire().await,
            Err(AuthError::SetupRequired)
        ));
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_authorizer() {
        let store = InMemoryTokenStore::with_token(Token::new(
            "stale",
            Some("revoked".to_string()),
            Some(-100),
            scopes(),
        ));
        let (refresher, refreshes) = FakeRefresher::new(true);
        let (authorizer, authorizations) = FakeAuthorizer::new();
        let provider = CredentialProvider::new(store, refresher, scopes()).with_authorizer(authorizer);

        let token = provider.acquire().await.unwrap();

        assert_eq!(token.access_token, "authorized");
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(authorizations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_propagates_when_headless() {
        let store = InMemoryTokenStore::with_token(Token::new(
            "stale",
            Some("revoked".to_string()),
            Some(-100),
            scopes(),
        ));
        let (refresher, _) = FakeRefresher::new(true);
        let provider = CredentialProvider::new(store, refresher, scopes());

        assert!(matches!(provider.acquire().await, Err(AuthError::Refresh(_))));
    }

    #[tokio::test]
    async fn test_missing_scope_forces_reauthorization() {
        let store = InMemoryTokenStore::with_token(Token::new(
            "narrow",
            Some("r".to_string()),
            Some(3600),
            vec!["https://www.googleapis.com/auth/spreadsheets.readonly".to_string()],
        ));
        let (refresher, refreshes) = FakeRefresher::new(false);
        let (authorizer, authorizations) = FakeAuthorizer::new();
        let provider = CredentialProvider::new(store, refresher, scopes()).with_authorizer(authorizer);

        let token = provider.acquire().await.unwrap();

        assert_eq!(token.access_token, "authorized");
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(authorizations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_acquire_is_memoised_for_the_run() {
        let store = Arc::new(InMemoryTokenStore::with_token(Token::new(
            "stale",
            Some("r1".to_string()),
            Some(-100),
            scopes(),
        )));
        let (refresher, refreshes) = FakeRefresher::new(false);
        let provider = CredentialProvider::new(Arc::clone(&store), refresher, scopes());

        let first = provider.access_token().await.unwrap();
        let second = provider.access_token().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(store.load_count(), 1);
    }
}
