// In-memory TokenStore for tests. Counts loads and saves so callers can
// check how often the cache was touched.

use crate::core::auth::{AuthError, Token, TokenStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

pub struct InMemoryTokenStore {
    token: RwLock<Option<Token>>,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self {
            token: RwLock::new(None),
            loads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn with_token(token: Token) -> Self {
        Self {
            token: RwLock::new(Some(token)),
            ..Self::new()
        }
    }

    pub async fn current(&self) -> Option<Token> {
        self.token.read().await.clone()
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn load(&self) -> Result<Option<Token>, AuthError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.read().await.clone())
    }

    async fn save(&self, token: &Token) -> Result<(), AuthError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.token.write().await = Some(token.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_store_loads_none() {
        let store = InMemoryTokenStore::new();
        assert!(store.load().await.unwrap().is_none());
        assert_eq!(store.load_count(), 1);
    }

    #[tokio::test]
    async fn test_save_replaces_token() {
        let store = InMemoryTokenStore::with_token(Token::new("old", None, None, vec![]));
        store
            .save(&Token::new("new", None, None, vec![]))
            .await
            .unwrap();

        assert_eq!(store.load().await.unwrap().unwrap().access_token, "new");
        assert_eq!(store.save_count(), 1);
    }
}
