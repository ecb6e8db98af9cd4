use super::models::{AiConfig, AiMessage};
use super::prompt::{article_prompt, ARTICLE_SYSTEM_PROMPT};
use crate::core::articles::{Article, ArticleWriter, GenerationError};
use async_trait::async_trait;
use std::error::Error;

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Sends a chat completion request and returns the text of the first choice.
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// Drafts articles by sending the article template to an `AiProvider`.
pub struct ArticleGenerator<P: AiProvider> {
    provider: P,
    config: AiConfig,
}

impl<P: AiProvider> ArticleGenerator<P> {
    pub fn new(provider: P, config: AiConfig) -> Self {
        Self { provider, config }
    }

    fn build_messages(topic: &str, audience: &str) -> Vec<AiMessage> {
        vec![
            AiMessage::system(ARTICLE_SYSTEM_PROMPT),
            AiMessage::user(article_prompt(topic, audience)),
        ]
    }
}

#[async_trait]
impl<P: AiProvider> ArticleWriter for ArticleGenerator<P> {
    async fn write_article(
        &self,
        topic: &str,
        audience: &str,
    ) -> Result<Article, GenerationError> {
        let messages = Self::build_messages(topic, audience);

        tracing::debug!(model = %self.config.model, "Requesting article for '{}'", topic);

        let content = self
            .provider
            .chat_complete(&messages, &self.config)
            .await
            .map_err(|e| GenerationError::Provider(e.to_string()))?;

        if content.trim().is_empty() {
            return Err(GenerationError::EmptyContent);
        }

        Ok(Article::new(content))
    }
}
