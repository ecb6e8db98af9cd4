use crate::core::ai::{AiConfig, AiMessage, AiProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// Chat-completions client for OpenAI and API-compatible hosts
/// (OpenRouter, local gateways) selected through the base URL.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [AiMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(client: Client, api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request<'a>(messages: &'a [AiMessage], config: &'a AiConfig) -> ChatRequest<'a> {
        ChatRequest {
            model: &config.model,
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn extract_content(response: ChatResponse) -> Result<String, Box<dyn Error + Send + Sync>> {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| "Failed to parse response content".into())
    }
}

#[async_trait]
impl AiProvider for OpenAiClient {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let payload = Self::build_request(messages, config);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            return Err(format!("Chat completion API error: {} - {}", status, text).into());
        }

        let body: ChatResponse = response.json().await?;
        Self::extract_content(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_skips_unset_options() {
        let messages = vec![AiMessage::system("s"), AiMessage::user("u")];
        let config = AiConfig::default();

        let json = serde_json::to_value(OpenAiClient::build_request(&messages, &config)).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "u");
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_request_serialization_includes_set_options() {
        let messages = vec![AiMessage::user("u")];
        let config = AiConfig {
            model: "gpt-4o".to_string(),
            temperature: Some(0.5),
            max_tokens: Some(1500),
        };

        let json = serde_json::to_value(OpenAiClient::build_request(&messages, &config)).unwrap();

        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["max_tokens"], 1500);
    }

    #[test]
    fn test_extract_first_choice_content() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Hola"}},
                {"index":1,"message":{"role":"assistant","content":"Otra"}}]}"#,
        )
        .unwrap();

        assert_eq!(OpenAiClient::extract_content(body).unwrap(), "Hola");
    }

    #[test]
    fn test_extract_fails_without_content() {
        let no_choices: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(OpenAiClient::extract_content(no_choices).is_err());

        let null_content: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert!(OpenAiClient::extract_content(null_content).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = OpenAiClient::new(Client::new(), "k".to_string(), "https://api.openai.com/v1/");
        assert_eq!(
            client.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }
}
