use std::time::Duration;

use async_trait::async_trait;
use gradus_core::{GradusError, LlmConfig, Result};
use serde::{Deserialize, Serialize};

/// A message in a chat conversation with the LLM.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use gradus_eval::llm::Role;
///
/// assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// The text-completion capability the pipeline consumes.
///
/// Implemented by [`LlmClient`] for real providers and by in-test fakes, so
/// triage/summarization/evaluation logic is exercised without a network.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Send one chat exchange and return the raw response text.
    ///
    /// `json_response` requests a JSON-object response format from providers
    /// that support the hint; the caller still parses defensively.
    async fn complete(&self, messages: Vec<ChatMessage>, json_response: bool) -> Result<String>;

    /// Model identifier, for run statistics.
    fn model(&self) -> &str;
}

#[async_trait]
impl<T: Completion + ?Sized> Completion for &T {
    async fn complete(&self, messages: Vec<ChatMessage>, json_response: bool) -> Result<String> {
        (**self).complete(messages, json_response).await
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

/// OpenAI-compatible chat completions client.
///
/// Works with any provider that exposes the `/v1/chat/completions` endpoint:
/// OpenAI, Ollama, vLLM, LiteLLM, etc.
///
/// # Examples
///
/// ```
/// use gradus_core::LlmConfig;
/// use gradus_eval::llm::LlmClient;
///
/// let config = LlmConfig {
///     api_key: Some("test-key".into()),
///     ..LlmConfig::default()
/// };
/// let client = LlmClient::new(&config).unwrap();
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new LLM client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GradusError::UpstreamService`] if the HTTP client cannot be
    /// built.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                GradusError::UpstreamService(format!("failed to create HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Completion for LlmClient {
    async fn complete(&self, messages: Vec<ChatMessage>, json_response: bool) -> Result<String> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com");
        let url = format!("{base_url}/v1/chat/completions");

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": 0.2,
        });
        if json_response {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let mut request = self.client.post(&url);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }
        request = request.header("Content-Type", "application/json");

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| GradusError::UpstreamService(format!("LLM request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(GradusError::UpstreamService(format!(
                "LLM API error {status}: {body_text}"
            )));
        }

        let response_body: serde_json::Value = response.json().await.map_err(|e| {
            GradusError::UpstreamService(format!("failed to parse LLM response: {e}"))
        })?;

        let content = response_body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                GradusError::UpstreamService(format!(
                    "unexpected LLM response structure: {response_body}"
                ))
            })?;

        Ok(content.to_string())
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction_succeeds() {
        let client = LlmClient::new(&LlmConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn model_returns_config_model() {
        let config = LlmConfig {
            model: "gpt-4o-mini".into(),
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.model(), "gpt-4o-mini");
    }

    #[test]
    fn chat_message_serializes() {
        let msg = ChatMessage::system("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "hello");
    }
}
