//! LLM client abstraction layer.
//!
//! This module provides:
//! - [`LlmClient`] trait for swappable LLM providers
//! - [`ProviderRegistry`] for building a client from config and a credential
//! - Concrete implementation: Groq (OpenAI-compatible chat completions)
//!
//! # Adding a New Provider
//!
//! 1. Create a new file (e.g., `openai.rs`)
//! 2. Implement `LlmClient` trait
//! 3. Add to `ProviderRegistry::create()`

mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::observer::TurnObserver;
use crate::auth::Credential;
use crate::config::Config;
use crate::error::Error;
use crate::tools::ToolDefinition;
use crate::Result;

pub use types::*;

pub mod groq;

pub use groq::GroqClient;

use super::message::{Message, ToolCallRequest};

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Text content of the response.
    pub content: Option<String>,

    /// Tool calls requested by the LLM.
    pub tool_calls: Vec<ToolCallRequest>,

    /// Reason the response finished.
    pub finish_reason: String,

    /// Token usage statistics.
    pub usage: Usage,
}

impl LlmResponse {
    /// Create a simple text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }

    /// Check if response has tool calls.
    #[inline]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl From<&UsageBlock> for Usage {
    fn from(u: &UsageBlock) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

/// LLM client trait - swappable provider abstraction.
///
/// Implement this trait to add a new LLM provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send messages and get response.
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse>;

    /// Like [`LlmClient::chat`], forwarding generated text to `observer` as it arrives.
    ///
    /// Providers without streaming report the whole text as one token.
    async fn chat_streaming(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        observer: &dyn TurnObserver,
    ) -> Result<LlmResponse> {
        let response = self.chat(messages, tools).await?;
        if let Some(text) = response.content.as_deref().filter(|t| !t.is_empty()) {
            observer.on_token(text);
        }
        Ok(response)
    }

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Box<T> {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        (**self).chat(messages, tools).await
    }

    async fn chat_streaming(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        observer: &dyn TurnObserver,
    ) -> Result<LlmResponse> {
        (**self).chat_streaming(messages, tools, observer).await
    }

    fn default_model(&self) -> &str {
        (**self).default_model()
    }
}

/// Provider registry - creates LLM clients dynamically.
///
/// # Example
///
/// ```ignore
/// let client = ProviderRegistry::create(&config, &credential)?;
/// let response = client.chat(&messages, &tools).await?;
/// ```
pub struct ProviderRegistry;

impl ProviderRegistry {
    /// Create an LLM client handle from configuration and the session credential.
    ///
    /// Fails with [`Error::Auth`] when the credential is empty.
    pub fn create(config: &Config, credential: &Credential) -> Result<Box<dyn LlmClient>> {
        match config.provider.as_str() {
            "groq" => {
                let mut client = GroqClient::new(credential, &config.model)?
                    .with_streaming(config.streaming)
                    .with_temperature(config.temperature);
                if let Some(base) = &config.api_base {
                    client = client.with_base_url(base);
                }
                Ok(Box::new(client))
            }
            other => Err(Error::Config(format!("Unknown provider: {other}"))),
        }
    }

    /// List available provider names.
    pub fn available() -> &'static [&'static str] {
        &["groq"]
    }
}

/// Fake LLM client for testing.
#[cfg(test)]
pub struct FakeLlmClient {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<LlmResponse>>>,
    seen: std::sync::Mutex<Vec<Vec<Message>>>,
}

#[cfg(test)]
impl FakeLlmClient {
    /// Create with predefined text responses.
    pub fn new(responses: Vec<&str>) -> Self {
        Self::scripted(responses.iter().map(|s| Ok(LlmResponse::text(*s))).collect())
    }

    pub fn scripted(responses: Vec<Result<LlmResponse>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create with a single tool call followed by a text response.
    pub fn with_tool_call(name: &str, args: serde_json::Value, final_response: &str) -> Self {
        Self::scripted(vec![
            Ok(Self::tool_call_response(name, args)),
            Ok(LlmResponse::text(final_response)),
        ])
    }

    pub fn tool_call_response(name: &str, args: serde_json::Value) -> LlmResponse {
        LlmResponse {
            content: None,
            tool_calls: vec![ToolCallRequest {
                id: "tc_1".to_string(),
                name: name.to_string(),
                arguments: args,
            }],
            finish_reason: "tool_calls".to_string(),
            usage: Usage::default(),
        }
    }

    /// Message lists received so far, one entry per call.
    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn chat(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        responses
            .pop_front()
            .unwrap_or_else(|| Err(Error::Llm("No more fake responses".to_string())))
    }

    fn default_model(&self) -> &str {
        "fake-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::observer::RecordingObserver;

    #[tokio::test]
    async fn test_fake_llm_client() {
        let client = FakeLlmClient::new(vec!["Hello!", "World!"]);

        let resp1 = client.chat(&[], &[]).await.unwrap();
        assert_eq!(resp1.content.as_deref(), Some("Hello!"));

        let resp2 = client.chat(&[], &[]).await.unwrap();
        assert_eq!(resp2.content.as_deref(), Some("World!"));
    }

    #[tokio::test]
    async fn test_default_streaming_emits_one_token() {
        let client = FakeLlmClient::new(vec!["whole answer"]);
        let observer = RecordingObserver::default();
        client.chat_streaming(&[], &[], &observer).await.unwrap();
        assert_eq!(observer.events().len(), 1);
    }

    #[test]
    fn test_registry_rejects_empty_credential() {
        let result = ProviderRegistry::create(&Config::default(), &Credential::new(""));
        assert!(matches!(result, Err(Error::Auth(_))));
    }

    #[test]
    fn test_registry_unknown_provider() {
        let config = Config { provider: "nope".to_string(), ..Config::default() };
        let result = ProviderRegistry::create(&config, &Credential::new("k"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
