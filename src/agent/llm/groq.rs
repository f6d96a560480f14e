//! Groq LLM client (OpenAI-compatible chat completions).

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use crate::agent::observer::TurnObserver;
use crate::auth::Credential;
use crate::error::Error;
use crate::tools::ToolDefinition;
use crate::Result;

use super::super::message::{Message, Role, ToolCallRequest};
use super::{
    ChatCompletion, ChatCompletionChunk, ErrorEnvelope, LlmClient, LlmResponse, Usage,
};

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

/// Groq API client handle: model, credential and streaming flag.
#[derive(Clone)]
pub struct GroqClient {
    api_key: String,
    model: String,
    base_url: String,
    streaming: bool,
    temperature: Option<f32>,
    client: Client,
}

impl GroqClient {
    /// Create a new client. An empty credential is rejected here, before any request.
    pub fn new(credential: &Credential, model: &str) -> Result<Self> {
        Ok(Self {
            api_key: credential.require()?.to_string(),
            model: model.to_string(),
            base_url: GROQ_API_URL.to_string(),
            streaming: false,
            temperature: None,
            client: Client::new(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::Tool => json!({
                    "role": "tool",
                    "tool_call_id": m.tool_call_id.as_deref().unwrap_or("unknown"),
                    "content": m.content
                }),
                Role::Assistant if m.tool_calls.is_some() => {
                    let calls: Vec<Value> = m
                        .tool_calls
                        .iter()
                        .flatten()
                        .map(|tc| {
                            json!({
                                "id": tc.id,
                                "type": "function",
                                "function": {
                                    "name": tc.name,
                                    "arguments": tc.arguments.to_string()
                                }
                            })
                        })
                        .collect();
                    json!({
                        "role": "assistant",
                        "content": m.content,
                        "tool_calls": calls
                    })
                }
                role => json!({
                    "role": role,
                    "content": m.content
                }),
            })
            .collect()
    }

    fn convert_tools(&self, tools: &[ToolDefinition]) -> Option<Value> {
        if tools.is_empty() {
            return None;
        }

        let functions: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters
                    }
                })
            })
            .collect();

        Some(Value::Array(functions))
    }

    fn build_request(&self, messages: &[Message], tools: &[ToolDefinition], stream: bool) -> Value {
        let mut request = json!({
            "model": self.model,
            "messages": self.convert_messages(messages),
            "stream": stream
        });

        if let Some(temperature) = self.temperature {
            request["temperature"] = json!(temperature);
        }

        if let Some(tool_config) = self.convert_tools(tools) {
            request["tools"] = tool_config;
        }

        request
    }

    async fn send(&self, request: &Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.build_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await?;
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Error::Auth(format!("Groq rejected the API key: {message}")))
            }
            _ => Err(Error::Llm(format!("Groq API error ({status}): {message}"))),
        }
    }

    fn parse_response(&self, response: ChatCompletion) -> Result<LlmResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Llm("No choices in response".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|tc| ToolCallRequest {
                id: tc.id,
                name: tc.function.name,
                arguments: parse_arguments(&tc.function.arguments),
            })
            .collect();

        Ok(LlmResponse {
            content: choice.message.content,
            tool_calls,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage: response.usage.as_ref().map(Usage::from).unwrap_or_default(),
        })
    }

    async fn read_stream(
        &self,
        response: reqwest::Response,
        observer: &dyn TurnObserver,
    ) -> Result<LlmResponse> {
        let mut acc = StreamAccumulator::default();
        let mut buffer: Vec<u8> = Vec::new();
        let mut bytes = response.bytes_stream();

        'read: while let Some(chunk) = bytes.next().await {
            buffer.extend_from_slice(&chunk?);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                if acc.feed_line(line.trim(), observer)? {
                    break 'read;
                }
            }
        }

        // Trailing line without a newline
        if !buffer.is_empty() {
            let line = String::from_utf8_lossy(&buffer).to_string();
            acc.feed_line(line.trim(), observer)?;
        }

        Ok(acc.finish())
    }
}

fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Folds streamed deltas into a single response.
#[derive(Default)]
struct StreamAccumulator {
    content: String,
    tool_calls: Vec<PartialToolCall>,
    finish_reason: Option<String>,
    usage: Usage,
}

impl StreamAccumulator {
    /// Consume one SSE line. Returns `true` once the stream is done.
    fn feed_line(&mut self, line: &str, observer: &dyn TurnObserver) -> Result<bool> {
        let Some(payload) = line.strip_prefix("data:") else {
            return Ok(false);
        };
        let payload = payload.trim();
        if payload == "[DONE]" {
            return Ok(true);
        }
        if payload.is_empty() {
            return Ok(false);
        }

        let chunk: ChatCompletionChunk = serde_json::from_str(payload)?;

        if let Some(usage) = chunk
            .usage
            .as_ref()
            .or_else(|| chunk.x_groq.as_ref().and_then(|x| x.usage.as_ref()))
        {
            self.usage = Usage::from(usage);
        }

        for choice in chunk.choices {
            if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                observer.on_token(&text);
                self.content.push_str(&text);
            }

            for delta in choice.delta.tool_calls {
                while self.tool_calls.len() <= delta.index {
                    self.tool_calls.push(PartialToolCall::default());
                }
                let slot = &mut self.tool_calls[delta.index];
                if let Some(id) = delta.id {
                    slot.id = id;
                }
                if let Some(function) = delta.function {
                    if let Some(name) = function.name {
                        slot.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        slot.arguments.push_str(&arguments);
                    }
                }
            }

            if choice.finish_reason.is_some() {
                self.finish_reason = choice.finish_reason;
            }
        }

        Ok(false)
    }

    fn finish(self) -> LlmResponse {
        let tool_calls = self
            .tool_calls
            .into_iter()
            .enumerate()
            .filter(|(_, tc)| !tc.name.is_empty())
            .map(|(i, tc)| ToolCallRequest {
                id: if tc.id.is_empty() { format!("tc_{i}") } else { tc.id },
                name: tc.name,
                arguments: parse_arguments(&tc.arguments),
            })
            .collect();

        LlmResponse {
            content: (!self.content.is_empty()).then_some(self.content),
            tool_calls,
            finish_reason: self.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage: self.usage,
        }
    }
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        let request = self.build_request(messages, tools, false);
        let response = self.send(&request).await?;
        let completion: ChatCompletion = response.json().await?;
        self.parse_response(completion)
    }

    async fn chat_streaming(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        observer: &dyn TurnObserver,
    ) -> Result<LlmResponse> {
        if !self.streaming {
            let response = self.chat(messages, tools).await?;
            if let Some(text) = response.content.as_deref().filter(|t| !t.is_empty()) {
                observer.on_token(text);
            }
            return Ok(response);
        }

        debug!("Streaming completion from {}", self.model);
        let request = self.build_request(messages, tools, true);
        let response = self.send(&request).await?;
        self.read_stream(response, observer).await
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}
