//! Agent loop - reasoning with provider-native tool calling

use async_trait::async_trait;
use tracing::{debug, info};
use crate::Result;
use crate::config::ParseErrorPolicy;
use crate::error::Error;
use crate::tools::ToolRunner;
use super::llm::LlmClient;
use super::message::{Message, ToolCallRequest};
use super::observer::TurnObserver;
use super::reasoner::{FinishReason, Reasoner, Reply};

const SYSTEM_PROMPT: &str = "You are a helpful assistant with access to search tools. \
Use a tool when the question needs facts you are unsure of, otherwise answer directly. \
The user message is the conversation so far; reply to the last User line.";

const EMPTY_REPLY_NUDGE: &str = "Your last response was empty. Either call a tool or answer the question.";

/// The agent loop sends tool definitions to the model and executes the calls it makes
pub struct AgentLoop<C: LlmClient> {
    client: C,
    on_parse_error: ParseErrorPolicy,
}

impl<C: LlmClient> AgentLoop<C> {
    /// Create a new agent loop
    pub fn new(client: C, on_parse_error: ParseErrorPolicy) -> Self {
        Self {
            client,
            on_parse_error,
        }
    }

    async fn execute_tool(
        &self,
        tools: &ToolRunner,
        tool_call: &ToolCallRequest,
        observer: &dyn TurnObserver,
    ) -> String {
        debug!("Executing tool: {} with args: {}", tool_call.name, tool_call.arguments);
        observer.on_tool_call(&tool_call.name, &tool_call.arguments.to_string());

        let result = tools.run_with_args(&tool_call.name, &tool_call.arguments).await;

        debug!("Tool {} returned {} chars", tool_call.name, result.len());
        observer.on_tool_result(&tool_call.name, &result);
        result
    }
}

#[async_trait]
impl<C: LlmClient> Reasoner for AgentLoop<C> {
    async fn reason(
        &self,
        prompt: &str,
        tools: &ToolRunner,
        max_rounds: usize,
        observer: &dyn TurnObserver,
    ) -> Result<Reply> {
        let mut messages = vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)];
        let definitions = tools.definitions();

        info!("Starting agent loop with {} tools", definitions.len());

        for round in 1..=max_rounds {
            debug!("Iteration {}/{}", round, max_rounds);

            let response = self.client.chat_streaming(&messages, &definitions, observer).await?;
            let content = response.content.clone().unwrap_or_default();

            // Check if done
            if !response.has_tool_calls() {
                if !content.trim().is_empty() {
                    info!("Agent completed with response: {} chars", content.len());
                    return Ok(Reply::answer(content.trim(), round));
                }

                match self.on_parse_error {
                    ParseErrorPolicy::Retry => {
                        observer.on_thought(EMPTY_REPLY_NUDGE);
                        messages.push(Message::user(EMPTY_REPLY_NUDGE));
                        continue;
                    }
                    ParseErrorPolicy::Explain => {
                        return Ok(Reply {
                            text: "I could not put together an answer to that.".to_string(),
                            rounds: round,
                            finish: FinishReason::ParseErrorRecovered,
                        });
                    }
                    ParseErrorPolicy::Fail => {
                        return Err(Error::Llm("Model returned neither text nor tool calls".to_string()));
                    }
                }
            }

            if !content.trim().is_empty() {
                observer.on_thought(content.trim());
            }

            // Add assistant message with tool calls
            messages.push(Message::assistant_with_tools(content, response.tool_calls.clone()));

            // Execute tool calls
            for tool_call in &response.tool_calls {
                let result = self.execute_tool(tools, tool_call, observer).await;
                messages.push(Message::tool_result(&tool_call.id, result));
            }
        }

        info!("Agent loop hit the {} round cap", max_rounds);
        Ok(Reply::iteration_limit(max_rounds))
    }
}
