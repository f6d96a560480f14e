//! Zero-shot ReAct reasoner.
//!
//! The model sees each tool's name and description and answers in a
//! `Thought / Action / Action Input / Observation` format until it writes a
//! `Final Answer:`. Works with any chat model, no function calling needed.

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use crate::config::ParseErrorPolicy;
use crate::error::Error;
use crate::tools::ToolRunner;
use crate::Result;

use super::llm::LlmClient;
use super::message::Message;
use super::observer::TurnObserver;
use super::reasoner::{FinishReason, Reasoner, Reply};

const FINAL_ANSWER: &str = "Final Answer:";

/// One parsed model step.
#[derive(Debug, Clone, PartialEq)]
enum Step {
    Action { tool: String, input: String, thought: String },
    Finish { answer: String, thought: String },
}

/// Why a model step could not be parsed. The message is shown to the model.
#[derive(Debug, Clone, PartialEq)]
struct ParseFailure(String);

pub struct ReactReasoner<C: LlmClient> {
    client: C,
    on_parse_error: ParseErrorPolicy,
}

impl<C: LlmClient> ReactReasoner<C> {
    pub fn new(client: C, on_parse_error: ParseErrorPolicy) -> Self {
        Self { client, on_parse_error }
    }

    fn render_prompt(&self, question: &str, tools: &ToolRunner, scratchpad: &str) -> String {
        format!(
            "Answer the following questions as best you can. You have access to the following tools:\n\n\
             {tools}\n\n\
             Use the following format:\n\n\
             Question: the input question you must answer\n\
             Thought: you should always think about what to do\n\
             Action: the action to take, should be one of [{names}]\n\
             Action Input: the input to the action\n\
             Observation: the result of the action\n\
             ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
             Thought: I now know the final answer\n\
             Final Answer: the final answer to the original input question\n\n\
             Begin!\n\n\
             Question: {question}\n\
             Thought:{scratchpad}",
            tools = tools.describe(),
            names = tools.tool_names().join(", "),
            question = question,
            scratchpad = scratchpad,
        )
    }
}

/// Drop anything after a hallucinated `Observation:`; observations come from tools.
fn cut_at_observation(text: &str) -> &str {
    match text.find("\nObservation:") {
        Some(idx) => &text[..idx],
        None => text,
    }
}

fn strip_thought_label(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix("Thought:").unwrap_or(text).trim().to_string()
}

fn parse_step(text: &str) -> std::result::Result<Step, ParseFailure> {
    let action = Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
        .map_err(|e| ParseFailure(format!("Invalid regex: {}", e)))?;

    let has_final = text.contains(FINAL_ANSWER);

    if let Some(caps) = action.captures(text) {
        if has_final {
            return Err(ParseFailure(
                "Parsing LLM output produced both a final answer and a parse-able action. \
                 Reply with either an Action or a Final Answer, not both."
                    .to_string(),
            ));
        }

        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let tool = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        let input = caps
            .get(2)
            .map(|m| m.as_str().trim().trim_matches('"').trim())
            .unwrap_or_default();

        return Ok(Step::Action {
            tool: tool.to_string(),
            input: input.to_string(),
            thought: strip_thought_label(&text[..start]),
        });
    }

    if let Some(idx) = text.find(FINAL_ANSWER) {
        return Ok(Step::Finish {
            answer: text[idx + FINAL_ANSWER.len()..].trim().to_string(),
            thought: strip_thought_label(&text[..idx]),
        });
    }

    let action_label = Regex::new(r"Action\s*\d*\s*:")
        .map_err(|e| ParseFailure(format!("Invalid regex: {}", e)))?;
    match action_label.find(text) {
        None => Err(ParseFailure("Invalid Format: Missing 'Action:' after 'Thought:'".to_string())),
        Some(_) => Err(ParseFailure(
            "Invalid Format: Missing 'Action Input:' after 'Action:'".to_string(),
        )),
    }
}

#[async_trait]
impl<C: LlmClient> Reasoner for ReactReasoner<C> {
    async fn reason(
        &self,
        prompt: &str,
        tools: &ToolRunner,
        max_rounds: usize,
        observer: &dyn TurnObserver,
    ) -> Result<Reply> {
        let mut scratchpad = String::new();

        for round in 1..=max_rounds {
            debug!("ReAct round {}/{}", round, max_rounds);

            let request = Message::user(self.render_prompt(prompt, tools, &scratchpad));
            let response = self.client.chat_streaming(&[request], &[], observer).await?;
            let raw = response.content.unwrap_or_default();
            let output = cut_at_observation(&raw);

            match parse_step(output) {
                Ok(Step::Finish { answer, thought }) => {
                    if !thought.is_empty() {
                        observer.on_thought(&thought);
                    }
                    info!("ReAct finished after {} rounds: {} chars", round, answer.len());
                    return Ok(Reply::answer(answer, round));
                }
                Ok(Step::Action { tool, input, thought }) => {
                    if !thought.is_empty() {
                        observer.on_thought(&thought);
                    }
                    observer.on_tool_call(&tool, &input);
                    let observation = tools.run(&tool, &input).await;
                    observer.on_tool_result(&tool, &observation);

                    scratchpad.push_str(output);
                    scratchpad.push_str(&format!("\nObservation: {}\nThought:", observation));
                }
                Err(ParseFailure(reason)) => {
                    debug!("Unparseable model output: {}", reason);
                    match self.on_parse_error {
                        ParseErrorPolicy::Retry => {
                            observer.on_thought(&reason);
                            scratchpad.push_str(output);
                            scratchpad.push_str(&format!("\nObservation: {}\nThought:", reason));
                        }
                        ParseErrorPolicy::Explain => {
                            let text = strip_thought_label(output);
                            let text = if text.is_empty() {
                                "I could not put together a well-formed answer to that.".to_string()
                            } else {
                                text
                            };
                            return Ok(Reply {
                                text,
                                rounds: round,
                                finish: FinishReason::ParseErrorRecovered,
                            });
                        }
                        ParseErrorPolicy::Fail => {
                            return Err(Error::Llm(format!(
                                "Could not parse LLM output `{}`: {}",
                                output.trim(),
                                reason
                            )));
                        }
                    }
                }
            }
        }

        info!("ReAct hit the {} round cap", max_rounds);
        Ok(Reply::iteration_limit(max_rounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::FakeLlmClient;
    use crate::agent::observer::{NullObserver, RecordingObserver, TurnEvent};
    use crate::agent::reasoner::ITERATION_LIMIT_REPLY;
    use crate::tools::DummyTool;

    fn tools() -> ToolRunner {
        let mut runner = ToolRunner::new();
        runner.register(DummyTool::ok("wikipedia", "Page: Rust\nSummary: A language."));
        runner
    }

    #[test]
    fn test_parse_action() {
        let step = parse_step(" I should look this up.\nAction: wikipedia\nAction Input: \"Rust language\"").unwrap();
        assert_eq!(
            step,
            Step::Action {
                tool: "wikipedia".to_string(),
                input: "Rust language".to_string(),
                thought: "I should look this up.".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_final_answer() {
        let step = parse_step(" I now know the final answer\nFinal Answer: Rust is a language.").unwrap();
        assert_eq!(
            step,
            Step::Finish {
                answer: "Rust is a language.".to_string(),
                thought: "I now know the final answer".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_step("Just chatting").unwrap_err().0,
            "Invalid Format: Missing 'Action:' after 'Thought:'"
        );
        assert_eq!(
            parse_step("Action: wikipedia").unwrap_err().0,
            "Invalid Format: Missing 'Action Input:' after 'Action:'"
        );
        assert!(parse_step("Action: Search\nAction Input: x\nFinal Answer: y").is_err());
    }

    #[test]
    fn test_cut_at_observation() {
        assert_eq!(
            cut_at_observation("Action: Search\nAction Input: x\nObservation: made up"),
            "Action: Search\nAction Input: x"
        );
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let client = FakeLlmClient::new(vec![" I know this.\nFinal Answer: Hello!"]);
        let reasoner = ReactReasoner::new(client, ParseErrorPolicy::Retry);
        let reply = reasoner.reason("User: hi\nAssistant:", &tools(), 3, &NullObserver).await.unwrap();
        assert_eq!(reply.text, "Hello!");
        assert_eq!(reply.rounds, 1);
        assert_eq!(reply.finish, FinishReason::Answer);
    }

    #[tokio::test]
    async fn test_tool_round_feeds_observation_back() {
        let client = FakeLlmClient::new(vec![
            " Look it up.\nAction: wikipedia\nAction Input: Rust",
            " I now know the final answer\nFinal Answer: Rust is a language.",
        ]);
        let observer = RecordingObserver::default();
        let reasoner = ReactReasoner::new(client, ParseErrorPolicy::Retry);
        let reply = reasoner.reason("What is Rust?", &tools(), 3, &observer).await.unwrap();

        assert_eq!(reply.text, "Rust is a language.");
        assert_eq!(reply.rounds, 2);

        let seen = reasoner.client.seen();
        let second_prompt = &seen[1][0].content;
        assert!(second_prompt.contains("Observation: Page: Rust\nSummary: A language.\nThought:"));
        assert!(second_prompt.contains("wikipedia: Dummy tool for testing"));

        let events = observer.events();
        assert!(events.contains(&TurnEvent::ToolCall {
            tool: "wikipedia".to_string(),
            input: "Rust".to_string()
        }));
        assert!(events.iter().any(|e| matches!(e, TurnEvent::ToolResult { .. })));
    }

    #[tokio::test]
    async fn test_round_cap_returns_partial_reply() {
        let looping = " Again.\nAction: wikipedia\nAction Input: Rust";
        let client = FakeLlmClient::new(vec![looping, looping, looping, looping]);
        let reasoner = ReactReasoner::new(client, ParseErrorPolicy::Retry);
        let reply = reasoner.reason("loop", &tools(), 3, &NullObserver).await.unwrap();

        assert_eq!(reply.text, ITERATION_LIMIT_REPLY);
        assert_eq!(reply.finish, FinishReason::IterationLimit);
        assert_eq!(reasoner.client.calls(), 3);
    }

    #[tokio::test]
    async fn test_parse_error_retry_then_answer() {
        let client = FakeLlmClient::new(vec!["Hmm, let me think", "Final Answer: 4"]);
        let reasoner = ReactReasoner::new(client, ParseErrorPolicy::Retry);
        let reply = reasoner.reason("2+2?", &tools(), 3, &NullObserver).await.unwrap();

        assert_eq!(reply.text, "4");
        let seen = reasoner.client.seen();
        let retry_prompt = &seen[1][0].content;
        assert!(retry_prompt.contains("Observation: Invalid Format: Missing 'Action:' after 'Thought:'"));
    }

    #[tokio::test]
    async fn test_parse_error_explain() {
        let client = FakeLlmClient::new(vec!["Thought: Paris is the capital of France."]);
        let reasoner = ReactReasoner::new(client, ParseErrorPolicy::Explain);
        let reply = reasoner.reason("Capital of France?", &tools(), 3, &NullObserver).await.unwrap();

        assert_eq!(reply.text, "Paris is the capital of France.");
        assert_eq!(reply.finish, FinishReason::ParseErrorRecovered);
    }

    #[tokio::test]
    async fn test_parse_error_fail() {
        let client = FakeLlmClient::new(vec!["no format at all"]);
        let reasoner = ReactReasoner::new(client, ParseErrorPolicy::Fail);
        let result = reasoner.reason("?", &tools(), 3, &NullObserver).await;
        assert!(matches!(result, Err(Error::Llm(_))));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_observation() {
        let client = FakeLlmClient::new(vec![
            "Action: google\nAction Input: rust",
            "Final Answer: done",
        ]);
        let reasoner = ReactReasoner::new(client, ParseErrorPolicy::Retry);
        reasoner.reason("?", &tools(), 3, &NullObserver).await.unwrap();

        let seen = reasoner.client.seen();
        let second_prompt = &seen[1][0].content;
        assert!(second_prompt.contains("google is not a valid tool, try one of [wikipedia]."));
    }
}
