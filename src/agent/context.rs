//! Context for a turn: the tool registry plus prompt flattening.
//!
//! The whole transcript is flattened into one prompt string:
//!
//! ```text
//! Assistant: Hi, I am a chatbot ...
//! User: What is machine learning?
//! User: What is machine learning?
//! Assistant:
//! ```
//!
//! The newest user line appears twice: once from the transcript and once as
//! the explicit input line. `agent.repeat_user_line = false` drops the repeat.

use crate::config::{AgentConfig, Config};
use crate::session::Turn;
use crate::tools::ToolRunner;

/// Context holds what every turn of a session shares.
#[derive(Clone)]
pub struct Context {
    pub tool_runner: ToolRunner,
    pub agent: AgentConfig,
}

impl Context {
    /// Create a new context from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            tool_runner: ToolRunner::new_with_defaults(&config.tools),
            agent: config.agent.clone(),
        }
    }

    /// Context with a caller-supplied tool set.
    pub fn with_tools(tool_runner: ToolRunner, agent: AgentConfig) -> Self {
        Self { tool_runner, agent }
    }

    /// Create a test context with no tools.
    #[cfg(test)]
    pub fn test() -> Self {
        Self::with_tools(ToolRunner::new(), AgentConfig::default())
    }

    /// Flatten `transcript` (already ending with the new user turn) and `input`
    /// into a single prompt with a trailing assistant cue.
    pub fn build_prompt(&self, transcript: &[Turn], input: &str) -> String {
        let mut lines = Vec::with_capacity(transcript.len() + 2);

        for turn in transcript {
            lines.push(format!("{}: {}", turn.role().label(), turn.text()));
        }

        let already_last = transcript
            .last()
            .is_some_and(|t| t.role() == crate::session::TurnRole::User && t.text() == input);
        if self.agent.repeat_user_line || !already_last {
            lines.push(format!("User: {}", input));
        }

        lines.push("Assistant:".to_string());
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Turn;

    fn transcript() -> Vec<Turn> {
        vec![
            Turn::assistant("Hi, how can I help?"),
            Turn::user("What is Rust?"),
            Turn::assistant("A systems language."),
            Turn::user("Who made it?"),
        ]
    }

    #[test]
    fn test_prompt_repeats_newest_user_line() {
        let ctx = Context::test();
        let prompt = ctx.build_prompt(&transcript(), "Who made it?");
        assert_eq!(
            prompt,
            "Assistant: Hi, how can I help?\n\
             User: What is Rust?\n\
             Assistant: A systems language.\n\
             User: Who made it?\n\
             User: Who made it?\n\
             Assistant:"
        );
    }

    #[test]
    fn test_prompt_without_repeat() {
        let mut ctx = Context::test();
        ctx.agent.repeat_user_line = false;
        let prompt = ctx.build_prompt(&transcript(), "Who made it?");
        assert_eq!(prompt.matches("User: Who made it?").count(), 1);
        assert!(prompt.ends_with("User: Who made it?\nAssistant:"));
    }

    #[test]
    fn test_prompt_keeps_order() {
        let ctx = Context::test();
        let turns = transcript();
        let prompt = ctx.build_prompt(&turns, "Who made it?");

        let mut cursor = 0;
        for turn in &turns {
            let found = prompt[cursor..].find(turn.text()).expect("turn text missing");
            cursor += found + turn.text().len();
        }
        assert!(prompt[cursor..].contains("Who made it?"));
    }
}
