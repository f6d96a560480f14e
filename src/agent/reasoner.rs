//! The reasoning capability a turn delegates to.
//!
//! A [`Reasoner`] takes the flattened prompt and the tool registry and decides
//! between answering directly and calling tools. Implementations are built per
//! turn by a [`ReasonerFactory`], so the turn controller never knows which
//! strategy or provider is behind it.

use async_trait::async_trait;
use serde::Serialize;

use crate::auth::Credential;
use crate::config::{Config, ReasonerKind};
use crate::tools::ToolRunner;
use crate::Result;

use super::llm::ProviderRegistry;
use super::loop_impl::AgentLoop;
use super::observer::TurnObserver;
use super::react::ReactReasoner;

/// Reply used when the round cap is hit before a final answer.
pub const ITERATION_LIMIT_REPLY: &str = "Agent stopped due to iteration limit or time limit.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model produced a final answer.
    Answer,
    /// The round cap was reached.
    IterationLimit,
    /// Output could not be parsed and was returned as-is.
    ParseErrorRecovered,
}

/// Final result of one turn's reasoning.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub text: String,
    /// Model calls made
    pub rounds: usize,
    pub finish: FinishReason,
}

impl Reply {
    pub fn answer(text: impl Into<String>, rounds: usize) -> Self {
        Self { text: text.into(), rounds, finish: FinishReason::Answer }
    }

    pub fn iteration_limit(rounds: usize) -> Self {
        Self {
            text: ITERATION_LIMIT_REPLY.to_string(),
            rounds,
            finish: FinishReason::IterationLimit,
        }
    }
}

#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Run at most `max_rounds` model calls and return one reply.
    async fn reason(
        &self,
        prompt: &str,
        tools: &ToolRunner,
        max_rounds: usize,
        observer: &dyn TurnObserver,
    ) -> Result<Reply>;
}

/// Builds a reasoner for one turn from the session credential.
pub trait ReasonerFactory: Send + Sync {
    fn create(&self, credential: &Credential) -> Result<Box<dyn Reasoner>>;
}

/// Provider client from config, wrapped in the configured strategy.
pub struct DefaultReasonerFactory {
    config: Config,
}

impl DefaultReasonerFactory {
    pub fn new(config: &Config) -> Self {
        Self { config: config.clone() }
    }
}

impl ReasonerFactory for DefaultReasonerFactory {
    fn create(&self, credential: &Credential) -> Result<Box<dyn Reasoner>> {
        let client = ProviderRegistry::create(&self.config, credential)?;
        let policy = self.config.agent.on_parse_error;

        Ok(match self.config.agent.kind {
            ReasonerKind::React => Box::new(ReactReasoner::new(client, policy)),
            ReasonerKind::ToolCalling => Box::new(AgentLoop::new(client, policy)),
        })
    }
}
