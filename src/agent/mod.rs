//! Agent module - everything between a user turn and its reply.
//!
//! This module contains:
//! - Message types for provider requests
//! - LLM client trait and the Groq implementation
//! - The [`Reasoner`] capability and its two strategies (ReAct, native tool calling)
//! - Turn observers for live progress
//! - Context for prompt flattening
//!
//! # Adding a New LLM Provider
//!
//! See [`llm::ProviderRegistry`] for instructions.

mod context;
mod loop_impl;
mod message;
mod react;
pub mod observer;
pub mod reasoner;

// LLM providers in submodule
pub mod llm;

// Re-exports for convenience
pub use context::Context;
pub use llm::{GroqClient, LlmClient, LlmResponse, ProviderRegistry, Usage};
pub use loop_impl::AgentLoop;
pub use message::{Message, Role, ToolCallRequest};
pub use observer::{ChannelObserver, NullObserver, TurnEvent, TurnObserver};
pub use react::ReactReasoner;
pub use reasoner::{
    DefaultReasonerFactory, FinishReason, Reasoner, ReasonerFactory, Reply, ITERATION_LIMIT_REPLY,
};
