//! Tools module - lookup adapters the agent can call
//!
//! Every tool wraps one external information source behind a
//! `query -> text` contract. Tools fail soft: [`Tool::run`] never returns an
//! error, it hands back a short error description the agent can reason about.

mod runner;
mod arxiv;
mod web;
mod wikipedia;

pub use runner::{ToolRunner, ToolDefinition};
pub use arxiv::ArxivTool;
pub use web::WebSearchTool;
pub use wikipedia::WikipediaTool;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;
use crate::Result;

pub(crate) const USER_AGENT: &str = concat!("scout/", env!("CARGO_PKG_VERSION"));

/// Tool trait - interface for all agent tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in function calls
    fn name(&self) -> &str;

    /// Description the agent reads to decide when the tool applies
    fn description(&self) -> &str;

    /// Maximum characters [`Tool::run`] may return
    fn max_chars(&self) -> usize;

    /// JSON Schema for parameters
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                }
            },
            "required": ["query"]
        })
    }

    /// Query the upstream service
    async fn lookup(&self, query: &str) -> Result<String>;

    /// Query the upstream service, capped and with failures folded into text
    async fn run(&self, query: &str) -> String {
        let text = match self.lookup(query).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Tool {} failed: {}", self.name(), e);
                format!("{} error: {}", self.name(), e)
            }
        };
        truncate_chars(&text, self.max_chars())
    }

    /// Convert to tool definition for LLM
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Keep at most `max` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Decode the handful of entities that show up in Atom feeds and search HTML.
pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Dummy tool for testing
#[cfg(test)]
pub struct DummyTool {
    pub name: String,
    pub result: std::result::Result<String, String>,
}

#[cfg(test)]
impl DummyTool {
    pub fn ok(name: &str, result: &str) -> Self {
        Self { name: name.to_string(), result: Ok(result.to_string()) }
    }

    pub fn failing(name: &str, message: &str) -> Self {
        Self { name: name.to_string(), result: Err(message.to_string()) }
    }
}

#[cfg(test)]
#[async_trait]
impl Tool for DummyTool {
    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { "Dummy tool for testing" }
    fn max_chars(&self) -> usize { 250 }

    async fn lookup(&self, _query: &str) -> Result<String> {
        self.result.clone().map_err(crate::Error::Tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 250), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Fish &amp; Chips &lt;b&gt;"), "Fish & Chips <b>");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[tokio::test]
    async fn test_run_folds_errors_into_text() {
        let tool = DummyTool::failing("flaky", "upstream down");
        let out = tool.run("anything").await;
        assert!(out.starts_with("flaky error:"));
        assert!(out.contains("upstream down"));
    }

    #[tokio::test]
    async fn test_run_caps_output() {
        let tool = DummyTool::ok("long", &"x".repeat(1000));
        assert_eq!(tool.run("q").await.chars().count(), 250);
    }
}
