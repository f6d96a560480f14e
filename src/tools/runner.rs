//! Tool runner - the ordered tool registry handed to the agent

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::config::ToolsConfig;
use super::Tool;
use super::arxiv::ArxivTool;
use super::web::WebSearchTool;
use super::wikipedia::WikipediaTool;

/// Tool definition for LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool runner keeps tools in registration order and executes them by name.
///
/// Order matters: it is the order tools are listed to the model.
#[derive(Clone)]
pub struct ToolRunner {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRunner {
    /// Create an empty tool runner
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Web search, arXiv and Wikipedia, in that order
    pub fn new_with_defaults(config: &ToolsConfig) -> Self {
        let mut runner = Self::new();
        runner.register(WebSearchTool::new(config));
        runner.register(ArxivTool::new(config));
        runner.register(WikipediaTool::new(config));
        runner
    }

    /// Register a tool. A tool with the same name replaces the earlier one in place.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let tool: Arc<dyn Tool> = Arc::new(tool);
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get tool definitions for LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Run a tool by name. Unknown tools come back as an observation, not an error.
    pub async fn run(&self, name: &str, query: &str) -> String {
        match self.get(name) {
            Some(tool) => tool.run(query).await,
            None => format!(
                "{} is not a valid tool, try one of [{}].",
                name,
                self.tool_names().join(", ")
            ),
        }
    }

    /// Run a tool with function-call style arguments.
    pub async fn run_with_args(&self, name: &str, args: &Value) -> String {
        self.run(name, &query_from_args(args)).await
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Check if a tool exists
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// List registered tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// `name: description` lines, one per tool
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull the query text out of tool-call arguments.
///
/// Models send `{"query": "..."}`, occasionally `{"input": "..."}` or a bare string.
fn query_from_args(args: &Value) -> String {
    match args {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("query")
            .or_else(|| map.get("input"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| args.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::DummyTool;
    use serde_json::json;

    #[tokio::test]
    async fn test_tool_runner_register_and_run() {
        let mut runner = ToolRunner::new();
        runner.register(DummyTool::ok("test_tool", "success"));

        assert!(runner.has("test_tool"));

        let result = runner.run("test_tool", "q").await;
        assert_eq!(result, "success");
    }

    #[tokio::test]
    async fn test_tool_runner_unknown_tool() {
        let mut runner = ToolRunner::new();
        runner.register(DummyTool::ok("Search", "x"));
        let result = runner.run("Google", "q").await;
        assert_eq!(result, "Google is not a valid tool, try one of [Search].");
    }

    #[test]
    fn test_default_registry_order() {
        let runner = ToolRunner::new_with_defaults(&ToolsConfig::default());
        assert_eq!(runner.tool_names(), vec!["Search", "arxiv", "wikipedia"]);
        assert!(runner.describe().starts_with("Search: "));
    }

    #[test]
    fn test_register_same_name_replaces_in_place() {
        let mut runner = ToolRunner::new();
        runner.register(DummyTool::ok("a", "1"));
        runner.register(DummyTool::ok("b", "2"));
        runner.register(DummyTool::ok("a", "3"));
        assert_eq!(runner.tool_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_query_from_args() {
        assert_eq!(query_from_args(&json!({"query": "rust"})), "rust");
        assert_eq!(query_from_args(&json!({"input": "tokio"})), "tokio");
        assert_eq!(query_from_args(&json!("bare")), "bare");
    }
}
