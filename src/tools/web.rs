//! Web search via the DuckDuckGo HTML endpoint (no API key needed)

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::debug;
use crate::Result;
use crate::config::ToolsConfig;
use crate::error::Error;
use super::{collapse_whitespace, decode_entities, Tool, USER_AGENT};

const NO_RESULT: &str = "No good DuckDuckGo Search Result was found";

/// Web search tool, returns result snippets joined into one paragraph
pub struct WebSearchTool {
    client: Client,
    endpoint: String,
    max_results: usize,
    max_chars: usize,
}

impl WebSearchTool {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.duckduckgo_url.clone(),
            max_results: config.search_max_results.max(1),
            max_chars: config.doc_content_chars_max,
        }
    }
}

/// Extract result snippets from DuckDuckGo HTML.
fn extract_snippets(html: &str, limit: usize) -> Result<Vec<String>> {
    let snippet = Regex::new(r#"(?s)class="result__snippet"[^>]*>(.*?)</(?:a|div|td)>"#)
        .map_err(|e| Error::Tool(format!("Invalid regex: {}", e)))?;
    let tags = Regex::new(r"<[^>]+>")
        .map_err(|e| Error::Tool(format!("Invalid regex: {}", e)))?;

    Ok(snippet
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| collapse_whitespace(&decode_entities(&tags.replace_all(m.as_str(), ""))))
        .filter(|s| !s.is_empty())
        .take(limit)
        .collect())
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str { "Search" }

    fn description(&self) -> &str {
        "Useful for answering questions about current events or general web search."
    }

    fn max_chars(&self) -> usize { self.max_chars }

    async fn lookup(&self, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        let response = self.client.post(&self.endpoint)
            .header("User-Agent", USER_AGENT)
            .form(&[("q", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Tool(format!("HTTP error: {}", status)));
        }

        let html = response.text().await?;
        let snippets = extract_snippets(&html, self.max_results)?;
        debug!("Web search for {:?} returned {} snippets", query, snippets.len());

        if snippets.is_empty() {
            Ok(NO_RESULT.to_string())
        } else {
            Ok(snippets.join(" "))
        }
    }
}
