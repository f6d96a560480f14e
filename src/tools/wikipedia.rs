//! Wikipedia lookup via the MediaWiki action API

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;
use crate::Result;
use crate::config::ToolsConfig;
use crate::error::Error;
use super::{Tool, USER_AGENT};

const NO_RESULT: &str = "No good Wikipedia Search Result was found";

/// Searches page titles, then returns the intro extract of the top hits.
pub struct WikipediaTool {
    client: Client,
    base_url: String,
    top_k: usize,
    max_chars: usize,
}

impl WikipediaTool {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.wikipedia_base(),
            top_k: config.top_k_results.max(1),
            max_chars: config.doc_content_chars_max,
        }
    }

    fn api_url(&self, params: &[(&str, &str)]) -> Result<Url> {
        let endpoint = format!("{}/w/api.php", self.base_url.trim_end_matches('/'));
        Url::parse_with_params(&endpoint, params)
            .map_err(|e| Error::Tool(format!("Invalid Wikipedia URL: {}", e)))
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        let response = self.client.get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Tool(format!("Wikipedia returned HTTP {}", status)));
        }
        Ok(response.json().await?)
    }

    async fn search_titles(&self, query: &str) -> Result<Vec<String>> {
        let limit = self.top_k.to_string();
        let url = self.api_url(&[
            ("action", "query"),
            ("list", "search"),
            ("srsearch", query),
            ("srlimit", &limit),
            ("format", "json"),
            ("utf8", "1"),
        ])?;

        let body = self.get_json(url).await?;
        let titles = body["query"]["search"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| hit["title"].as_str().map(str::to_string))
                    .take(self.top_k)
                    .collect()
            })
            .unwrap_or_default();
        Ok(titles)
    }

    async fn page_summary(&self, title: &str) -> Result<Option<String>> {
        let url = self.api_url(&[
            ("action", "query"),
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("redirects", "1"),
            ("format", "json"),
            ("titles", title),
        ])?;

        let body = self.get_json(url).await?;
        let extract = body["query"]["pages"]
            .as_object()
            .and_then(|pages| pages.values().next())
            .and_then(|page| page["extract"].as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(extract)
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str { "wikipedia" }

    fn description(&self) -> &str {
        "A wrapper around Wikipedia. Useful for when you need to answer general questions about \
         people, places, companies, facts, historical events, or other subjects. \
         Input should be a search query."
    }

    fn max_chars(&self) -> usize { self.max_chars }

    async fn lookup(&self, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        let titles = self.search_titles(query).await?;
        debug!("Wikipedia search for {:?} matched {} titles", query, titles.len());

        let mut summaries = Vec::with_capacity(titles.len());
        for title in &titles {
            // A page that fails to load is skipped, the others still count
            match self.page_summary(title).await {
                Ok(Some(summary)) => summaries.push(format!("Page: {}\nSummary: {}", title, summary)),
                Ok(None) => {}
                Err(e) => debug!("Skipping Wikipedia page {:?}: {}", title, e),
            }
        }

        if summaries.is_empty() {
            Ok(NO_RESULT.to_string())
        } else {
            Ok(summaries.join("\n\n"))
        }
    }
}
