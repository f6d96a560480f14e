//! arXiv lookup via the Atom export API

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::debug;
use url::Url;
use crate::Result;
use crate::config::ToolsConfig;
use crate::error::Error;
use super::{collapse_whitespace, decode_entities, truncate_chars, Tool, USER_AGENT};

const NO_RESULT: &str = "No good Arxiv Result was found";

/// The export API rejects very long search queries.
const MAX_QUERY_CHARS: usize = 300;

/// One `<entry>` of the Atom feed.
#[derive(Debug, Clone, PartialEq)]
struct Paper {
    published: String,
    title: String,
    authors: Vec<String>,
    summary: String,
}

impl Paper {
    fn render(&self) -> String {
        format!(
            "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
            self.published,
            self.title,
            self.authors.join(", "),
            self.summary
        )
    }
}

pub struct ArxivTool {
    client: Client,
    endpoint: String,
    top_k: usize,
    max_chars: usize,
}

impl ArxivTool {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.arxiv_url.clone(),
            top_k: config.top_k_results.max(1),
            max_chars: config.doc_content_chars_max,
        }
    }
}

fn tag_pattern(tag: &str) -> Result<Regex> {
    Regex::new(&format!(r"(?s)<{tag}[^>]*>(.*?)</{tag}>"))
        .map_err(|e| Error::Tool(format!("Invalid regex: {}", e)))
}

fn first_tag(re: &Regex, block: &str) -> String {
    re.captures(block)
        .and_then(|c| c.get(1))
        .map(|m| collapse_whitespace(&decode_entities(m.as_str())))
        .unwrap_or_default()
}

fn parse_feed(xml: &str) -> Result<Vec<Paper>> {
    let entry = tag_pattern("entry")?;
    let published = tag_pattern("published")?;
    let title = tag_pattern("title")?;
    let name = tag_pattern("name")?;
    let summary = tag_pattern("summary")?;

    let papers = entry
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|block| {
            let block = block.as_str();
            // Only the date part of the timestamp
            let published = first_tag(&published, block).chars().take(10).collect();
            Paper {
                published,
                title: first_tag(&title, block),
                authors: name
                    .captures_iter(block)
                    .filter_map(|c| c.get(1))
                    .map(|m| collapse_whitespace(&decode_entities(m.as_str())))
                    .collect(),
                summary: first_tag(&summary, block),
            }
        })
        .filter(|p| !p.title.is_empty())
        .collect();

    Ok(papers)
}

#[async_trait]
impl Tool for ArxivTool {
    fn name(&self) -> &str { "arxiv" }

    fn description(&self) -> &str {
        "A wrapper around Arxiv.org. Useful for when you need to answer questions about Physics, \
         Mathematics, Computer Science, Quantitative Biology, Quantitative Finance, Statistics, \
         Electrical Engineering, and Economics from scientific articles on arxiv.org. \
         Input should be a search query."
    }

    fn max_chars(&self) -> usize { self.max_chars }

    async fn lookup(&self, query: &str) -> Result<String> {
        let query = truncate_chars(query.trim(), MAX_QUERY_CHARS);
        if query.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        let max_results = self.top_k.to_string();
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("search_query", query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
            ],
        )
        .map_err(|e| Error::Tool(format!("Invalid arXiv URL: {}", e)))?;

        let response = self.client.get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| Error::Tool(format!("Arxiv exception: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Tool(format!("Arxiv exception: HTTP {}", status)));
        }

        let feed = response.text().await?;
        let papers = parse_feed(&feed)?;
        debug!("arXiv query {:?} returned {} entries", query, papers.len());

        if papers.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        Ok(papers
            .iter()
            .take(self.top_k)
            .map(Paper::render)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=all:attention</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All You
      Need</title>
    <summary>  The dominant sequence transduction models are based on complex
recurrent &amp; convolutional neural networks.</summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed() {
        let papers = parse_feed(FEED).unwrap();
        assert_eq!(papers.len(), 1);
        let paper = &papers[0];
        assert_eq!(paper.published, "2017-06-12");
        assert_eq!(paper.title, "Attention Is All You Need");
        assert_eq!(paper.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert!(paper.summary.starts_with("The dominant sequence"));
        assert!(paper.summary.contains("recurrent & convolutional"));
    }

    #[test]
    fn test_parse_feed_ignores_feed_title() {
        let papers = parse_feed("<feed><title>ArXiv Query</title></feed>").unwrap();
        assert!(papers.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_renders_and_caps() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("search_query", "attention"))
            .and(query_param("max_results", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .expect(1)
            .mount(&server)
            .await;

        let config = ToolsConfig {
            arxiv_url: format!("{}/api/query", server.uri()),
            doc_content_chars_max: 60,
            ..ToolsConfig::default()
        };
        let out = ArxivTool::new(&config).run("attention").await;
        assert!(out.starts_with("Published: 2017-06-12\nTitle: Attention Is All You Need"));
        assert_eq!(out.chars().count(), 60);
    }

    #[test]
    fn test_empty_query_skips_network() {
        let config = ToolsConfig {
            arxiv_url: "http://127.0.0.1:9/unreachable".to_string(),
            ..ToolsConfig::default()
        };
        let out = tokio_test::block_on(ArxivTool::new(&config).run("   "));
        assert_eq!(out, NO_RESULT);
    }
}
