//! DuckDuckGo instant-answer search

use std::time::Duration;

use anyhow::{Context, Result};
use cag_core::WebSearch;
use serde_json::Value;
use tracing::debug;

const DUCKDUCKGO_API_URL: &str = "https://api.duckduckgo.com/";

/// [`WebSearch`] over the DuckDuckGo instant-answer JSON API
pub struct DuckDuckGo {
    client: reqwest::blocking::Client,
    base_url: String,
    max_results: usize,
}

impl DuckDuckGo {
    pub fn new(max_results: usize) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("cag/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: DUCKDUCKGO_API_URL.to_string(),
            max_results,
        })
    }

    /// Point at another endpoint speaking the same JSON format
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl WebSearch for DuckDuckGo {
    fn search(&self, query: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}?q={}&format=json&no_redirect=1&no_html=1",
            self.base_url,
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .context("DuckDuckGo request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("DuckDuckGo search failed: {}", response.status());
        }

        let payload: Value = response
            .json()
            .context("DuckDuckGo returned invalid JSON")?;
        let snippets = parse_instant_answer(&payload, self.max_results);
        debug!("DuckDuckGo returned {} snippets for {:?}", snippets.len(), query);
        Ok(snippets)
    }
}

/// Snippets from an instant-answer payload: the abstract first, then
/// `Results`, then `RelatedTopics` (flattening nested topic groups)
pub fn parse_instant_answer(payload: &Value, max_results: usize) -> Vec<String> {
    let mut snippets = Vec::new();

    if let Some(abstract_text) = payload.get("AbstractText").and_then(|v| v.as_str()) {
        if !abstract_text.is_empty() {
            snippets.push(abstract_text.to_string());
        }
    }
    if let Some(items) = payload.get("Results").and_then(|v| v.as_array()) {
        collect_topics(items, &mut snippets);
    }
    if let Some(items) = payload.get("RelatedTopics").and_then(|v| v.as_array()) {
        collect_topics(items, &mut snippets);
    }

    snippets.truncate(max_results);
    snippets
}

fn collect_topics(items: &[Value], snippets: &mut Vec<String>) {
    for item in items {
        if let Some(topics) = item.get("Topics").and_then(|v| v.as_array()) {
            collect_topics(topics, snippets);
            continue;
        }
        let text = item.get("Text").and_then(|v| v.as_str()).unwrap_or("");
        if !text.is_empty() {
            snippets.push(text.to_string());
        }
    }
}
