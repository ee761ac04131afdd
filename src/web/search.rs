//! Search providers: Tavily API (preferred) and DuckDuckGo HTML (fallback).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{RawSearchResult, SearchProvider};

const TAVILY_URL: &str = "https://api.tavily.com/search";
const DUCKDUCKGO_URL: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; research-agent/0.3)";

/// Pick Tavily when a key is available, DuckDuckGo otherwise.
pub fn search_provider(tavily_api_key: Option<&str>) -> anyhow::Result<Arc<dyn SearchProvider>> {
    match tavily_api_key.filter(|key| !key.is_empty()) {
        Some(key) => Ok(Arc::new(TavilySearch::new(key.to_string())?)),
        None => {
            tracing::info!("TAVILY_API_KEY not set, using DuckDuckGo search");
            Ok(Arc::new(DuckDuckGoSearch::new()?))
        }
    }
}

/// Search using the Tavily API.
pub struct TavilySearch {
    client: reqwest::Client,
    api_key: String,
    max_results: u32,
}

#[derive(Debug, Serialize)]
struct TavilySearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct TavilySearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f64>,
}

impl TavilySearch {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_key,
            max_results: 10,
        })
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<RawSearchResult>> {
        let request = TavilySearchRequest {
            api_key: &self.api_key,
            query,
            max_results: self.max_results,
            include_answer: false,
            include_raw_content: false,
        };

        let response = self.client.post(TAVILY_URL).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Tavily API error ({}): {}", status, error_text);
        }

        let parsed: TavilySearchResponse = response.json().await?;
        Ok(parsed
            .results
            .into_iter()
            .map(|r| RawSearchResult {
                title: r.title,
                url: r.url,
                snippet: r.content,
                score: r.score,
            })
            .collect())
    }
}

/// Fallback search using DuckDuckGo HTML (may be blocked by CAPTCHA).
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo"
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<RawSearchResult>> {
        let url = format!("{}?q={}", DUCKDUCKGO_URL, urlencoding::encode(query));
        let html = self.client.get(&url).send().await?.text().await?;

        if html.contains("anomaly-modal") || html.contains("Unfortunately, bots") {
            anyhow::bail!(
                "DuckDuckGo blocked the request with CAPTCHA. Configure TAVILY_API_KEY for reliable web search."
            );
        }

        Ok(parse_duckduckgo_results(&html))
    }
}

/// Extract results from DuckDuckGo's HTML result page.
fn parse_duckduckgo_results(html: &str) -> Vec<RawSearchResult> {
    let mut results = Vec::new();

    for chunk in html.split("class=\"result__body\"").skip(1) {
        let Some(anchor) = chunk.split("class=\"result__a\"").nth(1) else {
            continue;
        };

        let href = anchor
            .split("href=\"")
            .nth(1)
            .and_then(|s| s.split('"').next())
            .unwrap_or("");
        let title = anchor
            .split('>')
            .nth(1)
            .and_then(|s| s.split('<').next())
            .unwrap_or("")
            .trim();
        let snippet = chunk
            .split("class=\"result__snippet\"")
            .nth(1)
            .and_then(|s| s.split('>').nth(1))
            .and_then(|s| s.split('<').next())
            .unwrap_or("")
            .trim();

        let url = resolve_duckduckgo_link(&html_decode(href));
        if title.is_empty() || url.is_empty() {
            continue;
        }

        results.push(RawSearchResult {
            title: html_decode(title),
            url,
            snippet: html_decode(snippet),
            score: None,
        });
    }

    results
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>&rut=...`.
fn resolve_duckduckgo_link(href: &str) -> String {
    if let Some(encoded) = href.split("uddg=").nth(1) {
        let encoded = encoded.split('&').next().unwrap_or("");
        return urlencoding::decode(encoded)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_default();
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    href.to_string()
}

/// Basic HTML entity decoding.
pub(crate) fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
}
