//! Web collaborators used by the research pipeline: search, result
//! simplification, and page fetching.
//!
//! Search uses the Tavily API if a key is configured, otherwise DuckDuckGo HTML.

mod fetch;
mod search;
mod simplify;

pub use fetch::{extract_text_from_html, HttpFetcher};
pub use search::{search_provider, DuckDuckGoSearch, TavilySearch};
pub use simplify::DefaultSimplifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A result as returned by a search provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Provider relevance score, when the provider reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// A candidate source for the research loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Run one query. An empty vector means the provider found nothing.
    async fn search(&self, query: &str) -> anyhow::Result<Vec<RawSearchResult>>;
}

/// Turns raw provider results into an ordered list of candidate sources.
pub trait ResultSimplifier: Send + Sync {
    fn simplify(&self, raw: Vec<RawSearchResult>) -> Vec<SearchResult>;
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Readable text of the page at `url`. `Ok("")` means the page had no text.
    async fn fetch(&self, url: &str) -> anyhow::Result<String>;
}
