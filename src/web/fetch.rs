//! Page fetching: download a URL and reduce it to readable text.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use super::search::html_decode;
use super::PageFetcher;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; research-agent/0.3)";

/// Fetches pages over HTTP. HTML bodies are converted to plain text; other
/// text bodies are returned as-is.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_timeout(Duration::from_secs(60))
    }

    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            anyhow::bail!("HTTP error: {}", status);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();

        if !is_textual(&content_type) {
            anyhow::bail!("Unsupported content type: {}", content_type);
        }

        let body = response.text().await?;
        tracing::debug!(url = %url, bytes = body.len(), "Fetched page");

        if content_type.is_empty() || content_type.contains("html") {
            Ok(extract_text_from_html(&body))
        } else {
            Ok(body.trim().to_string())
        }
    }
}

fn is_textual(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.starts_with("text/")
        || content_type.contains("json")
        || content_type.contains("xml")
}

/// Extract readable text from HTML: drop scripts, styles and markup, collapse whitespace.
pub fn extract_text_from_html(html: &str) -> String {
    let mut text = html.to_string();
    for pattern in [
        r"(?is)<script\b.*?</script\s*>",
        r"(?is)<style\b.*?</style\s*>",
        r"(?is)<noscript\b.*?</noscript\s*>",
        r"(?s)<!--.*?-->",
    ] {
        if let Ok(re) = Regex::new(pattern) {
            text = re.replace_all(&text, " ").into_owned();
        }
    }

    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                result.push(' ');
            }
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    let collapsed = result.split_whitespace().collect::<Vec<_>>().join(" ");
    html_decode(&collapsed)
}
