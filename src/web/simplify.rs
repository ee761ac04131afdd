use std::collections::HashSet;

use url::Url;

use super::{RawSearchResult, ResultSimplifier, SearchResult};

/// Keeps results with an http(s) link and drops repeated links, in provider order.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSimplifier;

impl ResultSimplifier for DefaultSimplifier {
    fn simplify(&self, raw: Vec<RawSearchResult>) -> Vec<SearchResult> {
        let mut seen = HashSet::new();
        raw.into_iter()
            .filter_map(|r| {
                let link = normalize_link(&r.url)?;
                if !seen.insert(link.clone()) {
                    return None;
                }
                Some(SearchResult {
                    title: r.title.trim().to_string(),
                    link,
                    snippet: r.snippet.trim().to_string(),
                })
            })
            .collect()
    }
}

/// Parse and strip the fragment; `None` for anything that is not http(s).
fn normalize_link(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(url: &str) -> RawSearchResult {
        RawSearchResult {
            title: format!(" {} ", url),
            url: url.to_string(),
            snippet: String::new(),
            score: None,
        }
    }

    #[test]
    fn drops_non_web_links_and_duplicates_keeping_order() {
        let out = DefaultSimplifier.simplify(vec![
            raw("https://b.example/"),
            raw("javascript:void(0)"),
            raw("https://a.example/page#intro"),
            raw("not a url"),
            raw("https://b.example/"),
            raw("https://a.example/page"),
            raw("ftp://files.example/x"),
        ]);

        let links: Vec<&str> = out.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(links, vec!["https://b.example/", "https://a.example/page"]);
        assert_eq!(out[0].title, "https://b.example/");
    }
}
