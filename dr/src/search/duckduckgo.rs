//! DuckDuckGo HTML results scraping

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;
use url::Url;

use super::{SearchError, SearchProvider};
use crate::fetch::USER_AGENT;
use crate::http::HttpTransport;

const ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Scrapes `a.result__a` anchors from the no-JavaScript results page
pub struct DuckDuckGoSearch {
    transport: Arc<dyn HttpTransport>,
    max_results: usize,
    anchor: Regex,
    class: Regex,
    href: Regex,
}

impl DuckDuckGoSearch {
    pub fn new(transport: Arc<dyn HttpTransport>, max_results: usize) -> Result<Self, SearchError> {
        debug!(max_results, "DuckDuckGoSearch::new: called");
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| SearchError::Parse {
                provider: "duckduckgo",
                message: e.to_string(),
            })
        };
        Ok(Self {
            transport,
            max_results,
            anchor: compile(r"(?is)<a\s[^>]*>")?,
            class: compile(r#"(?i)\bclass\s*=\s*["']([^"']*)["']"#)?,
            href: compile(r#"(?i)\bhref\s*=\s*["']([^"']*)["']"#)?,
        })
    }

    /// Result URLs in page order
    pub fn parse_results(&self, html: &str) -> Vec<String> {
        self.anchor
            .find_iter(html)
            .map(|m| m.as_str())
            .filter(|tag| {
                self.class
                    .captures(tag)
                    .map(|c| c[1].split_whitespace().any(|cls| cls == "result__a"))
                    .unwrap_or(false)
            })
            .filter_map(|tag| self.href.captures(tag).map(|c| c[1].to_string()))
            .filter_map(|href| resolve_href(&href))
            .take(self.max_results)
            .collect()
    }
}

/// Unwrap DuckDuckGo's `/l/?uddg=` redirect and keep only http(s) targets
fn resolve_href(raw: &str) -> Option<String> {
    let href = raw.replace("&amp;", "&");
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{}", href)
    } else {
        href
    };

    let parsed = Url::parse(&absolute).ok()?;
    let redirect = if parsed.path().starts_with("/l/") {
        parsed
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
    } else {
        None
    };
    let target = match redirect {
        Some(v) => Url::parse(&v).ok()?,
        None => parsed,
    };

    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        debug!(%query, "DuckDuckGoSearch::search: called");
        let url = Url::parse_with_params(ENDPOINT, &[("q", query)]).map_err(|e| SearchError::Parse {
            provider: "duckduckgo",
            message: e.to_string(),
        })?;

        let headers = [("User-Agent", USER_AGENT), ("Accept", "text/html")];
        let response = self.transport.get(url.as_str(), &headers).await?;
        if !response.is_success() {
            return Err(SearchError::Status {
                provider: "duckduckgo",
                status: response.status,
                message: response.text(),
            });
        }

        let results = self.parse_results(&response.text());
        debug!(count = results.len(), "DuckDuckGoSearch::search: parsed results");
        Ok(results)
    }
}
