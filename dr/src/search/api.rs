//! Keyed JSON search APIs: Tavily, Brave, SerpAPI

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{SearchError, SearchProvider};
use crate::http::{HttpResponse, HttpTransport};

fn check(provider: &'static str, response: HttpResponse) -> Result<Value, SearchError> {
    if !response.is_success() {
        debug!(provider, status = response.status, "check: API error");
        return Err(SearchError::Status {
            provider,
            status: response.status,
            message: response.text(),
        });
    }
    serde_json::from_slice(&response.body).map_err(|e| SearchError::Parse {
        provider,
        message: e.to_string(),
    })
}

fn urls(results: Option<&Vec<Value>>, field: &str, max: usize) -> Vec<String> {
    results
        .map(|items| {
            items
                .iter()
                .filter_map(|r| r[field].as_str())
                .filter(|u| !u.is_empty())
                .take(max)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn build_url(provider: &'static str, base: &str, params: &[(&str, &str)]) -> Result<Url, SearchError> {
    Url::parse_with_params(base, params).map_err(|e| SearchError::Parse {
        provider,
        message: e.to_string(),
    })
}

/// Tavily search API
pub struct TavilySearch {
    transport: Arc<dyn HttpTransport>,
    api_key: String,
    max_results: usize,
}

impl TavilySearch {
    pub fn new(transport: Arc<dyn HttpTransport>, api_key: String, max_results: usize) -> Self {
        Self {
            transport,
            api_key,
            max_results,
        }
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        debug!(%query, "TavilySearch::search: called");
        let body = serde_json::json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": self.max_results,
            "search_depth": "basic"
        });
        let response = self
            .transport
            .post_json("https://api.tavily.com/search", &[], &body)
            .await?;
        let result = check("tavily", response)?;
        Ok(urls(result["results"].as_array(), "url", self.max_results))
    }
}

/// Brave Search API
pub struct BraveSearch {
    transport: Arc<dyn HttpTransport>,
    api_key: String,
    max_results: usize,
}

impl BraveSearch {
    pub fn new(transport: Arc<dyn HttpTransport>, api_key: String, max_results: usize) -> Self {
        Self {
            transport,
            api_key,
            max_results,
        }
    }
}

#[async_trait]
impl SearchProvider for BraveSearch {
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        debug!(%query, "BraveSearch::search: called");
        let count = self.max_results.to_string();
        let url = build_url(
            "brave",
            "https://api.search.brave.com/res/v1/web/search",
            &[("q", query), ("count", count.as_str())],
        )?;
        let headers = [("X-Subscription-Token", self.api_key.as_str()), ("Accept", "application/json")];
        let response = self.transport.get(url.as_str(), &headers).await?;
        let result = check("brave", response)?;
        Ok(urls(result["web"]["results"].as_array(), "url", self.max_results))
    }
}

/// SerpAPI Google results
pub struct SerpApiSearch {
    transport: Arc<dyn HttpTransport>,
    api_key: String,
    max_results: usize,
}

impl SerpApiSearch {
    pub fn new(transport: Arc<dyn HttpTransport>, api_key: String, max_results: usize) -> Self {
        Self {
            transport,
            api_key,
            max_results,
        }
    }
}

#[async_trait]
impl SearchProvider for SerpApiSearch {
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        debug!(%query, "SerpApiSearch::search: called");
        let num = self.max_results.to_string();
        let url = build_url(
            "serpapi",
            "https://serpapi.com/search",
            &[
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", num.as_str()),
                ("engine", "google"),
            ],
        )?;
        let response = self.transport.get(url.as_str(), &[]).await?;
        let result = check("serpapi", response)?;
        Ok(urls(result["organic_results"].as_array(), "link", self.max_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::{ScriptedTransport, json};
    use serde_json::json as j;

    #[tokio::test]
    async fn test_tavily_results() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json(
            200,
            j!({"results": [{"url": "https://a.example"}, {"url": "https://b.example"}, {"url": "https://c.example"}]}),
        ))]));
        let tavily = TavilySearch::new(transport.clone(), "key".to_string(), 2);
        let results = tavily.search("sleep").await.unwrap();

        assert_eq!(results, vec!["https://a.example", "https://b.example"]);
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, "POST");
        assert_eq!(sent.body.as_ref().unwrap()["query"], "sleep");
    }

    #[tokio::test]
    async fn test_brave_results_and_header() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json(
            200,
            j!({"web": {"results": [{"url": "https://a.example"}]}}),
        ))]));
        let brave = BraveSearch::new(transport.clone(), "token".to_string(), 3);
        let results = brave.search("sleep memory").await.unwrap();

        assert_eq!(results, vec!["https://a.example"]);
        let sent = &transport.requests()[0];
        assert_eq!(sent.header("x-subscription-token"), Some("token"));
        assert!(sent.url.contains("q=sleep+memory"));
    }

    #[tokio::test]
    async fn test_serpapi_no_results_is_empty() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json(200, j!({"search_metadata": {}})))]));
        let serp = SerpApiSearch::new(transport, "key".to_string(), 3);
        assert!(serp.search("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json(401, j!({"error": "bad key"})))]));
        let tavily = TavilySearch::new(transport, "key".to_string(), 3);
        let err = tavily.search("q").await.unwrap_err();
        assert!(matches!(err, SearchError::Status { status: 401, .. }));
    }
}
