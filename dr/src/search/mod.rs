//! Web search providers
//!
//! A provider turns a query into an ordered list of result URLs. Ranking and
//! deduplication are left to the provider.

mod api;
mod duckduckgo;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use api::{BraveSearch, SerpApiSearch, TavilySearch};
pub use duckduckgo::DuckDuckGoSearch;

use crate::http::{HttpTransport, TransportError};

/// Search failures
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("{provider} API error {status}: {message}")]
    Status {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("Failed to parse {provider} response: {message}")]
    Parse { provider: &'static str, message: String },

    #[error("No API key for {provider}. Set the {env} environment variable.")]
    MissingKey { provider: String, env: String },

    #[error("Unknown search provider: '{0}'. Supported: duckduckgo, tavily, brave, serpapi")]
    UnknownProvider(String),
}

/// Ranked URL source
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Result URLs for `query`, best first
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError>;
}

/// Search configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// duckduckgo, tavily, brave or serpapi
    pub provider: String,

    /// Environment variable holding the provider key; provider default when unset
    #[serde(rename = "api-key-env")]
    pub api_key_env: Option<String>,

    /// URLs returned per query
    #[serde(rename = "max-results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "duckduckgo".to_string(),
            api_key_env: None,
            max_results: 3,
        }
    }
}

impl SearchConfig {
    /// Key variable for the configured provider
    pub fn key_env(&self) -> Option<String> {
        if let Some(env) = &self.api_key_env {
            return Some(env.clone());
        }
        match self.provider.as_str() {
            "tavily" => Some("TAVILY_API_KEY".to_string()),
            "brave" => Some("BRAVE_API_KEY".to_string()),
            "serpapi" => Some("SERPAPI_KEY".to_string()),
            _ => None,
        }
    }
}

/// Create the configured provider, reading keys from the environment
pub fn create_provider(
    config: &SearchConfig,
    transport: Arc<dyn HttpTransport>,
) -> Result<Arc<dyn SearchProvider>, SearchError> {
    create_provider_with(config, transport, |name| std::env::var(name).ok())
}

/// Create the configured provider with an explicit key lookup
pub fn create_provider_with<F>(
    config: &SearchConfig,
    transport: Arc<dyn HttpTransport>,
    lookup: F,
) -> Result<Arc<dyn SearchProvider>, SearchError>
where
    F: Fn(&str) -> Option<String>,
{
    debug!(provider = %config.provider, "create_provider_with: called");
    let provider = config.provider.to_lowercase();
    let key = || -> Result<String, SearchError> {
        let env = config.key_env().unwrap_or_default();
        lookup(&env)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SearchError::MissingKey {
                provider: provider.clone(),
                env,
            })
    };

    match provider.as_str() {
        "duckduckgo" | "ddg" => Ok(Arc::new(DuckDuckGoSearch::new(transport, config.max_results)?)),
        "tavily" => Ok(Arc::new(TavilySearch::new(transport, key()?, config.max_results))),
        "brave" => Ok(Arc::new(BraveSearch::new(transport, key()?, config.max_results))),
        "serpapi" => Ok(Arc::new(SerpApiSearch::new(transport, key()?, config.max_results))),
        other => Err(SearchError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::ScriptedTransport;

    fn transport() -> Arc<dyn HttpTransport> {
        Arc::new(ScriptedTransport::default())
    }

    #[test]
    fn test_default_is_duckduckgo() {
        let config = SearchConfig::default();
        assert_eq!(config.provider, "duckduckgo");
        assert_eq!(config.max_results, 3);
        assert!(config.key_env().is_none());
        assert!(create_provider_with(&config, transport(), |_| None).is_ok());
    }

    #[test]
    fn test_keyed_provider_requires_key() {
        let config = SearchConfig {
            provider: "tavily".to_string(),
            ..Default::default()
        };
        let err = create_provider_with(&config, transport(), |_| None).err().unwrap();
        assert!(err.to_string().contains("TAVILY_API_KEY"));

        assert!(create_provider_with(&config, transport(), |_| Some("k".to_string())).is_ok());
    }

    #[test]
    fn test_custom_key_env() {
        let config = SearchConfig {
            provider: "brave".to_string(),
            api_key_env: Some("MY_BRAVE".to_string()),
            ..Default::default()
        };
        let provider = create_provider_with(&config, transport(), |name| {
            (name == "MY_BRAVE").then(|| "k".to_string())
        });
        assert!(provider.is_ok());
    }

    #[test]
    fn test_unknown_provider() {
        let config = SearchConfig {
            provider: "altavista".to_string(),
            ..Default::default()
        };
        let err = create_provider_with(&config, transport(), |_| None).err().unwrap();
        assert!(matches!(err, SearchError::UnknownProvider(_)));
    }
}
