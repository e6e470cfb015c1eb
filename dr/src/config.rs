//! Deep research configuration types and loading

use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::llm::RetryPolicy;
use crate::scoring::ScoringConfig;
use crate::search::SearchConfig;

/// Main configuration file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model service configuration
    pub llm: LlmConfig,

    /// Research loop limits
    pub research: ResearchConfig,

    /// Source reliability rules
    pub scoring: ScoringConfig,

    /// Web search provider
    pub search: SearchConfig,

    /// Finding store location
    pub storage: StorageConfig,

    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .deepresearch.yml
        let local_config = PathBuf::from(".deepresearch.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/deepresearch/deepresearch.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("deepresearch").join("deepresearch.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply the process environment on top of the loaded file
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    ///
    /// Recognized: `OPENAI_MODEL`, `MAX_SUBTASKS`, `MAX_PAGES_PER_TASK`,
    /// `MAX_CHUNKS_PER_DOC`, `MAX_DEPTH`. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(model) = get("OPENAI_MODEL") {
            debug!(%model, "apply_overrides_from: OPENAI_MODEL");
            self.llm.model = model.trim().to_string();
        }
        if let Some(v) = get("MAX_SUBTASKS") {
            self.research.max_subtasks = parse_count("MAX_SUBTASKS", &v)?;
        }
        if let Some(v) = get("MAX_PAGES_PER_TASK") {
            self.research.max_pages_per_task = parse_count("MAX_PAGES_PER_TASK", &v)?;
        }
        if let Some(v) = get("MAX_CHUNKS_PER_DOC") {
            self.research.max_chunks_per_doc = parse_count("MAX_CHUNKS_PER_DOC", &v)?;
        }
        if let Some(v) = get("MAX_DEPTH") {
            self.research.max_depth = parse_count("MAX_DEPTH", &v)?;
        }
        Ok(())
    }
}

fn parse_count(name: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse::<usize>()
        .context(format!("{} must be a non-negative integer, got '{}'", name, value))
}

/// Model service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Retry envelope for transient failures
    pub retry: RetryPolicy,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            timeout_ms: 120_000,
            retry: RetryPolicy::default(),
        }
    }
}

/// Research loop limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Sub-questions kept per planning or refinement round
    #[serde(rename = "max-subtasks")]
    pub max_subtasks: usize,

    /// Search results fetched per sub-question
    #[serde(rename = "max-pages-per-task")]
    pub max_pages_per_task: usize,

    /// Refinement rounds after the initial report
    #[serde(rename = "max-depth")]
    pub max_depth: usize,

    /// Chunks summarized per long document
    #[serde(rename = "max-chunks-per-doc")]
    pub max_chunks_per_doc: usize,

    /// Characters per chunk; also the single-call threshold
    #[serde(rename = "chunk-size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(rename = "chunk-overlap")]
    pub chunk_overlap: usize,

    /// Skip a page whose fetch or summary fails instead of aborting
    #[serde(rename = "skip-failed-pages")]
    pub skip_failed_pages: bool,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_subtasks: 5,
            max_pages_per_task: 5,
            max_depth: 2,
            max_chunks_per_doc: 12,
            chunk_size: 8000,
            chunk_overlap: 400,
            skip_failed_pages: true,
        }
    }
}

/// Finding store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file; defaults to the platform data directory
    #[serde(rename = "db-path")]
    pub db_path: Option<PathBuf>,

    /// Persist findings at all
    pub enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            enabled: true,
        }
    }
}

/// Immutable per-run configuration
///
/// Built once from the loaded [`Config`] after every override has been
/// applied. Holds the credential, so `Debug` redacts it.
#[derive(Clone)]
pub struct RunConfig {
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub research: ResearchConfig,
    pub scoring: ScoringConfig,
    pub search: SearchConfig,
    /// `None` disables persistence
    pub db_path: Option<PathBuf>,
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("research", &self.research)
            .field("scoring", &self.scoring)
            .field("search", &self.search)
            .field("db_path", &self.db_path)
            .finish()
    }
}

impl RunConfig {
    /// Resolve against the process environment
    pub fn resolve(config: &Config) -> Result<Self> {
        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    /// Resolve with an explicit variable lookup for the credential
    pub fn resolve_with<F>(config: &Config, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        debug!(model = %config.llm.model, "RunConfig::resolve_with: called");
        let api_key = match lookup(&config.llm.api_key_env) {
            Some(key) if !key.trim().is_empty() => key.trim().to_string(),
            _ => bail!(
                "Missing API key. Set the {} environment variable.",
                config.llm.api_key_env
            ),
        };

        validate(config)?;

        let db_path = if config.storage.enabled {
            Some(
                config
                    .storage
                    .db_path
                    .clone()
                    .unwrap_or_else(findingstore::default_db_path),
            )
        } else {
            None
        };

        Ok(Self {
            model: config.llm.model.clone(),
            api_key,
            base_url: config.llm.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.llm.timeout_ms),
            retry: config.llm.retry.clone(),
            research: config.research.clone(),
            scoring: config.scoring.clone(),
            search: config.search.clone(),
            db_path,
        })
    }
}

fn validate(config: &Config) -> Result<()> {
    let r = &config.research;
    if config.llm.model.trim().is_empty() {
        bail!("llm.model must not be empty");
    }
    if config.llm.retry.max_attempts == 0 {
        bail!("llm.retry.max-attempts must be at least 1");
    }
    if r.max_subtasks == 0 {
        bail!("research.max-subtasks must be at least 1");
    }
    if r.max_pages_per_task == 0 {
        bail!("research.max-pages-per-task must be at least 1");
    }
    if r.max_chunks_per_doc == 0 {
        bail!("research.max-chunks-per-doc must be at least 1");
    }
    if r.chunk_size == 0 {
        bail!("research.chunk-size must be at least 1");
    }
    if r.chunk_overlap >= r.chunk_size {
        bail!(
            "research.chunk-overlap ({}) must be smaller than research.chunk-size ({})",
            r.chunk_overlap,
            r.chunk_size
        );
    }
    config.scoring.validate()?;
    if config.search.max_results == 0 {
        bail!("search.max-results must be at least 1");
    }
    Ok(())
}
