//! Source reliability scoring
//!
//! A pure heuristic over the source host and the length of the content that
//! was derived from it. Host tiers are an ordered list of suffix rules; the
//! first matching rule sets the base score.

use eyre::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// One host tier: hosts equal to or ending in `.suffix` get `score`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRule {
    pub suffix: String,
    pub score: f64,
}

impl ScoreRule {
    pub fn new(suffix: impl Into<String>, score: f64) -> Self {
        Self {
            suffix: suffix.into(),
            score,
        }
    }

    /// Host equals the suffix or ends with `.suffix`
    pub fn matches(&self, host: &str) -> bool {
        let suffix = self.suffix.trim_start_matches('.').to_lowercase();
        host == suffix || host.ends_with(&format!(".{}", suffix))
    }
}

/// Scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Ordered host tiers, first match wins
    pub rules: Vec<ScoreRule>,

    /// Base score when no rule matches
    #[serde(rename = "default-score")]
    pub default_score: f64,

    /// Content length that earns one full point of boost
    #[serde(rename = "length-boost-divisor")]
    pub length_boost_divisor: f64,

    /// Cap on the length boost
    #[serde(rename = "max-length-boost")]
    pub max_length_boost: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let authoritative = ["nature.com", "science.org", "sciencedirect.com", "arxiv.org", "ieeexplore.ieee.org"];
        let repositories = ["researchgate.net", "academia.edu"];

        let mut rules: Vec<ScoreRule> = authoritative.iter().map(|s| ScoreRule::new(*s, 0.90)).collect();
        rules.extend(repositories.iter().map(|s| ScoreRule::new(*s, 0.60)));
        rules.push(ScoreRule::new("edu", 0.85));

        Self {
            rules,
            default_score: 0.50,
            length_boost_divisor: 10_000.0,
            max_length_boost: 0.15,
        }
    }
}

impl ScoringConfig {
    /// Reject scores outside [0,1] and a non-positive divisor
    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        for rule in &self.rules {
            if rule.suffix.trim().is_empty() {
                bail!("scoring rule suffix must not be empty");
            }
            if !in_unit(rule.score) {
                bail!("scoring rule '{}' has score {} outside [0,1]", rule.suffix, rule.score);
            }
        }
        if !in_unit(self.default_score) {
            bail!("scoring.default-score {} is outside [0,1]", self.default_score);
        }
        if !in_unit(self.max_length_boost) {
            bail!("scoring.max-length-boost {} is outside [0,1]", self.max_length_boost);
        }
        if self.length_boost_divisor.is_nan() || self.length_boost_divisor <= 0.0 {
            bail!("scoring.length-boost-divisor must be positive");
        }
        Ok(())
    }
}

/// Deterministic reliability scorer
#[derive(Debug, Clone, Default)]
pub struct ReliabilityScorer {
    config: ScoringConfig,
}

impl ReliabilityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        debug!(rule_count = config.rules.len(), "ReliabilityScorer::new: called");
        Self { config }
    }

    /// Score a source in [0,1]
    ///
    /// `url` may be a full URL or a bare host such as `arxiv.org`.
    pub fn score(&self, url: &str, content_length: usize) -> f64 {
        let host = extract_host(url);
        let base = self
            .config
            .rules
            .iter()
            .find(|rule| rule.matches(&host))
            .map(|rule| rule.score)
            .unwrap_or(self.config.default_score);

        let boost = (content_length as f64 / self.config.length_boost_divisor).min(self.config.max_length_boost);
        let score = (base + boost).clamp(0.0, 1.0);
        debug!(%host, base, boost, score, "ReliabilityScorer::score: computed");
        score
    }
}

/// Lower-cased host of `url`, or of `http://url` for bare hosts
pub fn extract_host(url: &str) -> String {
    let trimmed = url.trim();
    let parsed = Url::parse(trimmed)
        .ok()
        .filter(|u| u.host_str().is_some())
        .or_else(|| Url::parse(&format!("http://{}", trimmed)).ok());

    match parsed.as_ref().and_then(|u| u.host_str()) {
        Some(host) => host.trim_end_matches('.').to_lowercase(),
        None => trimmed.to_lowercase(),
    }
}
