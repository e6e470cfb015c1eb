//! Finding record

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One piece of evidence gathered for a sub-task
///
/// `content` is always a model-produced summary, never raw page text.
/// `id` stays `None` until the store assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Store-assigned identity
    pub id: Option<i64>,
    /// Sub-task text that led to this source
    pub query: String,
    /// Source URL
    pub source: String,
    /// Summarized content
    pub content: String,
    /// Reliability score in [0, 1]
    pub score: f64,
    /// Creation time (RFC 3339, UTC)
    pub timestamp: String,
}

impl Finding {
    /// Create an unpersisted finding stamped with the current time
    pub fn new(query: impl Into<String>, source: impl Into<String>, content: impl Into<String>, score: f64) -> Self {
        Self {
            id: None,
            query: query.into(),
            source: source.into(),
            content: content.into(),
            score: score.clamp(0.0, 1.0),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Backfill the store-assigned identity
    pub fn with_id(self, id: i64) -> Self {
        Self { id: Some(id), ..self }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}
