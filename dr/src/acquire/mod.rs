//! Content acquisition: fetch a page and summarize it
//!
//! Short pages are summarized in one call. Long pages are split into
//! overlapping chunks, each chunk is summarized, and the chunk summaries are
//! combined into one structured summary.

pub mod chunk;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use chunk::{cap_chunks, chunk_text};

use crate::config::ResearchConfig;
use crate::fetch::{FetchError, Fetcher};
use crate::llm::{LlmClient, LlmError, ask};
use crate::progress::ProgressSink;
use crate::prompts::PromptLoader;

/// Label used for per-chunk progress
pub const CHUNK_PROGRESS_LABEL: &str = "Summarizing chunks";

/// Failures while turning a URL into a summary
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Prompt error: {0}")]
    Prompt(String),
}

/// Turns a source URL into a model-written summary
#[async_trait]
pub trait PageSummarizer: Send + Sync {
    async fn summarize(&self, url: &str, progress: &dyn ProgressSink) -> Result<String, AcquireError>;
}

/// Chunking limits for long documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSettings {
    /// Chars per chunk; texts at or under this size take one call
    pub size: usize,
    pub overlap: usize,
    pub max_chunks: usize,
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self::from(&ResearchConfig::default())
    }
}

impl From<&ResearchConfig> for ChunkSettings {
    fn from(config: &ResearchConfig) -> Self {
        Self {
            size: config.chunk_size,
            overlap: config.chunk_overlap,
            max_chunks: config.max_chunks_per_doc,
        }
    }
}

/// Fetches pages and summarizes them through the model
pub struct ContentAcquirer {
    fetcher: Fetcher,
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    chunking: ChunkSettings,
}

impl ContentAcquirer {
    pub fn new(fetcher: Fetcher, llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, chunking: ChunkSettings) -> Self {
        debug!(?chunking, "ContentAcquirer::new: called");
        Self {
            fetcher,
            llm,
            prompts,
            chunking,
        }
    }

    fn render(&self, name: &str, context: serde_json::Value) -> Result<String, AcquireError> {
        self.prompts
            .render(name, &context)
            .map_err(|e| AcquireError::Prompt(e.to_string()))
    }

    /// Summarize already-fetched text
    pub async fn summarize_text(&self, text: &str, progress: &dyn ProgressSink) -> Result<String, AcquireError> {
        let len = text.chars().count();
        debug!(len, "ContentAcquirer::summarize_text: called");

        if len <= self.chunking.size {
            let prompt = self.render("summarize-article", json!({ "text": text }))?;
            return Ok(ask(self.llm.as_ref(), &prompt).await?);
        }

        let chunks = chunk_text(text, self.chunking.size, self.chunking.overlap);
        let (chunks, dropped_from) = cap_chunks(chunks, self.chunking.max_chunks);
        if let Some(total) = dropped_from {
            warn!(total, kept = chunks.len(), "Document chunk count over limit, truncating");
            progress.note(&format!(
                "Note: document split into {} chunks. Truncating to first {} chunks to limit cost and time.",
                total,
                chunks.len()
            ));
        }

        let total = chunks.len();
        info!(total, "Summarizing long document in chunks");
        let mut summaries = Vec::with_capacity(total);
        for (i, chunk) in chunks.iter().enumerate() {
            let prompt = self.render(
                "summarize-chunk",
                json!({ "index": i + 1, "total": total, "text": chunk }),
            )?;
            let summary = ask(self.llm.as_ref(), &prompt).await?;
            summaries.push(format!("Chunk {} summary:\n{}", i + 1, summary));
            progress.update(i + 1, total, CHUNK_PROGRESS_LABEL);
        }

        let prompt = self.render("combine-chunks", json!({ "summaries": summaries.join("\n\n") }))?;
        Ok(ask(self.llm.as_ref(), &prompt).await?)
    }
}

#[async_trait]
impl PageSummarizer for ContentAcquirer {
    async fn summarize(&self, url: &str, progress: &dyn ProgressSink) -> Result<String, AcquireError> {
        debug!(%url, "ContentAcquirer::summarize: called");
        let text = self.fetcher.fetch_text(url).await?;
        self.summarize_text(&text, progress).await
    }
}
