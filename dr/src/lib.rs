//! Deep Research - iterative, cited research reports
//!
//! Given a topic, the engine decomposes it into sub-questions, gathers web
//! evidence for each, summarizes and scores every source, synthesizes a
//! structured report, and then deepens the report over a bounded number of
//! refinement rounds driven by the gaps the report itself names.
//!
//! # Modules
//!
//! - [`research`] - The control loop and finding persistence
//! - [`llm`] - Model client trait, OpenAI implementation, retry policy
//! - [`acquire`] - Page summarization with chunk-and-combine for long texts
//! - [`fetch`] - Page fetching with format fallback and decoders
//! - [`search`] - Web search providers
//! - [`scoring`] - Source reliability heuristic
//! - [`planning`] - Topic decomposition and follow-up questions
//! - [`synthesis`] - Report synthesis
//! - [`prompts`] - Prompt templates
//! - [`progress`] - Terminal progress reporting
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod acquire;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod http;
pub mod llm;
pub mod planning;
pub mod progress;
pub mod prompts;
pub mod research;
pub mod scoring;
pub mod search;
pub mod synthesis;

// Re-export commonly used types
pub use acquire::{AcquireError, ContentAcquirer, PageSummarizer};
pub use config::{Config, RunConfig};
pub use findingstore::Finding;
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient};
pub use progress::ProgressSink;
pub use research::{ResearchEngine, ResearchOutcome};
pub use scoring::ReliabilityScorer;
pub use search::{SearchError, SearchProvider};
