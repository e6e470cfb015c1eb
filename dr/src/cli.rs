//! CLI definition

use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use crate::config::Config;

/// Deep research - plan, gather, score, synthesize and refine
#[derive(Debug, Parser)]
#[command(
    name = "dr",
    about = "Iterative deep research: decomposes a topic, gathers and scores web evidence, and writes a cited report",
    version
)]
pub struct Cli {
    /// Research topic; read from stdin, or prompted for, when omitted
    #[arg(value_name = "TOPIC")]
    pub topic: Vec<String>,

    /// Path to config file
    #[arg(short, long, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Sub-questions kept per round
    #[arg(long = "max-subtasks")]
    pub max_subtasks: Option<usize>,

    /// Pages fetched per sub-question
    #[arg(long = "max-pages")]
    pub max_pages: Option<usize>,

    /// Refinement rounds after the first report
    #[arg(long = "max-depth")]
    pub max_depth: Option<usize>,

    /// Chunks summarized per long document
    #[arg(long = "max-chunks")]
    pub max_chunks: Option<usize>,

    /// Model identifier
    #[arg(short, long)]
    pub model: Option<String>,

    /// Finding store database path
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Do not persist findings
    #[arg(long = "no-store")]
    pub no_store: bool,
}

impl Cli {
    /// Topic from the positional arguments, if any
    pub fn topic(&self) -> Option<String> {
        let joined = self.topic.join(" ");
        let trimmed = joined.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Apply command-line overrides, which win over file and environment
    pub fn apply_to(&self, config: &mut Config) {
        debug!(?self, "Cli::apply_to: called");
        if let Some(n) = self.max_subtasks {
            config.research.max_subtasks = n;
        }
        if let Some(n) = self.max_pages {
            config.research.max_pages_per_task = n;
        }
        if let Some(n) = self.max_depth {
            config.research.max_depth = n;
        }
        if let Some(n) = self.max_chunks {
            config.research.max_chunks_per_doc = n;
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(db) = &self.db {
            config.storage.db_path = Some(db.clone());
        }
        if self.no_store {
            config.storage.enabled = false;
        }
    }
}
