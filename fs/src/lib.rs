//! FindingStore - append-only evidence store for deep research runs
//!
//! Every summarized source a research run produces is written once to a
//! single SQLite table and never updated or deleted afterwards.
//!
//! # Schema
//!
//! ```text
//! findings
//! ├── id         INTEGER PRIMARY KEY AUTOINCREMENT
//! ├── query      TEXT   (sub-task that produced the finding)
//! ├── source     TEXT   (source URL)
//! ├── content    TEXT   (model-produced summary)
//! ├── score      REAL   (reliability score, 0.0..=1.0)
//! └── timestamp  TEXT   (RFC 3339)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use findingstore::{Finding, FindingStore};
//!
//! let store = FindingStore::open("research_memory.db")?;
//! let id = store.insert(&Finding::new("sleep and memory", "https://arxiv.org/abs/1", "summary", 0.9))?;
//! let best = store.query_by_substring("sleep", 10)?;
//! ```

pub mod cli;
pub mod config;
mod finding;
mod store;

use std::path::PathBuf;

pub use finding::Finding;
pub use store::{FindingStore, StoreStats};

/// Default number of rows returned by queries
pub const DEFAULT_QUERY_LIMIT: usize = 10;

/// Database file name used when no path is configured
pub const DEFAULT_DB_FILE: &str = "research_memory.db";

/// Default database location: `<data_local_dir>/deepresearch/research_memory.db`
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deepresearch")
        .join(DEFAULT_DB_FILE)
}
