//! Research orchestration

mod engine;
pub mod store;

pub use engine::{ResearchEngine, ResearchOutcome};
pub use store::{FindingSink, SqliteSink};
