//! Topic decomposition and refinement follow-ups

mod list;

use std::sync::Arc;

use eyre::{Context, Result};
use serde_json::json;
use tracing::{debug, info};

pub use list::ListParser;

use crate::llm::{LlmClient, ask};
use crate::prompts::PromptLoader;

/// Turns a topic or a report into sub-questions
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    parser: ListParser,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>) -> Result<Self> {
        debug!("Planner::new: called");
        Ok(Self {
            llm,
            prompts,
            parser: ListParser::new().context("Failed to build list parser")?,
        })
    }

    /// Sub-questions for `topic`, in the model's order
    ///
    /// No cap is applied here; the caller truncates.
    pub async fn decompose(&self, topic: &str) -> Result<Vec<String>> {
        debug!(%topic, "Planner::decompose: called");
        let prompt = self.prompts.render("plan", &json!({ "topic": topic }))?;
        let reply = ask(self.llm.as_ref(), &prompt)
            .await
            .context("Planning request failed")?;
        let subtasks = self.parser.parse(&reply);
        info!(count = subtasks.len(), "Planned sub-questions");
        Ok(subtasks)
    }

    /// Ask which parts of `report` need deeper research
    ///
    /// Returns no items when the model answers blank or `NO` (any case).
    pub async fn follow_ups(&self, report: &str) -> Result<Vec<String>> {
        debug!(report_len = report.len(), "Planner::follow_ups: called");
        let prompt = self.prompts.render("followup", &json!({ "report": report }))?;
        let reply = ask(self.llm.as_ref(), &prompt)
            .await
            .context("Follow-up request failed")?;

        if is_done_reply(&reply) {
            info!("No further research needed");
            return Ok(Vec::new());
        }
        Ok(self.parser.parse(&reply))
    }
}

/// Blank, or `NO` ignoring case, surrounding whitespace and a trailing period
pub fn is_done_reply(reply: &str) -> bool {
    let trimmed = reply.trim().trim_end_matches('.').trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("no")
}
