//! Report synthesis

use std::sync::Arc;

use eyre::{Context, Result};
use findingstore::Finding;
use serde_json::json;
use tracing::{debug, info};

use crate::llm::{LlmClient, ask};
use crate::prompts::PromptLoader;

/// Section headings every report is asked to contain
pub const REPORT_SECTIONS: [&str; 4] = ["Introduction", "Key Findings", "Contrasting Perspectives", "Conclusion"];

/// Findings as the evidence block handed to the model
///
/// One `Source: <url> (score=<2dp>)` header per finding, followed by its
/// content, separated by blank lines.
pub fn format_findings(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(|f| format!("Source: {} (score={:.2})\n{}", f.source, f.score, f.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Writes the structured report from all findings
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>) -> Self {
        Self { llm, prompts }
    }

    /// One model call over every finding so far
    pub async fn combine(&self, findings: &[Finding], topic: &str) -> Result<String> {
        debug!(finding_count = findings.len(), %topic, "Synthesizer::combine: called");
        let prompt = self.prompts.render(
            "synthesize",
            &json!({ "findings": format_findings(findings), "topic": topic }),
        )?;
        let report = ask(self.llm.as_ref(), &prompt)
            .await
            .context("Synthesis request failed")?;
        info!(report_len = report.len(), "Synthesized report");
        Ok(report)
    }
}
