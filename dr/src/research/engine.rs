//! The research control loop
//!
//! PLANNING -> GATHERING -> SYNTHESIZING -> REFINING* -> DONE
//!
//! Planning, the initial gathering and the first synthesis must succeed.
//! A failure inside a refinement round ends refinement and the most recent
//! report is returned.

use std::sync::Arc;

use eyre::{Context, Result};
use findingstore::Finding;
use tracing::{debug, info, warn};

use super::store::FindingSink;
use crate::acquire::PageSummarizer;
use crate::config::ResearchConfig;
use crate::llm::LlmClient;
use crate::planning::Planner;
use crate::progress::{NoopProgress, ProgressSink};
use crate::prompts::PromptLoader;
use crate::scoring::{ReliabilityScorer, ScoringConfig};
use crate::search::SearchProvider;
use crate::synthesis::Synthesizer;

/// Result of a completed research run
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    /// The most recent report
    pub report: String,
    /// Every finding gathered, in gathering order
    pub findings: Vec<Finding>,
    /// Refinement rounds that produced a new report
    pub refinement_rounds: usize,
}

/// Drives one research run from topic to report
pub struct ResearchEngine {
    search: Arc<dyn SearchProvider>,
    summarizer: Arc<dyn PageSummarizer>,
    scorer: ReliabilityScorer,
    planner: Planner,
    synthesizer: Synthesizer,
    progress: Arc<dyn ProgressSink>,
    store: Option<Box<dyn FindingSink>>,
    limits: ResearchConfig,
}

impl ResearchEngine {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SearchProvider>,
        summarizer: Arc<dyn PageSummarizer>,
        prompts: Arc<PromptLoader>,
        limits: ResearchConfig,
        scoring: ScoringConfig,
    ) -> Result<Self> {
        debug!(?limits, "ResearchEngine::new: called");
        Ok(Self {
            search,
            summarizer,
            scorer: ReliabilityScorer::new(scoring),
            planner: Planner::new(llm.clone(), prompts.clone())?,
            synthesizer: Synthesizer::new(llm, prompts),
            progress: Arc::new(NoopProgress),
            store: None,
            limits,
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_store(mut self, store: Box<dyn FindingSink>) -> Self {
        self.store = Some(store);
        self
    }

    /// Research `topic` and return the final report with its evidence
    pub async fn run(mut self, topic: &str) -> Result<ResearchOutcome> {
        info!(%topic, "Research started");

        // PLANNING
        let mut subtasks = self.planner.decompose(topic).await?;
        subtasks.truncate(self.limits.max_subtasks);
        info!(count = subtasks.len(), "Sub-tasks selected");

        // GATHERING
        let findings = self.gather(Vec::new(), &subtasks, "Fetching pages for").await?;

        // SYNTHESIZING
        let report = self.synthesizer.combine(&findings, topic).await?;

        // REFINING
        let outcome = self.refine(topic, findings, report).await;

        // DONE
        if let Some(store) = self.store.take()
            && let Err(e) = store.close()
        {
            warn!(error = %e, "Failed to close finding store");
        }
        info!(
            findings = outcome.findings.len(),
            rounds = outcome.refinement_rounds,
            "Research finished"
        );
        Ok(outcome)
    }

    async fn refine(&self, topic: &str, mut findings: Vec<Finding>, mut report: String) -> ResearchOutcome {
        let mut depth = 0;
        while depth < self.limits.max_depth {
            info!(round = depth + 1, "Refinement round");

            let mut follow_ups = match self.planner.follow_ups(&report).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(error = %e, "Refinement stopped, keeping the last report");
                    break;
                }
            };
            follow_ups.truncate(self.limits.max_subtasks);
            if follow_ups.is_empty() {
                info!("No follow-up questions, refinement complete");
                break;
            }

            let before = findings.len();
            let extended = match self.gather(findings.clone(), &follow_ups, "Fetching pages for follow-up").await {
                Ok(extended) => extended,
                Err(e) => {
                    warn!(error = %e, "Refinement stopped, keeping the last report");
                    break;
                }
            };
            if extended.len() == before {
                info!("Refinement found nothing new");
                break;
            }

            match self.synthesizer.combine(&extended, topic).await {
                Ok(new_report) => report = new_report,
                Err(e) => {
                    warn!(error = %e, "Resynthesis failed, keeping the last report");
                    findings = extended;
                    break;
                }
            }
            findings = extended;
            depth += 1;
        }

        ResearchOutcome {
            report,
            findings,
            refinement_rounds: depth,
        }
    }

    /// Extend `findings` with evidence for every sub-task
    pub async fn gather(&self, mut findings: Vec<Finding>, subtasks: &[String], label: &str) -> Result<Vec<Finding>> {
        debug!(existing = findings.len(), subtasks = subtasks.len(), "ResearchEngine::gather: called");
        for task in subtasks {
            let mut urls = match self.search.search(task).await {
                Ok(urls) => urls,
                Err(e) if self.limits.skip_failed_pages => {
                    warn!(%task, error = %e, "Search failed, skipping sub-task");
                    continue;
                }
                Err(e) => return Err(e).context(format!("Search failed for '{}'", task)),
            };
            urls.truncate(self.limits.max_pages_per_task);
            if urls.is_empty() {
                info!(%task, "No search results");
                continue;
            }

            let progress_label = format!("{}: {}", label, task);
            let total = urls.len();
            for (i, url) in urls.iter().enumerate() {
                match self.summarizer.summarize(url, self.progress.as_ref()).await {
                    Ok(summary) => {
                        let score = self.scorer.score(url, summary.chars().count());
                        let finding = self.persist(Finding::new(task.as_str(), url.as_str(), summary, score));
                        findings.push(finding);
                    }
                    Err(e) if self.limits.skip_failed_pages => {
                        warn!(%url, error = %e, "Skipping page");
                    }
                    Err(e) => return Err(e).context(format!("Failed to summarize {}", url)),
                }
                self.progress.update(i + 1, total, &progress_label);
            }
        }
        Ok(findings)
    }

    /// Store `finding`, keeping it unpersisted when the store fails
    fn persist(&self, finding: Finding) -> Finding {
        let Some(store) = &self.store else {
            return finding;
        };
        match store.record(&finding) {
            Ok(id) => finding.with_id(id),
            Err(e) => {
                warn!(source = %finding.source, error = %e, "Failed to persist finding");
                finding
            }
        }
    }
}
