//! Triage pipeline - orchestrates the fetch-classify-persist flow.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::analysis::{Category, ClassificationResult, Classifier};
use crate::errors::{exit_code, TriageResult};
use crate::github::IssueSource;
use crate::knowledge::KnowledgeBase;
use crate::storage::{BatchRun, MarkdownReport, ResultStore};

/// Counters for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub by_category: BTreeMap<Category, usize>,
    pub flagged_for_review: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn from_results(results: &[ClassificationResult], failed: usize) -> Self {
        let mut by_category: BTreeMap<Category, usize> =
            Category::all().iter().map(|c| (*c, 0)).collect();
        for result in results {
            *by_category.entry(result.category).or_insert(0) += 1;
        }
        Self {
            by_category,
            flagged_for_review: results.iter().filter(|r| r.needs_manual_review()).count(),
            failed,
        }
    }
}

/// Result of a single batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Number of pending issues fetched.
    pub fetched: usize,
    /// Successfully classified issues, in fetch order.
    pub results: Vec<ClassificationResult>,
    pub summary: BatchSummary,
    /// Where the JSON artifact was written, if anything was written.
    pub artifact: Option<PathBuf>,
}

/// Triage pipeline orchestrator.
pub struct TriagePipeline {
    source: Arc<dyn IssueSource>,
    classifier: Classifier,
    knowledge_base: Option<KnowledgeBase>,
    results: ResultStore,
    report: Option<MarkdownReport>,
    issue_delay: Duration,
}

impl TriagePipeline {
    /// Create a pipeline. `knowledge_base` is fixed for the pipeline's
    /// lifetime; empty knowledge bases are treated as absent.
    pub fn new(
        source: Arc<dyn IssueSource>,
        classifier: Classifier,
        knowledge_base: Option<KnowledgeBase>,
        results: ResultStore,
        report: Option<MarkdownReport>,
        issue_delay: Duration,
    ) -> Self {
        Self {
            source,
            classifier,
            knowledge_base: knowledge_base.filter(|kb| !kb.is_empty()),
            results,
            report,
            issue_delay,
        }
    }

    /// Run one batch and map the outcome onto a status code.
    pub async fn run_batch(&self, limit: usize) -> i32 {
        match self.execute(limit).await {
            Ok(_) => exit_code::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "Triage batch failed");
                e.exit_code()
            }
        }
    }

    /// Fetch, classify and persist up to `limit` pending issues.
    ///
    /// A fetch failure or a persistence failure (after fallback) is returned
    /// as an error. Per-issue classification failures are logged and counted.
    pub async fn execute(&self, limit: usize) -> TriageResult<BatchOutcome> {
        tracing::info!(limit, "Starting triage batch");

        let issues = self.source.fetch_pending_issues(limit).await?;
        let mut outcome = BatchOutcome {
            fetched: issues.len(),
            ..Default::default()
        };

        if issues.is_empty() {
            tracing::info!("No pending issues to triage");
            return Ok(outcome);
        }

        let mut failed = 0;
        for (idx, issue) in issues.iter().enumerate() {
            tracing::info!(
                issue = issue.number,
                position = idx + 1,
                total = issues.len(),
                "Processing issue"
            );

            match self
                .classifier
                .classify(issue, self.knowledge_base.as_ref())
                .await
            {
                Ok(result) => outcome.results.push(result),
                Err(e) => {
                    tracing::warn!(issue = issue.number, error = %e, "Classification failed");
                    failed += 1;
                }
            }

            if idx + 1 < issues.len() && !self.issue_delay.is_zero() {
                sleep(self.issue_delay).await;
            }
        }

        outcome.summary = BatchSummary::from_results(&outcome.results, failed);

        if !outcome.results.is_empty() {
            let run = BatchRun::new(outcome.results.clone(), failed);
            outcome.artifact = Some(self.results.persist(&run)?);

            if let Some(report) = &self.report {
                if let Err(e) = report.append(&outcome.results) {
                    tracing::warn!(error = %e, "Failed to update markdown report");
                }
            }
        }

        tracing::info!(
            fetched = outcome.fetched,
            classified = outcome.results.len(),
            failed,
            flagged_for_review = outcome.summary.flagged_for_review,
            bugs = outcome.summary.by_category[&Category::Bug],
            features = outcome.summary.by_category[&Category::FeatureRequest],
            usability = outcome.summary.by_category[&Category::Usability],
            questions = outcome.summary.by_category[&Category::Question],
            "Triage batch complete"
        );

        Ok(outcome)
    }
}
