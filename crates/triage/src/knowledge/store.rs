//! Knowledge base persistence and bulk build.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::sleep;

use super::base::{infer_category_from_labels, IssueSummary, KnowledgeBase, KnowledgeBaseStatus};
use crate::errors::TriageResult;
use crate::github::IssueSource;

/// Maintainer comments fetched per historical issue.
const COMMENTS_PER_ISSUE: usize = 10;

/// Issues processed between pacing pauses.
const ISSUES_PER_PAUSE: usize = 10;

const PROGRESS_EVERY: usize = 50;

/// Owns the on-disk knowledge base and the currently loaded instance.
pub struct KnowledgeBaseStore {
    path: PathBuf,
    current: Option<KnowledgeBase>,
    pause: Duration,
}

/// Counters from a knowledge base build.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildStats {
    pub fetched: usize,
    pub included: usize,
    pub skipped: usize,
}

impl KnowledgeBaseStore {
    /// Open the store, loading any existing snapshot at `path`.
    ///
    /// A missing or unreadable snapshot leaves the store without a knowledge
    /// base; classification then runs without historical context.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = match Self::load(&path) {
            Ok(Some(kb)) => {
                tracing::info!(
                    path = %path.display(),
                    issues = kb.total_issues_analyzed(),
                    "Loaded knowledge base"
                );
                Some(kb)
            }
            Ok(None) => {
                tracing::info!(path = %path.display(), "No knowledge base found");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to load knowledge base");
                None
            }
        };

        Self {
            path,
            current,
            pause: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    fn load(path: &Path) -> TriageResult<Option<KnowledgeBase>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let mut kb: KnowledgeBase = serde_json::from_str(&content)?;
        kb.normalize();
        Ok(Some(kb))
    }

    fn save(&self, kb: &KnowledgeBase) -> TriageResult<()> {
        let content = serde_json::to_string_pretty(kb)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// The loaded knowledge base, if it has any content.
    pub fn knowledge_base(&self) -> Option<&KnowledgeBase> {
        self.current.as_ref().filter(|kb| !kb.is_empty())
    }

    /// Consume the store, yielding the non-empty knowledge base if any.
    pub fn into_knowledge_base(self) -> Option<KnowledgeBase> {
        self.current.filter(|kb| !kb.is_empty())
    }

    /// Context text for prompts, or a hint when nothing is loaded.
    pub fn context(&self) -> String {
        self.knowledge_base().map_or_else(
            || "No knowledge base available. Build one first by analyzing closed issues.".to_string(),
            KnowledgeBase::context_summary,
        )
    }

    pub fn status(&self) -> KnowledgeBaseStatus {
        self.current
            .as_ref()
            .map_or_else(KnowledgeBaseStatus::missing, KnowledgeBase::status)
    }

    /// Rebuild from triaged issues and replace the stored snapshot.
    ///
    /// Issues whose labels map to no category are skipped. On a fetch or
    /// save failure the previous knowledge base stays in place.
    pub async fn build(
        &mut self,
        source: &dyn IssueSource,
        max_issues: usize,
    ) -> TriageResult<BuildStats> {
        tracing::info!(max_issues, "Building knowledge base");

        let issues = source.fetch_triaged_issues(max_issues).await?;
        let mut stats = BuildStats {
            fetched: issues.len(),
            ..Default::default()
        };
        let mut kb = KnowledgeBase::new();

        for (idx, issue) in issues.iter().enumerate() {
            let Some(category) = infer_category_from_labels(&issue.labels) else {
                tracing::debug!(issue = issue.number, labels = ?issue.labels, "No category label, skipping");
                stats.skipped += 1;
                continue;
            };

            let comments = source
                .fetch_maintainer_comments(issue.number, COMMENTS_PER_ISSUE)
                .await;
            kb.add_issue(IssueSummary {
                number: issue.number,
                title: issue.title.clone(),
                category,
                labels: issue.labels.clone(),
                team_response: Some(comments).filter(|c| !c.is_empty()),
            });
            stats.included += 1;

            let processed = idx + 1;
            if processed % PROGRESS_EVERY == 0 {
                tracing::info!(processed, total = issues.len(), "Knowledge base build progress");
            }
            if stats.included % ISSUES_PER_PAUSE == 0 && !self.pause.is_zero() {
                sleep(self.pause).await;
            }
        }

        self.save(&kb)?;
        tracing::info!(
            fetched = stats.fetched,
            included = stats.included,
            skipped = stats.skipped,
            path = %self.path.display(),
            "Knowledge base saved"
        );
        self.current = Some(kb);
        Ok(stats)
    }
}
