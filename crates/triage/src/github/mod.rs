//! GitHub issue source.

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::errors::TriageResult;

pub use client::{merge_labels, GitHubClient, PER_PAGE};
pub use types::Issue;

/// Read access to the issue tracker.
///
/// The classifier, knowledge base builder and pipeline depend on this trait
/// rather than on [`GitHubClient`] directly.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Open issues carrying the pending-triage label, newest first.
    async fn fetch_pending_issues(&self, limit: usize) -> TriageResult<Vec<Issue>>;

    /// Open then closed issues without the pending-triage label, most
    /// recently updated first.
    async fn fetch_triaged_issues(&self, limit: usize) -> TriageResult<Vec<Issue>>;

    /// A single issue by number.
    async fn fetch_issue(&self, number: u64) -> TriageResult<Issue>;

    /// Maintainer comments as a `[login]: body` transcript. Never fails;
    /// problems produce an empty string.
    async fn fetch_maintainer_comments(&self, number: u64, max: usize) -> String;
}
