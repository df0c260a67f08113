//! Quick triage: one model call per issue, title and body only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::categories::Category;
use super::prompts::{truncate_body, PromptManager};
use crate::ai::ModelClient;
use crate::errors::TriageResult;
use crate::github::{Issue, IssueSource};

const UNKNOWN_CATEGORY_REASON: &str = "Unable to determine category from title and description";
const UNPARSEABLE_REASON: &str = "Unable to parse AI response";

/// Outcome of quick-triaging one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickResult {
    pub issue_number: u64,
    pub issue_title: String,
    pub issue_url: String,
    pub author: Option<String>,
    pub category: Category,
    pub reason: String,
}

/// One quick triage pass over pending issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickTriageRun {
    pub timestamp: DateTime<Utc>,
    pub fetched: usize,
    pub failed: usize,
    pub results: Vec<QuickResult>,
}

/// Lightweight categorizer used for a fast first pass.
pub struct QuickTriage {
    model: ModelClient,
    prompts: PromptManager,
}

impl QuickTriage {
    pub fn new(model: ModelClient) -> TriageResult<Self> {
        Ok(Self {
            model,
            prompts: PromptManager::new()?,
        })
    }

    pub async fn categorize(&self, issue: &Issue) -> TriageResult<QuickResult> {
        let body = issue
            .body
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .map_or_else(|| "No description provided".to_string(), truncate_body);
        let prompt = self
            .prompts
            .render("quick", &json!({"title": issue.title, "body": body}))?;

        let reply = self.model.complete(&prompt).await?;
        let (category, reason) = parse_quick_reply(&reply);

        Ok(QuickResult {
            issue_number: issue.number,
            issue_title: issue.title.clone(),
            issue_url: issue.url.clone(),
            author: issue.author.clone(),
            category,
            reason,
        })
    }

    /// Quick-triage up to `limit` pending issues. Per-issue failures are
    /// logged and counted; a failed fetch is returned as an error.
    pub async fn run(&self, source: &dyn IssueSource, limit: usize) -> TriageResult<QuickTriageRun> {
        let issues = source.fetch_pending_issues(limit).await?;
        tracing::info!(count = issues.len(), "Starting quick triage");

        let mut run = QuickTriageRun {
            timestamp: Utc::now(),
            fetched: issues.len(),
            failed: 0,
            results: Vec::with_capacity(issues.len()),
        };

        for issue in &issues {
            match self.categorize(issue).await {
                Ok(result) => {
                    tracing::info!(issue = issue.number, category = %result.category, "Quick triaged issue");
                    run.results.push(result);
                }
                Err(e) => {
                    tracing::error!(issue = issue.number, error = %e, "Quick triage failed");
                    run.failed += 1;
                }
            }
        }

        Ok(run)
    }
}

/// Parse `CATEGORY: reason`, defaulting to Question.
fn parse_quick_reply(reply: &str) -> (Category, String) {
    let line = reply.trim().lines().next().unwrap_or("");
    let Some((label, reason)) = line.split_once(':') else {
        return (Category::Question, UNPARSEABLE_REASON.to_string());
    };

    let category = match label.trim().trim_matches('*').to_uppercase().as_str() {
        "BUG" => Some(Category::Bug),
        "FEATURE" => Some(Category::FeatureRequest),
        "QUESTION" => Some(Category::Question),
        "USABILITY" => Some(Category::Usability),
        _ => None,
    };

    match category {
        Some(category) => (category, reason.trim().to_string()),
        None => (Category::Question, UNKNOWN_CATEGORY_REASON.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_category_and_reason() {
        assert_eq!(
            parse_quick_reply("FEATURE: asks for dark mode\nextra"),
            (Category::FeatureRequest, "asks for dark mode".to_string())
        );
        assert_eq!(
            parse_quick_reply("bug: null pointer on save"),
            (Category::Bug, "null pointer on save".to_string())
        );
    }

    #[test]
    fn unknown_or_malformed_defaults_to_question() {
        assert_eq!(
            parse_quick_reply("CHORE: bump deps"),
            (Category::Question, UNKNOWN_CATEGORY_REASON.to_string())
        );
        assert_eq!(
            parse_quick_reply("no colon here"),
            (Category::Question, UNPARSEABLE_REASON.to_string())
        );
    }
}
