//! # GitHub Issues API Client
//!
//! Read and write access to repository issues: paginated listings of
//! pending and already-triaged issues, single-issue lookup, maintainer
//! comments, and label replacement. Transient network failures are retried
//! with exponential backoff; authentication, rate-limit and not-found
//! answers are surfaced immediately.

use async_trait::async_trait;
use reqwest::{header, Client as HttpClient, Method, Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::config::{GitHubConfig, PacingConfig};
use crate::errors::{TriageError, TriageResult};
use crate::retry::RetryPolicy;

use super::types::{
    maintainer_transcript, GitHubComment, GitHubErrorBody, GitHubIssue, Issue,
};
use super::IssueSource;

/// Provider maximum page size.
pub const PER_PAGE: usize = 100;

/// Pages fetched between pacing pauses.
const PAGES_PER_PAUSE: u32 = 3;

const API_VERSION: &str = "2022-11-28";

/// GitHub API client for issue triage.
#[derive(Clone)]
pub struct GitHubClient {
    http_client: HttpClient,
    base_url: String,
    token: String,
    owner: String,
    repo: String,
    pending_label: String,
    retry: RetryPolicy,
    page_pause: Duration,
}

impl GitHubClient {
    /// Create a client from configuration.
    pub fn new(github: &GitHubConfig, pacing: &PacingConfig) -> TriageResult<Self> {
        let http_client = HttpClient::builder()
            .user_agent(concat!("issue-triage/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url: github.api_url.trim_end_matches('/').to_string(),
            token: github.token.clone(),
            owner: github.owner.clone(),
            repo: github.repo.clone(),
            pending_label: github.pending_label.clone(),
            retry: RetryPolicy::new(
                pacing.network_attempts,
                Duration::from_millis(pacing.network_backoff_ms),
            ),
            page_pause: Duration::from_millis(pacing.page_pause_ms),
        })
    }

    /// Point the client at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_page_pause(mut self, pause: Duration) -> Self {
        self.page_pause = pause;
        self
    }

    pub fn pending_label(&self) -> &str {
        &self.pending_label
    }

    /// Walk `/issues` pages until `limit` matching issues are collected or a
    /// short page signals the end.
    async fn fetch_paginated<F>(
        &self,
        params: &[(&str, &str)],
        limit: usize,
        keep: F,
    ) -> TriageResult<Vec<Issue>>
    where
        F: Fn(&Issue) -> bool,
    {
        let mut issues = Vec::new();
        let mut page: u32 = 1;

        while issues.len() < limit {
            let page_str = page.to_string();
            let per_page = PER_PAGE.to_string();
            let mut query: Vec<(&str, &str)> = params.to_vec();
            query.push(("per_page", per_page.as_str()));
            query.push(("page", page_str.as_str()));

            let response = self.get("/issues", &query).await?;
            let batch: Vec<GitHubIssue> = response.json().await?;
            let count = batch.len();
            debug!(page, count, "Fetched issue page");

            issues.extend(batch.into_iter().map(Issue::from).filter(|i| keep(i)));

            if count < PER_PAGE || issues.len() >= limit {
                break;
            }
            if page % PAGES_PER_PAUSE == 0 {
                debug!(pause_ms = self.page_pause.as_millis() as u64, "Pacing pause");
                sleep(self.page_pause).await;
            }
            page += 1;
        }

        issues.truncate(limit);
        Ok(issues)
    }

    /// Replace the full label set on an issue.
    #[instrument(skip(self, labels))]
    pub async fn replace_labels(&self, number: u64, labels: &[String]) -> TriageResult<()> {
        let path = format!("/issues/{number}/labels");
        let body = serde_json::json!({ "labels": labels });
        self.retry
            .run("replace_labels", || {
                self.send(Method::PUT, &path, &[], Some(&body))
            })
            .await
            .map_err(|e| not_found_as(e, number))?;

        info!(issue = number, count = labels.len(), "Replaced labels");
        Ok(())
    }

    /// Read the current labels, drop `remove`, append any missing `add`, and
    /// write the result back.
    pub async fn update_labels(
        &self,
        number: u64,
        add: &[String],
        remove: &[String],
    ) -> TriageResult<Vec<String>> {
        let current = self.fetch_issue(number).await?.labels;
        let updated = merge_labels(&current, add, remove);
        self.replace_labels(number, &updated).await?;
        Ok(updated)
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> TriageResult<Response> {
        self.retry
            .run("github_get", || self.send(Method::GET, path, query, None))
            .await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> TriageResult<Response> {
        let url = format!(
            "{}/repos/{}/{}{}",
            self.base_url, self.owner, self.repo, path
        );

        let mut request = self
            .http_client
            .request(method, &url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        check_status(response).await
    }
}

#[async_trait]
impl IssueSource for GitHubClient {
    #[instrument(skip(self))]
    async fn fetch_pending_issues(&self, limit: usize) -> TriageResult<Vec<Issue>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let params = [
            ("labels", self.pending_label.as_str()),
            ("state", "open"),
            ("sort", "created"),
            ("direction", "desc"),
        ];
        let issues = self.fetch_paginated(&params, limit, |_| true).await?;
        info!(count = issues.len(), "Fetched pending issues");
        Ok(issues)
    }

    #[instrument(skip(self))]
    async fn fetch_triaged_issues(&self, limit: usize) -> TriageResult<Vec<Issue>> {
        let mut issues = Vec::new();
        for state in ["open", "closed"] {
            if issues.len() >= limit {
                break;
            }
            let params = [("state", state), ("sort", "updated"), ("direction", "desc")];
            let remaining = limit - issues.len();
            let batch = self
                .fetch_paginated(&params, remaining, |i| !i.has_label(&self.pending_label))
                .await?;
            debug!(state, count = batch.len(), "Fetched triaged issues");
            issues.extend(batch);
        }
        info!(count = issues.len(), "Fetched triaged issues");
        Ok(issues)
    }

    #[instrument(skip(self))]
    async fn fetch_issue(&self, number: u64) -> TriageResult<Issue> {
        let response = self
            .get(&format!("/issues/{number}"), &[])
            .await
            .map_err(|e| not_found_as(e, number))?;
        let raw: GitHubIssue = response.json().await?;
        Ok(raw.into())
    }

    async fn fetch_maintainer_comments(&self, number: u64, max: usize) -> String {
        if max == 0 {
            return String::new();
        }
        let per_page = max.min(PER_PAGE).to_string();
        let result = async {
            let response = self
                .get(&format!("/issues/{number}/comments"), &[("per_page", per_page.as_str())])
                .await?;
            let comments: Vec<GitHubComment> = response.json().await?;
            Ok::<_, TriageError>(comments)
        }
        .await;

        match result {
            Ok(comments) => maintainer_transcript(&comments),
            Err(e) => {
                warn!(issue = number, error = %e, "Failed to fetch comments");
                String::new()
            }
        }
    }
}

/// Translate a non-success response into a typed error.
async fn check_status(response: Response) -> TriageResult<Response> {
    let status = response.status();
    let remaining = header_i64(&response, "x-ratelimit-remaining");
    if let Some(remaining) = remaining {
        debug!(remaining, "GitHub rate limit");
    }
    if status.is_success() {
        return Ok(response);
    }

    let reset_at = header_i64(&response, "x-ratelimit-reset");
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GitHubErrorBody>(&text)
        .map(|b| b.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => TriageError::RateLimitExceeded { reset_at },
        StatusCode::FORBIDDEN if remaining == Some(0) => {
            TriageError::RateLimitExceeded { reset_at }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            TriageError::AuthenticationFailed(message)
        }
        _ => TriageError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

fn header_i64(response: &Response, name: &str) -> Option<i64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn not_found_as(error: TriageError, number: u64) -> TriageError {
    match error {
        TriageError::Api { status: 404, .. } => TriageError::IssueNotFound(number),
        other => other,
    }
}

/// Compute the label set after removing `remove` and appending `add`.
pub fn merge_labels(current: &[String], add: &[String], remove: &[String]) -> Vec<String> {
    let mut labels: Vec<String> = current
        .iter()
        .filter(|l| !remove.contains(l))
        .cloned()
        .collect();
    for label in add {
        if !labels.contains(label) {
            labels.push(label.clone());
        }
    }
    labels
}
