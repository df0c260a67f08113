//! Issue records and their GitHub wire shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment author associations counted as maintainers.
pub const MAINTAINER_ASSOCIATIONS: &[&str] = &["OWNER", "MEMBER", "COLLABORATOR"];

/// An issue as seen by the pipeline. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Label names in tracker order, without duplicates.
    pub labels: Vec<String>,
    pub url: String,
}

impl Issue {
    /// Body text, or an empty string when the issue has none.
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l == name)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitHubLabel {
    pub name: String,
}

/// Issue payload returned by the REST API.
#[derive(Debug, Deserialize)]
pub(crate) struct GitHubIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    pub html_url: String,
}

impl From<GitHubIssue> for Issue {
    fn from(raw: GitHubIssue) -> Self {
        let mut labels: Vec<String> = Vec::with_capacity(raw.labels.len());
        for label in raw.labels {
            if !labels.contains(&label.name) {
                labels.push(label.name);
            }
        }

        Self {
            number: raw.number,
            title: raw.title,
            body: raw.body,
            author: raw.user.map(|u| u.login),
            created_at: raw.created_at,
            labels,
            url: raw.html_url,
        }
    }
}

/// Comment payload returned by the REST API.
#[derive(Debug, Deserialize)]
pub(crate) struct GitHubComment {
    #[serde(default)]
    pub user: Option<GitHubUser>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub author_association: String,
}

impl GitHubComment {
    pub fn is_from_maintainer(&self) -> bool {
        MAINTAINER_ASSOCIATIONS.contains(&self.author_association.as_str())
    }
}

/// Render maintainer comments as `[login]: body` lines.
pub(crate) fn maintainer_transcript(comments: &[GitHubComment]) -> String {
    let mut transcript = String::new();
    for comment in comments.iter().filter(|c| c.is_from_maintainer()) {
        let login = comment.user.as_ref().map_or("unknown", |u| u.login.as_str());
        transcript.push('[');
        transcript.push_str(login);
        transcript.push_str("]: ");
        transcript.push_str(comment.body.as_deref().unwrap_or(""));
        transcript.push('\n');
    }
    transcript
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitHubErrorBody {
    pub message: String,
}
