//! Error types for the triage pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Process status codes reported by pipeline operations and the CLI.
pub mod exit_code {
    /// Operation completed (including "nothing to do").
    pub const SUCCESS: i32 = 0;
    /// Generic tracker, model, or unexpected failure.
    pub const FAILURE: i32 = 1;
    /// Tracker rate limit exhausted.
    pub const RATE_LIMITED: i32 = 2;
    /// Tracker rejected the credentials.
    pub const AUTH_FAILED: i32 = 3;
    /// Requested issue does not exist.
    pub const NOT_FOUND: i32 = 4;
    /// Startup configuration is invalid.
    pub const INVALID_CONFIG: i32 = 5;
}

/// Errors produced anywhere in the triage pipeline.
#[derive(Debug, Error)]
pub enum TriageError {
    /// HTTP transport failure talking to the tracker
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Tracker answered with an unexpected status
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Tracker rate limit exhausted
    #[error("GitHub rate limit exceeded (resets at {})", .reset_at.map_or_else(|| "unknown".to_string(), |t| t.to_string()))]
    RateLimitExceeded { reset_at: Option<i64> },

    /// Tracker rejected the credentials
    #[error("GitHub authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Single-issue lookup found nothing
    #[error("Issue #{0} not found")]
    IssueNotFound(u64),

    /// Configuration failed validation
    #[error("Invalid configuration: {}", .0.join("; "))]
    Config(Vec<String>),

    /// Model call failed and should not be retried
    #[error("AI error: {0}")]
    Ai(String),

    /// Model call failed in a way worth retrying (timeouts, overload, 5xx)
    #[error("AI provider unavailable: {0}")]
    ModelUnavailable(String),

    /// Model answered but the payload could not be parsed
    #[error("Failed to parse AI response: {reason}")]
    AiResponseParse { reason: String },

    /// Result artifact could not be written to the primary or fallback path
    #[error("Failed to persist results to {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Prompt template failed to render
    #[error("Prompt template error: {0}")]
    Template(String),
}

impl TriageError {
    /// Map the error onto the process status code contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RateLimitExceeded { .. } => exit_code::RATE_LIMITED,
            Self::AuthenticationFailed(_) => exit_code::AUTH_FAILED,
            Self::IssueNotFound(_) => exit_code::NOT_FOUND,
            Self::Config(_) => exit_code::INVALID_CONFIG,
            _ => exit_code::FAILURE,
        }
    }

    /// Whether a retry has a chance of succeeding.
    ///
    /// Only network-level failures qualify. Authentication, rate-limit and
    /// not-found answers are terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::ModelUnavailable(_) => true,
            _ => false,
        }
    }
}

impl From<handlebars::RenderError> for TriageError {
    fn from(e: handlebars::RenderError) -> Self {
        Self::Template(e.to_string())
    }
}

impl From<handlebars::TemplateError> for TriageError {
    fn from(e: handlebars::TemplateError) -> Self {
        Self::Template(e.to_string())
    }
}

/// Result alias used across the crate.
pub type TriageResult<T> = Result<T, TriageError>;
