//! Classification result records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::categories::Category;
use crate::github::Issue;

/// Results below this confidence are flagged for a human.
pub const REVIEW_THRESHOLD: u8 = 70;

/// How easily a reported problem can be reproduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reproducibility {
    Easy,
    Moderate,
    Difficult,
    Unknown,
}

impl Reproducibility {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "moderate" => Some(Self::Moderate),
            "difficult" => Some(Self::Difficult),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Reproducibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Easy => "Easy",
            Self::Moderate => "Moderate",
            Self::Difficult => "Difficult",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Outcome of classifying one issue.
///
/// `needs_manual_review` is derived from `confidence` and only changes
/// through [`set_confidence`](Self::set_confidence). A stored flag is
/// ignored on load and recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredResult")]
pub struct ClassificationResult {
    pub issue_number: u64,
    pub issue_title: String,
    pub issue_url: String,
    pub category: Category,
    confidence: u8,
    pub reasoning: String,
    pub suggested_response: String,
    pub suggested_labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reproducibility: Option<Reproducibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reproducibility_notes: Option<String>,
    pub is_duplicate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_reasoning: Option<String>,
    pub processed_at: DateTime<Utc>,
    needs_manual_review: bool,
}

/// Artifact shape of [`ClassificationResult`], without the derived flag.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredResult {
    issue_number: u64,
    issue_title: String,
    issue_url: String,
    category: Category,
    confidence: i64,
    reasoning: String,
    #[serde(default)]
    suggested_response: String,
    #[serde(default)]
    suggested_labels: Vec<String>,
    #[serde(default)]
    reproducibility: Option<Reproducibility>,
    #[serde(default)]
    reproducibility_notes: Option<String>,
    #[serde(default)]
    is_duplicate: bool,
    #[serde(default)]
    duplicate_of: Option<Vec<u64>>,
    #[serde(default)]
    duplicate_reasoning: Option<String>,
    processed_at: DateTime<Utc>,
}

impl From<StoredResult> for ClassificationResult {
    fn from(stored: StoredResult) -> Self {
        let mut result = Self {
            issue_number: stored.issue_number,
            issue_title: stored.issue_title,
            issue_url: stored.issue_url,
            category: stored.category,
            confidence: 0,
            reasoning: stored.reasoning,
            suggested_response: stored.suggested_response,
            suggested_labels: stored.suggested_labels,
            reproducibility: stored.reproducibility,
            reproducibility_notes: stored.reproducibility_notes,
            is_duplicate: stored.is_duplicate,
            duplicate_of: stored.duplicate_of,
            duplicate_reasoning: stored.duplicate_reasoning,
            processed_at: stored.processed_at,
            needs_manual_review: true,
        };
        result.set_confidence(stored.confidence);
        result
    }
}

impl ClassificationResult {
    /// Start a result for `issue` with the given category verdict.
    pub fn new(issue: &Issue, category: Category, confidence: i64, reasoning: String) -> Self {
        let mut result = Self {
            issue_number: issue.number,
            issue_title: issue.title.clone(),
            issue_url: issue.url.clone(),
            category,
            confidence: 0,
            reasoning,
            suggested_response: String::new(),
            suggested_labels: Vec::new(),
            reproducibility: None,
            reproducibility_notes: None,
            is_duplicate: false,
            duplicate_of: None,
            duplicate_reasoning: None,
            processed_at: Utc::now(),
            needs_manual_review: true,
        };
        result.set_confidence(confidence);
        result
    }

    /// Set confidence, clamped to 0..=100, and recompute the review flag.
    pub fn set_confidence(&mut self, confidence: i64) {
        self.confidence = confidence.clamp(0, 100) as u8;
        self.needs_manual_review = self.confidence < REVIEW_THRESHOLD;
    }

    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    pub fn needs_manual_review(&self) -> bool {
        self.needs_manual_review
    }
}
