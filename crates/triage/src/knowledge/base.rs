//! Knowledge base of previously triaged issues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::analysis::Category;
use crate::analysis::prompts::head_chars;

/// Examples shown per category in the context summary.
const EXAMPLES_PER_CATEGORY: usize = 3;

/// Characters of maintainer response shown per example.
const EXCERPT_CHARS: usize = 200;

/// Compact record of a historically triaged issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    pub number: u64,
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Maintainer comment transcript, if any maintainer replied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_response: Option<String>,
}

/// Historically triaged issues grouped by category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    total_issues_analyzed: usize,
    categorized_issues: BTreeMap<Category, Vec<IssueSummary>>,
    #[serde(default)]
    pub label_frequency: BTreeMap<String, u32>,
}

/// Snapshot of knowledge base state for status reporting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseStatus {
    pub exists: bool,
    pub total_issues_analyzed: usize,
    pub created_at: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub category_distribution: BTreeMap<Category, usize>,
}

impl KnowledgeBaseStatus {
    pub fn missing() -> Self {
        Self {
            exists: false,
            total_issues_analyzed: 0,
            created_at: None,
            last_updated: None,
            category_distribution: BTreeMap::new(),
        }
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeBase {
    /// Empty knowledge base with every category present.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_updated: now,
            total_issues_analyzed: 0,
            categorized_issues: Category::all().iter().map(|c| (*c, Vec::new())).collect(),
            label_frequency: BTreeMap::new(),
        }
    }

    /// Record one triaged issue under its category.
    pub fn add_issue(&mut self, summary: IssueSummary) {
        for label in &summary.labels {
            *self.label_frequency.entry(label.clone()).or_insert(0) += 1;
        }
        self.categorized_issues
            .entry(summary.category)
            .or_default()
            .push(summary);
        self.total_issues_analyzed += 1;
        self.last_updated = Utc::now();
    }

    pub fn total_issues_analyzed(&self) -> usize {
        self.total_issues_analyzed
    }

    pub fn is_empty(&self) -> bool {
        self.total_issues_analyzed == 0
    }

    pub fn issues_in(&self, category: Category) -> &[IssueSummary] {
        self.categorized_issues
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Restore invariants after loading from disk: all categories present and
    /// the total equal to the number of stored summaries.
    pub(crate) fn normalize(&mut self) {
        for category in Category::all() {
            self.categorized_issues.entry(*category).or_default();
        }
        self.total_issues_analyzed = self.categorized_issues.values().map(Vec::len).sum();
    }

    /// Text summary embedded in classification and duplicate prompts.
    pub fn context_summary(&self) -> String {
        let mut out = String::from("Knowledge Base Summary:\n");
        let _ = writeln!(out, "Total Issues Analyzed: {}", self.total_issues_analyzed);

        out.push_str("\nIssue Distribution by Category:\n");
        for (category, issues) in self.non_empty_categories() {
            let _ = writeln!(out, "- {}: {} issues", category, issues.len());
        }

        out.push_str("\nCommon Patterns and Team Responses:\n");
        for (category, issues) in self.non_empty_categories() {
            let _ = writeln!(out, "\n{category}:");
            for issue in issues.iter().take(EXAMPLES_PER_CATEGORY) {
                let _ = writeln!(out, "  - #{}: {}", issue.number, issue.title);
                if let Some(response) = issue.team_response.as_deref().filter(|r| !r.is_empty()) {
                    let _ = writeln!(
                        out,
                        "    Team Response: {}...",
                        head_chars(response, EXCERPT_CHARS)
                    );
                }
            }
        }

        out
    }

    pub fn status(&self) -> KnowledgeBaseStatus {
        KnowledgeBaseStatus {
            exists: true,
            total_issues_analyzed: self.total_issues_analyzed,
            created_at: Some(self.created_at),
            last_updated: Some(self.last_updated),
            category_distribution: self
                .categorized_issues
                .iter()
                .map(|(c, issues)| (*c, issues.len()))
                .collect(),
        }
    }

    fn non_empty_categories(&self) -> impl Iterator<Item = (&Category, &Vec<IssueSummary>)> {
        self.categorized_issues.iter().filter(|(_, v)| !v.is_empty())
    }
}

/// Infer a category from historical labels. First matching rule wins.
pub fn infer_category_from_labels(labels: &[String]) -> Option<Category> {
    const RULES: &[(&[&str], Category)] = &[
        (&["bug", "defect"], Category::Bug),
        (&["feature", "enhancement", "feature-request"], Category::FeatureRequest),
        (&["question", "help wanted", "help-wanted"], Category::Question),
        (&["usability", "ux", "ui"], Category::Usability),
    ];

    let lowered: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();
    RULES
        .iter()
        .find(|(names, _)| lowered.iter().any(|l| names.contains(&l.as_str())))
        .map(|(_, category)| *category)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(number: u64, category: Category, response: Option<&str>) -> IssueSummary {
        IssueSummary {
            number,
            title: format!("Issue {number}"),
            category,
            labels: vec!["triaged".into()],
            team_response: response.map(str::to_string),
        }
    }

    #[test]
    fn total_matches_sum_of_categories() {
        let mut kb = KnowledgeBase::new();
        kb.add_issue(summary(1, Category::Bug, None));
        kb.add_issue(summary(2, Category::Bug, None));
        kb.add_issue(summary(3, Category::Question, None));

        let sum: usize = Category::all().iter().map(|c| kb.issues_in(*c).len()).sum();
        assert_eq!(kb.total_issues_analyzed(), 3);
        assert_eq!(sum, 3);
        assert_eq!(kb.label_frequency["triaged"], 3);
    }

    #[test]
    fn context_caps_examples_and_excerpts() {
        let mut kb = KnowledgeBase::new();
        let long = "r".repeat(500);
        for n in 1..=5 {
            kb.add_issue(summary(n, Category::Bug, Some(&long)));
        }

        let context = kb.context_summary();
        assert!(context.starts_with("Knowledge Base Summary:\nTotal Issues Analyzed: 5\n"));
        assert!(context.contains("- Bug: 5 issues"));
        assert!(!context.contains("Question:"));
        assert!(context.contains("  - #3: Issue 3"));
        assert!(!context.contains("#4: Issue 4"));
        let expected = format!("    Team Response: {}...\n", "r".repeat(200));
        assert!(context.contains(&expected));
    }

    #[test]
    fn normalize_recomputes_total() {
        let json = serde_json::json!({
            "createdAt": "2024-01-01T00:00:00Z",
            "lastUpdated": "2024-01-02T00:00:00Z",
            "totalIssuesAnalyzed": 99,
            "categorizedIssues": {
                "Bug": [{"number": 1, "title": "a", "category": "Bug"}]
            }
        });
        let mut kb: KnowledgeBase = serde_json::from_value(json).unwrap();
        kb.normalize();

        assert_eq!(kb.total_issues_analyzed(), 1);
        assert!(kb.issues_in(Category::Usability).is_empty());
        assert_eq!(kb.status().category_distribution.len(), 4);
    }

    #[test]
    fn label_inference_first_rule_wins() {
        let labels = |names: &[&str]| names.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();

        assert_eq!(infer_category_from_labels(&labels(&["Defect"])), Some(Category::Bug));
        assert_eq!(
            infer_category_from_labels(&labels(&["ui", "enhancement"])),
            Some(Category::FeatureRequest)
        );
        assert_eq!(
            infer_category_from_labels(&labels(&["help wanted"])),
            Some(Category::Question)
        );
        assert_eq!(infer_category_from_labels(&labels(&["UX"])), Some(Category::Usability));
        assert_eq!(infer_category_from_labels(&labels(&["wontfix"])), None);
    }
}
