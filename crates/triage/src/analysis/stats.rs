//! Label statistics for pending issues.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::github::Issue;

const RULES: &[(&[&str], &str)] = &[
    (&["bug", "defect"], "bug"),
    (&["feature", "enhancement"], "feature"),
    (&["question"], "question"),
    (&["usability", "ux"], "usability"),
];

const UNLABELED: &str = "unlabeled";

/// Counts of pending issues grouped by their first recognised label.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LabelStatistics {
    pub total: usize,
    pub by_kind: BTreeMap<String, usize>,
}

impl LabelStatistics {
    pub fn from_issues(issues: &[Issue]) -> Self {
        let mut stats = Self {
            total: issues.len(),
            by_kind: RULES
                .iter()
                .map(|(_, kind)| ((*kind).to_string(), 0))
                .chain(std::iter::once((UNLABELED.to_string(), 0)))
                .collect(),
        };

        for issue in issues {
            *stats.by_kind.entry(classify(&issue.labels).to_string()).or_insert(0) += 1;
        }
        stats
    }
}

/// First label containing a known keyword decides the kind.
fn classify(labels: &[String]) -> &'static str {
    for label in labels {
        let lower = label.to_lowercase();
        if let Some((_, kind)) = RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        {
            return *kind;
        }
    }
    UNLABELED
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn issue(labels: &[&str]) -> Issue {
        Issue {
            number: 1,
            title: String::new(),
            body: None,
            author: None,
            created_at: Utc::now(),
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
            url: String::new(),
        }
    }

    #[test]
    fn groups_by_first_matching_label() {
        let stats = LabelStatistics::from_issues(&[
            issue(&["pending-triage", "Type: Bug"]),
            issue(&["pending-triage", "enhancement", "bug"]),
            issue(&["pending-triage", "UX polish"]),
            issue(&["pending-triage"]),
        ]);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_kind["bug"], 1);
        assert_eq!(stats.by_kind["feature"], 1);
        assert_eq!(stats.by_kind["usability"], 1);
        assert_eq!(stats.by_kind["question"], 0);
        assert_eq!(stats.by_kind["unlabeled"], 1);
    }
}
