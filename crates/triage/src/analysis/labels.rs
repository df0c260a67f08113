//! Keyword-based label suggestions.

use super::categories::Category;
use crate::github::Issue;

/// Suggest labels for an issue from its category and keywords in its text.
pub fn suggest_labels(issue: &Issue, category: Category) -> Vec<String> {
    let title = issue.title.to_lowercase();
    let body = issue.body_text().to_lowercase();
    let anywhere = |word: &str| title.contains(word) || body.contains(word);

    let mut labels = Vec::new();
    push_unique(&mut labels, category.suggested_label());

    if anywhere("crash") || anywhere("critical") {
        push_unique(&mut labels, "priority: high");
    }
    if anywhere("windows") || body.contains("win32") {
        push_unique(&mut labels, "platform: windows");
    }
    if title.contains("mac") || title.contains("macos") || body.contains("darwin") {
        push_unique(&mut labels, "platform: mac");
    }
    if anywhere("linux") {
        push_unique(&mut labels, "platform: linux");
    }
    if category == Category::Bug {
        push_unique(&mut labels, "needs-reproduction");
    }

    labels
}

fn push_unique(labels: &mut Vec<String>, label: &str) {
    if !labels.iter().any(|l| l == label) {
        labels.push(label.to_string());
    }
}
