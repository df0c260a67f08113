//! Issue categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Triage category assigned to every issue.
///
/// Ordering follows declaration order and drives report layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Bug,
    #[serde(rename = "Feature Request")]
    FeatureRequest,
    Usability,
    Question,
}

impl Category {
    /// Get all categories.
    #[must_use]
    pub fn all() -> &'static [Category] {
        &[
            Category::Bug,
            Category::FeatureRequest,
            Category::Usability,
            Category::Question,
        ]
    }

    /// Parse a display name ("Feature Request") or identifier
    /// ("FEATURE_REQUEST"), ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::all().iter().copied().find(|c| {
            s.eq_ignore_ascii_case(c.display_name()) || s.eq_ignore_ascii_case(c.identifier())
        })
    }

    /// Human-facing name, also used in JSON artifacts.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Bug => "Bug",
            Category::FeatureRequest => "Feature Request",
            Category::Usability => "Usability",
            Category::Question => "Question",
        }
    }

    #[must_use]
    pub fn identifier(&self) -> &'static str {
        match self {
            Category::Bug => "BUG",
            Category::FeatureRequest => "FEATURE_REQUEST",
            Category::Usability => "USABILITY",
            Category::Question => "QUESTION",
        }
    }

    /// One-line definition given to the model.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Category::Bug => "Something is broken or behaves incorrectly",
            Category::FeatureRequest => "A request for new functionality or an enhancement",
            Category::Usability => "The product works but is confusing or hard to use",
            Category::Question => "A request for help, clarification, or information",
        }
    }

    /// Guidance for drafting the first maintainer reply.
    #[must_use]
    pub fn response_guidance(&self) -> &'static str {
        match self {
            Category::Bug => "- Ask for reproduction steps, environment details, error logs",
            Category::FeatureRequest => "- Acknowledge the request, ask about use cases",
            Category::Usability => "- Show empathy, discuss potential improvements",
            Category::Question => "- Provide direct answers or point to documentation",
        }
    }

    /// Label suggested for issues of this category.
    #[must_use]
    pub fn suggested_label(&self) -> &'static str {
        match self {
            Category::Bug => "bug",
            Category::FeatureRequest => "enhancement",
            Category::Usability => "usability",
            Category::Question => "question",
        }
    }

    /// Label written back to the tracker once an issue is triaged.
    #[must_use]
    pub fn type_label(&self) -> &'static str {
        match self {
            Category::Bug => "type: bug",
            Category::FeatureRequest => "type: feature",
            Category::Usability => "type: usability",
            Category::Question => "type: question",
        }
    }

    #[must_use]
    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Bug => "🐛",
            Category::FeatureRequest => "✨",
            Category::Usability => "🎨",
            Category::Question => "❓",
        }
    }

    /// Whether reproducibility is assessed for this category.
    #[must_use]
    pub fn needs_reproduction_check(&self) -> bool {
        matches!(self, Category::Bug | Category::Usability)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_display_and_identifier_forms() {
        assert_eq!(Category::parse("Feature Request"), Some(Category::FeatureRequest));
        assert_eq!(Category::parse("feature_request"), Some(Category::FeatureRequest));
        assert_eq!(Category::parse("BUG"), Some(Category::Bug));
        assert_eq!(Category::parse(" question "), Some(Category::Question));
        assert_eq!(Category::parse("Enhancement"), None);
        assert_eq!(Category::parse(""), None);
    }

    #[test]
    fn serializes_with_display_names() {
        let json = serde_json::to_string(&Category::FeatureRequest).unwrap();
        assert_eq!(json, "\"Feature Request\"");
        let parsed: Category = serde_json::from_str("\"Usability\"").unwrap();
        assert_eq!(parsed, Category::Usability);
    }

    #[test]
    fn reproduction_only_for_bug_and_usability() {
        let checked: Vec<Category> = Category::all()
            .iter()
            .copied()
            .filter(Category::needs_reproduction_check)
            .collect();
        assert_eq!(checked, vec![Category::Bug, Category::Usability]);
    }
}
