//! Append-only markdown history of triage sessions.
//!
//! These files are a human-readable export. Nothing reads them back; the
//! JSON artifact is the source for redisplaying past runs.

use chrono::Local;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::analysis::{Category, ClassificationResult, QuickTriageRun};
use crate::errors::TriageResult;

const REPORT_HEADER: &str = "# GitHub Issue Triage Report\n\n\
This file contains the history of all triaged issues.\n\n---\n\n";

const QUICK_HEADER: &str = "# Quick Triage Results\n\n\
This file contains quick categorization of pending-triage issues based on title and description only.\n\n---\n\n";

/// Markdown history of full triage sessions.
#[derive(Debug, Clone)]
pub struct MarkdownReport {
    path: PathBuf,
}

impl MarkdownReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one session block, creating the file with a header if needed.
    pub fn append(&self, results: &[ClassificationResult]) -> TriageResult<()> {
        append_section(&self.path, REPORT_HEADER, &render_session(results))?;
        tracing::info!(path = %self.path.display(), issues = results.len(), "Triage report updated");
        Ok(())
    }
}

/// Markdown history of quick triage passes.
#[derive(Debug, Clone)]
pub struct QuickReport {
    path: PathBuf,
}

impl QuickReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, run: &QuickTriageRun) -> TriageResult<()> {
        append_section(&self.path, QUICK_HEADER, &render_quick_session(run))
    }
}

fn append_section(path: &Path, header: &str, section: &str) -> TriageResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let is_new = !path.exists();
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    if is_new {
        file.write_all(header.as_bytes())?;
    }
    file.write_all(section.as_bytes())?;
    Ok(())
}

fn render_session(results: &[ClassificationResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "## Triage Session - {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "**Total Issues Triaged:** {}\n", results.len());

    out.push_str("**Category Distribution:**\n");
    for category in Category::all() {
        let count = results.iter().filter(|r| r.category == *category).count();
        let _ = writeln!(out, "- {} {}: {}", category.emoji(), category, count);
    }
    out.push('\n');

    out.push_str("### Issues\n\n");
    for result in results {
        let _ = writeln!(
            out,
            "#### {} Issue #{}: {}\n",
            result.category.emoji(),
            result.issue_number,
            result.issue_title
        );
        let _ = writeln!(out, "- **Category:** {}", result.category);
        let _ = writeln!(out, "- **Confidence:** {}%", result.confidence());
        let _ = writeln!(out, "- **URL:** [{0}]({0})", result.issue_url);
        let _ = writeln!(out, "- **Reasoning:** {}", result.reasoning);
        if result.needs_manual_review() {
            out.push_str("- **Needs Manual Review:** yes\n");
        }
        if result.is_duplicate {
            let refs = result
                .duplicate_of
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|n| format!("#{n}"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "- **Possible Duplicate:** {refs}");
            if let Some(reasoning) = &result.duplicate_reasoning {
                let _ = writeln!(out, "  - {reasoning}");
            }
        }
        if !result.suggested_labels.is_empty() {
            let _ = writeln!(
                out,
                "- **Suggested Labels:** {}",
                result.suggested_labels.join(", ")
            );
        }
        if let Some(reproducibility) = result.reproducibility {
            let _ = writeln!(out, "- **Reproducibility:** {reproducibility}");
            if let Some(notes) = result.reproducibility_notes.as_deref().filter(|n| !n.is_empty()) {
                let _ = writeln!(out, "  - {notes}");
            }
        }
        out.push('\n');
    }

    out.push_str("---\n\n");
    out
}

fn render_quick_session(run: &QuickTriageRun) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "## Quick Triage Session - {}\n",
        run.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "**Total Issues:** {}\n", run.results.len());

    out.push_str("**Category Distribution:**\n");
    for category in Category::all() {
        let count = run.results.iter().filter(|r| r.category == *category).count();
        let _ = writeln!(out, "- {} {}: {}", category.emoji(), category, count);
    }
    out.push_str("\n### Issues\n\n");

    for result in &run.results {
        let _ = writeln!(
            out,
            "#### {} #{}: {}\n",
            result.category.emoji(),
            result.issue_number,
            result.issue_title
        );
        let _ = writeln!(out, "- **Category:** {}", result.category);
        let _ = writeln!(out, "- **Reason:** {}", result.reason);
        let _ = writeln!(
            out,
            "- **Author:** {}",
            result.author.as_deref().unwrap_or("unknown")
        );
        let _ = writeln!(out, "- **URL:** [{0}]({0})\n", result.issue_url);
    }

    out.push_str("---\n\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{QuickResult, Reproducibility};
    use crate::github::Issue;
    use chrono::Utc;
    use tempfile::TempDir;

    fn bug_result() -> ClassificationResult {
        let issue = Issue {
            number: 5,
            title: "Crash on save".into(),
            body: None,
            author: None,
            created_at: Utc::now(),
            labels: vec![],
            url: "https://github.com/acme/widgets/issues/5".into(),
        };
        let mut result = ClassificationResult::new(&issue, Category::Bug, 88, "stack trace".into());
        result.suggested_labels = vec!["bug".into(), "needs-reproduction".into()];
        result.reproducibility = Some(Reproducibility::Easy);
        result.reproducibility_notes = Some("steps given".into());
        result.is_duplicate = true;
        result.duplicate_of = Some(vec![2, 3]);
        result
    }

    #[test]
    fn header_written_once_and_sessions_appended() {
        let temp = TempDir::new().unwrap();
        let report = MarkdownReport::new(temp.path().join("triage-report.md"));

        report.append(&[bug_result()]).unwrap();
        report.append(&[bug_result()]).unwrap();

        let content = std::fs::read_to_string(report.path()).unwrap();
        assert!(content.starts_with("# GitHub Issue Triage Report\n"));
        assert_eq!(content.matches("# GitHub Issue Triage Report").count(), 1);
        assert_eq!(content.matches("## Triage Session - ").count(), 2);
    }

    #[test]
    fn session_lists_issue_details() {
        let section = render_session(&[bug_result()]);

        assert!(section.contains("**Total Issues Triaged:** 1"));
        assert!(section.contains("- 🐛 Bug: 1"));
        assert!(section.contains("- ✨ Feature Request: 0"));
        assert!(section.contains("#### 🐛 Issue #5: Crash on save"));
        assert!(section.contains("- **Confidence:** 88%"));
        assert!(section.contains("- **Possible Duplicate:** #2, #3"));
        assert!(section.contains("- **Suggested Labels:** bug, needs-reproduction"));
        assert!(section.contains("- **Reproducibility:** Easy\n  - steps given"));
        assert!(!section.contains("Needs Manual Review"));
    }

    #[test]
    fn quick_session_renders_reason_and_author() {
        let temp = TempDir::new().unwrap();
        let report = QuickReport::new(temp.path().join("quick-triage.md"));
        let run = QuickTriageRun {
            timestamp: Utc::now(),
            fetched: 1,
            failed: 0,
            results: vec![QuickResult {
                issue_number: 8,
                issue_title: "Dark mode".into(),
                issue_url: "u".into(),
                author: Some("dev".into()),
                category: Category::FeatureRequest,
                reason: "asks for a theme".into(),
            }],
        };

        report.append(&run).unwrap();
        let content = std::fs::read_to_string(temp.path().join("quick-triage.md")).unwrap();
        assert!(content.starts_with("# Quick Triage Results"));
        assert!(content.contains("#### ✨ #8: Dark mode"));
        assert!(content.contains("- **Reason:** asks for a theme"));
        assert!(content.contains("- **Author:** dev"));
    }
}
