//! Structured JSON result artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analysis::{Category, ClassificationResult};
use crate::errors::{TriageError, TriageResult};

/// Batch-level metadata stored alongside the results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageRunInfo {
    pub timestamp: DateTime<Utc>,
    pub total_issues: usize,
    /// Count per category display name; every category is present.
    pub summary: BTreeMap<String, usize>,
    #[serde(default)]
    pub flagged_for_review: usize,
    #[serde(default)]
    pub failed: usize,
}

/// Contents of one batch artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRun {
    pub triage_run: TriageRunInfo,
    pub results: Vec<ClassificationResult>,
}

impl BatchRun {
    pub fn new(results: Vec<ClassificationResult>, failed: usize) -> Self {
        let summary = Category::all()
            .iter()
            .map(|c| {
                let count = results.iter().filter(|r| r.category == *c).count();
                (c.display_name().to_string(), count)
            })
            .collect();

        Self {
            triage_run: TriageRunInfo {
                timestamp: Utc::now(),
                total_issues: results.len(),
                summary,
                flagged_for_review: results.iter().filter(|r| r.needs_manual_review()).count(),
                failed,
            },
            results,
        }
    }
}

/// Writes batch artifacts to a primary path, with timestamped fallbacks.
#[derive(Debug, Clone)]
pub struct ResultStore {
    primary: PathBuf,
    fallback_dir: PathBuf,
}

impl ResultStore {
    pub fn new(primary: impl Into<PathBuf>, fallback_dir: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            fallback_dir: fallback_dir.into(),
        }
    }

    pub fn primary(&self) -> &Path {
        &self.primary
    }

    /// Write a batch run. Returns the path actually written.
    pub fn persist(&self, run: &BatchRun) -> TriageResult<PathBuf> {
        write_with_fallback(&self.primary, &self.fallback_dir, "triage-results", run)
    }

    /// Read the artifact at the primary path.
    pub fn load_latest(&self) -> TriageResult<BatchRun> {
        let content = std::fs::read_to_string(&self.primary)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Write `value` as pretty JSON to `primary`; on failure, to a new
/// timestamped file in `fallback_dir`. An existing fallback file is never
/// overwritten.
pub fn write_with_fallback<T: Serialize>(
    primary: &Path,
    fallback_dir: &Path,
    prefix: &str,
    value: &T,
) -> TriageResult<PathBuf> {
    let content = serde_json::to_string_pretty(value)?;

    match write_file(primary, &content) {
        Ok(()) => {
            tracing::info!(path = %primary.display(), "Results saved");
            Ok(primary.to_path_buf())
        }
        Err(primary_err) => {
            tracing::error!(
                path = %primary.display(),
                error = %primary_err,
                "Failed to save results, trying fallback"
            );
            let fallback = fallback_path(fallback_dir, prefix);
            match write_new_file(&fallback, &content) {
                Ok(()) => {
                    tracing::warn!(path = %fallback.display(), "Results saved to fallback location");
                    Ok(fallback)
                }
                Err(source) => Err(TriageError::Persistence {
                    path: fallback,
                    source,
                }),
            }
        }
    }
}

fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
}

/// Create `path` exclusively so a concurrent or earlier fallback survives.
fn write_new_file(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(content.as_bytes())
}

/// `<dir>/<prefix>-YYYYMMDD-HHMMSS-mmm.json`, suffixed with `-N` if taken.
fn fallback_path(dir: &Path, prefix: &str) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S-%3f");
    let base = format!("{prefix}-{stamp}");
    let mut candidate = dir.join(format!("{base}.json"));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{base}-{n}.json"));
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::Issue;
    use tempfile::TempDir;

    fn result(number: u64, category: Category, confidence: i64) -> ClassificationResult {
        let issue = Issue {
            number,
            title: format!("Issue {number}"),
            body: None,
            author: None,
            created_at: Utc::now(),
            labels: vec![],
            url: String::new(),
        };
        ClassificationResult::new(&issue, category, confidence, "r".into())
    }

    #[test]
    fn batch_summary_counts_every_category() {
        let run = BatchRun::new(
            vec![
                result(1, Category::Bug, 90),
                result(2, Category::Bug, 50),
                result(3, Category::Question, 80),
            ],
            1,
        );

        let info = &run.triage_run;
        assert_eq!(info.total_issues, 3);
        assert_eq!(info.summary["Bug"], 2);
        assert_eq!(info.summary["Feature Request"], 0);
        assert_eq!(info.summary.len(), 4);
        assert_eq!(info.flagged_for_review, 1);
        assert_eq!(info.failed, 1);
    }

    #[test]
    fn persists_to_primary_and_reads_back() {
        let temp = TempDir::new().unwrap();
        let store = ResultStore::new(temp.path().join("out/results.json"), temp.path());

        let written = store
            .persist(&BatchRun::new(vec![result(1, Category::Usability, 75)], 0))
            .unwrap();
        assert_eq!(written, store.primary());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written).unwrap()).unwrap();
        assert_eq!(raw["triageRun"]["totalIssues"], 1);
        assert_eq!(raw["results"][0]["category"], "Usability");

        let loaded = store.load_latest().unwrap();
        assert_eq!(loaded.results[0].issue_number, 1);
    }

    #[test]
    fn falls_back_when_primary_unwritable() {
        let temp = TempDir::new().unwrap();
        // A directory at the primary path makes the write fail
        let primary = temp.path().join("taken");
        std::fs::create_dir(&primary).unwrap();
        let fallback_dir = temp.path().join("fallback");
        let store = ResultStore::new(&primary, &fallback_dir);

        let run = BatchRun::new(vec![result(1, Category::Bug, 90)], 0);
        let first = store.persist(&run).unwrap();
        let second = store.persist(&run).unwrap();

        assert_ne!(first, primary);
        assert_ne!(first, second);
        assert!(first.starts_with(&fallback_dir));
        assert!(first
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("triage-results-"));
        assert!(first.exists() && second.exists());
    }

    #[test]
    fn existing_fallback_is_never_reused() {
        let temp = TempDir::new().unwrap();
        let first = fallback_path(temp.path(), "triage-results");
        std::fs::write(&first, "{}").unwrap();

        let next = fallback_path(temp.path(), "triage-results");
        assert_ne!(first, next);
    }

    #[test]
    fn both_locations_failing_is_fatal() {
        let temp = TempDir::new().unwrap();
        let primary = temp.path().join("taken");
        std::fs::create_dir(&primary).unwrap();
        // Fallback "directory" is a regular file
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let store = ResultStore::new(&primary, &blocker);
        let err = store
            .persist(&BatchRun::new(vec![result(1, Category::Bug, 90)], 0))
            .unwrap_err();

        assert!(matches!(err, TriageError::Persistence { .. }));
        assert_eq!(err.exit_code(), 1);
    }
}
