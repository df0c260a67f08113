//! Runtime configuration.
//!
//! Settings come from an optional TOML file (`triage.toml` by default),
//! then environment variables override individual keys. [`TriageConfig::validate`]
//! runs before any work starts and reports every problem at once.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{TriageError, TriageResult};

/// Label that marks issues awaiting triage.
pub const DEFAULT_PENDING_LABEL: &str = "pending-triage";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub github: GitHubConfig,
    pub ai: AiConfig,
    pub output: OutputConfig,
    pub pacing: PacingConfig,
}

/// Tracker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub owner: String,
    pub repo: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub api_url: String,
    pub pending_label: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            token: String::new(),
            api_url: "https://api.github.com".to_string(),
            pending_label: DEFAULT_PENDING_LABEL.to_string(),
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// `anthropic` or `openai`.
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Override for the provider endpoint.
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Attempts per model call, including the first.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.3,
            max_tokens: 1000,
            max_attempts: 3,
            initial_backoff_ms: 2000,
        }
    }
}

/// Where artifacts are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Primary JSON artifact for batch runs.
    pub results_path: PathBuf,
    /// Directory for timestamped fallback artifacts.
    pub fallback_dir: PathBuf,
    /// Appended markdown history.
    pub report_path: PathBuf,
    pub knowledge_base_path: PathBuf,
    pub quick_results_path: PathBuf,
    pub quick_report_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: PathBuf::from("./triage-results.json"),
            fallback_dir: PathBuf::from("."),
            report_path: PathBuf::from("./triage-report.md"),
            knowledge_base_path: PathBuf::from("./knowledge-base.json"),
            quick_results_path: PathBuf::from("./quick-triage.json"),
            quick_report_path: PathBuf::from("./quick-triage.md"),
        }
    }
}

/// Delays and retry budgets for outbound calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause between consecutive issues in a batch.
    pub issue_delay_secs: u64,
    /// Pause after every third page of a listing.
    pub page_pause_ms: u64,
    /// Pause after every ten issues during a knowledge base build.
    pub kb_pause_ms: u64,
    /// Attempts per tracker request, including the first.
    pub network_attempts: u32,
    pub network_backoff_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            issue_delay_secs: 10,
            page_pause_ms: 1000,
            kb_pause_ms: 1000,
            network_attempts: 3,
            network_backoff_ms: 1000,
        }
    }
}

impl PacingConfig {
    pub fn issue_delay(&self) -> Duration {
        Duration::from_secs(self.issue_delay_secs)
    }
}

impl TriageConfig {
    /// Load from a TOML file, falling back to defaults when it does not exist,
    /// then apply environment overrides.
    pub fn load(path: &Path) -> TriageResult<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read the TOML file only.
    pub fn from_file(path: &Path) -> TriageResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            TriageError::Config(vec![format!("{}: {e}", path.display())])
        })
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("GITHUB_TOKEN").or_else(|| non_empty("GH_TOKEN")) {
            self.github.token = token;
        }
        if let Some(owner) = non_empty("GITHUB_OWNER") {
            self.github.owner = owner;
        }
        if let Some(repo) = non_empty("GITHUB_REPO") {
            self.github.repo = repo;
        }
        if let Some(path) = non_empty("TRIAGE_OUTPUT_PATH") {
            self.output.results_path = PathBuf::from(path);
        }
        if let Some(provider) = non_empty("TRIAGE_AI_PROVIDER") {
            self.ai.provider = provider;
        }
        if let Some(model) = non_empty("TRIAGE_AI_MODEL") {
            self.ai.model = model;
        }
        if self.ai.api_key.is_none() {
            let var = match self.ai.provider.as_str() {
                "openai" => "OPENAI_API_KEY",
                _ => "ANTHROPIC_API_KEY",
            };
            self.ai.api_key = non_empty(var);
        }
    }

    /// Check every required setting, collecting all problems.
    pub fn validate(&self) -> TriageResult<()> {
        let mut problems = Vec::new();

        if self.github.owner.trim().is_empty() {
            problems.push("GitHub owner is not configured. Set GITHUB_OWNER.".to_string());
        }
        if self.github.repo.trim().is_empty() {
            problems.push("GitHub repository is not configured. Set GITHUB_REPO.".to_string());
        }
        if self.github.token.trim().is_empty() {
            problems.push("GitHub token is not configured. Set GITHUB_TOKEN.".to_string());
        }
        if self.ai.model.trim().is_empty() {
            problems.push("AI model is not configured.".to_string());
        }
        match self.ai.provider.as_str() {
            "anthropic" | "openai" => {
                if self.ai.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
                    problems.push(format!(
                        "No API key for AI provider '{}'.",
                        self.ai.provider
                    ));
                }
            }
            other => problems.push(format!("Unknown AI provider '{other}'.")),
        }
        if self.ai.max_attempts == 0 {
            problems.push("ai.max_attempts must be at least 1.".to_string());
        }
        if self.output.results_path.as_os_str().is_empty() {
            problems.push("Output path is not configured.".to_string());
        }

        if problems.is_empty() {
            tracing::info!(
                repo = %format!("{}/{}", self.github.owner, self.github.repo),
                model = %self.ai.model,
                output = %self.output.results_path.display(),
                "Configuration validated"
            );
            Ok(())
        } else {
            for problem in &problems {
                tracing::error!("{problem}");
            }
            Err(TriageError::Config(problems))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_file_missing() {
        let temp = TempDir::new().unwrap();
        let config = TriageConfig::from_file(&temp.path().join("nope.toml")).unwrap();

        assert_eq!(config.github.pending_label, "pending-triage");
        assert_eq!(config.pacing.issue_delay(), Duration::from_secs(10));
        assert_eq!(config.ai.max_attempts, 3);
    }

    #[test]
    fn reads_partial_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("triage.toml");
        std::fs::write(
            &path,
            r#"
[github]
owner = "acme"
repo = "widgets"

[pacing]
issue_delay_secs = 2
"#,
        )
        .unwrap();

        let config = TriageConfig::from_file(&path).unwrap();
        assert_eq!(config.github.owner, "acme");
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.pacing.issue_delay_secs, 2);
        assert_eq!(config.pacing.page_pause_ms, 1000);
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("triage.toml");
        std::fs::write(&path, "[github\nowner = ").unwrap();

        let err = TriageConfig::from_file(&path).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = TriageConfig::default();
        config.github.owner = "from-file".into();

        config.apply_env(env(&[
            ("GITHUB_OWNER", "from-env"),
            ("GITHUB_REPO", "repo"),
            ("GH_TOKEN", "ghp_x"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
        ]));

        assert_eq!(config.github.owner, "from-env");
        assert_eq!(config.github.token, "ghp_x");
        assert_eq!(config.ai.api_key.as_deref(), Some("sk-ant"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn api_key_follows_selected_provider() {
        let mut config = TriageConfig::default();
        config.apply_env(env(&[
            ("TRIAGE_AI_PROVIDER", "openai"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("OPENAI_API_KEY", "sk-oai"),
        ]));

        assert_eq!(config.ai.provider, "openai");
        assert_eq!(config.ai.api_key.as_deref(), Some("sk-oai"));
    }

    #[test]
    fn validate_reports_all_problems() {
        let config = TriageConfig::default();
        let err = config.validate().unwrap_err();

        match err {
            TriageError::Config(problems) => {
                assert!(problems.iter().any(|p| p.contains("owner")));
                assert!(problems.iter().any(|p| p.contains("repository")));
                assert!(problems.iter().any(|p| p.contains("token")));
                assert!(problems.iter().any(|p| p.contains("API key")));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_provider_rejected() {
        let mut config = TriageConfig::default();
        config.github.owner = "o".into();
        config.github.repo = "r".into();
        config.github.token = "t".into();
        config.ai.provider = "llama".into();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown AI provider 'llama'"));
    }
}
