//! # Triage
//!
//! Automated triage for GitHub issues labelled `pending-triage`.
//!
//! This crate provides:
//! - Paginated issue retrieval with rate-limit aware error handling
//! - LLM classification into Bug / Feature Request / Usability / Question,
//!   with response drafts, label suggestions and reproducibility notes
//! - A knowledge base of previously triaged issues for duplicate detection
//! - JSON result artifacts with fallback, plus an appended markdown report
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use triage::{Classifier, GitHubClient, ModelClient, ResultStore, TriagePipeline};
//!
//! let source = Arc::new(GitHubClient::new(&config.github, &config.pacing)?);
//! let model = ModelClient::from_config(provider, &config.ai);
//! let classifier = Classifier::new(model, Some(source.clone()))?;
//! let pipeline = TriagePipeline::new(source, classifier, None, store, None, delay);
//!
//! let status = pipeline.run_batch(100).await;
//! ```

pub mod ai;
pub mod analysis;
pub mod config;
pub mod errors;
pub mod github;
pub mod knowledge;
pub mod pipeline;
pub mod retry;
pub mod storage;

pub use ai::{AIProvider, ModelClient};
pub use analysis::{Category, ClassificationResult, Classifier, Reproducibility};
pub use config::TriageConfig;
pub use errors::{exit_code, TriageError, TriageResult};
pub use github::{GitHubClient, Issue, IssueSource};
pub use knowledge::{KnowledgeBase, KnowledgeBaseStore};
pub use pipeline::{BatchOutcome, BatchSummary, TriagePipeline};
pub use retry::RetryPolicy;
pub use storage::{BatchRun, MarkdownReport, ResultStore};
