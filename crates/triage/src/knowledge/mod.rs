//! Historical issue knowledge base.

pub mod base;
pub mod store;

pub use base::{infer_category_from_labels, IssueSummary, KnowledgeBase, KnowledgeBaseStatus};
pub use store::{BuildStats, KnowledgeBaseStore};
