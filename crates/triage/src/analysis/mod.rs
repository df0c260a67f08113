//! Issue analysis: categories, prompts, classification.

pub mod categories;
pub mod classifier;
pub mod labels;
pub mod prompts;
pub mod quick;
pub mod result;
pub mod stats;

pub use categories::Category;
pub use classifier::Classifier;
pub use labels::suggest_labels;
pub use quick::{QuickResult, QuickTriage, QuickTriageRun};
pub use result::{ClassificationResult, Reproducibility, REVIEW_THRESHOLD};
pub use stats::LabelStatistics;
