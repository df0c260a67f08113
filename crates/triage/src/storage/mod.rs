//! Result persistence: JSON artifacts and markdown exports.

pub mod report;
pub mod results;

pub use report::{MarkdownReport, QuickReport};
pub use results::{write_with_fallback, BatchRun, ResultStore, TriageRunInfo};
