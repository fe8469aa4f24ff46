//! Dioxus UI components for symscan.
//!
//! Provides the document picker, pipeline progress tracker, results
//! summary cards, per-class detection table, and the page viewer.

mod progress;
mod summary;
mod upload;
mod viewer;

pub use progress::ProgressTracker;
pub use summary::{DetectionOverview, ResultsSummary};
pub use upload::FileUpload;
pub use viewer::PageViewer;
