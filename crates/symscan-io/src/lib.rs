//! symscan-io: Browser I/O and Dioxus component library.
//!
//! Implements the pipeline ports over `fetch` and `XMLHttpRequest`,
//! saves CSV exports through Blob downloads, and provides the UI
//! components of the symscan web application.

pub mod components;
pub mod download;
pub mod http;

pub use components::{DetectionOverview, FileUpload, PageViewer, ProgressTracker, ResultsSummary};
pub use http::{HttpBackend, HttpError};

use symscan_pipeline::BackendConfig;
use tracing::warn;

/// Backend address baked in at compile time.
const BACKEND_URL: Option<&str> = option_env!("SYMSCAN_BACKEND_URL");

/// The backend address for this build.
///
/// Taken from `SYMSCAN_BACKEND_URL` at compile time; an unset or
/// invalid value falls back to [`BackendConfig::DEFAULT_BASE_URL`].
#[must_use]
pub fn backend_config() -> BackendConfig {
    let Some(url) = BACKEND_URL else {
        return BackendConfig::default();
    };
    BackendConfig::new(url).unwrap_or_else(|e| {
        warn!(error = %e, "ignoring SYMSCAN_BACKEND_URL");
        BackendConfig::default()
    })
}
