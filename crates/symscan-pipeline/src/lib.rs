//! symscan-pipeline: Pure orchestration core for the symscan client (sans-IO).
//!
//! Drives a remote symbol-detection backend through its stages:
//! upload -> preprocess -> model load -> inference -> results.
//!
//! This crate has **no I/O dependencies** -- every network call goes
//! through the [`StageBackend`] and [`UploadTransport`] ports, which
//! are implemented by `symscan-io` (browser) and `symscan-cli`
//! (native). Everything here can be driven from tests with scripted
//! in-memory ports.

pub mod config;
pub mod controller;
pub mod ports;
pub mod slot;
pub mod stage;
pub mod summary;
pub mod types;
pub mod upload;
pub mod viewer;

pub use config::{BackendConfig, ConfigError};
pub use controller::{PipelineController, StageEvent};
pub use ports::{Endpoint, StageBackend, TransportError, UploadTransport};
pub use slot::{ControllerSlot, Lease};
pub use stage::{DISPLAY_STEPS, MAX_PROGRESS, Stage, StepStatus, step_status};
pub use summary::{DetectionSummaryRow, class_color, summarize, to_csv};
pub use types::{
    DetectionRecord, PageImage, PipelineError, ResultsPayload, ResultsSummary, StageFailure,
    UploadResult, UploadStatus,
};
pub use upload::{ProgressReporter, UploadFile, UploadGate, UploadRejection};
pub use viewer::{
    Cursor, Point, ResolvedImage, ViewerAction, ViewerState, page_count, resolve_image_url,
};
