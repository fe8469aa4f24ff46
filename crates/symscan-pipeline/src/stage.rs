//! Pipeline stage identifiers and display progress.
//!
//! [`Stage`] is the controller's state. The UI shows five
//! [`DISPLAY_STEPS`]; [`Stage::progress_index`] maps a stage onto the
//! number of display steps that have finished (0..=5).

use std::fmt;

use crate::ports::Endpoint;

/// Highest progress index; reached only by [`Stage::Complete`].
pub const MAX_PROGRESS: u8 = 5;

/// Labels of the user-facing pipeline steps, in order.
pub const DISPLAY_STEPS: [&str; 5] = [
    "File Upload & Validation",
    "File Preprocessing",
    "Model Loading",
    "Object Detection Inference",
    "Results Processing",
];

/// State of the pipeline controller.
///
/// Transitions only move forward through the declaration order, except
/// an explicit reset back to [`Idle`](Self::Idle). [`Failed`](Self::Failed)
/// is terminal until reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    /// No run in progress.
    #[default]
    Idle,
    /// The file reached the backend; no stage call issued yet.
    Uploaded,
    /// Waiting on `GET /preprocess`.
    Preprocessing,
    /// Waiting on `GET /load_model`.
    ModelLoading,
    /// Waiting on `GET /inference`.
    Inferencing,
    /// Waiting on `GET /results`.
    FetchingResults,
    /// Results fetched; the payload is available.
    Complete,
    /// The run halted. See the controller's error for where.
    Failed,
}

impl Stage {
    /// Stages that issue a remote call, in execution order.
    pub const REMOTE: [Self; 4] = [
        Self::Preprocessing,
        Self::ModelLoading,
        Self::Inferencing,
        Self::FetchingResults,
    ];

    /// Short label used in status messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Upload",
            Self::Uploaded => "Uploaded",
            Self::Preprocessing => "Preprocessing",
            Self::ModelLoading => "Model loading",
            Self::Inferencing => "Inference",
            Self::FetchingResults => "Results",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Status line shown while this stage is current.
    #[must_use]
    pub const fn status_message(self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Uploaded => "File uploaded",
            Self::Preprocessing => "Preprocessing...",
            Self::ModelLoading => "Loading model...",
            Self::Inferencing => "Running inference...",
            Self::FetchingResults => "Fetching results...",
            Self::Complete => "Inference complete. Results ready.",
            Self::Failed => "Pipeline failed",
        }
    }

    /// The endpoint called on entering this stage, if any.
    #[must_use]
    pub const fn endpoint(self) -> Option<Endpoint> {
        match self {
            Self::Preprocessing => Some(Endpoint::Preprocess),
            Self::ModelLoading => Some(Endpoint::LoadModel),
            Self::Inferencing => Some(Endpoint::Inference),
            Self::FetchingResults => Some(Endpoint::Results),
            Self::Idle | Self::Uploaded | Self::Complete | Self::Failed => None,
        }
    }

    /// Number of finished display steps while in this stage.
    ///
    /// `Uploaded` and `Preprocessing` share index 1: both mean "upload
    /// done, preprocessing next". Every other stage has its own value,
    /// so `FetchingResults` (4) and `Complete` (5) are distinct.
    ///
    /// Returns `None` for [`Failed`](Self::Failed); the failing stage
    /// determines progress in that case.
    #[must_use]
    pub const fn progress_index(self) -> Option<u8> {
        match self {
            Self::Idle => Some(0),
            Self::Uploaded | Self::Preprocessing => Some(1),
            Self::ModelLoading => Some(2),
            Self::Inferencing => Some(3),
            Self::FetchingResults => Some(4),
            Self::Complete => Some(MAX_PROGRESS),
            Self::Failed => None,
        }
    }

    /// Whether the run has ended, successfully or not.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Whether a run is in progress.
    #[must_use]
    pub const fn is_running(self) -> bool {
        !matches!(self, Self::Idle | Self::Complete | Self::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Display state of one of the [`DISPLAY_STEPS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Not reached yet.
    Pending,
    /// Currently executing.
    InProgress,
    /// Finished successfully.
    Complete,
    /// The run halted here.
    Failed,
}

impl StepStatus {
    /// Label shown on the step's badge.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }
}

/// Status of display step `step` given the controller's `stage` and
/// `progress` index.
///
/// While idle every step is pending; a UI that is mid-upload marks the
/// first step in progress itself.
#[must_use]
pub fn step_status(step: usize, stage: Stage, progress: u8) -> StepStatus {
    let progress = usize::from(progress);
    match stage {
        Stage::Idle => StepStatus::Pending,
        Stage::Complete => StepStatus::Complete,
        Stage::Failed if step == progress => StepStatus::Failed,
        _ if step < progress => StepStatus::Complete,
        Stage::Failed => StepStatus::Pending,
        _ if step == progress => StepStatus::InProgress,
        _ => StepStatus::Pending,
    }
}
