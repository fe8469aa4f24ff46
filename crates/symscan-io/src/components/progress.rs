//! Five-step pipeline progress tracker.

use dioxus::prelude::*;
use symscan_pipeline::{DISPLAY_STEPS, MAX_PROGRESS, Stage, StepStatus, step_status};

/// Props for the [`ProgressTracker`] component.
#[derive(Props, Clone, PartialEq)]
pub struct ProgressTrackerProps {
    /// Controller stage.
    stage: Stage,
    /// Controller progress index (0..=5).
    progress: u8,
    /// Whether the file transfer is still running; the first step shows
    /// as in progress before the controller has started.
    uploading: bool,
}

/// CSS modifier class for a step badge.
const fn badge_class(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "badge pending",
        StepStatus::InProgress => "badge in-progress",
        StepStatus::Complete => "badge complete",
        StepStatus::Failed => "badge failed",
    }
}

/// Status of step `index`, accounting for an upload in flight.
fn status_of(index: usize, stage: Stage, progress: u8, uploading: bool) -> StepStatus {
    if uploading && stage == Stage::Idle {
        return if index == 0 {
            StepStatus::InProgress
        } else {
            StepStatus::Pending
        };
    }
    step_status(index, stage, progress)
}

/// Width of the overall bar, in percent of the five steps.
const fn overall_percent(progress: u8) -> u8 {
    let step = if progress < MAX_PROGRESS { progress } else { MAX_PROGRESS };
    step * (100 / MAX_PROGRESS)
}

/// Overall progress bar above a vertical list of the pipeline steps
/// with a status badge each.
#[component]
pub fn ProgressTracker(props: ProgressTrackerProps) -> Element {
    let percent = overall_percent(props.progress);

    rsx! {
        div {
            class: "progress-bar",
            role: "progressbar",
            "aria-valuenow": "{percent}",
            div { class: "progress-fill", style: "width: {percent}%" }
        }
        ol { class: "steps",
            for (index, label) in DISPLAY_STEPS.iter().enumerate() {
                {
                    let status = status_of(index, props.stage, props.progress, props.uploading);
                    rsx! {
                        li { key: "{index}", class: "step",
                            span { class: "step-number", "{index + 1}" }
                            span { class: "step-label", "{label}" }
                            span { class: badge_class(status), "{status.label()}" }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_in_flight_marks_first_step() {
        assert_eq!(status_of(0, Stage::Idle, 0, true), StepStatus::InProgress);
        assert_eq!(status_of(1, Stage::Idle, 0, true), StepStatus::Pending);
        assert_eq!(status_of(0, Stage::Idle, 0, false), StepStatus::Pending);
    }

    #[test]
    fn overall_bar_tracks_the_progress_index() {
        assert_eq!(overall_percent(0), 0);
        assert_eq!(overall_percent(2), 40);
        assert_eq!(overall_percent(MAX_PROGRESS), 100);
        assert_eq!(overall_percent(9), 100);
    }

    #[test]
    fn controller_state_wins_once_started() {
        assert_eq!(
            status_of(0, Stage::ModelLoading, 2, false),
            StepStatus::Complete
        );
        assert_eq!(
            status_of(2, Stage::ModelLoading, 2, false),
            StepStatus::InProgress
        );
    }
}
