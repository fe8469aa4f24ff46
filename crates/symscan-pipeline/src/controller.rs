//! Sequencing of the remote pipeline stages.
//!
//! After a successful upload, [`PipelineController::start`] walks the
//! stages in order:
//!
//! ```text
//! Uploaded -> Preprocessing -> ModelLoading -> Inferencing -> FetchingResults -> Complete
//! ```
//!
//! Each stage issues exactly one call and the call is awaited before
//! the next stage begins: every stage depends on server-side state left
//! by the previous one. The first failure moves the controller to
//! [`Stage::Failed`] and ends the run; nothing is retried and earlier
//! stages are not rolled back.
//!
//! `start` takes `&mut self`, so two runs can never overlap on one
//! controller.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::ports::{Endpoint, StageBackend};
use crate::stage::Stage;
use crate::types::{PipelineError, ResultsPayload, StageFailure, UploadResult};

/// The `status` value stage endpoints return on success.
const STAGE_SUCCESS_STATUS: &str = "ok";

/// Emitted on every controller transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEvent {
    /// The stage just entered.
    pub stage: Stage,
    /// Display progress index (0..=5) after the transition.
    pub progress: u8,
    /// Human-readable status line.
    pub status: String,
}

impl StageEvent {
    /// Whether the event reports a failure.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.stage, Stage::Failed)
    }
}

/// Drives one session's pipeline runs against a [`StageBackend`].
#[derive(Debug)]
pub struct PipelineController<B> {
    backend: B,
    stage: Stage,
    status: String,
    error: Option<PipelineError>,
    results: Option<Arc<ResultsPayload>>,
}

impl<B: StageBackend> PipelineController<B> {
    /// Create an idle controller.
    pub const fn new(backend: B) -> Self {
        Self {
            backend,
            stage: Stage::Idle,
            status: String::new(),
            error: None,
            results: None,
        }
    }

    /// The backend this controller calls.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Current stage.
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Current status line; empty while idle.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// The error that halted the last run, if it failed.
    pub const fn error(&self) -> Option<&PipelineError> {
        self.error.as_ref()
    }

    /// Payload of the last completed run.
    pub const fn results(&self) -> Option<&Arc<ResultsPayload>> {
        self.results.as_ref()
    }

    /// Display progress index (0..=5).
    ///
    /// After a failure this is the index of the stage that failed, so
    /// the UI can mark that step.
    pub fn progress(&self) -> u8 {
        let stage = self
            .error
            .as_ref()
            .map_or(self.stage, PipelineError::failed_stage);
        stage.progress_index().unwrap_or_default()
    }

    /// Return to [`Stage::Idle`], discarding status, error, and results.
    pub fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.status.clear();
        self.error = None;
        self.results = None;
    }

    /// Ask the backend to clear artifacts of previous sessions.
    ///
    /// Called once at session start. Failure is logged and otherwise
    /// ignored: the pipeline works against a dirty backend too.
    #[allow(clippy::future_not_send)] // Browser backends are single-threaded
    pub async fn reset_backend(&self) {
        match self.backend.get_json(Endpoint::Reset).await {
            Ok(_) => info!("backend storage reset"),
            Err(e) => warn!(error = %e, "failed to reset backend storage"),
        }
    }

    /// Run the pipeline for a finished upload.
    ///
    /// Equivalent to [`start_with`](Self::start_with) with an observer
    /// that ignores every event.
    ///
    /// # Errors
    ///
    /// See [`start_with`](Self::start_with).
    #[allow(clippy::future_not_send)] // Browser backends are single-threaded
    pub async fn start(
        &mut self,
        upload: &UploadResult,
    ) -> Result<Arc<ResultsPayload>, PipelineError> {
        self.start_with(upload, |_| {}).await
    }

    /// Run the pipeline for a finished upload, reporting every
    /// transition to `observe`.
    ///
    /// A run always starts from a reset controller, replacing any
    /// previous results wholesale. On success the fetched payload is
    /// stored and returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Upload`] without issuing any call if
    /// `upload` did not complete, and [`PipelineError::Stage`] for the
    /// first stage call that is rejected or reports failure.
    #[allow(clippy::future_not_send)] // Browser backends are single-threaded
    pub async fn start_with(
        &mut self,
        upload: &UploadResult,
        mut observe: impl FnMut(&StageEvent),
    ) -> Result<Arc<ResultsPayload>, PipelineError> {
        self.reset();

        if !upload.is_complete() {
            let reason = upload
                .error
                .clone()
                .unwrap_or_else(|| "upload did not complete".to_owned());
            return Err(self.fail(PipelineError::Upload(reason), &mut observe));
        }

        self.enter(Stage::Uploaded, &mut observe);

        for stage in Stage::REMOTE {
            self.enter(stage, &mut observe);
            let Some(endpoint) = stage.endpoint() else {
                continue;
            };
            debug!(%stage, path = endpoint.path(), "calling stage");

            let outcome = match self.backend.get_json(endpoint).await {
                Ok(body) => interpret(stage, body),
                Err(e) => Err(StageFailure::from(e)),
            };

            match outcome {
                Ok(None) => info!(%stage, "stage complete"),
                Ok(Some(payload)) => {
                    info!(
                        %stage,
                        detections = payload.detections.len(),
                        "results fetched"
                    );
                    self.results = Some(Arc::new(payload));
                }
                Err(reason) => {
                    return Err(self.fail(PipelineError::Stage { stage, reason }, &mut observe));
                }
            }
        }

        let Some(results) = self.results.clone() else {
            let reason = StageFailure::MalformedResults("no results were fetched".to_owned());
            let err = PipelineError::Stage {
                stage: Stage::FetchingResults,
                reason,
            };
            return Err(self.fail(err, &mut observe));
        };

        self.enter(Stage::Complete, &mut observe);
        Ok(results)
    }

    /// Move to `stage` and notify the observer.
    fn enter(&mut self, stage: Stage, observe: &mut impl FnMut(&StageEvent)) {
        debug_assert!(stage > self.stage, "stage transitions only move forward");
        self.stage = stage;
        stage.status_message().clone_into(&mut self.status);
        observe(&StageEvent {
            stage,
            progress: self.progress(),
            status: self.status.clone(),
        });
    }

    /// Record a terminal failure and notify the observer.
    fn fail(
        &mut self,
        err: PipelineError,
        observe: &mut impl FnMut(&StageEvent),
    ) -> PipelineError {
        error!(error = %err, "pipeline run failed");
        self.stage = Stage::Failed;
        self.status = err.to_string();
        self.error = Some(err.clone());
        observe(&StageEvent {
            stage: Stage::Failed,
            progress: self.progress(),
            status: self.status.clone(),
        });
        err
    }
}

/// Interpret a stage's response body.
///
/// The results stage yields its payload; every other stage yields
/// `None` on success.
fn interpret(stage: Stage, body: Value) -> Result<Option<ResultsPayload>, StageFailure> {
    if stage == Stage::FetchingResults {
        parse_results(body).map(Some)
    } else {
        check_ack(&body).map(|()| None)
    }
}

/// Accept a `{"status": "ok"}` acknowledgement.
fn check_ack(body: &Value) -> Result<(), StageFailure> {
    let status = body.get("status").and_then(Value::as_str);
    if status == Some(STAGE_SUCCESS_STATUS) {
        return Ok(());
    }
    let reason = body_error(body).map_or_else(
        || match status {
            Some(s) => format!("status {s:?}"),
            None => "response has no status".to_owned(),
        },
        str::to_owned,
    );
    Err(StageFailure::Rejected(reason))
}

/// Parse a results body. A body carrying an `error` field is a failure
/// even if the rest of it parses.
fn parse_results(body: Value) -> Result<ResultsPayload, StageFailure> {
    if let Some(message) = body_error(&body) {
        return Err(StageFailure::Rejected(message.to_owned()));
    }
    serde_json::from_value(body).map_err(|e| StageFailure::MalformedResults(e.to_string()))
}

fn body_error(body: &Value) -> Option<&str> {
    body.get("error").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn ack_accepts_ok_status() {
        assert_eq!(check_ack(&json!({"status": "ok", "pages": 3})), Ok(()));
    }

    #[test]
    fn ack_rejects_failed_status_with_error_message() {
        assert_eq!(
            check_ack(&json!({"status": "failed", "error": "No uploaded file found"})),
            Err(StageFailure::Rejected("No uploaded file found".into()))
        );
    }

    #[test]
    fn ack_rejects_missing_status() {
        assert_eq!(
            check_ack(&json!({})),
            Err(StageFailure::Rejected("response has no status".into()))
        );
        assert_eq!(
            check_ack(&json!({"status": "pending"})),
            Err(StageFailure::Rejected("status \"pending\"".into()))
        );
    }

    #[test]
    fn results_with_error_field_fail() {
        assert_eq!(
            parse_results(json!({"error": "no run directory"})),
            Err(StageFailure::Rejected("no run directory".into()))
        );
    }

    #[test]
    fn malformed_results_fail() {
        let result = parse_results(json!({"detections": "not a list"}));
        assert!(matches!(result, Err(StageFailure::MalformedResults(_))));
    }

    #[test]
    fn only_results_stage_yields_payload() {
        assert_eq!(interpret(Stage::Preprocessing, json!({"status": "ok"})), Ok(None));
        assert!(matches!(
            interpret(Stage::FetchingResults, json!({"detections": []})),
            Ok(Some(_))
        ));
    }
}
