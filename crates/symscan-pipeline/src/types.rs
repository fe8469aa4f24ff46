//! Core types for the symscan orchestration pipeline.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::ports::TransportError;
use crate::stage::Stage;

/// Fields the backend has used for a detection's class label, in
/// priority order after `class_name`.
const LABEL_FALLBACK_FIELDS: &[&str] = &["label", "name", "cls"];

/// A single classified object instance reported by the backend.
///
/// Only the label and confidence are interpreted. Geometry and any
/// other fields are kept verbatim in [`extra`](Self::extra) so the
/// record round-trips unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Class label, e.g. `"Socket Outlet"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    /// Detection confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Uninterpreted fields (class id, bounding box, page, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DetectionRecord {
    /// Convenience constructor for a labelled detection.
    #[must_use]
    pub fn new(class_name: impl Into<String>, confidence: f64) -> Self {
        Self {
            class_name: Some(class_name.into()),
            confidence: Some(confidence),
            extra: Map::new(),
        }
    }

    /// The class label, falling back to the alternative field names
    /// some backend versions emit.
    ///
    /// Returns `None` when no non-blank label is present.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        let primary = self.class_name.as_deref();
        let fallbacks = LABEL_FALLBACK_FIELDS
            .iter()
            .map(|key| self.extra.get(*key).and_then(Value::as_str));

        std::iter::once(primary)
            .chain(fallbacks)
            .flatten()
            .find(|label| !label.trim().is_empty())
    }

    /// The confidence score, falling back to a `conf` field, or `0.0`
    /// when the record carries none.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.confidence
            .or_else(|| self.extra.get("conf").and_then(Value::as_f64))
            .filter(|c| c.is_finite())
            .unwrap_or(0.0)
    }
}

/// Headline counters reported alongside the detections.
///
/// Missing counters default to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsSummary {
    /// Number of rendered pages that went through inference.
    pub total_pages: u64,
    /// Number of distinct classes found.
    pub items_found: u64,
    /// Number of individual detections.
    pub total_detections: u64,

    /// Uninterpreted fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One annotated page image served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-based page number.
    pub page: u64,
    /// Backend-relative URL of the annotated image.
    pub url: String,
}

/// The payload returned by the results stage.
///
/// Owned by the controller behind an `Arc` once a run completes and
/// shared read-only with the aggregator and viewer.
///
/// A deserialized payload keeps the body it was read from and
/// serializes back to exactly that body, explicit `null`s and unknown
/// keys included. Payloads built in code serialize their typed fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsPayload {
    /// Headline counters.
    pub summary: ResultsSummary,

    /// Every detection across all pages, in backend order.
    pub detections: Vec<DetectionRecord>,

    /// Per-page annotated images, if the backend produced any.
    pub pages: Option<Vec<PageImage>>,

    /// Single preview image used when no per-page images exist.
    pub preview: Option<String>,

    pub(crate) raw: Value,
}

impl ResultsPayload {
    /// The body this payload was read from, or `Null` if it was built
    /// in code.
    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.raw
    }
}

#[derive(Deserialize)]
struct PayloadFields {
    #[serde(default)]
    summary: ResultsSummary,
    #[serde(default)]
    detections: Vec<DetectionRecord>,
    #[serde(default)]
    pages: Option<Vec<PageImage>>,
    #[serde(default)]
    preview: Option<String>,
}

#[derive(Serialize)]
struct PayloadFieldsRef<'a> {
    summary: &'a ResultsSummary,
    detections: &'a [DetectionRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<&'a Vec<PageImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview: Option<&'a String>,
}

impl<'de> Deserialize<'de> for ResultsPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let fields = PayloadFields::deserialize(&raw).map_err(serde::de::Error::custom)?;
        Ok(Self {
            summary: fields.summary,
            detections: fields.detections,
            pages: fields.pages,
            preview: fields.preview,
            raw,
        })
    }
}

impl Serialize for ResultsPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !self.raw.is_null() {
            return self.raw.serialize(serializer);
        }
        PayloadFieldsRef {
            summary: &self.summary,
            detections: &self.detections,
            pages: self.pages.as_ref(),
            preview: self.preview.as_ref(),
        }
        .serialize(serializer)
    }
}

/// Terminal state of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    /// The backend stored the file.
    Complete,
    /// The transfer or the backend rejected the file.
    Failed,
}

/// The single terminal outcome of an upload, handed to
/// [`PipelineController::start`](crate::PipelineController::start).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Whether the upload reached the success state.
    pub status: UploadStatus,
    /// Human-readable reason when `status` is [`UploadStatus::Failed`].
    pub error: Option<String>,
    /// The backend's response body, uninterpreted.
    pub payload: Value,
}

impl UploadResult {
    /// The `status` value the backend reports for a stored file.
    pub const SUCCESS_STATUS: &'static str = "Complete";

    /// Interpret the JSON body of an upload response.
    ///
    /// Anything other than `{"status": "Complete", ...}` is a failure.
    /// The failure reason is taken from the body's `error` field, then
    /// its `message` field.
    #[must_use]
    pub fn from_response(payload: Value) -> Self {
        let status = payload.get("status").and_then(Value::as_str);
        if status == Some(Self::SUCCESS_STATUS) {
            return Self {
                status: UploadStatus::Complete,
                error: None,
                payload,
            };
        }

        let error = ["error", "message"]
            .iter()
            .find_map(|key| payload.get(*key).and_then(Value::as_str))
            .map_or_else(
                || match status {
                    Some(s) => format!("backend reported status {s:?}"),
                    None => "response has no status".to_owned(),
                },
                str::to_owned,
            );

        Self {
            status: UploadStatus::Failed,
            error: Some(error),
            payload,
        }
    }

    /// A failed upload that never produced a backend response.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: UploadStatus::Failed,
            error: Some(error.into()),
            payload: Value::Null,
        }
    }

    /// Whether the upload reached the success state.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.status, UploadStatus::Complete)
    }
}

/// Why a single remote stage call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageFailure {
    /// The call itself was rejected (network error, HTTP error status).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The backend answered, but reported a failure.
    #[error("backend reported failure: {0}")]
    Rejected(String),

    /// The results body could not be interpreted.
    #[error("malformed results payload: {0}")]
    MalformedResults(String),
}

/// Terminal errors of a pipeline run.
///
/// Both variants halt the run; neither is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The upload did not reach the success state, so no stage ran.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// A stage call failed. Stages before it are not rolled back.
    #[error("Pipeline failed at {stage}: {reason}")]
    Stage {
        /// The stage whose call failed.
        stage: Stage,
        /// Why it failed.
        reason: StageFailure,
    },
}

impl PipelineError {
    /// The stage the run halted at, or [`Stage::Idle`] for an upload
    /// failure.
    #[must_use]
    pub const fn failed_stage(&self) -> Stage {
        match self {
            Self::Upload(_) => Stage::Idle,
            Self::Stage { stage, .. } => *stage,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn label_prefers_class_name() {
        let record: DetectionRecord =
            serde_json::from_value(json!({"class_name": "Door", "label": "Other"})).unwrap();
        assert_eq!(record.label(), Some("Door"));
    }

    #[test]
    fn label_falls_back_to_alternative_fields() {
        let record: DetectionRecord = serde_json::from_value(json!({"cls": "Downlight"})).unwrap();
        assert_eq!(record.label(), Some("Downlight"));

        let record: DetectionRecord =
            serde_json::from_value(json!({"class_name": "  ", "name": "Exit Sign"})).unwrap();
        assert_eq!(record.label(), Some("Exit Sign"));
    }

    #[test]
    fn missing_label_is_none() {
        let record: DetectionRecord = serde_json::from_value(json!({"confidence": 0.4})).unwrap();
        assert_eq!(record.label(), None);
    }

    #[test]
    fn score_falls_back_to_conf_then_zero() {
        let record: DetectionRecord = serde_json::from_value(json!({"conf": 0.25})).unwrap();
        assert!((record.score() - 0.25).abs() < f64::EPSILON);

        let record = DetectionRecord::default();
        assert!(record.score().abs() < f64::EPSILON);
    }

    #[test]
    fn detection_preserves_geometry_fields() {
        let value = json!({
            "class_id": 5,
            "class_name": "Socket Outlet",
            "confidence": 0.87,
            "bbox": [10.0, 20.0, 30.0, 40.0],
        });
        let record: DetectionRecord = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), value);
    }

    #[test]
    fn results_payload_defaults_missing_sections() {
        let payload: ResultsPayload = serde_json::from_value(json!({})).unwrap();
        assert_eq!(payload.summary.total_pages, 0);
        assert!(payload.detections.is_empty());
        assert!(payload.pages.is_none());
        assert!(payload.preview.is_none());
    }

    #[test]
    fn results_payload_keeps_explicit_nulls() {
        let body = json!({
            "summary": {"total_pages": 0, "items_found": 0, "total_detections": 0},
            "detections": [{"class_name": null, "confidence": 0.3}],
            "pages": [],
            "preview": null,
        });
        let payload: ResultsPayload = serde_json::from_value(body.clone()).unwrap();
        assert!(payload.preview.is_none());
        assert_eq!(payload.detections[0].class_name, None);
        assert_eq!(payload.raw(), &body);
        assert_eq!(serde_json::to_value(&payload).unwrap(), body);
    }

    #[test]
    fn built_payload_serializes_typed_fields() {
        let payload = ResultsPayload {
            detections: vec![DetectionRecord::new("Door", 0.9)],
            ..ResultsPayload::default()
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "summary": {"total_pages": 0, "items_found": 0, "total_detections": 0},
                "detections": [{"class_name": "Door", "confidence": 0.9}],
            })
        );
    }

    #[test]
    fn upload_result_complete() {
        let result = UploadResult::from_response(
            json!({"filename": "file.pdf", "path": "/srv/uploads/file.pdf", "status": "Complete"}),
        );
        assert!(result.is_complete());
        assert_eq!(result.error, None);
        assert_eq!(result.payload["filename"], "file.pdf");
    }

    #[test]
    fn upload_result_failed_carries_error() {
        let result = UploadResult::from_response(json!({"status": "failed", "error": "disk full"}));
        assert!(!result.is_complete());
        assert_eq!(result.error.as_deref(), Some("disk full"));
    }

    #[test]
    fn upload_result_without_status_fails() {
        let result = UploadResult::from_response(json!({"message": "Upload failed"}));
        assert_eq!(result.status, UploadStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("Upload failed"));

        let result = UploadResult::from_response(json!({}));
        assert_eq!(result.error.as_deref(), Some("response has no status"));
    }

    #[test]
    fn pipeline_error_messages() {
        let err = PipelineError::Upload("disk full".into());
        assert_eq!(err.to_string(), "Upload failed: disk full");
        assert_eq!(err.failed_stage(), Stage::Idle);

        let err = PipelineError::Stage {
            stage: Stage::Inferencing,
            reason: StageFailure::Rejected("Model not loaded".into()),
        };
        assert_eq!(
            err.to_string(),
            "Pipeline failed at Inference: backend reported failure: Model not loaded"
        );
        assert_eq!(err.failed_stage(), Stage::Inferencing);
    }
}
