//! Per-class aggregation of detection records.
//!
//! [`summarize`] groups detections by label and computes count and mean
//! confidence per group. [`to_csv`] renders the result for export.

use std::collections::HashMap;
use std::fmt::Write;

use serde::Serialize;

use crate::types::DetectionRecord;

/// Label used for detections without a usable class name.
pub const UNKNOWN_CLASS: &str = "Unknown";

/// Legend color for labels not in the known class table.
pub const UNKNOWN_COLOR: &str = "#9CA3AF";

/// Legend colors for the symbol classes the detector is trained on.
const CLASS_COLORS: &[(&str, &str)] = &[
    ("Cove Light", "#F59E0B"),
    ("Door", "#10B981"),
    ("Downlight", "#2F80ED"),
    ("Emergency Light Fitting", "#EF4444"),
    ("Fluorescent Light", "#A78BFA"),
    ("Socket Outlet", "#F97316"),
    ("Exit Sign", "#059669"),
];

/// Aggregated statistics for all detections sharing one label.
///
/// `count == confidences.len()` and `avg_confidence` is the mean of
/// `confidences` (zero when empty).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSummaryRow {
    /// The group's label.
    pub class_name: String,
    /// Number of detections in the group.
    pub count: usize,
    /// Confidences in input order.
    pub confidences: Vec<f64>,
    /// Arithmetic mean of `confidences`.
    pub avg_confidence: f64,
}

/// Group `detections` by label and sort the groups by size.
///
/// Missing or blank labels are grouped under [`UNKNOWN_CLASS`]. Rows
/// are ordered by `count` descending; equal counts keep first-seen
/// order. Runs in O(n) plus an O(k log k) sort over the k groups.
#[must_use]
pub fn summarize(detections: &[DetectionRecord]) -> Vec<DetectionSummaryRow> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<DetectionSummaryRow> = Vec::new();

    for detection in detections {
        let label = detection.label().unwrap_or(UNKNOWN_CLASS);
        let slot = *index.entry(label).or_insert_with(|| {
            rows.push(DetectionSummaryRow {
                class_name: label.to_owned(),
                count: 0,
                confidences: Vec::new(),
                avg_confidence: 0.0,
            });
            rows.len() - 1
        });
        let row = &mut rows[slot];
        row.count += 1;
        row.confidences.push(detection.score());
    }

    for row in &mut rows {
        row.avg_confidence = mean(&row.confidences);
    }

    // Stable: ties keep first-seen order.
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

/// Arithmetic mean, or `0.0` for an empty slice.
#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Render summary rows as CSV with a header line.
///
/// Average confidence is written as a percentage with one decimal,
/// matching the on-screen table.
#[must_use]
pub fn to_csv(rows: &[DetectionSummaryRow]) -> String {
    let mut out = String::from("class,count,avg_confidence\n");
    for row in rows {
        let _ = writeln!(
            out,
            "{},{},{:.1}",
            csv_field(&row.class_name),
            row.count,
            row.avg_confidence * 100.0
        );
    }
    out
}

/// Quote a CSV field if it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

/// Legend color for a class label.
#[must_use]
pub fn class_color(label: &str) -> &'static str {
    CLASS_COLORS
        .iter()
        .find(|(name, _)| *name == label)
        .map_or(UNKNOWN_COLOR, |(_, color)| color)
}
