//! Headline counters and the per-class detection table.

use std::rc::Rc;
use std::sync::Arc;

use dioxus::prelude::*;
use symscan_pipeline::{DetectionSummaryRow, ResultsPayload, class_color, summarize};
use tracing::warn;

use crate::download;

/// Props for the [`ResultsSummary`] component.
#[derive(Props, Clone)]
pub struct ResultsSummaryProps {
    /// Payload of the completed run.
    payload: Arc<ResultsPayload>,
}

impl PartialEq for ResultsSummaryProps {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

/// Three counter cards: pages, distinct items, and detections.
#[component]
pub fn ResultsSummary(props: ResultsSummaryProps) -> Element {
    let summary = &props.payload.summary;
    rsx! {
        div { class: "cards",
            {card("Total Pages", summary.total_pages)}
            {card("Items Found", summary.items_found)}
            {card("Total Detections", summary.total_detections)}
        }
    }
}

fn card(title: &str, value: u64) -> Element {
    rsx! {
        div { class: "card",
            p { class: "card-value", "{value}" }
            p { class: "card-title", "{title}" }
        }
    }
}

/// Props for the [`DetectionOverview`] component.
#[derive(Props, Clone)]
pub struct DetectionOverviewProps {
    /// Payload of the completed run.
    payload: Arc<ResultsPayload>,
    /// Name of the uploaded document, used for the export filename.
    document: String,
}

impl PartialEq for DetectionOverviewProps {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload) && self.document == other.document
    }
}

/// Average confidence as shown in the table, e.g. `"87.5%"`.
fn format_confidence(avg: f64) -> String {
    format!("{:.1}%", avg * 100.0)
}

/// Table of detections grouped by class, largest group first, with a
/// CSV export button.
#[component]
pub fn DetectionOverview(props: DetectionOverviewProps) -> Element {
    let rows = Rc::new(summarize(&props.payload.detections));
    let mut export_error = use_signal(|| Option::<String>::None);

    let export_click = {
        let rows = Rc::clone(&rows);
        let document = props.document;
        move |_| {
            match download::download_summary_csv(&rows, &document) {
                Ok(()) => export_error.set(None),
                Err(e) => {
                    warn!(error = %e, "CSV export failed");
                    export_error.set(Some(format!("Download failed: {e}")));
                }
            }
        }
    };

    rsx! {
        div { class: "panel",
            div { class: "panel-header",
                h3 { "Detection Overview" }
                button {
                    class: if rows.is_empty() { "btn btn-disabled" } else { "btn btn-primary" },
                    disabled: rows.is_empty(),
                    onclick: export_click,
                    "Export CSV"
                }
            }

            if let Some(ref err) = export_error() {
                p { class: "text-error", "{err}" }
            }

            if rows.is_empty() {
                p { class: "text-muted", "No symbols were detected." }
            } else {
                table { class: "detections",
                    thead {
                        tr {
                            th { "Class" }
                            th { "Count" }
                            th { "Avg. Confidence" }
                        }
                    }
                    tbody {
                        for row in rows.iter() {
                            {render_row(row)}
                        }
                    }
                }
            }
        }
    }
}

fn render_row(row: &DetectionSummaryRow) -> Element {
    let color = class_color(&row.class_name);
    rsx! {
        tr { key: "{row.class_name}",
            td {
                span { class: "swatch", style: "background-color: {color}" }
                "{row.class_name}"
            }
            td { "{row.count}" }
            td { "{format_confidence(row.avg_confidence)}" }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_a_percentage_with_one_decimal() {
        assert_eq!(format_confidence(0.875), "87.5%");
        assert_eq!(format_confidence(0.0), "0.0%");
        assert_eq!(format_confidence(1.0), "100.0%");
    }
}
