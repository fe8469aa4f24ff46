//! Rendering of a completed run for the terminal.

use std::fmt::Write;

use symscan_pipeline::{
    BackendConfig, DetectionSummaryRow, ResultsPayload, ViewerAction, ViewerState, page_count,
    resolve_image_url, summarize, to_csv,
};

use crate::config::OutputFormat;

const HEADERS: [&str; 3] = ["Class", "Count", "Avg. Confidence"];

/// Render `payload` in the requested format.
///
/// # Errors
///
/// Returns an error if the payload cannot be serialized as JSON.
pub fn render(payload: &ResultsPayload, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(payload)),
        OutputFormat::Csv => Ok(to_csv(&summarize(&payload.detections))),
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(payload)?;
            out.push('\n');
            Ok(out)
        }
    }
}

/// Headline counters followed by the per-class table.
#[must_use]
pub fn render_table(payload: &ResultsPayload) -> String {
    let summary = &payload.summary;
    let mut out = format!(
        "Pages: {}  Items found: {}  Detections: {}\n",
        summary.total_pages, summary.items_found, summary.total_detections
    );

    let rows = summarize(&payload.detections);
    if rows.is_empty() {
        out.push_str("No symbols were detected.\n");
        return out;
    }

    let cells: Vec<[String; 3]> = rows.iter().map(cells).collect();
    let mut widths = HEADERS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    out.push('\n');
    push_line(&mut out, &HEADERS.map(str::to_owned), widths);
    push_line(&mut out, &widths.map(|w| "-".repeat(w)), widths);
    for row in &cells {
        push_line(&mut out, row, widths);
    }
    out
}

fn cells(row: &DetectionSummaryRow) -> [String; 3] {
    [
        row.class_name.clone(),
        row.count.to_string(),
        format!("{:.1}%", row.avg_confidence * 100.0),
    ]
}

/// Class left-aligned, numbers right-aligned.
fn push_line(out: &mut String, row: &[String; 3], widths: [usize; 3]) {
    let _ = writeln!(
        out,
        "{:<w0$}  {:>w1$}  {:>w2$}",
        row[0],
        row[1],
        row[2],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
    );
}

/// The annotated image for a 1-based `page`, clamped to the pages the
/// payload has, together with the page actually selected.
#[must_use]
pub fn page_image(
    config: &BackendConfig,
    payload: &ResultsPayload,
    page: i64,
) -> (usize, Option<String>) {
    let state = ViewerState::default()
        .apply(ViewerAction::Load(page_count(payload)))
        .apply(ViewerAction::SetPage(page));
    let resolved = resolve_image_url(config, payload, state.current_page);
    (state.current_page, resolved.url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload() -> ResultsPayload {
        serde_json::from_value(json!({
            "summary": {"total_pages": 2, "items_found": 2, "total_detections": 3},
            "detections": [
                {"class_name": "Socket Outlet", "confidence": 0.5},
                {"class_name": "Door", "confidence": 0.9},
                {"class_name": "Door", "confidence": 0.7},
            ],
            "pages": [
                {"page": 1, "url": "/outputs/page_1.jpg"},
                {"page": 2, "url": "/outputs/page_2.jpg"},
            ],
        }))
        .unwrap()
    }

    #[test]
    fn table_lists_largest_class_first() {
        let table = render_table(&payload());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Pages: 2  Items found: 2  Detections: 3");
        assert_eq!(lines[2], "Class          Count  Avg. Confidence");
        assert!(lines[4].starts_with("Door "));
        assert!(lines[4].ends_with("80.0%"));
        assert!(lines[5].starts_with("Socket Outlet"));
        assert!(lines[5].ends_with("50.0%"));
    }

    #[test]
    fn table_without_detections() {
        let table = render_table(&ResultsPayload::default());
        assert!(table.contains("No symbols were detected."));
    }

    #[test]
    fn csv_matches_summary_rows() {
        let csv = render(&payload(), OutputFormat::Csv).unwrap();
        assert_eq!(
            csv,
            "class,count,avg_confidence\nDoor,2,80.0\nSocket Outlet,1,50.0\n"
        );
    }

    #[test]
    fn json_keeps_the_payload() {
        let out = render(&payload(), OutputFormat::Json).unwrap();
        let back: ResultsPayload = serde_json::from_str(&out).unwrap();
        assert_eq!(back, payload());
    }

    #[test]
    fn page_image_clamps_to_available_pages() {
        let config = BackendConfig::new("http://localhost:8000/").unwrap();
        assert_eq!(
            page_image(&config, &payload(), 2),
            (2, Some("http://localhost:8000/outputs/page_2.jpg".to_owned()))
        );
        assert_eq!(
            page_image(&config, &payload(), 99),
            (2, Some("http://localhost:8000/outputs/page_2.jpg".to_owned()))
        );
        assert_eq!(page_image(&config, &payload(), 0).0, 1);
    }
}
