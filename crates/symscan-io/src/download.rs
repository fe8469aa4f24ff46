//! Client-side file saving via Blob URLs.
//!
//! The browser offers no direct "save file" call, so a download is
//! started by pointing a temporary `<a download>` element at an object
//! URL and clicking it.

use symscan_pipeline::{DetectionSummaryRow, to_csv};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use web_sys::BlobPropertyBag;

/// MIME type of the summary export.
pub const CSV_MIME: &str = "text/csv;charset=utf-8";

/// Errors that can occur when triggering a file download.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for DownloadError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// Filename for the CSV export of an uploaded document.
///
/// `"plan.pdf"` becomes `"plan_detections.csv"`.
#[must_use]
pub fn csv_filename(document: &str) -> String {
    let stem = document
        .rsplit_once('.')
        .map_or(document, |(stem, _)| stem);
    let stem = if stem.is_empty() { "symscan" } else { stem };
    format!("{stem}_detections.csv")
}

/// Save the per-class summary as a CSV file.
///
/// # Errors
///
/// See [`trigger_download`].
pub fn download_summary_csv(
    rows: &[DetectionSummaryRow],
    document: &str,
) -> Result<(), DownloadError> {
    trigger_download(&to_csv(rows), &csv_filename(document), CSV_MIME)
}

/// Offer `data` to the user as a file named `filename`.
///
/// # Errors
///
/// Returns [`DownloadError::JsError`] if the window or document is
/// missing or any Blob, URL, or DOM call fails.
pub fn trigger_download(data: &str, filename: &str, mime_type: &str) -> Result<(), DownloadError> {
    let window =
        web_sys::window().ok_or_else(|| DownloadError::JsError("no global window".into()))?;
    let document = window
        .document()
        .ok_or_else(|| DownloadError::JsError("no document".into()))?;
    let body = document
        .body()
        .ok_or_else(|| DownloadError::JsError("no document body".into()))?;

    let parts = js_sys::Array::of1(&JsValue::from_str(data));
    let opts = BlobPropertyBag::new();
    opts.set_type(mime_type);
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &opts)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let anchor = document
        .create_element("a")?
        .dyn_into::<web_sys::HtmlAnchorElement>()
        .map_err(|e| DownloadError::JsError(format!("failed to cast element: {e:?}")))?;
    anchor.set_href(&url);
    anchor.set_download(filename);

    body.append_child(&anchor)?;
    anchor.click();

    // The download has started; cleanup failures are not reported.
    let _ = body.remove_child(&anchor);
    let _ = web_sys::Url::revoke_object_url(&url);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_filename_replaces_extension() {
        assert_eq!(csv_filename("plan.pdf"), "plan_detections.csv");
        assert_eq!(csv_filename("a.b.png"), "a.b_detections.csv");
    }

    #[test]
    fn csv_filename_without_extension() {
        assert_eq!(csv_filename("scan"), "scan_detections.csv");
        assert_eq!(csv_filename(".pdf"), "symscan_detections.csv");
    }
}
