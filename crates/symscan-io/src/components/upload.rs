//! Document picker with drag-and-drop and an upload progress bar.

use dioxus::html::{FileData, HasFileData};
use dioxus::prelude::*;
use symscan_pipeline::upload::{ACCEPTED_EXTENSIONS, has_accepted_extension};

/// Props for the [`FileUpload`] component.
#[derive(Props, Clone, PartialEq)]
pub struct FileUploadProps {
    /// Called with the raw file bytes and filename once a file is read.
    on_upload: EventHandler<(Vec<u8>, String)>,
    /// Upload fraction in `[0, 1]` while a transfer is in flight.
    progress: Option<f64>,
    /// Ignore new files (a run is in flight).
    disabled: bool,
}

/// `accept` attribute for the file input, e.g. `.pdf,.dwf,.png`.
fn accept_attribute() -> String {
    ACCEPTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Whole-number percentage for the progress bar.
#[allow(clippy::cast_possible_truncation)]
fn percent(fraction: f64) -> u8 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// A drop zone and file picker for PDF, DWF, and image documents.
///
/// Unsupported files are reported inline and never forwarded. While
/// `progress` is set, a bar shows how much of the file has been sent.
#[component]
pub fn FileUpload(props: FileUploadProps) -> Element {
    let mut dragging = use_signal(|| false);
    let mut filename = use_signal(|| Option::<String>::None);
    let mut error = use_signal(|| Option::<String>::None);
    let disabled = props.disabled;

    // Shared by the picker and drop paths.
    let process_files = move |files: Vec<FileData>| async move {
        if disabled {
            return;
        }
        let Some(file) = files.first() else {
            return;
        };
        let name = file.name();
        if !has_accepted_extension(&name) {
            error.set(Some(format!("Unsupported file type: {name}")));
            return;
        }
        match file.read_bytes().await {
            Ok(bytes) => {
                filename.set(Some(name.clone()));
                error.set(None);
                props.on_upload.call((bytes.to_vec(), name));
            }
            Err(e) => {
                error.set(Some(format!("Failed to read file: {e}")));
            }
        }
    };

    let handle_files = move |evt: FormEvent| async move {
        process_files(evt.files()).await;
    };

    let handle_drop = move |evt: DragEvent| async move {
        evt.prevent_default();
        dragging.set(false);
        process_files(evt.files()).await;
    };

    let zone_class = match (disabled, dragging()) {
        (true, _) => "upload-zone disabled",
        (false, true) => "upload-zone dragging",
        (false, false) => "upload-zone",
    };
    let accept = accept_attribute();

    rsx! {
        div {
            class: "{zone_class}",
            ondragover: move |evt| {
                evt.prevent_default();
                if !disabled {
                    dragging.set(true);
                }
            },
            ondragleave: move |_| {
                dragging.set(false);
            },
            ondrop: handle_drop,

            if let Some(ref name) = filename() {
                p { class: "text-success", "Selected: {name}" }
            }

            if let Some(ref err) = error() {
                p { class: "text-error", "{err}" }
            }

            if let Some(fraction) = props.progress {
                div { class: "progress-bar",
                    role: "progressbar",
                    "aria-valuemin": "0",
                    "aria-valuemax": "100",
                    "aria-valuenow": "{percent(fraction)}",
                    div {
                        class: "progress-fill",
                        style: "width: {percent(fraction)}%",
                    }
                }
                p { class: "text-muted", "Uploading... {percent(fraction)}%" }
            }

            p { class: "text-secondary", "Drop a floor plan here or " }

            label { class: if disabled { "btn btn-disabled" } else { "btn btn-primary" },
                input {
                    r#type: "file",
                    accept: "{accept}",
                    class: "hidden",
                    disabled,
                    onchange: handle_files,
                }
                "Choose File"
            }

            p { class: "text-muted text-small", "PDF, DWF, PNG, JPEG" }
        }
    }
}
