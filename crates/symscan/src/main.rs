use std::rc::Rc;
use std::sync::Arc;

use dioxus::prelude::*;
use symscan_io::{
    DetectionOverview, FileUpload, HttpBackend, PageViewer, ProgressTracker, ResultsSummary,
};
use symscan_pipeline::{
    ControllerSlot, PipelineController, ResultsPayload, Stage, UploadFile, UploadGate,
    ViewerAction, ViewerState, page_count,
};
use tracing::{info, warn};

fn main() {
    dioxus::launch(app);
}

/// Root application component.
///
/// Owns the session's controller, upload gate, and viewer state, and
/// mirrors controller transitions into signals for rendering.
#[allow(clippy::too_many_lines)]
fn app() -> Element {
    let config = use_hook(symscan_io::backend_config);
    let slot = use_hook(|| ControllerSlot::new(PipelineController::new(HttpBackend::new(
        config.clone(),
    ))));
    let gate = use_hook(|| Rc::new(UploadGate::new(HttpBackend::new(config.clone()))));

    // --- Application state ---
    let mut document = use_signal(String::new);
    let mut stage = use_signal(|| Stage::Idle);
    let mut progress = use_signal(|| 0u8);
    let mut status = use_signal(String::new);
    let mut upload_progress = use_signal(|| Option::<f64>::None);
    let mut notice = use_signal(|| Option::<String>::None);
    let mut results = use_signal(|| Option::<Arc<ResultsPayload>>::None);
    let mut viewer = use_signal(ViewerState::default);
    let mut running = use_signal(|| false);
    let mut generation = use_signal(|| 0u64);

    // --- Session start: clear backend artifacts once ---
    {
        let slot = slot.clone();
        use_future(move || {
            let slot = slot.clone();
            async move {
                let Some(mut lease) = slot.checkout() else {
                    return;
                };
                if let Some(ctl) = lease.controller() {
                    ctl.reset_backend().await;
                }
            }
        });
    }

    let busy = running() || upload_progress().is_some() || stage().is_running();

    // --- File upload handler ---
    let on_upload = {
        let slot = slot.clone();
        let gate = Rc::clone(&gate);
        move |(bytes, name): (Vec<u8>, String)| {
            // Held from the first upload byte until the last stage.
            let Some(mut lease) = slot.checkout() else {
                notice.set(Some("A run is already in progress.".to_owned()));
                return;
            };
            if gate.is_busy() {
                notice.set(Some("A run is already in progress.".to_owned()));
                return;
            }

            // Any task from an earlier upload is now stale.
            generation += 1;
            let my_generation = *generation.peek();

            document.set(name.clone());
            notice.set(None);
            results.set(None);
            viewer.set(ViewerState::default());
            stage.set(Stage::Idle);
            progress.set(0);
            status.set(String::new());
            upload_progress.set(Some(0.0));
            running.set(true);

            let gate = Rc::clone(&gate);
            spawn(async move {
                let file = UploadFile::new(name, bytes);
                let upload = gate
                    .upload(&file, move |fraction| {
                        let mut upload_progress = upload_progress;
                        upload_progress.set(Some(fraction));
                    })
                    .await;
                upload_progress.set(None);

                let upload = match upload {
                    Ok(upload) => upload,
                    Err(rejection) => {
                        warn!(error = %rejection, "upload rejected");
                        notice.set(Some(rejection.to_string()));
                        running.set(false);
                        return;
                    }
                };

                // Let the finished upload bar paint before the run starts.
                gloo_timers::future::TimeoutFuture::new(0).await;

                let Some(ctl) = lease.controller() else {
                    running.set(false);
                    return;
                };
                let outcome = ctl
                    .start_with(&upload, |event| {
                        if *generation.peek() == my_generation {
                            stage.set(event.stage);
                            progress.set(event.progress);
                            status.set(event.status.clone());
                        }
                    })
                    .await;
                drop(lease);
                running.set(false);

                if *generation.peek() != my_generation {
                    return;
                }
                if let Ok(payload) = outcome {
                    info!(detections = payload.detections.len(), "results ready");
                    viewer.set(ViewerState::default().apply(ViewerAction::Load(page_count(
                        &payload,
                    ))));
                    results.set(Some(payload));
                }
            });
        }
    };

    // --- Viewer actions ---
    let on_viewer_action = move |action: ViewerAction| {
        let next = viewer.peek().apply(action);
        if next != *viewer.peek() {
            viewer.set(next);
        }
    };

    let status_text = status();
    let status_class = if stage() == Stage::Failed {
        "status-bar error"
    } else if stage() == Stage::Complete {
        "status-bar success"
    } else {
        "status-bar"
    };

    // --- Layout ---
    rsx! {
        style { dangerous_inner_html: include_str!("../assets/main.css") }

        div { class: "app",
            header { class: "app-header",
                h1 { "symscan" }
                p { class: "text-muted",
                    "Electrical symbol detection for floor plans"
                }
            }

            main { class: "app-main",
                // Left column: upload and progress
                section { class: "sidebar",
                    div { class: "panel",
                        h3 { "Upload Document" }
                        FileUpload {
                            on_upload: on_upload,
                            progress: upload_progress(),
                            disabled: busy,
                        }
                        if let Some(ref message) = notice() {
                            p { class: "text-error", "{message}" }
                        }
                    }

                    div { class: "panel",
                        h3 { "Pipeline" }
                        ProgressTracker {
                            stage: stage(),
                            progress: progress(),
                            uploading: upload_progress().is_some(),
                        }
                    }
                }

                // Right column: results
                section { class: "content",
                    if !status_text.is_empty() {
                        div { class: "{status_class}",
                            p { "{status_text}" }
                        }
                    }

                    if let Some(payload) = results() {
                        ResultsSummary { payload: Arc::clone(&payload) }
                        DetectionOverview {
                            payload: Arc::clone(&payload),
                            document: document(),
                        }
                        PageViewer {
                            config: config.clone(),
                            payload: Arc::clone(&payload),
                            state: viewer(),
                            on_action: on_viewer_action,
                        }
                    } else if busy {
                        div { class: "empty",
                            p { class: "text-secondary pulse", "Processing..." }
                        }
                    } else {
                        div { class: "empty",
                            p { class: "text-placeholder",
                                "Upload a floor plan to get started"
                            }
                        }
                    }
                }
            }
        }
    }
}
