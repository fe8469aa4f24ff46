//! A whole session: upload, run, aggregate, and view.

#![allow(clippy::unwrap_used)]

mod common;

use common::{ScriptedBackend, ScriptedUpload, results_body};
use futures::FutureExt;
use futures::executor::block_on;
use serde_json::json;
use symscan_pipeline::{
    BackendConfig, ControllerSlot, PipelineController, Stage, UploadFile, UploadGate,
    UploadResult, ViewerAction, ViewerState, page_count, resolve_image_url, summarize, to_csv,
};

#[test]
fn upload_to_viewer() {
    let config = BackendConfig::new("http://localhost:8000/").unwrap();
    let gate = UploadGate::new(ScriptedUpload::accepting());
    let backend = ScriptedBackend::healthy(results_body());
    let mut controller = PipelineController::new(&backend);

    block_on(controller.reset_backend());
    let upload = block_on(gate.upload(&UploadFile::new("plan.pdf", vec![1; 8]), |_| {})).unwrap();
    let payload = block_on(controller.start(&upload)).unwrap();
    assert_eq!(controller.stage(), Stage::Complete);

    let rows = summarize(&payload.detections);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].class_name, "Door");
    assert_eq!(rows[0].count, 2);
    assert!((rows[0].avg_confidence - 0.8).abs() < 1e-9);
    assert_eq!(rows[1].class_name, "Socket Outlet");
    assert_eq!(
        to_csv(&rows),
        "class,count,avg_confidence\nDoor,2,80.0\nSocket Outlet,1,50.0\n"
    );

    let viewer = ViewerState::default().apply(ViewerAction::Load(page_count(&payload)));
    assert_eq!(viewer.total_pages, 2);

    let first = resolve_image_url(&config, &payload, viewer.current_page);
    assert_eq!(
        first.url.as_deref(),
        Some("http://localhost:8000/outputs/run/run_1/page_1.jpg")
    );

    let viewer = viewer.apply(ViewerAction::NextPage).apply(ViewerAction::NextPage);
    assert_eq!(viewer.current_page, 2);
    let second = resolve_image_url(&config, &payload, viewer.current_page);
    assert_eq!(
        second.url.as_deref(),
        Some("http://localhost:8000/outputs/run/run_1/page_2.jpg")
    );
}

#[test]
fn second_upload_refused_between_upload_and_run() {
    let gate = UploadGate::new(ScriptedUpload::accepting());
    let backend = ScriptedBackend::healthy(results_body());
    let slot = ControllerSlot::new(PipelineController::new(&backend));

    let mut lease = slot.checkout().unwrap();
    block_on(async {
        let upload = gate
            .upload(&UploadFile::new("plan.pdf", vec![1; 8]), |_| {})
            .await
            .unwrap();

        // The gate alone no longer marks the session busy.
        assert!(!gate.is_busy());
        assert!(slot.checkout().is_none());

        let controller = lease.controller().unwrap();
        controller.start(&upload).await.unwrap();
        assert_eq!(controller.stage(), Stage::Complete);
        assert!(slot.checkout().is_none());
    });

    drop(lease);
    assert!(slot.checkout().is_some());
}

#[test]
fn cancelled_run_returns_the_controller() {
    let backend = ScriptedBackend::healthy(results_body());
    let slot = ControllerSlot::new(PipelineController::new(&backend));
    let upload = UploadResult::from_response(json!({"status": "Complete"}));

    let mut lease = slot.checkout().unwrap();
    let run = async move { lease.controller().unwrap().start(&upload).await.is_ok() };
    assert_eq!(run.now_or_never(), None);

    assert!(!slot.is_checked_out());
    assert_eq!(backend.calls().len(), 1);
}
