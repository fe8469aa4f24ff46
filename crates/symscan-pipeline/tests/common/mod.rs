//! Scripted in-memory ports for driving the pipeline in tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::{Value, json};
use symscan_pipeline::{
    Endpoint, ProgressReporter, StageBackend, TransportError, UploadFile, UploadTransport,
};

/// Future that returns `Pending` once before completing, so callers
/// observe a real suspension point.
#[derive(Default)]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// A backend answering each endpoint from a script and recording calls.
#[derive(Default)]
pub struct ScriptedBackend {
    responses: RefCell<HashMap<Endpoint, Result<Value, TransportError>>>,
    calls: RefCell<Vec<Endpoint>>,
    in_flight: Cell<usize>,
    max_in_flight: Cell<usize>,
}

impl ScriptedBackend {
    /// A backend where every stage succeeds and results are `results`.
    pub fn healthy(results: Value) -> Self {
        let backend = Self::default();
        backend.respond(Endpoint::Reset, Ok(json!({"status": "ok"})));
        backend.respond(Endpoint::Preprocess, Ok(json!({"status": "ok", "pages": 2})));
        backend.respond(Endpoint::LoadModel, Ok(json!({"status": "ok"})));
        backend.respond(Endpoint::Inference, Ok(json!({"status": "ok", "run_dir": "run_1"})));
        backend.respond(Endpoint::Results, Ok(results));
        backend
    }

    /// Replace the scripted response for `endpoint`.
    pub fn respond(&self, endpoint: Endpoint, response: Result<Value, TransportError>) {
        self.responses.borrow_mut().insert(endpoint, response);
    }

    /// Every endpoint called so far, in order.
    pub fn calls(&self) -> Vec<Endpoint> {
        self.calls.borrow().clone()
    }

    /// Highest number of calls that were ever pending at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.get()
    }
}

impl StageBackend for ScriptedBackend {
    async fn get_json(&self, endpoint: Endpoint) -> Result<Value, TransportError> {
        self.calls.borrow_mut().push(endpoint);
        self.in_flight.set(self.in_flight.get() + 1);
        self.max_in_flight
            .set(self.max_in_flight.get().max(self.in_flight.get()));

        YieldNow::default().await;

        self.in_flight.set(self.in_flight.get() - 1);
        self.responses
            .borrow()
            .get(&endpoint)
            .cloned()
            .unwrap_or(Err(TransportError::Status(404)))
    }
}

/// An upload transport that reports progress in fixed chunks and then
/// returns a scripted response.
pub struct ScriptedUpload {
    response: Result<Value, TransportError>,
    chunk: u64,
    posts: Cell<usize>,
}

impl ScriptedUpload {
    pub fn new(response: Result<Value, TransportError>, chunk: u64) -> Self {
        Self {
            response,
            chunk,
            posts: Cell::new(0),
        }
    }

    pub fn accepting() -> Self {
        Self::new(
            Ok(json!({"filename": "file.pdf", "path": "uploads/file.pdf", "status": "Complete"})),
            4,
        )
    }

    pub fn posts(&self) -> usize {
        self.posts.get()
    }
}

impl UploadTransport for ScriptedUpload {
    async fn post_file(
        &self,
        file: &UploadFile,
        progress: ProgressReporter,
    ) -> Result<Value, TransportError> {
        self.posts.set(self.posts.get() + 1);
        let total = file.len();
        let mut sent = 0;
        while sent < total {
            sent = (sent + self.chunk).min(total);
            progress.report(sent, total);
            YieldNow::default().await;
        }
        self.response.clone()
    }
}

/// Results body shaped like the backend's `/results` response.
pub fn results_body() -> Value {
    json!({
        "summary": {
            "total_pages": 2,
            "items_found": 2,
            "total_detections": 3,
            "pages": [
                {"page": 1, "url": "/outputs/run/run_1/page_1.jpg"},
                {"page": 2, "url": "/outputs/run/run_1/page_2.jpg"},
            ],
        },
        "detections": [
            {"class_id": 1, "confidence": 0.9, "class_name": "Door"},
            {"class_id": 1, "confidence": 0.7, "class_name": "Door"},
            {"class_id": 5, "confidence": 0.5, "class_name": "Socket Outlet"},
        ],
        "preview": "/outputs/run/run_1/page_2.jpg",
        "pages": [
            {"page": 1, "url": "/outputs/run/run_1/page_1.jpg"},
            {"page": 2, "url": "/outputs/run/run_1/page_2.jpg"},
        ],
    })
}
