//! Browser HTTP transport for the detection backend.
//!
//! [`HttpBackend`] implements both pipeline ports:
//!
//! - [`StageBackend`] via `window.fetch()` for the stage `GET`s.
//! - [`UploadTransport`] via `XMLHttpRequest`, because `fetch` exposes
//!   no upload progress events.
//!
//! All functions in this module require a browser environment
//! (`wasm32-unknown-unknown` target).

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use symscan_pipeline::{
    BackendConfig, Endpoint, ProgressReporter, StageBackend, TransportError, UploadFile,
    UploadTransport,
};
use tracing::debug;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

/// Multipart field name the backend reads the document from.
const UPLOAD_FIELD: &str = "file";

/// Failures of the browser APIs underneath a request.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),

    /// The request never produced a response (offline, CORS, aborted).
    #[error("network error")]
    Network,
}

impl From<JsValue> for HttpError {
    fn from(value: JsValue) -> Self {
        Self::JsError(
            value
                .as_string()
                .unwrap_or_else(|| format!("{value:?}")),
        )
    }
}

impl From<HttpError> for TransportError {
    fn from(err: HttpError) -> Self {
        Self::Network(err.to_string())
    }
}

/// The detection backend, reached over HTTP from the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBackend {
    config: BackendConfig,
}

impl HttpBackend {
    /// Create a transport for the backend at `config`.
    #[must_use]
    pub const fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    /// The backend address requests are sent to.
    #[must_use]
    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }
}

impl StageBackend for HttpBackend {
    async fn get_json(&self, endpoint: Endpoint) -> Result<Value, TransportError> {
        let url = self.config.endpoint_url(endpoint);
        debug!(%url, "GET");

        let window = web_sys::window().ok_or_else(|| HttpError::JsError("no global window".into()))?;
        let response: web_sys::Response = JsFuture::from(window.fetch_with_str(&url))
            .await
            .map_err(|_| HttpError::Network)?
            .dyn_into()
            .map_err(|_| HttpError::JsError("fetch did not resolve to a Response".into()))?;

        if !response.ok() {
            return Err(TransportError::Status(response.status()));
        }

        let text = JsFuture::from(response.text().map_err(HttpError::from)?)
            .await
            .map_err(HttpError::from)?
            .as_string()
            .ok_or_else(|| TransportError::Body("response body is not text".into()))?;
        parse_body(&text)
    }
}

impl UploadTransport for HttpBackend {
    async fn post_file(
        &self,
        file: &UploadFile,
        progress: ProgressReporter,
    ) -> Result<Value, TransportError> {
        let url = self.config.endpoint_url(Endpoint::Upload);
        debug!(%url, file = %file.name, "POST");

        let form = build_form(file)?;
        let xhr = web_sys::XmlHttpRequest::new().map_err(HttpError::from)?;
        xhr.open_with_async("POST", &url, true)
            .map_err(HttpError::from)?;

        let (promise, resolve, reject) = new_promise()?;

        // `loaded`/`total` are byte counts reported as doubles.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let onprogress = Closure::<dyn FnMut(web_sys::ProgressEvent)>::new(
            move |event: web_sys::ProgressEvent| {
                if event.length_computable() {
                    progress.report(event.loaded() as u64, event.total() as u64);
                }
            },
        );
        let onload = Closure::<dyn FnMut()>::new(move || {
            resolve.call0(&JsValue::NULL).ok();
        });
        let onerror = Closure::<dyn FnMut()>::new(move || {
            reject.call0(&JsValue::NULL).ok();
        });

        let upload = xhr.upload().map_err(HttpError::from)?;
        upload.set_onprogress(Some(onprogress.as_ref().unchecked_ref()));
        xhr.set_onload(Some(onload.as_ref().unchecked_ref()));
        xhr.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        xhr.set_onabort(Some(onerror.as_ref().unchecked_ref()));

        xhr.send_with_opt_form_data(Some(&form))
            .map_err(HttpError::from)?;

        // Yields to the browser event loop until load, error, or abort.
        let outcome = JsFuture::from(promise).await;

        upload.set_onprogress(None);
        xhr.set_onload(None);
        xhr.set_onerror(None);
        xhr.set_onabort(None);
        drop((onprogress, onload, onerror));

        outcome.map_err(|_| HttpError::Network)?;

        let status = xhr.status().map_err(HttpError::from)?;
        if !(200..300).contains(&status) {
            return Err(TransportError::Status(status));
        }
        let text = xhr
            .response_text()
            .map_err(HttpError::from)?
            .unwrap_or_default();
        parse_body(&text)
    }
}

/// Wrap `file` in a `FormData` under [`UPLOAD_FIELD`].
fn build_form(file: &UploadFile) -> Result<web_sys::FormData, HttpError> {
    let bytes = js_sys::Uint8Array::from(file.bytes.as_slice());
    let parts = js_sys::Array::new();
    parts.push(&bytes.buffer());
    let blob = web_sys::Blob::new_with_buffer_source_sequence(&parts)?;

    let form = web_sys::FormData::new()?;
    form.append_with_blob_and_filename(UPLOAD_FIELD, &blob, &file.name)?;
    Ok(form)
}

fn parse_body(text: &str) -> Result<Value, TransportError> {
    serde_json::from_str(text).map_err(|e| TransportError::Body(e.to_string()))
}

/// Create a JS Promise along with its resolve and reject functions.
fn new_promise() -> Result<(js_sys::Promise, js_sys::Function, js_sys::Function), HttpError> {
    let resolve = Rc::new(RefCell::new(None::<js_sys::Function>));
    let reject = Rc::new(RefCell::new(None::<js_sys::Function>));
    let resolve_clone = Rc::clone(&resolve);
    let reject_clone = Rc::clone(&reject);

    let promise = js_sys::Promise::new(&mut move |res, rej| {
        *resolve_clone.borrow_mut() = Some(res);
        *reject_clone.borrow_mut() = Some(rej);
    });

    let resolve_fn = resolve.borrow_mut().take();
    let reject_fn = reject.borrow_mut().take();
    match (resolve_fn, reject_fn) {
        (Some(res), Some(rej)) => Ok((promise, res, rej)),
        _ => Err(HttpError::JsError("promise executor did not run".into())),
    }
}
