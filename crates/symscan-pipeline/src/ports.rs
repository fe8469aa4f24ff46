//! I/O ports implemented outside the core.
//!
//! The controller and upload gate only ever talk to the backend
//! through these traits, so the same orchestration runs in the browser
//! (`fetch` / `XMLHttpRequest`), natively (`reqwest`), and in tests
//! (scripted in-memory ports).
//!
//! The traits use `async fn` without a `Send` bound: the browser
//! transport is single-threaded and its futures are `!Send`.

use serde_json::Value;

use crate::upload::{ProgressReporter, UploadFile};

/// A backend endpoint, relative to the configured base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `GET /reset` -- clear artifacts from a previous session.
    Reset,
    /// `POST /upload` -- multipart file submission (field `file`).
    Upload,
    /// `GET /preprocess` -- render the document into page images.
    Preprocess,
    /// `GET /load_model` -- load the detection model.
    LoadModel,
    /// `GET /inference` -- run detection on every page.
    Inference,
    /// `GET /results` -- fetch the [`ResultsPayload`](crate::ResultsPayload).
    Results,
}

impl Endpoint {
    /// Path component, with a leading `/`.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Reset => "/reset",
            Self::Upload => "/upload",
            Self::Preprocess => "/preprocess",
            Self::LoadModel => "/load_model",
            Self::Inference => "/inference",
            Self::Results => "/results",
        }
    }

    /// HTTP method used for this endpoint.
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            Self::Upload => "POST",
            _ => "GET",
        }
    }
}

/// A remote call was rejected before a usable response arrived.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request never completed (connection refused, CORS, ...).
    #[error("request failed: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("server responded with HTTP {0}")]
    Status(u16),

    /// The response body was not valid JSON.
    #[error("invalid response body: {0}")]
    Body(String),
}

/// Issues the parameterless `GET` calls of the pipeline.
#[allow(async_fn_in_trait)]
pub trait StageBackend {
    /// Call `endpoint` and return its decoded JSON body.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the request fails, the server
    /// answers with a non-success HTTP status, or the body is not JSON.
    async fn get_json(&self, endpoint: Endpoint) -> Result<Value, TransportError>;
}

/// Performs the multipart file transfer to [`Endpoint::Upload`].
#[allow(async_fn_in_trait)]
pub trait UploadTransport {
    /// Send `file` and return the decoded JSON response body.
    ///
    /// Implementations call [`ProgressReporter::report`] as bytes are
    /// sent; the reporter enforces monotonicity itself.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the transfer fails or the
    /// response is not JSON.
    async fn post_file(
        &self,
        file: &UploadFile,
        progress: ProgressReporter,
    ) -> Result<Value, TransportError>;
}

impl<T: StageBackend + ?Sized> StageBackend for &T {
    async fn get_json(&self, endpoint: Endpoint) -> Result<Value, TransportError> {
        (**self).get_json(endpoint).await
    }
}

impl<T: UploadTransport + ?Sized> UploadTransport for &T {
    async fn post_file(
        &self,
        file: &UploadFile,
        progress: ProgressReporter,
    ) -> Result<Value, TransportError> {
        (**self).post_file(file, progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_upload_is_posted() {
        for endpoint in [
            Endpoint::Reset,
            Endpoint::Preprocess,
            Endpoint::LoadModel,
            Endpoint::Inference,
            Endpoint::Results,
        ] {
            assert_eq!(endpoint.method(), "GET", "{endpoint:?}");
        }
        assert_eq!(Endpoint::Upload.method(), "POST");
    }

    #[test]
    fn paths_are_rooted() {
        assert_eq!(Endpoint::Preprocess.path(), "/preprocess");
        assert_eq!(Endpoint::LoadModel.path(), "/load_model");
        assert!(Endpoint::Results.path().starts_with('/'));
    }
}
