//! Upload gate: validates a file, transfers it once, and reports
//! progress.
//!
//! The gate allows one transfer at a time. A second call while a
//! transfer is in flight is rejected with [`UploadRejection::Busy`]
//! rather than racing the first.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::ports::UploadTransport;
use crate::types::UploadResult;

/// File extensions the backend can preprocess.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "dwf", "png", "jpg", "jpeg"];

/// Check whether a filename has an accepted extension.
#[must_use]
pub fn has_accepted_extension(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(_, ext)| {
        ACCEPTED_EXTENSIONS
            .iter()
            .any(|a| a.eq_ignore_ascii_case(ext))
    })
}

/// A document selected for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Original filename, including extension.
    pub name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Create an upload from a filename and its contents.
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Size of the file in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }

    /// Whether the file has no contents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Check the file can be submitted.
    ///
    /// # Errors
    ///
    /// Returns [`UploadRejection::UnsupportedType`] for an extension
    /// outside [`ACCEPTED_EXTENSIONS`] and [`UploadRejection::EmptyFile`]
    /// for a zero-byte file.
    pub fn validate(&self) -> Result<(), UploadRejection> {
        if !has_accepted_extension(&self.name) {
            return Err(UploadRejection::UnsupportedType(self.name.clone()));
        }
        if self.is_empty() {
            return Err(UploadRejection::EmptyFile(self.name.clone()));
        }
        Ok(())
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Reasons the gate refuses to start a transfer.
///
/// None of these touch the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    /// Another upload is still in flight.
    #[error("an upload is already in progress")]
    Busy,

    /// The file has an extension the backend cannot process.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// The file is empty.
    #[error("file is empty: {0}")]
    EmptyFile(String),
}

/// Shared progress state behind a [`ProgressReporter`].
struct ProgressState {
    last: Cell<f64>,
    sink: Box<dyn Fn(f64)>,
}

/// Forwards transfer progress as a fraction in `[0, 1]`.
///
/// Cheap to clone, so transports can move copies into event callbacks.
/// Reported values never decrease: a report lower than the last one is
/// dropped, as is any report with an unknown (`0`) total.
#[derive(Clone)]
pub struct ProgressReporter {
    state: Rc<ProgressState>,
}

impl ProgressReporter {
    /// Create a reporter that forwards accepted fractions to `sink`.
    #[must_use]
    pub fn new(sink: impl Fn(f64) + 'static) -> Self {
        Self {
            state: Rc::new(ProgressState {
                last: Cell::new(0.0),
                sink: Box::new(sink),
            }),
        }
    }

    /// A reporter that discards everything.
    #[must_use]
    pub fn silent() -> Self {
        Self::new(|_| {})
    }

    /// Report `loaded` of `total` bytes sent.
    #[allow(clippy::cast_precision_loss)]
    pub fn report(&self, loaded: u64, total: u64) {
        if total == 0 {
            return;
        }
        let fraction = (loaded as f64 / total as f64).clamp(0.0, 1.0);
        if fraction < self.state.last.get() {
            return;
        }
        self.state.last.set(fraction);
        (self.state.sink)(fraction);
    }

    /// The most recently reported fraction.
    #[must_use]
    pub fn last(&self) -> f64 {
        self.state.last.get()
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("last", &self.last())
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight flag when the transfer ends, however it ends.
struct InFlight<'a>(&'a Cell<bool>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Performs the initial file transfer.
pub struct UploadGate<T> {
    transport: T,
    in_flight: Cell<bool>,
}

impl<T: UploadTransport> UploadGate<T> {
    /// Create a gate over `transport`.
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            in_flight: Cell::new(false),
        }
    }

    /// Whether a transfer is currently in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.get()
    }

    /// Upload `file`, forwarding progress fractions to `on_progress`.
    ///
    /// Transport failures and backend refusals are not errors here:
    /// they produce an [`UploadResult`] with a `Failed` status, which
    /// the controller turns into a failed run.
    ///
    /// # Errors
    ///
    /// Returns an [`UploadRejection`] without contacting the backend if
    /// another upload is in flight or the file fails validation.
    #[allow(clippy::future_not_send)] // Browser transports are single-threaded
    pub async fn upload(
        &self,
        file: &UploadFile,
        on_progress: impl Fn(f64) + 'static,
    ) -> Result<UploadResult, UploadRejection> {
        if self.in_flight.replace(true) {
            warn!(file = %file.name, "upload rejected: another upload is in flight");
            return Err(UploadRejection::Busy);
        }
        let _guard = InFlight(&self.in_flight);

        file.validate()?;

        debug!(file = %file.name, bytes = file.len(), "uploading");
        let reporter = ProgressReporter::new(on_progress);
        let result = match self.transport.post_file(file, reporter.clone()).await {
            Ok(body) => UploadResult::from_response(body),
            Err(e) => UploadResult::failed(e.to_string()),
        };

        if result.is_complete() {
            reporter.report(1, 1);
            info!(file = %file.name, "upload complete");
        } else {
            warn!(
                file = %file.name,
                error = result.error.as_deref().unwrap_or_default(),
                "upload failed"
            );
        }
        Ok(result)
    }
}

impl<T> fmt::Debug for UploadGate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadGate")
            .field("in_flight", &self.in_flight.get())
            .finish_non_exhaustive()
    }
}
