//! Native HTTP transport built on `reqwest`.
//!
//! Stage calls are plain `GET`s. The upload streams the file as a
//! multipart body in fixed-size chunks; each chunk handed to the
//! connection is counted towards the progress bar.

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde_json::Value;
use symscan_pipeline::{
    BackendConfig, Endpoint, ProgressReporter, StageBackend, TransportError, UploadFile,
    UploadTransport,
};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Bytes per upload chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Talks to the detection backend over HTTP.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: Client,
    config: BackendConfig,
}

impl ReqwestBackend {
    /// Create a backend client for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(config: BackendConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("symscan/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// Where requests are sent.
    #[must_use]
    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }
}

impl StageBackend for ReqwestBackend {
    async fn get_json(&self, endpoint: Endpoint) -> Result<Value, TransportError> {
        let url = self.config.endpoint_url(endpoint);
        debug!(%url, "GET");
        let response = self.client.get(&url).send().await.map_err(network)?;
        decode(response).await
    }
}

impl UploadTransport for ReqwestBackend {
    async fn post_file(
        &self,
        file: &UploadFile,
        progress: ProgressReporter,
    ) -> Result<Value, TransportError> {
        let url = self.config.endpoint_url(Endpoint::Upload);
        let total = file.len();
        debug!(%url, file = %file.name, bytes = total, "POST");

        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel::<u64>();
        let chunks: Vec<Vec<u8>> = file.bytes.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect();
        let mut sent = 0u64;
        let stream = futures::stream::iter(chunks).map(move |chunk| {
            sent = sent.saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
            // The receiver is gone once the response has arrived.
            let _ = sent_tx.send(sent);
            Ok::<_, std::io::Error>(chunk)
        });

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(file.name.clone());
        let form = Form::new().part("file", part);

        let request = self.client.post(&url).multipart(form).send();
        tokio::pin!(request);

        let result = loop {
            tokio::select! {
                result = &mut request => break result,
                Some(bytes) = sent_rx.recv() => {
                    trace!(bytes, total, "upload progress");
                    progress.report(bytes, total);
                }
            }
        };
        while let Ok(bytes) = sent_rx.try_recv() {
            progress.report(bytes, total);
        }

        decode(result.map_err(network)?).await
    }
}

/// Check the status and parse the body as JSON.
async fn decode(response: Response) -> Result<Value, TransportError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status(status.as_u16()));
    }
    response.json::<Value>().await.map_err(|e| {
        if e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            network(e)
        }
    })
}

#[allow(clippy::needless_pass_by_value)]
fn network(err: reqwest::Error) -> TransportError {
    TransportError::Network(err.to_string())
}
