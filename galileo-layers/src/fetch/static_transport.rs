use std::sync::Arc;

use ahash::HashMap;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;

use super::{MetadataTransport, RawMetadata, ResponseMode, TransportError};

#[derive(Debug, Clone)]
enum Response {
    Ready(Result<RawMetadata, TransportError>),
    Pending,
}

/// Transport that serves predefined responses.
///
/// Useful for offline configurations and for tests. Requests to unknown urls fail with
/// [`TransportError::Status(404)`](TransportError::Status).
#[derive(Debug, Default)]
pub struct StaticTransport {
    responses: HashMap<String, Response>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StaticTransport {
    /// Creates a transport without responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a JSON response for the url.
    pub fn with_json(self, url: impl Into<String>, value: Value) -> Self {
        self.with_response(url, Ok(RawMetadata::Json(value)))
    }

    /// Adds a text response for the url.
    pub fn with_text(self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_response(url, Ok(RawMetadata::Text(text.into())))
    }

    /// Adds a binary response for the url.
    pub fn with_bytes(self, url: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        self.with_response(url, Ok(RawMetadata::Binary(bytes.into())))
    }

    /// Makes requests to the url fail with the error.
    pub fn with_failure(self, url: impl Into<String>, error: TransportError) -> Self {
        self.with_response(url, Err(error))
    }

    /// Makes requests to the url never complete.
    pub fn with_pending(mut self, url: impl Into<String>) -> Self {
        self.responses.insert(url.into(), Response::Pending);
        self
    }

    fn with_response(
        mut self,
        url: impl Into<String>,
        response: Result<RawMetadata, TransportError>,
    ) -> Self {
        self.responses.insert(url.into(), Response::Ready(response));
        self
    }

    /// Urls requested so far, in order. The log is shared, so it can be inspected after the
    /// transport is moved into a resolver.
    pub fn request_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.requests.clone()
    }
}

#[async_trait]
impl MetadataTransport for StaticTransport {
    async fn get(&self, url: &str, mode: ResponseMode) -> Result<RawMetadata, TransportError> {
        self.requests.lock().push(url.to_string());

        let response = match self.responses.get(url) {
            Some(Response::Ready(response)) => response.clone(),
            Some(Response::Pending) => return futures::future::pending().await,
            None => return Err(TransportError::Status(404)),
        };

        let body = response?;
        match (mode, &body) {
            (ResponseMode::Json, RawMetadata::Json(_))
            | (ResponseMode::Text, RawMetadata::Text(_))
            | (ResponseMode::Binary, RawMetadata::Binary(_)) => Ok(body),
            (ResponseMode::Json, RawMetadata::Text(text)) => serde_json::from_str(text)
                .map(RawMetadata::Json)
                .map_err(|error| TransportError::Decoding(error.to_string())),
            _ => Err(TransportError::Decoding(format!(
                "response of {url} does not match {mode:?} mode"
            ))),
        }
    }
}
