use std::time::Duration;

use async_trait::async_trait;

use super::{MetadataTransport, RawMetadata, ResponseMode, TransportError};
use crate::error::LayerConfigError;

/// Metadata transport that executes requests with [`reqwest`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a new transport.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, LayerConfigError> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder
            .build()
            .map_err(|error| LayerConfigError::Configuration(error.to_string()))?;

        Ok(Self { http_client })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        if let Some(status) = value.status() {
            Self::Status(status.as_u16())
        } else if value.is_decode() || value.is_body() {
            Self::Decoding(value.to_string())
        } else {
            Self::Network(value.to_string())
        }
    }
}

#[async_trait]
impl MetadataTransport for HttpTransport {
    async fn get(&self, url: &str, mode: ResponseMode) -> Result<RawMetadata, TransportError> {
        let response = self.http_client.get(url).send().await?;
        if !response.status().is_success() {
            log::info!("Failed to load {url}: {}", response.status());
            return Err(TransportError::Status(response.status().as_u16()));
        }

        let bytes = response.bytes().await?;
        log::debug!("Loaded {} bytes from {url}", bytes.len());

        match mode {
            ResponseMode::Json => serde_json::from_slice(&bytes)
                .map(RawMetadata::Json)
                .map_err(|error| TransportError::Decoding(error.to_string())),
            ResponseMode::Text => String::from_utf8(bytes.to_vec())
                .map(RawMetadata::Text)
                .map_err(|error| TransportError::Decoding(error.to_string())),
            ResponseMode::Binary => Ok(RawMetadata::Binary(bytes)),
        }
    }
}
