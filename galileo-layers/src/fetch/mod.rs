//! Retrieval of raw service metadata. See [`MetadataFetcher`].

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use bytes::Bytes;
use quick_cache::sync::Cache;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::LayerConfigError;
use crate::xml::XmlElement;

mod http;
mod static_transport;

pub use http::HttpTransport;
pub use static_transport::StaticTransport;

static KNOWN_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(json|geojson|xml|gpkg)$").expect("extension pattern is valid")
});

/// Expected format of the response body.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResponseMode {
    /// JSON document.
    Json,
    /// Structured text (XML).
    Text,
    /// Binary content.
    Binary,
}

/// Response body decoded according to its [`ResponseMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawMetadata {
    /// JSON document.
    Json(Value),
    /// Text document.
    Text(String),
    /// Binary content.
    Binary(Bytes),
}

/// Failure of a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection, timeout or cross-origin failure. Requests failed with this error can be retried
    /// through a proxy.
    #[error("network error: {0}")]
    Network(String),
    /// Server responded with an unsuccessful status.
    #[error("server responded with status {0}")]
    Status(u16),
    /// Response body does not match the requested mode.
    #[error("failed to decode response: {0}")]
    Decoding(String),
}

/// Transport that executes metadata requests.
#[async_trait]
pub trait MetadataTransport: Send + Sync {
    /// Executes a GET request to the url and decodes the body according to `mode`.
    async fn get(&self, url: &str, mode: ResponseMode) -> Result<RawMetadata, TransportError>;
}

/// Metadata request: url, response mode and the query parameters that request the format from
/// services that negotiate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRequest {
    url: String,
    mode: ResponseMode,
    format_params: Vec<(String, String)>,
}

impl MetadataRequest {
    /// Request of a JSON document (`f=json` is requested if not present).
    pub fn json(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: ResponseMode::Json,
            format_params: vec![("f".into(), "json".into())],
        }
    }

    /// Request of a WMS capabilities document.
    pub fn capabilities(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: ResponseMode::Text,
            format_params: vec![
                ("service".into(), "WMS".into()),
                ("request".into(), "GetCapabilities".into()),
            ],
        }
    }

    /// Request of binary content.
    pub fn binary(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: ResponseMode::Binary,
            format_params: vec![],
        }
    }

    /// Adds a query parameter that is appended unless already present in the url.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.format_params.push((key.into(), value.into()));
        self
    }

    /// Response mode of the request.
    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Url that is actually requested.
    ///
    /// If the path of the url ends with a known file extension, the url is used as is. Otherwise
    /// the format parameters that are not in the query yet are appended.
    pub fn prepared_url(&self) -> Result<String, LayerConfigError> {
        let mut url = Url::parse(&self.url).map_err(|error| {
            LayerConfigError::ServiceMetadataFetch {
                url: self.url.clone(),
                reason: error.to_string(),
            }
        })?;

        if KNOWN_EXTENSION.is_match(url.path()) {
            return Ok(url.into());
        }

        let missing: Vec<_> = self
            .format_params
            .iter()
            .filter(|(key, _)| {
                !url.query_pairs()
                    .any(|(existing, _)| existing.eq_ignore_ascii_case(key))
            })
            .collect();

        if !missing.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in missing {
                pairs.append_pair(key, value);
            }
        }

        Ok(url.into())
    }
}

/// Successfully fetched metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedMetadata {
    /// Requested url (without the proxy prefix).
    pub url: String,
    /// Decoded body.
    pub body: RawMetadata,
    /// Proxy prefix the metadata was loaded through. Requests to the same service should use it
    /// too.
    pub proxy: Option<String>,
}

impl FetchedMetadata {
    /// Returns the JSON body.
    pub fn into_json(self) -> Result<Value, LayerConfigError> {
        match self.body {
            RawMetadata::Json(value) => Ok(value),
            _ => Err(LayerConfigError::MalformedMetadata(format!(
                "expected JSON document from {}",
                self.url
            ))),
        }
    }

    /// Returns the text body.
    pub fn into_text(self) -> Result<String, LayerConfigError> {
        match self.body {
            RawMetadata::Text(text) => Ok(text),
            _ => Err(LayerConfigError::MalformedMetadata(format!(
                "expected text document from {}",
                self.url
            ))),
        }
    }

    /// Returns the binary body.
    pub fn into_bytes(self) -> Result<Bytes, LayerConfigError> {
        match self.body {
            RawMetadata::Binary(bytes) => Ok(bytes),
            _ => Err(LayerConfigError::MalformedMetadata(format!(
                "expected binary content from {}",
                self.url
            ))),
        }
    }
}

/// Loads service metadata.
///
/// * Appends format parameters to urls without a known extension (see
///   [`MetadataRequest::prepared_url`]).
/// * If a request fails with a [`TransportError::Network`] error and a proxy is configured, the
///   request is repeated once through the proxy. The proxy is reported in
///   [`FetchedMetadata::proxy`].
/// * Well-formed responses that describe a service error fail with
///   [`LayerConfigError::ServiceMetadataContent`].
/// * Fetches are aborted when the cancellation token is cancelled.
#[derive(Clone)]
pub struct MetadataFetcher {
    transport: Arc<dyn MetadataTransport>,
    proxy_url: Option<String>,
    /// Responses by url, with the proxy they were loaded through.
    cache: Option<Arc<Cache<String, (RawMetadata, Option<String>)>>>,
}

impl std::fmt::Debug for MetadataFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataFetcher")
            .field("proxy_url", &self.proxy_url)
            .field("cached", &self.cache.as_ref().map(|cache| cache.len()))
            .finish()
    }
}

impl MetadataFetcher {
    /// Creates a new fetcher.
    pub fn new(
        transport: Arc<dyn MetadataTransport>,
        proxy_url: Option<String>,
        cache_capacity: usize,
    ) -> Self {
        Self {
            transport,
            proxy_url,
            cache: (cache_capacity > 0).then(|| Arc::new(Cache::new(cache_capacity))),
        }
    }

    /// Fetches the metadata.
    ///
    /// If `via_proxy` is set, the request goes through that proxy directly without trying the
    /// original url first.
    pub async fn fetch(
        &self,
        request: &MetadataRequest,
        via_proxy: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<FetchedMetadata, LayerConfigError> {
        if cancel.is_cancelled() {
            return Err(LayerConfigError::Cancelled);
        }

        let url = request.prepared_url()?;
        let cached = self.cache.as_ref().and_then(|cache| cache.get(url.as_str()));
        if let Some((body, proxy)) = cached {
            log::trace!("Metadata for {url} is loaded from cache");
            return Ok(FetchedMetadata { url, body, proxy });
        }

        let (body, proxy) = match via_proxy {
            Some(proxy) => {
                let body = self
                    .attempt(&proxied(proxy, &url), request.mode(), cancel)
                    .await?
                    .map_err(|error| fetch_error(&url, error))?;
                (body, Some(proxy.to_string()))
            }
            None => match self.attempt(&url, request.mode(), cancel).await? {
                Ok(body) => (body, None),
                Err(TransportError::Network(reason)) if self.proxy_url.is_some() => {
                    let proxy = self.proxy_url.clone().unwrap_or_default();
                    log::warn!("Failed to load {url} ({reason}), retrying through proxy {proxy}");
                    let body = self
                        .attempt(&proxied(&proxy, &url), request.mode(), cancel)
                        .await?
                        .map_err(|error| fetch_error(&url, error))?;
                    (body, Some(proxy))
                }
                Err(error) => return Err(fetch_error(&url, error)),
            },
        };

        check_service_error(&url, &body)?;

        if let Some(cache) = &self.cache {
            cache.insert(url.clone(), (body.clone(), proxy.clone()));
        }

        Ok(FetchedMetadata { url, body, proxy })
    }

    /// Executes one request. The outer error is returned only when the request is cancelled.
    async fn attempt(
        &self,
        url: &str,
        mode: ResponseMode,
        cancel: &CancellationToken,
    ) -> Result<Result<RawMetadata, TransportError>, LayerConfigError> {
        log::info!("Loading metadata from {url}");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("Request to {url} is cancelled");
                Err(LayerConfigError::Cancelled)
            }
            result = self.transport.get(url, mode) => Ok(result),
        }
    }
}

fn proxied(proxy: &str, url: &str) -> String {
    format!("{proxy}{url}")
}

fn fetch_error(url: &str, error: TransportError) -> LayerConfigError {
    LayerConfigError::ServiceMetadataFetch {
        url: url.to_string(),
        reason: error.to_string(),
    }
}

/// Checks a well-formed response for an embedded service error.
///
/// JSON services report errors as `{"error": {"code": 400, "message": "..."}}`, OGC services as a
/// `ServiceExceptionReport` (or `ExceptionReport`) document.
pub fn check_service_error(url: &str, body: &RawMetadata) -> Result<(), LayerConfigError> {
    match body {
        RawMetadata::Json(value) => {
            let Some(error) = value.get("error").filter(|error| error.is_object()) else {
                return Ok(());
            };

            Err(LayerConfigError::ServiceMetadataContent {
                url: url.to_string(),
                code: error.get("code").and_then(Value::as_i64),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown service error")
                    .to_string(),
            })
        }
        RawMetadata::Text(text) if text.contains("ExceptionReport") => {
            let Ok(root) = XmlElement::parse(text) else {
                return Ok(());
            };
            if root.name != "ServiceExceptionReport" && root.name != "ExceptionReport" {
                return Ok(());
            }

            let exception = root
                .find("ServiceException")
                .or_else(|| root.find("ExceptionText"));
            Err(LayerConfigError::ServiceMetadataContent {
                url: url.to_string(),
                code: None,
                message: exception
                    .map(|element| element.text.trim().to_string())
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| "unknown service error".to_string()),
            })
        }
        _ => Ok(()),
    }
}
