//! Configuration of the [`LayerConfigResolver`](crate::LayerConfigResolver).

use std::sync::Arc;
use std::time::Duration;

use galileo_gpkg::GpkgOpener;
use serde::Deserialize;

const DEFAULT_USER_AGENT: &str = "galileo-layers/0.1";
const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Settings of metadata resolution.
///
/// Can be deserialized from the application configuration:
///
/// ```
/// use galileo_layers::ResolverConfig;
///
/// let config: ResolverConfig = serde_json::from_str(r#"{
///     "proxy_url": "https://proxy.example.com/?",
///     "timeout_secs": 30
/// }"#).unwrap();
/// assert_eq!(config.proxy_url.as_deref(), Some("https://proxy.example.com/?"));
/// ```
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Prefix prepended to a url when a request fails because of a network or cross-origin error.
    pub proxy_url: Option<String>,
    /// User agent of the http transport.
    pub user_agent: String,
    /// Timeout of the http transport. No timeout if not set.
    pub timeout_secs: Option<u64>,
    /// Number of metadata responses kept in memory.
    pub cache_capacity: usize,
    /// Reader of packaged databases.
    #[serde(skip)]
    pub gpkg_opener: Option<Arc<dyn GpkgOpener>>,
}

impl std::fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverConfig")
            .field("proxy_url", &self.proxy_url)
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .field("cache_capacity", &self.cache_capacity)
            .field("gpkg_opener", &self.gpkg_opener.is_some())
            .finish()
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            proxy_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            gpkg_opener: default_gpkg_opener(),
        }
    }
}

#[cfg(feature = "sqlite")]
fn default_gpkg_opener() -> Option<Arc<dyn GpkgOpener>> {
    Some(Arc::new(galileo_gpkg::database::SqliteOpener))
}

#[cfg(not(feature = "sqlite"))]
fn default_gpkg_opener() -> Option<Arc<dyn GpkgOpener>> {
    None
}

impl ResolverConfig {
    /// Sets the proxy prefix used to retry failed requests.
    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Sets the timeout of the http transport.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Sets the reader of packaged databases.
    pub fn with_gpkg_opener(mut self, opener: impl GpkgOpener + 'static) -> Self {
        self.gpkg_opener = Some(Arc::new(opener));
        self
    }

    /// Sets the number of metadata responses kept in memory. `0` disables the cache.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Timeout of the http transport.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_for_missing_values() {
        let config: ResolverConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.proxy_url, None);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn builder_methods() {
        let config = ResolverConfig::default()
            .with_proxy("https://proxy/?")
            .with_timeout(Duration::from_secs(5))
            .with_cache_capacity(0);
        assert_eq!(config.proxy_url.as_deref(), Some("https://proxy/?"));
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.cache_capacity, 0);
    }
}
