//! Entry point of layer configuration resolution. See [`LayerConfigResolver`].

use std::sync::Arc;

use ahash::AHashMap;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::builder::TreeBuilder;
use crate::config::ResolverConfig;
use crate::descriptor::{LayerDescriptor, LayerEntryConfig, ServiceType};
use crate::error::{LayerConfigError, LoadError};
use crate::fetch::{HttpTransport, MetadataFetcher, MetadataRequest, MetadataTransport};
use crate::metadata::{CapabilitiesDocument, PackagedMetadata, ServiceIndex, ServiceMetadata};
use crate::node::ConfigTree;

/// Result of resolving a layer descriptor.
#[derive(Debug, Clone)]
pub struct ResolvedLayerConfig {
    /// Configuration tree. Contains both resolved and failed nodes.
    pub tree: ConfigTree,
    /// Errors of the failed nodes.
    pub errors: Vec<LoadError>,
    /// Normalized service metadata.
    pub metadata: ServiceMetadata,
    /// Proxy prefix the service was accessed through.
    pub proxy: Option<String>,
}

/// Resolves layer descriptors into configuration trees.
///
/// ```no_run
/// use galileo_layers::{LayerConfigResolver, LayerDescriptor, ResolverConfig, ServiceType};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> Result<(), galileo_layers::LayerConfigError> {
/// let resolver = LayerConfigResolver::new(ResolverConfig::default())?;
/// let descriptor = LayerDescriptor::new(
///     "water",
///     ServiceType::EsriDynamic,
///     "https://example.com/arcgis/rest/services/Water/MapServer",
/// );
///
/// let resolved = resolver.resolve(&descriptor, &CancellationToken::new()).await?;
/// for error in &resolved.errors {
///     println!("{}: {}", error.layer_path, error.message());
/// }
/// # Ok(())
/// # }
/// ```
pub struct LayerConfigResolver {
    config: ResolverConfig,
    fetcher: MetadataFetcher,
    proxies: Mutex<AHashMap<String, String>>,
}

impl std::fmt::Debug for LayerConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerConfigResolver")
            .field("config", &self.config)
            .field("fetcher", &self.fetcher)
            .finish()
    }
}

impl LayerConfigResolver {
    /// Creates a resolver that loads metadata over http.
    pub fn new(config: ResolverConfig) -> Result<Self, LayerConfigError> {
        let transport = HttpTransport::new(&config.user_agent, config.timeout())?;
        Ok(Self::with_transport(config, transport))
    }

    /// Creates a resolver with a custom transport.
    pub fn with_transport(config: ResolverConfig, transport: impl MetadataTransport + 'static) -> Self {
        let fetcher = MetadataFetcher::new(
            Arc::new(transport),
            config.proxy_url.clone(),
            config.cache_capacity,
        );

        Self {
            config,
            fetcher,
            proxies: Mutex::new(AHashMap::new()),
        }
    }

    /// Proxy prefix that was needed to access the service before.
    pub fn known_proxy(&self, service_url: &str) -> Option<String> {
        self.proxies.lock().get(service_url).cloned()
    }

    /// Resolves the descriptor.
    ///
    /// Fails only if the service metadata cannot be loaded or interpreted. Failures of separate
    /// layers are reported in [`ResolvedLayerConfig::errors`].
    pub async fn resolve(
        &self,
        descriptor: &LayerDescriptor,
        cancel: &CancellationToken,
    ) -> Result<ResolvedLayerConfig, LayerConfigError> {
        let service_url = descriptor.metadata_access_path.as_str();
        let known_proxy = self.known_proxy(service_url);

        let request = metadata_request(descriptor.service_type, service_url);
        let fetched = self
            .fetcher
            .fetch(&request, known_proxy.as_deref(), cancel)
            .await?;
        let mut proxy = fetched.proxy.clone();

        let mut metadata = match descriptor.service_type {
            ServiceType::Wms => {
                ServiceMetadata::Capabilities(CapabilitiesDocument::parse(&fetched.into_text()?)?)
            }
            ServiceType::EsriDynamic | ServiceType::EsriFeature => {
                ServiceMetadata::Index(ServiceIndex::from_json(&fetched.into_json()?)?)
            }
            ServiceType::GeoPackage => {
                let opener = self.config.gpkg_opener.as_ref().ok_or_else(|| {
                    LayerConfigError::Configuration("no GeoPackage reader is configured".into())
                })?;
                ServiceMetadata::Packaged(
                    PackagedMetadata::load(opener.as_ref(), fetched.into_bytes()?).await?,
                )
            }
        };

        if let ServiceMetadata::Capabilities(document) = &mut metadata {
            if descriptor.fetch_per_layer {
                self.merge_layer_capabilities(document, descriptor, proxy.as_deref(), cancel)
                    .await;
            }
        }

        let output = TreeBuilder::new(descriptor, &metadata, &self.fetcher, cancel)?
            .with_proxy(proxy.clone())
            .build()
            .await;

        proxy = proxy.or(output.proxy);
        if let Some(proxy) = &proxy {
            self.proxies
                .lock()
                .insert(service_url.to_string(), proxy.clone());
        }

        log::info!(
            "Resolved {} with {} nodes, {} failed",
            descriptor.id,
            output.tree.iter().count(),
            output.errors.len()
        );

        Ok(ResolvedLayerConfig {
            tree: output.tree,
            errors: output.errors,
            metadata,
            proxy,
        })
    }

    /// Resolves several descriptors concurrently. A failure of one descriptor doesn't affect the
    /// others.
    pub async fn resolve_all(
        &self,
        descriptors: &[LayerDescriptor],
        cancel: &CancellationToken,
    ) -> Vec<Result<ResolvedLayerConfig, LayerConfigError>> {
        join_all(
            descriptors
                .iter()
                .map(|descriptor| self.resolve(descriptor, cancel)),
        )
        .await
    }

    /// Loads capabilities of every declared layer separately and merges them into `document`.
    async fn merge_layer_capabilities(
        &self,
        document: &mut CapabilitiesDocument,
        descriptor: &LayerDescriptor,
        proxy: Option<&str>,
        cancel: &CancellationToken,
    ) {
        let mut names = vec![];
        collect_leaf_ids(&descriptor.entries, &mut names);

        let requests = names.iter().map(|name| {
            let request = MetadataRequest::capabilities(&descriptor.metadata_access_path)
                .with_param("layers", name.as_str());
            async move {
                let fetched = self.fetcher.fetch(&request, proxy, cancel).await?;
                CapabilitiesDocument::parse(&fetched.into_text()?)
            }
        });
        let results = join_all(requests).await;

        for (name, result) in names.iter().zip(results) {
            match result {
                Ok(source) => {
                    if document.merge_layer(&source, name) {
                        log::debug!("Merged capabilities of layer {name}");
                    }
                }
                Err(error) => log::warn!("Failed to load capabilities of layer {name}: {error}"),
            }
        }
    }
}

fn metadata_request(service_type: ServiceType, url: &str) -> MetadataRequest {
    match service_type {
        ServiceType::Wms => MetadataRequest::capabilities(url),
        ServiceType::EsriDynamic | ServiceType::EsriFeature => MetadataRequest::json(url),
        ServiceType::GeoPackage => MetadataRequest::binary(url),
    }
}

fn collect_leaf_ids(entries: &[LayerEntryConfig], ids: &mut Vec<String>) {
    for entry in entries {
        match entry {
            LayerEntryConfig::Leaf(leaf) => ids.push(leaf.id.clone()),
            LayerEntryConfig::Group(group) => collect_leaf_ids(&group.entries, ids),
        }
    }
}
