//! Construction of the configuration tree.
//!
//! The tree is built in three passes:
//! 1. declared (or discovered) entries are validated against the service metadata. Leaves that
//!    turn out to be groups in the service are promoted to groups with one synthetic child per
//!    sublayer. Failures are recorded against the failed node only. A sibling repeating an
//!    earlier sibling's id is failed with [`LayerConfigError::DuplicateEntryId`];
//! 2. for ArcGIS services, the metadata documents of all remaining leaves are loaded concurrently,
//!    one request per distinct layer id. Once every request has settled, the results are applied
//!    to the tree in one pass;
//! 3. statuses are settled bottom-up. A group without children that resolved is failed with
//!    [`LayerConfigError::EmptyGroup`].

use std::collections::BTreeMap;

use ahash::AHashSet;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::descriptor::{GroupEntry, LayerDescriptor, LayerEntryConfig, LeafEntry, LocalizedString};
use crate::error::{LayerConfigError, LoadError};
use crate::fetch::{MetadataFetcher, MetadataRequest};
use crate::metadata::capabilities::CapabilityLayer;
use crate::metadata::index::{IndexNode, LayerMetadata, ServiceIndex};
use crate::metadata::packaged::PackagedMetadata;
use crate::metadata::{CapabilitiesDocument, ServiceMetadata};
use crate::node::{
    ConfigNode, ConfigTree, GroupNode, LeafNode, NodeCommon, ScaleLimits, SourceConfig,
};
use crate::status::LayerStatus;

mod apply;

/// Result of a tree build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// The tree.
    pub tree: ConfigTree,
    /// Errors of the failed nodes.
    pub errors: Vec<LoadError>,
    /// Proxy prefix the service was accessed through.
    pub proxy: Option<String>,
}

/// Outcome of validating a leaf entry against the metadata.
enum Resolution {
    Leaf,
    Group(Vec<LayerEntryConfig>),
}

/// Leaf waiting for its layer metadata document.
#[derive(Debug)]
struct PendingLeaf {
    layer_path: String,
    layer_id: i64,
    declared_feature_info: bool,
    declared_scale: bool,
}

/// Builds the configuration tree of a descriptor from the service metadata.
#[derive(Debug)]
pub struct TreeBuilder<'a> {
    descriptor: &'a LayerDescriptor,
    metadata: &'a ServiceMetadata,
    fetcher: &'a MetadataFetcher,
    cancel: &'a CancellationToken,
    proxy: Option<String>,
    esri_roots: Vec<i64>,
    esri_children: BTreeMap<i64, Vec<i64>>,
    pending: Vec<PendingLeaf>,
    errors: Vec<LoadError>,
    /// Entry ids of the leaves being promoted, outermost first.
    promoted: Vec<String>,
    /// Descriptor name, given to the only top-level node.
    root_name: Option<LocalizedString>,
}

impl<'a> TreeBuilder<'a> {
    /// Creates a builder.
    ///
    /// Fails if the metadata is a service index that does not form a forest.
    pub fn new(
        descriptor: &'a LayerDescriptor,
        metadata: &'a ServiceMetadata,
        fetcher: &'a MetadataFetcher,
        cancel: &'a CancellationToken,
    ) -> Result<Self, LayerConfigError> {
        let mut esri_roots = vec![];
        let mut esri_children = BTreeMap::new();
        if let ServiceMetadata::Index(index) = metadata {
            for root in index.forest()? {
                esri_roots.push(root.id);
                collect_children(&root, &mut esri_children);
            }
        }

        Ok(Self {
            descriptor,
            metadata,
            fetcher,
            cancel,
            proxy: None,
            esri_roots,
            esri_children,
            pending: vec![],
            errors: vec![],
            promoted: vec![],
            root_name: None,
        })
    }

    /// Sets the proxy prefix already known for the service.
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Builds the tree.
    pub async fn build(mut self) -> BuildOutput {
        let entries = if self.descriptor.entries.is_empty() {
            let discovered = self.discover_entries();
            log::debug!(
                "Descriptor {} declares no entries, discovered {} from metadata",
                self.descriptor.id,
                discovered.len()
            );
            discovered
        } else {
            self.descriptor.entries.clone()
        };

        if entries.len() == 1 {
            self.root_name = self.descriptor.name.clone();
        }

        let parent_path = self.descriptor.id.clone();
        let mut roots = self.build_children(&entries, &parent_path, true);

        self.load_layer_metadata(&mut roots).await;

        for root in &mut roots {
            self.settle(root);
        }

        BuildOutput {
            tree: ConfigTree::new(roots),
            errors: self.errors,
            proxy: self.proxy,
        }
    }

    fn discover_entries(&self) -> Vec<LayerEntryConfig> {
        match self.metadata {
            ServiceMetadata::Index(_) => self
                .esri_roots
                .iter()
                .map(|id| LayerEntryConfig::leaf(id.to_string()))
                .collect(),
            ServiceMetadata::Capabilities(document) => match &document.root.name {
                Some(name) => vec![LayerEntryConfig::leaf(name.clone())],
                None => discover_capability_layers(&document.root.layers),
            },
            ServiceMetadata::Packaged(package) => package
                .tables
                .iter()
                .map(|table| table.info.name.clone())
                .chain(package.failed.iter().map(|(name, _)| name.clone()))
                .map(LayerEntryConfig::leaf)
                .collect(),
        }
    }

    fn build_children(
        &mut self,
        entries: &[LayerEntryConfig],
        parent_path: &str,
        top_level: bool,
    ) -> Vec<ConfigNode> {
        let mut seen = AHashSet::new();
        entries
            .iter()
            .map(|entry| {
                if seen.insert(entry.id()) {
                    self.build_entry(entry, parent_path, top_level)
                } else {
                    self.build_duplicate(entry, parent_path, top_level)
                }
            })
            .collect()
    }

    /// Failed node for an entry whose id is already taken by a sibling.
    fn build_duplicate(
        &mut self,
        entry: &LayerEntryConfig,
        parent_path: &str,
        top_level: bool,
    ) -> ConfigNode {
        let mut common = self.new_node(entry.id(), parent_path, top_level);
        let error = LayerConfigError::DuplicateEntryId {
            layer_path: common.layer_path.clone(),
            entry_id: entry.id().to_string(),
        };
        self.fail(&mut common, error);

        match entry {
            LayerEntryConfig::Group(_) => ConfigNode::Group(GroupNode {
                common,
                children: vec![],
            }),
            LayerEntryConfig::Leaf(_) => ConfigNode::Leaf(LeafNode { common }),
        }
    }

    fn build_entry(
        &mut self,
        entry: &LayerEntryConfig,
        parent_path: &str,
        top_level: bool,
    ) -> ConfigNode {
        match entry {
            LayerEntryConfig::Group(group) => self.build_group(group, parent_path, top_level),
            LayerEntryConfig::Leaf(leaf) => self.build_leaf(leaf, parent_path, top_level),
        }
    }

    fn new_node(&mut self, entry_id: &str, parent_path: &str, top_level: bool) -> NodeCommon {
        let source = SourceConfig {
            access_path: self.descriptor.metadata_access_path.clone(),
            projection: self.descriptor.projection,
            format: self.descriptor.service_type,
            proxy: self.proxy.clone(),
        };

        let mut common = NodeCommon::new(entry_id, parent_path, top_level, source);
        if top_level {
            if let Some(name) = self.root_name.take() {
                common.name = name;
            }
        }
        if let Err(error) = common.status.advance(LayerStatus::Processing) {
            log::warn!("Cannot start {}: {error}", common.layer_path);
        }
        log::debug!("Resolving {}", common.layer_path);

        common
    }

    fn build_group(&mut self, group: &GroupEntry, parent_path: &str, top_level: bool) -> ConfigNode {
        let mut common = self.new_node(&group.id, parent_path, top_level);
        if let Some(name) = &group.name {
            common.name = name.clone();
        }

        let children = self.build_children(&group.entries, &common.layer_path, false);

        ConfigNode::Group(GroupNode { common, children })
    }

    fn build_leaf(&mut self, leaf: &LeafEntry, parent_path: &str, top_level: bool) -> ConfigNode {
        let mut common = self.new_node(&leaf.id, parent_path, top_level);
        if let Some(name) = &leaf.name {
            common.name = name.clone();
        }
        if let Some(style) = &leaf.style {
            common.style = style.clone();
        }
        if let Some(style) = &self.descriptor.style {
            common.style.merge_missing(style);
        }
        if let Some(feature_info) = &leaf.feature_info {
            common.feature_info = feature_info.clone();
        }
        common.scale_limits = ScaleLimits {
            min_scale: leaf.min_scale,
            max_scale: leaf.max_scale,
        };

        let metadata = self.metadata;
        let resolution = match metadata {
            ServiceMetadata::Index(index) => self.resolve_index_leaf(index, leaf, &mut common),
            ServiceMetadata::Capabilities(document) => {
                self.resolve_capability_leaf(document, leaf, &mut common)
            }
            ServiceMetadata::Packaged(package) => {
                self.resolve_packaged_leaf(package, leaf, &mut common)
            }
        };

        match resolution {
            Ok(Resolution::Leaf) => ConfigNode::Leaf(LeafNode { common }),
            Ok(Resolution::Group(entries)) => self.promote(LeafNode { common }, entries),
            Err(error) => {
                self.fail(&mut common, error);
                ConfigNode::Leaf(LeafNode { common })
            }
        }
    }

    /// Replaces a leaf with a group built from the given entries.
    fn promote(&mut self, leaf: LeafNode, entries: Vec<LayerEntryConfig>) -> ConfigNode {
        let LeafNode { common } = leaf;
        log::debug!(
            "Layer {} has {} sublayers in the service, converting it to a group",
            common.layer_path,
            entries.len()
        );

        self.promoted.push(common.entry_id.clone());
        let children = self.build_children(&entries, &common.layer_path, false);
        self.promoted.pop();

        ConfigNode::Group(GroupNode { common, children })
    }

    fn resolve_index_leaf(
        &mut self,
        index: &ServiceIndex,
        leaf: &LeafEntry,
        common: &mut NodeCommon,
    ) -> Result<Resolution, LayerConfigError> {
        let layer_id: i64 =
            leaf.id
                .trim()
                .parse()
                .map_err(|_| LayerConfigError::LayerIdMustBeNumeric {
                    layer_path: common.layer_path.clone(),
                    layer_id: leaf.id.clone(),
                })?;

        let entry = index
            .entry(layer_id)
            .ok_or_else(|| LayerConfigError::LayerIdNotFound {
                layer_path: common.layer_path.clone(),
                layer_id: leaf.id.clone(),
            })?;

        apply::index_entry(common, entry, leaf.min_scale.is_some() || leaf.max_scale.is_some());
        common.source.access_path = format!(
            "{}/{layer_id}",
            self.descriptor.metadata_access_path.trim_end_matches('/')
        );

        let sub_ids: Vec<String> = self
            .esri_children
            .get(&layer_id)
            .map(|ids| ids.iter().map(i64::to_string).collect())
            .unwrap_or_default();
        let sub_ids = self.without_promoted(common, sub_ids);
        if !sub_ids.is_empty() {
            return Ok(Resolution::Group(synthetic_entries(leaf, sub_ids)));
        }

        self.pending.push(PendingLeaf {
            layer_path: common.layer_path.clone(),
            layer_id,
            declared_feature_info: leaf.feature_info.is_some(),
            declared_scale: leaf.min_scale.is_some() || leaf.max_scale.is_some(),
        });

        Ok(Resolution::Leaf)
    }

    fn resolve_capability_leaf(
        &mut self,
        document: &CapabilitiesDocument,
        leaf: &LeafEntry,
        common: &mut NodeCommon,
    ) -> Result<Resolution, LayerConfigError> {
        let (layer, _) =
            document
                .find_layer(&leaf.id)
                .ok_or_else(|| LayerConfigError::LayerIdNotFound {
                    layer_path: common.layer_path.clone(),
                    layer_id: leaf.id.clone(),
                })?;

        if common.name.is_empty() {
            if let Some(title) = layer.title.as_ref().or(layer.name.as_ref()) {
                common.name = LocalizedString::both(title);
            }
        }

        let sub_names = layer
            .layers
            .iter()
            .filter_map(|child| child.name.clone())
            .collect();
        let sub_names = self.without_promoted(common, sub_names);
        if !sub_names.is_empty() {
            return Ok(Resolution::Group(synthetic_entries(leaf, sub_names)));
        }

        apply::capability_layer(common, layer, self.descriptor, leaf);
        Ok(Resolution::Leaf)
    }

    fn resolve_packaged_leaf(
        &mut self,
        package: &PackagedMetadata,
        leaf: &LeafEntry,
        common: &mut NodeCommon,
    ) -> Result<Resolution, LayerConfigError> {
        let Some(table) = package.table(&leaf.id) else {
            return Err(match package.table_error(&leaf.id) {
                Some(error) => error.clone().into(),
                None => LayerConfigError::LayerIdNotFound {
                    layer_path: common.layer_path.clone(),
                    layer_id: leaf.id.clone(),
                },
            });
        };

        apply::packaged_table(common, table, self.descriptor, leaf);
        Ok(Resolution::Leaf)
    }

    /// Drops sublayer ids that refer back to the node or to a leaf it is nested in by promotion.
    fn without_promoted(&self, common: &NodeCommon, ids: Vec<String>) -> Vec<String> {
        ids.into_iter()
            .filter(|id| {
                let repeated = *id == common.entry_id || self.promoted.contains(id);
                if repeated {
                    log::warn!(
                        "Sublayer {id} of {} repeats its ancestor, skipping it",
                        common.layer_path
                    );
                }
                !repeated
            })
            .collect()
    }

    /// Loads the metadata documents of the pending ArcGIS leaves and applies them.
    async fn load_layer_metadata(&mut self, roots: &mut [ConfigNode]) {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return;
        }

        let endpoint = self.descriptor.metadata_access_path.trim_end_matches('/');
        let fetcher = self.fetcher;
        let cancel = self.cancel;
        let proxy = self.proxy.as_deref();

        let mut layer_ids: Vec<i64> = vec![];
        for leaf in &pending {
            if !layer_ids.contains(&leaf.layer_id) {
                layer_ids.push(leaf.layer_id);
            }
        }

        log::info!(
            "Loading metadata of {} layers of {endpoint}",
            layer_ids.len()
        );
        let requests = layer_ids.iter().map(|layer_id| {
            let request = MetadataRequest::json(format!("{endpoint}/{layer_id}"));
            async move {
                let fetched = fetcher.fetch(&request, proxy, cancel).await?;
                let proxy = fetched.proxy.clone();
                let metadata = LayerMetadata::from_json(&fetched.into_json()?)?;
                Ok::<_, LayerConfigError>((metadata, proxy))
            }
        });
        let results: BTreeMap<i64, _> = layer_ids
            .iter()
            .copied()
            .zip(join_all(requests).await)
            .collect();

        for leaf in &pending {
            let Some(result) = results.get(&leaf.layer_id) else {
                continue;
            };
            let Some(node) = find_mut(roots, &leaf.layer_path) else {
                log::warn!("Layer {} disappeared from the tree", leaf.layer_path);
                continue;
            };

            match result {
                Ok((metadata, proxy)) => {
                    if self.proxy.is_none() && proxy.is_some() {
                        self.proxy = proxy.clone();
                    }

                    let common = node.common_mut();
                    common.source.proxy = self.proxy.clone();
                    apply::layer_metadata(
                        common,
                        metadata,
                        leaf.declared_feature_info,
                        leaf.declared_scale,
                    );
                }
                Err(error) => self.fail(node.common_mut(), error.clone()),
            }
        }
    }

    /// Settles all processing nodes of the subtree.
    fn settle(&mut self, node: &mut ConfigNode) {
        match node {
            ConfigNode::Leaf(leaf) => {
                if leaf.common.status == LayerStatus::Processing {
                    complete(&mut leaf.common);
                }
            }
            ConfigNode::Group(group) => {
                for child in &mut group.children {
                    self.settle(child);
                }

                if group.common.status != LayerStatus::Processing {
                    return;
                }

                if group
                    .children
                    .iter()
                    .all(|child| child.status() == LayerStatus::Error)
                {
                    let error = LayerConfigError::EmptyGroup {
                        layer_path: group.common.layer_path.clone(),
                    };
                    self.fail(&mut group.common, error);
                } else {
                    complete(&mut group.common);
                }
            }
        }
    }

    fn fail(&mut self, common: &mut NodeCommon, error: LayerConfigError) {
        log::warn!("Layer {} failed: {error}", common.layer_path);
        common.status.fail();
        self.errors
            .push(LoadError::new(common.layer_path.clone(), error));
    }
}

fn complete(common: &mut NodeCommon) {
    match common.status.advance(LayerStatus::Processed) {
        Ok(()) => log::debug!("Layer {} is processed", common.layer_path),
        Err(error) => log::warn!("Cannot complete {}: {error}", common.layer_path),
    }
}

fn collect_children(node: &IndexNode, children: &mut BTreeMap<i64, Vec<i64>>) {
    children.insert(node.id, node.children.iter().map(|child| child.id).collect());
    for child in &node.children {
        collect_children(child, children);
    }
}

fn discover_capability_layers(layers: &[CapabilityLayer]) -> Vec<LayerEntryConfig> {
    layers
        .iter()
        .enumerate()
        .filter_map(|(index, layer)| match &layer.name {
            Some(name) => Some(LayerEntryConfig::leaf(name.clone())),
            None => {
                let entries = discover_capability_layers(&layer.layers);
                (!entries.is_empty()).then(|| {
                    LayerEntryConfig::Group(GroupEntry {
                        id: format!("group-{index}"),
                        name: layer.title.as_ref().map(LocalizedString::both),
                        entries,
                    })
                })
            }
        })
        .collect()
}

/// Leaf entries for the sublayers of a promoted leaf. Overrides of the original entry are copied
/// to every child.
fn synthetic_entries(original: &LeafEntry, ids: Vec<String>) -> Vec<LayerEntryConfig> {
    ids.into_iter()
        .map(|id| {
            LayerEntryConfig::Leaf(LeafEntry {
                id,
                name: None,
                style: original.style.clone(),
                feature_info: original.feature_info.clone(),
                min_scale: original.min_scale,
                max_scale: original.max_scale,
            })
        })
        .collect()
}

fn find_mut<'n>(nodes: &'n mut [ConfigNode], layer_path: &str) -> Option<&'n mut ConfigNode> {
    for node in nodes {
        if node.layer_path() == layer_path {
            return Some(node);
        }

        if let ConfigNode::Group(group) = node {
            if let Some(found) = find_mut(&mut group.children, layer_path) {
                return Some(found);
            }
        }
    }

    None
}
