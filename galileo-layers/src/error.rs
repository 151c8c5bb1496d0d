//! Error types used by the crate.

use galileo_gpkg::error::GpkgError;
use serde::Serialize;
use thiserror::Error;

use crate::status::LayerStatus;

/// Error of layer configuration resolution.
#[derive(Debug, Clone, Error)]
pub enum LayerConfigError {
    /// Service metadata could not be retrieved (network failure, bad status, undecodable body).
    #[error("failed to fetch service metadata from {url}: {reason}")]
    ServiceMetadataFetch {
        /// Requested url.
        url: String,
        /// Reason of the failure.
        reason: String,
    },

    /// Service returned a well-formed response that describes an error.
    #[error("{message}")]
    ServiceMetadataContent {
        /// Requested url.
        url: String,
        /// Error code reported by the service, if any.
        code: Option<i64>,
        /// Error message reported by the service.
        message: String,
    },

    /// Layer id is not listed in the service metadata.
    #[error("layer {layer_id} not found in the service metadata of {layer_path}")]
    LayerIdNotFound {
        /// Path of the node.
        layer_path: String,
        /// Requested layer id.
        layer_id: String,
    },

    /// Service requires numeric layer ids, but the given one is not a number.
    #[error("layer id {layer_id} of {layer_path} must be numeric")]
    LayerIdMustBeNumeric {
        /// Path of the node.
        layer_path: String,
        /// Requested layer id.
        layer_id: String,
    },

    /// Two sibling entries have the same id.
    #[error("entry id {entry_id} is declared more than once at {layer_path}")]
    DuplicateEntryId {
        /// Path of the duplicate node.
        layer_path: String,
        /// Repeated entry id.
        entry_id: String,
    },

    /// None of the children of a group could be resolved.
    #[error("group {layer_path} has no valid children")]
    EmptyGroup {
        /// Path of the group.
        layer_path: String,
    },

    /// Geometry blob of a packaged database has an unknown envelope kind.
    #[error("unsupported geometry envelope flag {0}")]
    UnsupportedGeometryEnvelope(u8),

    /// Resolution was aborted by the caller.
    #[error("layer resolution was cancelled")]
    Cancelled,

    /// Metadata was retrieved but cannot be interpreted.
    #[error("malformed service metadata: {0}")]
    MalformedMetadata(String),

    /// Service index references form a cycle or a layer has several parents.
    #[error("malformed service index: {0}")]
    MalformedServiceIndex(String),

    /// Attempt to move a layer status backwards.
    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidStatusTransition {
        /// Current status.
        from: LayerStatus,
        /// Requested status.
        to: LayerStatus,
    },

    /// Error reading a packaged database.
    #[error("packaged database error: {0}")]
    Packaged(GpkgError),

    /// The resolver is configured incorrectly.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<GpkgError> for LayerConfigError {
    fn from(value: GpkgError) -> Self {
        match value {
            GpkgError::UnsupportedGeometryEnvelope(flag) => Self::UnsupportedGeometryEnvelope(flag),
            other => Self::Packaged(other),
        }
    }
}

impl From<quick_xml::Error> for LayerConfigError {
    fn from(value: quick_xml::Error) -> Self {
        Self::MalformedMetadata(value.to_string())
    }
}

impl From<serde_json::Error> for LayerConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::MalformedMetadata(value.to_string())
    }
}

/// Kind of a [`LayerConfigError`], without the details.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// See [`LayerConfigError::ServiceMetadataFetch`].
    ServiceMetadataFetch,
    /// See [`LayerConfigError::ServiceMetadataContent`].
    ServiceMetadataContent,
    /// See [`LayerConfigError::LayerIdNotFound`].
    LayerIdNotFound,
    /// See [`LayerConfigError::LayerIdMustBeNumeric`].
    LayerIdMustBeNumeric,
    /// See [`LayerConfigError::DuplicateEntryId`].
    DuplicateEntryId,
    /// See [`LayerConfigError::EmptyGroup`].
    EmptyGroup,
    /// See [`LayerConfigError::UnsupportedGeometryEnvelope`].
    UnsupportedGeometryEnvelope,
    /// See [`LayerConfigError::Cancelled`].
    Cancelled,
    /// See [`LayerConfigError::MalformedMetadata`].
    MalformedMetadata,
    /// See [`LayerConfigError::MalformedServiceIndex`].
    MalformedServiceIndex,
    /// See [`LayerConfigError::InvalidStatusTransition`].
    InvalidStatusTransition,
    /// See [`LayerConfigError::Packaged`].
    Packaged,
    /// See [`LayerConfigError::Configuration`].
    Configuration,
}

impl LayerConfigError {
    /// Kind of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ServiceMetadataFetch { .. } => ErrorKind::ServiceMetadataFetch,
            Self::ServiceMetadataContent { .. } => ErrorKind::ServiceMetadataContent,
            Self::LayerIdNotFound { .. } => ErrorKind::LayerIdNotFound,
            Self::LayerIdMustBeNumeric { .. } => ErrorKind::LayerIdMustBeNumeric,
            Self::DuplicateEntryId { .. } => ErrorKind::DuplicateEntryId,
            Self::EmptyGroup { .. } => ErrorKind::EmptyGroup,
            Self::UnsupportedGeometryEnvelope(_) => ErrorKind::UnsupportedGeometryEnvelope,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::MalformedMetadata(_) => ErrorKind::MalformedMetadata,
            Self::MalformedServiceIndex(_) => ErrorKind::MalformedServiceIndex,
            Self::InvalidStatusTransition { .. } => ErrorKind::InvalidStatusTransition,
            Self::Packaged(_) => ErrorKind::Packaged,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

/// Error recorded against a single node of the configuration tree.
#[derive(Debug, Clone)]
pub struct LoadError {
    /// Path of the node the error belongs to.
    pub layer_path: String,
    /// The error.
    pub error: LayerConfigError,
}

impl LoadError {
    /// Creates a new instance.
    pub fn new(layer_path: impl Into<String>, error: LayerConfigError) -> Self {
        Self {
            layer_path: layer_path.into(),
            error,
        }
    }

    /// Kind of the error.
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Human readable message.
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}
