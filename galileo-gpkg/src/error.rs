//! Error types used by the crate.

use geozero::error::GeozeroError;
use thiserror::Error;

/// Error reading a GeoPackage database or one of its geometry blobs.
#[derive(Debug, Clone, Error)]
pub enum GpkgError {
    /// Envelope flag of a geometry blob is not one of the values defined by the standard.
    #[error("unsupported geometry envelope flag {0}")]
    UnsupportedGeometryEnvelope(u8),

    /// Geometry blob is shorter than its header and envelope.
    #[error("geometry blob of {len} bytes is shorter than its {required} bytes header")]
    TruncatedGeometry {
        /// Actual length of the blob.
        len: usize,
        /// Number of bytes the header and envelope require.
        required: usize,
    },

    /// Geometry payload is not a valid WKB geometry.
    #[error("failed to decode geometry payload: {0}")]
    Wkb(String),

    /// Error reported by the database engine.
    #[error("database error: {0}")]
    Database(String),

    /// Table with the given name does not exist in the database.
    #[error("table {0} not found")]
    TableNotFound(String),
}

impl From<GeozeroError> for GpkgError {
    fn from(value: GeozeroError) -> Self {
        Self::Wkb(value.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for GpkgError {
    fn from(value: sqlx::Error) -> Self {
        Self::Database(value.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<std::io::Error> for GpkgError {
    fn from(value: std::io::Error) -> Self {
        Self::Database(value.to_string())
    }
}
