//! Decoding of GeoPackage binary geometry blobs.
//!
//! A blob consists of an 8 byte header, an optional envelope and a WKB payload:
//!
//! ```text
//! | 'G' 'P' | version | flags | srs_id (4 bytes) | envelope (0..64 bytes) | WKB |
//! ```
//!
//! Bit 0 of `flags` gives the byte order of the header values, bits 1-3 give the envelope kind.

use geo_types::Geometry;
use geozero::wkb::Wkb;
use geozero::ToGeo;

use crate::error::GpkgError;

/// Size of the fixed part of the header.
pub const HEADER_SIZE: usize = 8;

const FLAGS_BYTE: usize = 3;
const ENVELOPE_FLAG_MASK: u8 = 0b111;

/// Returns the size of the envelope in bytes for the given envelope flag value.
///
/// | flag | envelope     | size |
/// |------|--------------|------|
/// | 0    | none         | 0    |
/// | 1    | \[x, y\]     | 32   |
/// | 2    | \[x, y, z\]  | 48   |
/// | 3    | \[x, y, m\]  | 48   |
/// | 4    | \[x, y, z, m\] | 64 |
pub fn envelope_size(flag: u8) -> Result<usize, GpkgError> {
    match flag {
        0 => Ok(0),
        1 => Ok(32),
        2 | 3 => Ok(48),
        4 => Ok(64),
        other => Err(GpkgError::UnsupportedGeometryEnvelope(other)),
    }
}

/// Header values and payload of a geometry blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryBlob<'a> {
    /// Spatial reference system id the geometry is declared in.
    pub srs_id: i32,
    /// Size of the envelope that was skipped.
    pub envelope_size: usize,
    /// WKB payload.
    pub payload: &'a [u8],
}

impl<'a> GeometryBlob<'a> {
    /// Splits the blob into header values and payload.
    pub fn parse(blob: &'a [u8]) -> Result<Self, GpkgError> {
        if blob.len() < HEADER_SIZE {
            return Err(GpkgError::TruncatedGeometry {
                len: blob.len(),
                required: HEADER_SIZE,
            });
        }

        let flags = blob[FLAGS_BYTE];
        let envelope_size = envelope_size((flags >> 1) & ENVELOPE_FLAG_MASK)?;
        let required = HEADER_SIZE + envelope_size;
        if blob.len() < required {
            return Err(GpkgError::TruncatedGeometry {
                len: blob.len(),
                required,
            });
        }

        let srs_bytes = [blob[4], blob[5], blob[6], blob[7]];
        let srs_id = if flags & 1 == 1 {
            i32::from_le_bytes(srs_bytes)
        } else {
            i32::from_be_bytes(srs_bytes)
        };

        Ok(Self {
            srs_id,
            envelope_size,
            payload: &blob[required..],
        })
    }
}

/// Returns the payload of the blob remaining after the header and the envelope.
pub fn geometry_payload(blob: &[u8]) -> Result<&[u8], GpkgError> {
    GeometryBlob::parse(blob).map(|parsed| parsed.payload)
}

/// Decodes the geometry blob into a geometry.
pub fn decode_geometry(blob: &[u8]) -> Result<Geometry<f64>, GpkgError> {
    let payload = geometry_payload(blob)?;
    Ok(Wkb(payload.to_vec()).to_geo()?)
}

#[cfg(test)]
pub(crate) mod tests {
    use assert_matches::assert_matches;
    use geo_types::{Geometry, Point};
    use insta::assert_compact_debug_snapshot;

    use super::*;

    pub(crate) fn wkb_point(x: f64, y: f64) -> Vec<u8> {
        let mut wkb = vec![1u8];
        wkb.extend_from_slice(&1u32.to_le_bytes());
        wkb.extend_from_slice(&x.to_le_bytes());
        wkb.extend_from_slice(&y.to_le_bytes());
        wkb
    }

    pub(crate) fn blob(envelope_flag: u8, srs_id: i32, payload: &[u8]) -> Vec<u8> {
        let mut blob = vec![b'G', b'P', 0, (envelope_flag << 1) | 1];
        blob.extend_from_slice(&srs_id.to_le_bytes());
        let envelope = envelope_size(envelope_flag).unwrap_or(0);
        blob.extend(std::iter::repeat(0u8).take(envelope));
        blob.extend_from_slice(payload);
        blob
    }

    #[test]
    fn envelope_sizes() {
        let sizes: Vec<usize> = (0..=4).map(|flag| envelope_size(flag).unwrap()).collect();
        assert_compact_debug_snapshot!(sizes, @"[0, 32, 48, 48, 64]");
    }

    #[test]
    fn unsupported_envelope_flags() {
        for flag in 5..=7 {
            assert_matches!(
                envelope_size(flag),
                Err(GpkgError::UnsupportedGeometryEnvelope(f)) if f == flag
            );
        }
    }

    #[test]
    fn payload_skips_header_and_envelope() {
        for flag in 0..=4 {
            let blob = blob(flag, 4326, &[1, 2, 3]);
            assert_eq!(geometry_payload(&blob).unwrap(), &[1, 2, 3]);
        }
    }

    #[test]
    fn payload_fails_for_unsupported_flag() {
        let mut blob = blob(0, 4326, &[1, 2, 3]);
        blob[3] = (5 << 1) | 1;
        assert_matches!(
            geometry_payload(&blob),
            Err(GpkgError::UnsupportedGeometryEnvelope(5))
        );
    }

    #[test]
    fn srs_id_honors_byte_order() {
        let little = blob(0, 3857, &[]);
        assert_eq!(GeometryBlob::parse(&little).unwrap().srs_id, 3857);

        let mut big = vec![b'G', b'P', 0, 0];
        big.extend_from_slice(&3857i32.to_be_bytes());
        assert_eq!(GeometryBlob::parse(&big).unwrap().srs_id, 3857);
    }

    #[test]
    fn truncated_blob() {
        assert_matches!(
            geometry_payload(&[b'G', b'P', 0]),
            Err(GpkgError::TruncatedGeometry {
                len: 3,
                required: 8
            })
        );

        let mut blob = blob(1, 4326, &[]);
        blob.truncate(20);
        assert_matches!(
            geometry_payload(&blob),
            Err(GpkgError::TruncatedGeometry {
                len: 20,
                required: 40
            })
        );
    }

    #[test]
    fn decodes_point() {
        let blob = blob(1, 4326, &wkb_point(10.0, 20.0));
        let geometry = decode_geometry(&blob).unwrap();
        assert_eq!(geometry, Geometry::Point(Point::new(10.0, 20.0)));
    }
}
