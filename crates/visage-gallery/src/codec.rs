//! Binary index format and JSON metadata format.
//!
//! Index layout (all integers and floats little-endian):
//!
//! | offset | size        | field                      |
//! |--------|-------------|----------------------------|
//! | 0      | 4           | magic `VGIX`               |
//! | 4      | 4           | format version (`u32`, 1)  |
//! | 8      | 4           | dimension (`u32`)          |
//! | 12     | 8           | entry count (`u64`)        |
//! | 20     | 4 * d * n   | row-major `f32` data       |
//!
//! Metadata is a JSON array of label strings, position `i` naming index row `i`.

use visage_core::{Error, Result};

use crate::store::FlatIndex;

pub const INDEX_MAGIC: &[u8; 4] = b"VGIX";
pub const INDEX_FORMAT_VERSION: u32 = 1;
pub const INDEX_HEADER_LEN: usize = 20;

/// Serialize an index.
pub fn encode_index(index: &FlatIndex) -> Vec<u8> {
    let raw = index.as_raw();
    let mut out = Vec::with_capacity(INDEX_HEADER_LEN + raw.len() * 4);
    out.extend_from_slice(INDEX_MAGIC);
    out.extend_from_slice(&INDEX_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(index.dimension() as u32).to_le_bytes());
    out.extend_from_slice(&(index.len() as u64).to_le_bytes());
    for value in raw {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Parse an index, requiring it to hold vectors of `expected_dimension`.
pub fn decode_index(bytes: &[u8], expected_dimension: usize) -> Result<FlatIndex> {
    if bytes.len() < INDEX_HEADER_LEN {
        return Err(Error::Codec(format!(
            "index is {} bytes, shorter than its {}-byte header",
            bytes.len(),
            INDEX_HEADER_LEN
        )));
    }
    if &bytes[0..4] != INDEX_MAGIC {
        return Err(Error::Codec("index has wrong magic bytes".to_string()));
    }

    let version = read_u32(&bytes[4..8]);
    if version != INDEX_FORMAT_VERSION {
        return Err(Error::Codec(format!(
            "unsupported index format version {}",
            version
        )));
    }

    let dimension = read_u32(&bytes[8..12]) as usize;
    if dimension != expected_dimension {
        return Err(Error::Codec(format!(
            "index dimension {} does not match expected {}",
            dimension, expected_dimension
        )));
    }

    let count = read_u64(&bytes[12..20]);
    let expected_len = usize::try_from(count)
        .ok()
        .and_then(|n| n.checked_mul(dimension))
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(INDEX_HEADER_LEN))
        .ok_or_else(|| Error::Codec(format!("index entry count {} overflows", count)))?;
    if bytes.len() != expected_len {
        return Err(Error::Codec(format!(
            "index declares {} entries ({} bytes) but file has {} bytes",
            count,
            expected_len,
            bytes.len()
        )));
    }

    let data: Vec<f32> = bytes[INDEX_HEADER_LEN..]
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    if data.iter().any(|v| !v.is_finite()) {
        return Err(Error::Codec("index contains non-finite values".to_string()));
    }

    FlatIndex::from_rows(dimension, data).map_err(|e| Error::Codec(e.to_string()))
}

/// Serialize the label list.
pub fn encode_metadata(labels: &[String]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(labels)?)
}

/// Parse the label list.
pub fn decode_metadata(bytes: &[u8]) -> Result<Vec<String>> {
    serde_json::from_slice(bytes).map_err(|e| Error::Codec(format!("invalid metadata: {}", e)))
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> FlatIndex {
        FlatIndex::from_rows(3, vec![1.0, 0.0, 0.0, 0.0, 0.6, 0.8]).unwrap()
    }

    #[test]
    fn test_encode_layout() {
        let bytes = encode_index(&sample_index());
        assert_eq!(&bytes[0..4], b"VGIX");
        assert_eq!(read_u32(&bytes[4..8]), 1);
        assert_eq!(read_u32(&bytes[8..12]), 3);
        assert_eq!(read_u64(&bytes[12..20]), 2);
        assert_eq!(bytes.len(), INDEX_HEADER_LEN + 6 * 4);
    }

    #[test]
    fn test_decode_restores_rows() {
        let index = sample_index();
        let decoded = decode_index(&encode_index(&index), 3).unwrap();
        assert_eq!(decoded, index);
    }

    #[test]
    fn test_empty_index_is_header_only() {
        let bytes = encode_index(&FlatIndex::new(512));
        assert_eq!(bytes.len(), INDEX_HEADER_LEN);
        let decoded = decode_index(&bytes, 512).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.dimension(), 512);
    }

    #[test]
    fn test_decode_rejects_wrong_dimension() {
        let err = decode_index(&encode_index(&sample_index()), 512).unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }

    #[test]
    fn test_decode_rejects_truncated_data() {
        let mut bytes = encode_index(&sample_index());
        bytes.pop();
        assert!(decode_index(&bytes, 3).is_err());
        assert!(decode_index(&bytes[..10], 3).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_magic_and_version() {
        let mut bytes = encode_index(&sample_index());
        bytes[0] = b'X';
        assert!(decode_index(&bytes, 3).is_err());

        let mut bytes = encode_index(&sample_index());
        bytes[4..8].copy_from_slice(&7u32.to_le_bytes());
        let err = decode_index(&bytes, 3).unwrap_err();
        assert!(err.to_string().contains("version 7"));
    }

    #[test]
    fn test_decode_rejects_absurd_count() {
        let mut bytes = encode_index(&sample_index());
        bytes[12..20].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(decode_index(&bytes, 3).is_err());
    }

    #[test]
    fn test_decode_rejects_nan() {
        let index = FlatIndex::from_rows(2, vec![f32::NAN, 0.0]).unwrap();
        assert!(decode_index(&encode_index(&index), 2).is_err());
    }

    #[test]
    fn test_metadata_is_json_array() {
        let labels = vec!["alice".to_string(), "bob".to_string()];
        let bytes = encode_metadata(&labels).unwrap();
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), r#"["alice","bob"]"#);
        assert_eq!(decode_metadata(&bytes).unwrap(), labels);
    }

    #[test]
    fn test_metadata_rejects_non_array() {
        assert!(decode_metadata(br#"{"labels": []}"#).is_err());
        assert!(decode_metadata(b"not json").is_err());
        assert!(decode_metadata(b"[1, 2]").is_err());
    }
}
