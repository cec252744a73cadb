//! Binary codec for the dense index artifact
//!
//! Layout before compression (all integers little-endian):
//! `b"PLDX"`, format version `u32`, dimension `u32`, count `u64`,
//! 64 ASCII bytes of chunk fingerprint, then `count * dimension` `f32` values
//! row by row. The whole buffer is zstd-compressed.

use crate::embedding::{FlatL2Index, NearestNeighbor, INDEX_FORMAT_VERSION};

const MAGIC: &[u8; 4] = b"PLDX";
const FINGERPRINT_LEN: usize = 64;
const HEADER_LEN: usize = 4 + 4 + 4 + 8 + FINGERPRINT_LEN;
const COMPRESSION_LEVEL: i32 = 3;

/// Decoded dense artifact
#[derive(Debug, Clone)]
pub struct DenseArtifact {
    pub format_version: u32,
    pub chunk_fingerprint: String,
    pub index: FlatL2Index,
}

pub(crate) fn encode(index: &FlatL2Index, fingerprint: &str) -> std::io::Result<Vec<u8>> {
    if fingerprint.len() != FINGERPRINT_LEN || !fingerprint.is_ascii() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("fingerprint must be {} hex characters", FINGERPRINT_LEN),
        ));
    }

    let mut raw = Vec::with_capacity(HEADER_LEN + index.len() * index.dimension() * 4);
    raw.extend_from_slice(MAGIC);
    raw.extend_from_slice(&INDEX_FORMAT_VERSION.to_le_bytes());
    raw.extend_from_slice(&(index.dimension() as u32).to_le_bytes());
    raw.extend_from_slice(&(index.len() as u64).to_le_bytes());
    raw.extend_from_slice(fingerprint.as_bytes());
    for value in index.raw_values() {
        raw.extend_from_slice(&value.to_le_bytes());
    }

    zstd::encode_all(&raw[..], COMPRESSION_LEVEL)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<DenseArtifact, String> {
    let raw = zstd::decode_all(bytes).map_err(|e| format!("decompression failed: {}", e))?;
    if raw.len() < HEADER_LEN {
        return Err(format!("truncated header ({} bytes)", raw.len()));
    }
    if &raw[0..4] != MAGIC {
        return Err("bad magic".to_string());
    }

    let format_version = u32::from_le_bytes(le_array(&raw[4..8])?);
    if format_version != INDEX_FORMAT_VERSION {
        return Err(format!(
            "unsupported format version {} (expected {})",
            format_version, INDEX_FORMAT_VERSION
        ));
    }

    let dimension = u32::from_le_bytes(le_array(&raw[8..12])?) as usize;
    let count = u64::from_le_bytes(le_array(&raw[12..20])?) as usize;
    let chunk_fingerprint = std::str::from_utf8(&raw[20..HEADER_LEN])
        .map_err(|_| "fingerprint is not ASCII".to_string())?
        .to_string();

    let body = &raw[HEADER_LEN..];
    let expected = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| "vector payload size overflows".to_string())?;
    if body.len() != expected {
        return Err(format!(
            "expected {} bytes of vectors for {}x{}, found {}",
            expected,
            count,
            dimension,
            body.len()
        ));
    }

    let values: Vec<f32> = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    let index = FlatL2Index::from_raw(dimension, count, values).map_err(|e| e.to_string())?;

    Ok(DenseArtifact {
        format_version,
        chunk_fingerprint,
        index,
    })
}

fn le_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], String> {
    bytes
        .try_into()
        .map_err(|_| "malformed header field".to_string())
}
