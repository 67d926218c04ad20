//! # Chunk Payload Compression
//!
//! Chunk snapshots are two planes of one byte per tile (terrain kind, then
//! flags) compressed as a single LZ4 block with a size prefix. Terrain is
//! highly repetitive, so a 2 KiB plane pair usually shrinks to a few
//! hundred bytes.

use strata_procedural::TILES_PER_CHUNK;

use crate::error::{ProtocolError, ProtocolResult};

/// Uncompressed size of a chunk payload.
pub const RAW_CHUNK_PAYLOAD: usize = TILES_PER_CHUNK * 2;

/// Compresses a raw chunk payload.
#[must_use]
pub fn compress_chunk_payload(raw: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(raw)
}

/// Decompresses a chunk payload, checking the size prefix before
/// allocating.
///
/// # Errors
///
/// [`ProtocolError::SnapshotSize`] for a wrong size prefix,
/// [`ProtocolError::Decompress`] for a corrupt block.
pub fn decompress_chunk_payload(compressed: &[u8]) -> ProtocolResult<Vec<u8>> {
    let Some(prefix) = compressed.get(..4) else {
        return Err(ProtocolError::Truncated {
            needed: 4,
            available: compressed.len(),
        });
    };
    let declared = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if declared != RAW_CHUNK_PAYLOAD {
        return Err(ProtocolError::SnapshotSize {
            expected: RAW_CHUNK_PAYLOAD,
            actual: declared,
        });
    }

    let raw = lz4_flex::decompress_size_prepended(compressed)
        .map_err(|err| ProtocolError::Decompress(err.to_string()))?;
    if raw.len() != RAW_CHUNK_PAYLOAD {
        return Err(ProtocolError::SnapshotSize {
            expected: RAW_CHUNK_PAYLOAD,
            actual: raw.len(),
        });
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_payload_compresses() {
        let raw = vec![2u8; RAW_CHUNK_PAYLOAD];
        let compressed = compress_chunk_payload(&raw);
        assert!(compressed.len() < RAW_CHUNK_PAYLOAD / 8);
        assert_eq!(decompress_chunk_payload(&compressed).unwrap(), raw);
    }

    #[test]
    fn test_wrong_size_prefix_rejected() {
        let compressed = compress_chunk_payload(&[1u8; 16]);
        assert_eq!(
            decompress_chunk_payload(&compressed),
            Err(ProtocolError::SnapshotSize {
                expected: RAW_CHUNK_PAYLOAD,
                actual: 16
            })
        );
    }

    #[test]
    fn test_corrupt_block_rejected() {
        let mut compressed = compress_chunk_payload(&vec![3u8; RAW_CHUNK_PAYLOAD]);
        compressed.truncate(6);
        assert!(decompress_chunk_payload(&compressed).is_err());
        assert!(matches!(
            decompress_chunk_payload(&[0, 1]),
            Err(ProtocolError::Truncated { .. })
        ));
    }
}
