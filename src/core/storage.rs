//! Opaque snapshots of a whole array.
//!
//! A snapshot carries everything a session needs to resume: geometry,
//! generation, notes, and every neuron with its synapses. Session-scoped
//! state (the undo log, the module registry, the fire counters, and the
//! phase scratch buffer) is deliberately not persisted and comes back
//! empty.
//!
//! Format: 8-byte magic, `u32` version, `u32` uncompressed length, then the
//! LZ4-compressed serde_json image.

use std::io;
use std::path::Path;

use crate::array::NeuronArray;
use crate::error::GraphError;

pub const MAGIC: &[u8; 8] = b"NGRAPH01";
pub const VERSION_V1: u32 = 1;
pub const VERSION_CURRENT: u32 = VERSION_V1;

const HEADER_LEN: usize = 8 + 4 + 4;

fn compress_lz4(input: &[u8]) -> Vec<u8> {
    lz4_flex::compress(input)
}

fn decompress_lz4(input: &[u8], expected_size: usize) -> Result<Vec<u8>, GraphError> {
    // Strict format: raw LZ4 block with external expected size.
    lz4_flex::decompress(input, expected_size)
        .map_err(|_| GraphError::Snapshot("lz4 decompression failed".into()))
}

/// Serialize an array into a framed, compressed snapshot.
pub fn snapshot_to_bytes(array: &NeuronArray) -> Result<Vec<u8>, GraphError> {
    let image = serde_json::to_vec(array)
        .map_err(|e| GraphError::Snapshot(format!("encode failed: {e}")))?;
    let compressed = compress_lz4(&image);

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION_CURRENT.to_le_bytes());
    let len = u32::try_from(image.len())
        .map_err(|_| GraphError::Snapshot("image too large".into()))?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Restore an array from a snapshot produced by [`snapshot_to_bytes`].
///
/// The restored array is freshly runnable: scratch state is rebuilt and the
/// geometry is re-validated, so a corrupted image is rejected rather than
/// faulting later.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<NeuronArray, GraphError> {
    if bytes.len() < HEADER_LEN {
        return Err(GraphError::Snapshot("truncated snapshot".into()));
    }
    let (header, body) = bytes.split_at(HEADER_LEN);
    if &header[0..8] != MAGIC {
        return Err(GraphError::Snapshot("bad magic".into()));
    }
    let version = u32::from_le_bytes(header[8..12].try_into().expect("fixed-width slice"));
    if version != VERSION_CURRENT {
        return Err(GraphError::Snapshot(format!(
            "unsupported snapshot version {version}"
        )));
    }
    let uncompressed_len =
        u32::from_le_bytes(header[12..16].try_into().expect("fixed-width slice")) as usize;

    let image = decompress_lz4(body, uncompressed_len)?;
    let mut array: NeuronArray = serde_json::from_slice(&image)
        .map_err(|e| GraphError::Snapshot(format!("decode failed: {e}")))?;
    array.rebuild_runtime_state()?;
    Ok(array)
}

pub fn save_to_file(array: &NeuronArray, path: impl AsRef<Path>) -> Result<(), GraphError> {
    let bytes = snapshot_to_bytes(array)?;
    std::fs::write(path, bytes).map_err(|e: io::Error| GraphError::Snapshot(format!("write: {e}")))
}

pub fn load_from_file(path: impl AsRef<Path>) -> Result<NeuronArray, GraphError> {
    let bytes = std::fs::read(path)
        .map_err(|e: io::Error| GraphError::Snapshot(format!("read: {e}")))?;
    snapshot_from_bytes(&bytes)
}
