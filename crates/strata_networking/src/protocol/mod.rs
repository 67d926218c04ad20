//! # Sync Protocol
//!
//! Length-prefixed binary frames carrying chunk and tile state from the
//! simulation to clients. See [`Packet`] for the frame layout.
//!
//! Decoding never trusts the input: lengths are bounded by [`MAX_PAYLOAD`]
//! and checked per packet kind before any payload is read.

mod compression;
mod packets;
mod serialization;

pub use compression::{compress_chunk_payload, decompress_chunk_payload, RAW_CHUNK_PAYLOAD};
pub use packets::{
    decode_stream, encode_stream, ChunkHeaderRecord, ChunkSnapshot, Packet, PacketKind,
    RejectReason, RejectRecord, TileState, TileUpdateRecord,
};
pub use serialization::{FrameReader, FrameWriter};

/// Kind byte plus u32 length.
pub const FRAME_HEADER_SIZE: usize = 5;

/// Largest payload a frame may declare.
pub const MAX_PAYLOAD: usize = 64 * 1024;
