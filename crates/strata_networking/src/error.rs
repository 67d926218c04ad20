//! # Networking Error Types
//!
//! Decode failures for untrusted bytes, and session setup/tick failures.

use strata_core::EcsError;
use strata_procedural::WorldError;
use thiserror::Error;

/// Errors decoding a packet frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer ended before the structure did.
    #[error("truncated frame: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        available: usize,
    },

    /// First byte is not a known packet kind.
    #[error("unknown packet kind {0}")]
    UnknownKind(u8),

    /// Declared payload exceeds the frame limit.
    #[error("payload of {0} bytes exceeds the frame limit")]
    PayloadTooLarge(usize),

    /// Payload size does not match the packet kind.
    #[error("packet kind {kind} expects {expected} payload bytes, got {actual}")]
    PayloadLength {
        /// Packet kind byte.
        kind: u8,
        /// Expected size.
        expected: usize,
        /// Declared size.
        actual: usize,
    },

    /// A tile kind byte is out of range.
    #[error("invalid tile kind {0}")]
    InvalidTileKind(u8),

    /// A rejection reason byte is out of range.
    #[error("unknown rejection reason {0}")]
    UnknownRejectReason(u8),

    /// Chunk snapshot declares the wrong uncompressed size.
    #[error("chunk snapshot expands to {actual} bytes, expected {expected}")]
    SnapshotSize {
        /// Expected uncompressed size.
        expected: usize,
        /// Declared or produced size.
        actual: usize,
    },

    /// LZ4 block failed to decompress.
    #[error("chunk snapshot decompression failed: {0}")]
    Decompress(String),
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that stop a session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// World setup or streaming failed.
    #[error(transparent)]
    World(#[from] WorldError),

    /// A registry contract was violated.
    #[error(transparent)]
    Ecs(#[from] EcsError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
