//! # Frame Serialization
//!
//! Little-endian primitive writers and bounds-checked readers.
//!
//! Pod records go through `bytemuck` as raw bytes; every record is
//! `#[repr(C)]` without padding, so the layout is fixed per target
//! endianness (little-endian on every supported target).

use bytemuck::{bytes_of, Pod};

use crate::error::{ProtocolError, ProtocolResult};

/// Appends primitives to a growable buffer.
#[derive(Debug, Default)]
pub struct FrameWriter {
    buffer: Vec<u8>,
}

impl FrameWriter {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Creates a writer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Writes a u32 in little-endian format.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a u64 in little-endian format.
    #[inline]
    pub fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes a Pod record directly.
    #[inline]
    pub fn write_pod<T: Pod>(&mut self, value: &T) {
        self.buffer.extend_from_slice(bytes_of(value));
    }

    /// Overwrites four bytes at `offset` with a little-endian u32.
    ///
    /// Used to back-patch a length prefix once the payload is known.
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        if let Some(slot) = self.buffer.get_mut(offset..offset + 4) {
            slot.copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Finishes writing.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// Written bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }
}

/// Reads primitives from a borrowed buffer.
pub struct FrameReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> FrameReader<'a> {
    /// Creates a reader over `buffer`.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Bytes not yet consumed.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Bytes consumed so far.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Consumes `len` bytes.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Truncated`] if fewer remain.
    pub fn read_bytes(&mut self, len: usize) -> ProtocolResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(ProtocolError::Truncated {
                needed: len,
                available: self.remaining(),
            });
        }
        let bytes = &self.buffer[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    /// Reads a single byte.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Truncated`] at end of buffer.
    pub fn read_u8(&mut self) -> ProtocolResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads a little-endian u32.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Truncated`] if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> ProtocolResult<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    /// Reads a little-endian u64.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Truncated`] if fewer than 8 bytes remain.
    pub fn read_u64(&mut self) -> ProtocolResult<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.read_bytes(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    /// Reads a Pod record (unaligned).
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Truncated`] if the record does not fit.
    pub fn read_pod<T: Pod>(&mut self) -> ProtocolResult<T> {
        let bytes = self.read_bytes(std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }
}
