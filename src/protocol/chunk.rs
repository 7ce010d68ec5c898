//! Chunk primitives
//!
//! The fixed 64-byte unit exchanged with the transport, plus the header and
//! reassembly helpers both wire codecs share.

use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::error::{Result, WireError};

/// Size of every unit exchanged with the transport
pub const CHUNK_SIZE: usize = 64;

/// Bytes following the marker byte
pub const CHUNK_BODY_SIZE: usize = CHUNK_SIZE - 1;

/// One 64-byte transport unit: marker byte followed by 63 body bytes
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Chunk([u8; CHUNK_SIZE]);

impl Chunk {
    /// Build a chunk from a marker and body fragments, zero-padding the rest.
    ///
    /// Fails with `Length` if the fragments exceed 63 bytes.
    pub fn build(marker: u8, parts: &[&[u8]]) -> Result<Self> {
        let body_len: usize = parts.iter().map(|p| p.len()).sum();
        if body_len > CHUNK_BODY_SIZE {
            return Err(WireError::Length(format!(
                "chunk body of {} bytes exceeds {}",
                body_len, CHUNK_BODY_SIZE
            )));
        }

        let mut bytes = [0u8; CHUNK_SIZE];
        bytes[0] = marker;
        let mut pos = 1;
        for part in parts {
            bytes[pos..pos + part.len()].copy_from_slice(part);
            pos += part.len();
        }
        Ok(Self(bytes))
    }

    /// Wrap raw transport bytes, which must be exactly 64 bytes long
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; CHUNK_SIZE] = bytes.try_into().map_err(|_| {
            WireError::Length(format!(
                "unexpected chunk size: {} (expected {})",
                bytes.len(),
                CHUNK_SIZE
            ))
        })?;
        Ok(Self(array))
    }

    pub fn marker(&self) -> u8 {
        self.0[0]
    }

    /// The 63 bytes after the marker
    pub fn body(&self) -> &[u8] {
        &self.0[1..]
    }

    pub fn as_bytes(&self) -> &[u8; CHUNK_SIZE] {
        &self.0
    }

    /// Ensure the marker byte matches, else `Framing`
    pub fn expect_marker(&self, expected: u8, name: &'static str) -> Result<()> {
        if self.marker() != expected {
            tracing::warn!(
                "Unexpected chunk marker 0x{:02x}, expected {}",
                self.marker(),
                name
            );
            return Err(WireError::Framing {
                expected: name,
                found: self.marker(),
            });
        }
        Ok(())
    }
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Chunk {
    type Error = WireError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_slice(bytes)
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Chunk")
            .field(&(self.marker() as char))
            .field(&hex::encode(self.body()))
            .finish()
    }
}

// =============================================================================
// Header helpers
// =============================================================================

/// Read a big-endian u16 at `offset`, else `HeaderParse`
pub fn read_u16_be(bytes: &[u8], offset: usize) -> Result<u16> {
    bytes
        .get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| truncated_header(bytes.len(), offset + 2))
}

/// Read a big-endian u32 at `offset`, else `HeaderParse`
pub fn read_u32_be(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| truncated_header(bytes.len(), offset + 4))
}

fn truncated_header(available: usize, needed: usize) -> WireError {
    WireError::HeaderParse(format!(
        "need {} header bytes, got {}",
        needed, available
    ))
}

/// Convert a payload length to the 32-bit length field
pub(crate) fn length_field(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        WireError::Length(format!("payload of {} bytes does not fit a u32 length", len))
    })
}

/// Reject a declared or outgoing payload length above the configured limit
pub(crate) fn check_message_size(len: usize, max_message_size: usize) -> Result<()> {
    if len > max_message_size {
        return Err(WireError::Length(format!(
            "message length {} exceeds limit {}",
            len, max_message_size
        )));
    }
    Ok(())
}

// =============================================================================
// Reassembly
// =============================================================================

/// Accumulates chunk bodies until a declared number of bytes has arrived
pub(crate) struct Reassembly {
    buf: BytesMut,
    target: usize,
}

impl Reassembly {
    /// Start a frame expecting `target` bytes; the caller has already checked
    /// the declared length against the limit
    pub fn new(target: usize, first: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(target.max(first.len()));
        buf.extend_from_slice(first);
        Self { buf, target }
    }

    pub fn is_complete(&self) -> bool {
        self.buf.len() >= self.target
    }

    pub fn extend(&mut self, fragment: &[u8]) {
        self.buf.extend_from_slice(fragment);
    }

    /// Strip the chunk padding and hand back exactly `target` bytes
    pub fn finish(mut self) -> Result<Bytes> {
        self.buf.truncate(self.target);
        if self.buf.len() != self.target {
            return Err(WireError::Length(format!(
                "reassembled {} bytes, declared {}",
                self.buf.len(),
                self.target
            )));
        }
        Ok(self.buf.freeze())
    }
}
