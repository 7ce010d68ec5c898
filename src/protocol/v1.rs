//! Legacy framing (V1)
//!
//! ## Wire Format
//! ```text
//! first chunk:
//! ┌─────┬─────┬──────────┬────────────┬──────────────────────────┐
//! │ '?' │ ##  │ Type (2) │ Length (4) │ Payload ... zero padding │
//! └─────┴─────┴──────────┴────────────┴──────────────────────────┘
//! continuation chunks:
//! ┌─────┬──────────────────────────────────────────────────────────┐
//! │ '?' │ Payload (63) ... zero padding on the last chunk         │
//! └─────┴──────────────────────────────────────────────────────────┘
//! ```
//!
//! No sessions, no checksum. Integers are big-endian.

use bytes::{BufMut, BytesMut};

use crate::error::{Result, WireError};
use crate::transport::ChunkLink;

use super::chunk::{
    check_message_size, length_field, read_u16_be, read_u32_be, Chunk, Reassembly, CHUNK_BODY_SIZE,
};
use super::codec::{ProtocolVersion, RawFrame, ReadMode, WireCodec};

/// Report marker leading every V1 chunk
pub const REPORT_MARKER: u8 = b'?';

/// Magic preceding the header inside the first chunk
pub const FRAME_MAGIC: &[u8; 2] = b"##";

/// Marker and magic as they appear at the start of a header chunk
const HEADER_MAGIC: &[u8; 3] = b"?##";

/// Magic + type (2) + length (4)
pub const HEADER_SIZE: usize = 2 + 2 + 4;

/// Encode a message into V1 chunks
///
/// Fails with `InvalidMessageType` if the type id does not fit in 16 bits.
pub fn encode_frame(message_type: u32, payload: &[u8]) -> Result<Vec<Chunk>> {
    let message_type =
        u16::try_from(message_type).map_err(|_| WireError::InvalidMessageType(message_type))?;
    let length = length_field(payload.len())?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_slice(FRAME_MAGIC);
    buf.put_u16(message_type);
    buf.put_u32(length);
    buf.put_slice(payload);

    buf.chunks(CHUNK_BODY_SIZE)
        .map(|part| Chunk::build(REPORT_MARKER, &[part]))
        .collect()
}

/// Decode one V1 frame starting at `first`, pulling continuations from `next`
pub fn decode_frame<F>(first: &Chunk, mut next: F, max_message_size: usize) -> Result<RawFrame>
where
    F: FnMut() -> Result<Chunk>,
{
    let bytes = first.as_bytes();
    if let Some((&found, _)) = bytes.iter().zip(HEADER_MAGIC).find(|(got, want)| got != want) {
        tracing::warn!("Unexpected magic characters in V1 header chunk");
        return Err(WireError::Framing {
            expected: "'?##'",
            found,
        });
    }

    let header = &bytes[3..];
    let message_type = read_u16_be(header, 0)?;
    let length = read_u32_be(header, 2)? as usize;

    check_message_size(length, max_message_size)?;

    let mut frame = Reassembly::new(length, &header[6..]);
    while !frame.is_complete() {
        let chunk = next()?;
        chunk.expect_marker(REPORT_MARKER, "'?'")?;
        frame.extend(chunk.body());
    }

    Ok(RawFrame {
        session_id: None,
        message_type: u32::from(message_type),
        payload: frame.finish()?,
    })
}

/// Stateless codec for the legacy format
#[derive(Debug, Clone)]
pub struct CodecV1 {
    max_message_size: usize,
}

impl CodecV1 {
    pub fn new(max_message_size: usize) -> Self {
        Self { max_message_size }
    }
}

impl WireCodec for CodecV1 {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V1
    }

    fn session_id(&self) -> Option<u32> {
        None
    }

    fn write_frame(
        &mut self,
        link: &mut ChunkLink,
        message_type: u32,
        payload: &[u8],
    ) -> Result<()> {
        check_message_size(payload.len(), self.max_message_size)?;
        let chunks = encode_frame(message_type, payload)?;
        tracing::trace!(
            "V1 write: type={} len={} chunks={}",
            message_type,
            payload.len(),
            chunks.len()
        );
        for chunk in &chunks {
            link.write_chunk(chunk)?;
        }
        Ok(())
    }

    fn read_frame(&mut self, link: &mut ChunkLink, mode: ReadMode) -> Result<Option<RawFrame>> {
        let Some(first) = link.next_chunk(mode)? else {
            return Ok(None);
        };

        let frame = decode_frame(&first, || link.read_chunk(), self.max_message_size)?;
        tracing::trace!(
            "V1 read: type={} len={}",
            frame.message_type,
            frame.payload.len()
        );
        Ok(Some(frame))
    }
}
