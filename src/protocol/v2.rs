//! Session-aware framing (V2)
//!
//! ## Wire Format
//! ```text
//! first chunk:
//! ┌─────┬─────────────┬──────────┬────────────┬─────────────────────────┐
//! │ 'H' │ Session (4) │ Type (4) │ Length (4) │ Payload ...             │
//! └─────┴─────────────┴──────────┴────────────┴─────────────────────────┘
//! continuation chunks:
//! ┌─────┬─────────────┬───────────────────────────────────────────────┐
//! │ 'D' │ Session (4) │ Payload ... CRC-32 (4) ... zero padding       │
//! └─────┴─────────────┴───────────────────────────────────────────────┘
//! session control:
//! ┌─────┬─────────────┬──────────────┐
//! │ 'O' │ 0 / id (4)  │ zero padding │   open request / response
//! │ 'C' │ id (4)      │ zero padding │   close request / response
//! └─────┴─────────────┴──────────────┘
//! ```
//!
//! The logical frame `type | length | payload | crc32(payload)` is cut into
//! 59-byte slices, each carried behind a marker and the session id.

use bytes::{BufMut, BytesMut};

use crate::error::{Result, WireError};
use crate::transport::ChunkLink;

use super::chunk::{
    check_message_size, length_field, read_u32_be, Chunk, Reassembly, CHUNK_BODY_SIZE,
};
use super::codec::{ProtocolVersion, RawFrame, ReadMode, WireCodec};

pub const HEADER_MARKER: u8 = b'H';
pub const DATA_MARKER: u8 = b'D';
pub const SESSION_OPEN_MARKER: u8 = b'O';
pub const SESSION_CLOSE_MARKER: u8 = b'C';

/// Session id carried at the start of every chunk body
pub const SESSION_ID_SIZE: usize = 4;

/// Frame bytes per chunk after marker and session id
pub const CHUNK_PAYLOAD_SIZE: usize = CHUNK_BODY_SIZE - SESSION_ID_SIZE;

/// Type (4) + length (4) at the start of the logical frame
pub const FRAME_HEADER_SIZE: usize = 8;

pub const CHECKSUM_SIZE: usize = 4;

/// CRC-32 (zlib/gzip polynomial) of a payload
pub fn checksum(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// Encode a message into V2 chunks under `session_id`
pub fn encode_frame(session_id: u32, message_type: u32, payload: &[u8]) -> Result<Vec<Chunk>> {
    let length = length_field(payload.len())?;

    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    buf.put_u32(message_type);
    buf.put_u32(length);
    buf.put_slice(payload);
    buf.put_u32(checksum(payload));

    let session = session_id.to_be_bytes();
    buf.chunks(CHUNK_PAYLOAD_SIZE)
        .enumerate()
        .map(|(i, part)| {
            let marker = if i == 0 { HEADER_MARKER } else { DATA_MARKER };
            Chunk::build(marker, &[&session[..], part])
        })
        .collect()
}

/// Decode one V2 frame starting at `first`, pulling continuations from `next`
///
/// Verifies markers, that every continuation carries the opening session id,
/// and the CRC-32 trailer.
pub fn decode_frame<F>(first: &Chunk, mut next: F, max_message_size: usize) -> Result<RawFrame>
where
    F: FnMut() -> Result<Chunk>,
{
    first.expect_marker(HEADER_MARKER, "'H'")?;

    let body = first.body();
    let session_id = read_u32_be(body, 0)?;
    let message_type = read_u32_be(body, 4)?;
    let length = read_u32_be(body, 8)? as usize;

    check_message_size(length, max_message_size)?;

    // The trailer is reassembled along with the payload
    let mut frame = Reassembly::new(
        length.saturating_add(CHECKSUM_SIZE),
        &body[SESSION_ID_SIZE + FRAME_HEADER_SIZE..],
    );

    while !frame.is_complete() {
        let chunk = next()?;
        chunk.expect_marker(DATA_MARKER, "'D'")?;

        let next_session = read_u32_be(chunk.body(), 0)?;
        if next_session != session_id {
            tracing::warn!(
                "Continuation chunk for session {} inside frame of session {}",
                next_session,
                session_id
            );
            return Err(WireError::SessionMismatch {
                expected: Some(session_id),
                found: Some(next_session),
            });
        }
        frame.extend(&chunk.body()[SESSION_ID_SIZE..]);
    }

    let mut data = frame.finish()?;
    let trailer = data.split_off(length);
    let expected = read_u32_be(&trailer, 0)?;
    let computed = checksum(&data);
    if expected != computed {
        tracing::warn!("Checksum mismatch on message type {}", message_type);
        return Err(WireError::Checksum { expected, computed });
    }

    Ok(RawFrame {
        session_id: Some(session_id),
        message_type,
        payload: data,
    })
}

/// Session open request: marker and all-zero body
pub fn session_open_request() -> Result<Chunk> {
    Chunk::build(SESSION_OPEN_MARKER, &[])
}

/// Session close request for `session_id`
pub fn session_close_request(session_id: u32) -> Result<Chunk> {
    Chunk::build(SESSION_CLOSE_MARKER, &[&session_id.to_be_bytes()[..]])
}

/// Parse the session id the device assigned in its open response
pub fn parse_session_open(chunk: &Chunk) -> Result<u32> {
    if chunk.marker() != SESSION_OPEN_MARKER {
        return Err(WireError::ProtocolState(format!(
            "expected session open, got marker 0x{:02x}",
            chunk.marker()
        )));
    }
    read_u32_be(chunk.body(), 0)
}

/// Codec for the session-aware format
///
/// Holds the active wire session id; reads and writes are refused while it is
/// unset.
#[derive(Debug, Clone)]
pub struct CodecV2 {
    session_id: Option<u32>,
    max_message_size: usize,
}

impl CodecV2 {
    pub fn new(max_message_size: usize) -> Self {
        Self {
            session_id: None,
            max_message_size,
        }
    }

    /// Codec already bound to a known session (e.g. replaying a capture)
    pub fn with_session(max_message_size: usize, session_id: u32) -> Self {
        Self {
            session_id: Some(session_id),
            max_message_size,
        }
    }

    fn active_session(&self) -> Result<u32> {
        self.session_id
            .ok_or_else(|| WireError::ProtocolState("missing session id for v2 transport".into()))
    }
}

impl WireCodec for CodecV2 {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V2
    }

    fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    fn write_frame(
        &mut self,
        link: &mut ChunkLink,
        message_type: u32,
        payload: &[u8],
    ) -> Result<()> {
        let session_id = self.active_session()?;
        check_message_size(payload.len(), self.max_message_size)?;
        let chunks = encode_frame(session_id, message_type, payload)?;
        tracing::trace!(
            "V2 write: session={} type={} len={} chunks={}",
            session_id,
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
        self.active_session()?;

        let Some(first) = link.next_chunk(mode)? else {
            return Ok(None);
        };

        let frame = decode_frame(&first, || link.read_chunk(), self.max_message_size)?;
        tracing::trace!(
            "V2 read: session={:?} type={} len={}",
            frame.session_id,
            frame.message_type,
            frame.payload.len()
        );
        Ok(Some(frame))
    }

    fn session_open(&mut self, link: &mut ChunkLink) -> Result<()> {
        link.write_chunk(&session_open_request()?)?;
        let response = link.read_chunk()?;
        let session_id = parse_session_open(&response)?;

        tracing::debug!("V2 session {} opened", session_id);
        self.session_id = Some(session_id);
        Ok(())
    }

    fn session_close(&mut self, link: &mut ChunkLink) -> Result<()> {
        let session_id = self.active_session()?;
        link.write_chunk(&session_close_request(session_id)?)?;

        let response = link.read_chunk()?;
        if response.marker() != SESSION_CLOSE_MARKER {
            return Err(WireError::ProtocolState(format!(
                "expected session close, got marker 0x{:02x}",
                response.marker()
            )));
        }

        tracing::debug!("V2 session {} closed", session_id);
        self.session_id = None;
        Ok(())
    }
}
