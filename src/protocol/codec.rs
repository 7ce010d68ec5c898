//! Wire codec capability
//!
//! The coordinator drives one of the two framing formats through this trait
//! and never sees the concrete codec type.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::config::Config;
use crate::error::{Result, WireError};
use crate::transport::ChunkLink;

use super::{CodecV1, CodecV2};

/// One reassembled message as it came off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Session the frame was sent under; `None` for the legacy format
    pub session_id: Option<u32>,

    pub message_type: u32,

    /// Exactly `length` bytes, padding and checksum already stripped
    pub payload: Bytes,
}

/// How to wait for the first chunk of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Single non-blocking attempt; no data means no frame
    Poll,
    /// Wait until the first chunk arrives
    Block,
}

/// A framing format that turns messages into chunks and back
pub trait WireCodec {
    fn version(&self) -> ProtocolVersion;

    /// Currently bound wire session, if any
    fn session_id(&self) -> Option<u32>;

    /// Split one message into chunks and send them
    fn write_frame(&mut self, link: &mut ChunkLink, message_type: u32, payload: &[u8])
        -> Result<()>;

    /// Read one complete frame, following every continuation chunk.
    ///
    /// Returns `Ok(None)` only in `ReadMode::Poll` when no chunk is pending.
    fn read_frame(&mut self, link: &mut ChunkLink, mode: ReadMode) -> Result<Option<RawFrame>>;

    /// Wire-level session open handshake; formats without sessions ignore it
    fn session_open(&mut self, _link: &mut ChunkLink) -> Result<()> {
        Ok(())
    }

    /// Wire-level session close handshake
    fn session_close(&mut self, _link: &mut ChunkLink) -> Result<()> {
        Ok(())
    }
}

/// Framing format spoken by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolVersion {
    /// Legacy stateless framing (`?##` header, no checksum)
    V1,
    /// Session-aware framing with CRC-32 trailer
    V2,
}

impl ProtocolVersion {
    /// Build a fresh codec for this format
    pub fn codec(self, config: &Config) -> Box<dyn WireCodec> {
        match self {
            ProtocolVersion::V1 => Box::new(CodecV1::new(config.max_message_size)),
            ProtocolVersion::V2 => Box::new(CodecV2::new(config.max_message_size)),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V1 => write!(f, "v1"),
            ProtocolVersion::V2 => write!(f, "v2"),
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(ProtocolVersion::V1),
            "2" | "v2" => Ok(ProtocolVersion::V2),
            other => Err(WireError::ProtocolState(format!(
                "unknown protocol version: {}",
                other
            ))),
        }
    }
}
