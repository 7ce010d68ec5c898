//! Protocol Coordinator
//!
//! Version-agnostic front end over one chunk link.
//!
//! ## Responsibilities
//! - Own the re-entrant session lock and trigger wire handshakes only on the
//!   0 → 1 and 1 → 0 depth transitions
//! - Resolve messages through the registry and hand bytes to the codec
//! - Reject frames whose session differs from the bound session
//!
//! ## Concurrency
//! One coordinator per transport channel, used from one thread. Main and
//! debug links of a device each get their own coordinator and session lock.

use crate::config::Config;
use crate::error::{Result, WireError};
use crate::protocol::{ProtocolVersion, RawFrame, ReadMode, WireCodec};
use crate::registry::MessageRegistry;
use crate::transport::{ChunkLink, ChunkTransport};

/// Drives one wire codec over one chunk link
pub struct ProtocolCoordinator<R: MessageRegistry> {
    link: ChunkLink,
    codec: Box<dyn WireCodec>,
    registry: R,

    /// Session lock nesting depth; never negative
    depth: usize,
}

impl<R: MessageRegistry> ProtocolCoordinator<R> {
    /// Bind a codec to a link and open the link
    pub fn new(mut link: ChunkLink, codec: Box<dyn WireCodec>, registry: R) -> Result<Self> {
        link.open()?;
        tracing::debug!("Protocol coordinator ready ({})", codec.version());

        Ok(Self {
            link,
            codec,
            registry,
            depth: 0,
        })
    }

    /// Build link and codec from a transport and a protocol version
    pub fn with_version<T>(
        transport: T,
        version: ProtocolVersion,
        registry: R,
        config: &Config,
    ) -> Result<Self>
    where
        T: ChunkTransport + 'static,
    {
        let link = ChunkLink::new(Box::new(transport), config);
        Self::new(link, version.codec(config), registry)
    }

    pub fn version(&self) -> ProtocolVersion {
        self.codec.version()
    }

    /// Current session lock depth
    pub fn session_depth(&self) -> usize {
        self.depth
    }

    /// Wire session currently bound, if any
    pub fn session_id(&self) -> Option<u32> {
        self.codec.session_id()
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Take the session lock for a multi-step conversation.
    ///
    /// The first holder performs the wire open handshake. If it fails the
    /// depth is left unchanged.
    pub fn session_begin(&mut self) -> Result<()> {
        if self.depth == 0 {
            self.codec.session_open(&mut self.link)?;
        }
        self.depth += 1;
        tracing::debug!("Session lock depth {}", self.depth);
        Ok(())
    }

    /// Release the session lock; the last holder performs the close handshake
    pub fn session_end(&mut self) -> Result<()> {
        if self.depth == 0 {
            tracing::warn!("session_end called without an open session");
            return Ok(());
        }

        self.depth -= 1;
        tracing::debug!("Session lock depth {}", self.depth);
        if self.depth == 0 {
            self.codec.session_close(&mut self.link)?;
        }
        Ok(())
    }

    /// Send one message
    pub fn write(&mut self, message: &R::Message) -> Result<()> {
        let message_type = self.registry.type_of(message)?;
        let payload = self.registry.serialize(message)?;
        self.codec.write_frame(&mut self.link, message_type, &payload)
    }

    /// Single attempt: `None` if the device has nothing pending.
    ///
    /// Once the first chunk is there the rest of the frame is awaited.
    pub fn read(&mut self) -> Result<Option<R::Message>> {
        match self.codec.read_frame(&mut self.link, ReadMode::Poll)? {
            Some(frame) => self.parse_frame(frame).map(Some),
            None => Ok(None),
        }
    }

    /// Wait for the next message. There is no timeout at this layer.
    pub fn read_blocking(&mut self) -> Result<R::Message> {
        loop {
            if let Some(frame) = self.codec.read_frame(&mut self.link, ReadMode::Block)? {
                return self.parse_frame(frame);
            }
        }
    }

    /// Write a request and wait for its response
    pub fn call(&mut self, message: &R::Message) -> Result<R::Message> {
        self.write(message)?;
        self.read_blocking()
    }

    pub fn close(&mut self) -> Result<()> {
        self.link.close()
    }

    fn parse_frame(&self, frame: RawFrame) -> Result<R::Message> {
        let bound = self.codec.session_id();
        if frame.session_id != bound {
            tracing::warn!(
                "Frame for session {:?} while bound to {:?}",
                frame.session_id,
                bound
            );
            return Err(WireError::SessionMismatch {
                expected: bound,
                found: frame.session_id,
            });
        }

        self.registry.deserialize(frame.message_type, frame.payload)
    }
}
