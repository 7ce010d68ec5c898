//! Chunk link
//!
//! Wraps a transport with chunk-size validation and the blocking wait loop.

use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{Result, WireError};
use crate::protocol::{Chunk, ReadMode};

use super::ChunkTransport;

/// A transport plus the timing policy used to wait on it
pub struct ChunkLink {
    transport: Box<dyn ChunkTransport>,

    /// Length of a single wait for data
    poll_interval: Duration,

    /// Silence after which liveness is probed
    liveness_timeout: Duration,
}

impl ChunkLink {
    pub fn new(transport: Box<dyn ChunkTransport>, config: &Config) -> Self {
        Self {
            transport,
            poll_interval: config.poll_interval(),
            liveness_timeout: config.liveness_timeout(),
        }
    }

    pub fn open(&mut self) -> Result<()> {
        self.transport.open()
    }

    pub fn close(&mut self) -> Result<()> {
        self.transport.close()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn write_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        tracing::trace!("-> {:?}", chunk);
        self.transport.write_chunk(chunk.as_bytes())
    }

    /// Single non-blocking attempt
    pub fn try_read_chunk(&mut self) -> Result<Option<Chunk>> {
        self.transport
            .try_read_chunk()?
            .map(|raw| self.validate(raw))
            .transpose()
    }

    /// Block until a chunk arrives.
    ///
    /// Every `liveness_timeout` of silence the transport is probed; a dead
    /// transport fails with `ConnectionLost`, a live one restarts the timer.
    pub fn read_chunk(&mut self) -> Result<Chunk> {
        let mut started = Instant::now();

        loop {
            if let Some(raw) = self.transport.wait_chunk(self.poll_interval)? {
                return self.validate(raw);
            }

            if started.elapsed() >= self.liveness_timeout {
                if !self.transport.is_connected() {
                    tracing::warn!("No data for {:?} and transport is gone", self.liveness_timeout);
                    return Err(WireError::ConnectionLost("connection failed".into()));
                }
                started = Instant::now();
            }
        }
    }

    pub fn next_chunk(&mut self, mode: ReadMode) -> Result<Option<Chunk>> {
        match mode {
            ReadMode::Poll => self.try_read_chunk(),
            ReadMode::Block => self.read_chunk().map(Some),
        }
    }

    fn validate(&self, raw: Vec<u8>) -> Result<Chunk> {
        let chunk = Chunk::from_slice(&raw)?;
        tracing::trace!("<- {:?}", chunk);
        Ok(chunk)
    }
}
