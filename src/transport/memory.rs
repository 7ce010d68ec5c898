//! In-memory transport pair
//!
//! Host and device ends joined by two unbounded channels. The device end is
//! driven by hand to emulate hardware in tests and demos.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::error::{Result, WireError};
use crate::protocol::{Chunk, CHUNK_SIZE};

use super::ChunkTransport;

/// State visible to both ends
#[derive(Debug, Default)]
struct PipeState {
    connected: bool,
    open: bool,
    open_count: usize,
}

/// Host end, handed to a `ChunkLink`
pub struct MemoryTransport {
    to_device: Sender<Vec<u8>>,
    from_device: Receiver<Vec<u8>>,
    state: Arc<Mutex<PipeState>>,
}

/// Device end, kept by the test or emulator
pub struct MemoryDevice {
    to_host: Sender<Vec<u8>>,
    from_host: Receiver<Vec<u8>>,
    state: Arc<Mutex<PipeState>>,
}

impl MemoryTransport {
    /// Create a connected host/device pair
    pub fn pair() -> (MemoryTransport, MemoryDevice) {
        let (to_device, from_host) = channel::unbounded();
        let (to_host, from_device) = channel::unbounded();
        let state = Arc::new(Mutex::new(PipeState {
            connected: true,
            ..PipeState::default()
        }));

        let host = MemoryTransport {
            to_device,
            from_device,
            state: Arc::clone(&state),
        };
        let device = MemoryDevice {
            to_host,
            from_host,
            state,
        };
        (host, device)
    }

    fn lost() -> WireError {
        WireError::ConnectionLost("memory device dropped".into())
    }
}

impl ChunkTransport for MemoryTransport {
    fn open(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.open {
            state.open = true;
            state.open_count += 1;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state.lock().open = false;
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        if chunk.len() != CHUNK_SIZE {
            return Err(WireError::Length(format!(
                "unexpected data length: {}",
                chunk.len()
            )));
        }
        if !self.state.lock().connected {
            return Err(Self::lost());
        }
        self.to_device.send(chunk.to_vec()).map_err(|_| Self::lost())
    }

    fn try_read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.from_device.try_recv() {
            Ok(chunk) => Ok(Some(chunk)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Self::lost()),
        }
    }

    fn wait_chunk(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        match self.from_device.recv_timeout(timeout) {
            Ok(chunk) => Ok(Some(chunk)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Self::lost()),
        }
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }
}

impl MemoryDevice {
    /// Queue a chunk for the host
    pub fn send(&self, chunk: &Chunk) {
        self.send_raw(chunk.as_bytes().to_vec());
    }

    pub fn send_all<'a>(&self, chunks: impl IntoIterator<Item = &'a Chunk>) {
        for chunk in chunks {
            self.send(chunk);
        }
    }

    /// Queue arbitrary bytes, including wrongly sized reports
    pub fn send_raw(&self, bytes: Vec<u8>) {
        // The host end may already be gone; nothing to deliver to then
        let _ = self.to_host.send(bytes);
    }

    /// Next chunk written by the host, if any
    pub fn recv(&self) -> Option<Chunk> {
        self.from_host
            .try_recv()
            .ok()
            .and_then(|raw| Chunk::from_slice(&raw).ok())
    }

    /// Wait up to `timeout` for the host to write a chunk
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Chunk> {
        self.from_host
            .recv_timeout(timeout)
            .ok()
            .and_then(|raw| Chunk::from_slice(&raw).ok())
    }

    /// Drain everything the host has written so far
    pub fn drain(&self) -> Vec<Chunk> {
        std::iter::from_fn(|| self.recv()).collect()
    }

    /// Simulate unplugging: the host's liveness probe starts failing
    pub fn disconnect(&self) {
        self.state.lock().connected = false;
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// How many times the host opened its end
    pub fn open_count(&self) -> usize {
        self.state.lock().open_count
    }
}

impl Drop for MemoryDevice {
    fn drop(&mut self) {
        self.state.lock().connected = false;
    }
}
