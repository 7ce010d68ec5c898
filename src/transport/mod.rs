//! Transport Module
//!
//! The raw 64-byte chunk layer underneath the wire codecs.
//!
//! ## Responsibilities
//! - `ChunkTransport`: what a device adapter must provide (open/close, chunk
//!   write, non-blocking chunk read, liveness probe)
//! - `ChunkLink`: length validation and the blocking read loop with a
//!   liveness fallback
//! - Shipped adapters: in-memory pair, HID report devices, capture replay

mod capture;
mod link;
mod memory;
mod report;

pub use capture::{parse_capture, write_capture, CaptureRecord, CaptureTransport, Direction};
pub use link::ChunkLink;
pub use memory::{MemoryDevice, MemoryTransport};
pub use report::{ReportDevice, ReportFormat, ReportTransport};

use std::time::Duration;

use crate::error::Result;

/// A device handle exchanging fixed 64-byte chunks
///
/// Implementations are not expected to understand chunk contents.
pub trait ChunkTransport {
    /// Establish the underlying handle. Calling it twice is a no-op.
    fn open(&mut self) -> Result<()>;

    /// Release the underlying handle. Calling it twice is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Send one chunk; anything but 64 bytes fails with `Length`
    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()>;

    /// Return the next pending unit without blocking
    fn try_read_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Wait up to `timeout` for the next unit
    fn wait_chunk(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        if let Some(chunk) = self.try_read_chunk()? {
            return Ok(Some(chunk));
        }
        std::thread::sleep(timeout);
        Ok(None)
    }

    /// Liveness probe
    fn is_connected(&self) -> bool;
}
