//! Capture files
//!
//! Text captures of a chunk conversation, one chunk per line:
//!
//! ```text
//! # comment
//! > 3f2323...   host -> device
//! < 3f2323...   device -> host
//! 3f2323...     device -> host (no prefix)
//! ```
//!
//! `CaptureTransport` replays the device side and records what the host sends.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, WireError};
use crate::protocol::v2::{parse_session_open, SESSION_CLOSE_MARKER, SESSION_OPEN_MARKER};
use crate::protocol::Chunk;

use super::ChunkTransport;

/// Which way a recorded chunk travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToHost,
    ToDevice,
}

/// One line of a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    pub direction: Direction,
    pub bytes: Vec<u8>,
}

impl CaptureRecord {
    pub fn to_host(chunk: &Chunk) -> Self {
        Self {
            direction: Direction::ToHost,
            bytes: chunk.as_bytes().to_vec(),
        }
    }

    pub fn to_device(chunk: &Chunk) -> Self {
        Self {
            direction: Direction::ToDevice,
            bytes: chunk.as_bytes().to_vec(),
        }
    }
}

/// Parse a capture. Sizes are not checked here; the chunk link does that.
pub fn parse_capture<R: BufRead>(reader: R) -> Result<Vec<CaptureRecord>> {
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (direction, data) = match line.as_bytes()[0] {
            b'<' => (Direction::ToHost, &line[1..]),
            b'>' => (Direction::ToDevice, &line[1..]),
            _ => (Direction::ToHost, line),
        };

        let digits: String = data.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = hex::decode(&digits)
            .map_err(|e| WireError::Capture(format!("line {}: {}", index + 1, e)))?;

        records.push(CaptureRecord { direction, bytes });
    }

    Ok(records)
}

/// Write records in the format `parse_capture` reads
pub fn write_capture<W: Write>(writer: &mut W, records: &[CaptureRecord]) -> Result<()> {
    for record in records {
        let prefix = match record.direction {
            Direction::ToHost => '<',
            Direction::ToDevice => '>',
        };
        writeln!(writer, "{} {}", prefix, hex::encode(&record.bytes))?;
    }
    writer.flush()?;
    Ok(())
}

/// Replays the device side of a capture
///
/// Once every device-to-host record has been delivered the capture counts
/// as disconnected.
pub struct CaptureTransport {
    incoming: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
}

impl CaptureTransport {
    pub fn from_records(records: Vec<CaptureRecord>) -> Self {
        let incoming = records
            .into_iter()
            .filter(|r| r.direction == Direction::ToHost)
            .map(|r| r.bytes)
            .collect();

        Self {
            incoming,
            written: Vec::new(),
        }
    }

    /// Load a capture file
    pub fn open_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let records = parse_capture(BufReader::new(file))?;
        Ok(Self::from_records(records))
    }

    /// Chunks the host has sent so far
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    /// Device-to-host records not yet delivered
    pub fn remaining(&self) -> usize {
        self.incoming.len()
    }

    /// Take V2 session open/close acknowledgements out of the replay.
    ///
    /// Returns the session id granted by the first open ack, if any.
    pub fn strip_session_control(&mut self) -> Result<Option<u32>> {
        let mut opened = None;
        let mut kept = VecDeque::with_capacity(self.incoming.len());

        for raw in self.incoming.drain(..) {
            match raw.first().copied() {
                Some(SESSION_OPEN_MARKER) => {
                    let session_id = parse_session_open(&Chunk::from_slice(&raw)?)?;
                    tracing::debug!("Capture: session {} opened", session_id);
                    match opened {
                        None => opened = Some(session_id),
                        Some(first) if first != session_id => tracing::warn!(
                            "Capture reopens as session {}, frames are checked against {}",
                            session_id,
                            first
                        ),
                        Some(_) => {}
                    }
                }
                Some(SESSION_CLOSE_MARKER) => {
                    Chunk::from_slice(&raw)?;
                    tracing::debug!("Capture: session close acknowledged");
                }
                _ => kept.push_back(raw),
            }
        }

        self.incoming = kept;
        Ok(opened)
    }
}

impl ChunkTransport for CaptureTransport {
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        Chunk::from_slice(chunk)?;
        self.written.push(chunk.to_vec());
        Ok(())
    }

    fn try_read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.incoming.pop_front())
    }

    fn wait_chunk(&mut self, _timeout: Duration) -> Result<Option<Vec<u8>>> {
        match self.incoming.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None => Err(WireError::ConnectionLost("capture exhausted".into())),
        }
    }

    fn is_connected(&self) -> bool {
        !self.incoming.is_empty()
    }
}
