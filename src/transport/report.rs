//! HID report adapter
//!
//! Turns a raw report device into a `ChunkTransport`. Devices differ in
//! whether reports carry a leading report-id byte, so the framing is probed
//! once on open unless it is already known.

use crate::error::{Result, WireError};
use crate::protocol::CHUNK_SIZE;

use super::ChunkTransport;

/// Low-level report I/O of an opened HID handle
pub trait ReportDevice {
    /// Write one report, returning how many bytes the device accepted
    fn write_report(&mut self, report: &[u8]) -> Result<usize>;

    /// Non-blocking read; an empty vector means nothing is pending
    fn read_report(&mut self) -> Result<Vec<u8>>;

    /// Whether the device is still enumerated
    fn is_present(&self) -> bool;

    fn close(&mut self) {}
}

/// How a chunk is laid out in an outgoing report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// The chunk is the report (64 bytes)
    Plain,
    /// Report id 0x00 followed by the chunk (65 bytes)
    Prefixed,
}

impl ReportFormat {
    /// Probe which framing the device accepts.
    ///
    /// Sends a 65-byte prefixed probe, then a 64-byte plain one.
    pub fn detect<D: ReportDevice + ?Sized>(device: &mut D) -> Result<Self> {
        let mut probe = vec![0x00, 63];
        probe.extend_from_slice(&[0xFF; CHUNK_SIZE - 1]);
        if device.write_report(&probe)? == CHUNK_SIZE + 1 {
            return Ok(ReportFormat::Prefixed);
        }

        let mut probe = vec![63];
        probe.extend_from_slice(&[0xFF; CHUNK_SIZE - 1]);
        if device.write_report(&probe)? == CHUNK_SIZE {
            return Ok(ReportFormat::Plain);
        }

        Err(WireError::ConnectionLost("unknown HID version".into()))
    }

    /// Wrap a chunk into an outgoing report
    pub fn frame(self, chunk: &[u8]) -> Vec<u8> {
        match self {
            ReportFormat::Plain => chunk.to_vec(),
            ReportFormat::Prefixed => {
                let mut report = Vec::with_capacity(chunk.len() + 1);
                report.push(0x00);
                report.extend_from_slice(chunk);
                report
            }
        }
    }
}

/// `ChunkTransport` over a report device
pub struct ReportTransport<D: ReportDevice> {
    device: D,
    format: Option<ReportFormat>,
    opened: bool,
}

impl<D: ReportDevice> ReportTransport<D> {
    /// Framing will be probed on `open`
    pub fn new(device: D) -> Self {
        Self {
            device,
            format: None,
            opened: false,
        }
    }

    /// Framing known up front (e.g. from the device model); no probing
    pub fn with_format(device: D, format: ReportFormat) -> Self {
        Self {
            device,
            format: Some(format),
            opened: false,
        }
    }

    pub fn format(&self) -> Option<ReportFormat> {
        self.format
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: ReportDevice> ChunkTransport for ReportTransport<D> {
    fn open(&mut self) -> Result<()> {
        if self.opened {
            return Ok(());
        }
        if self.format.is_none() {
            let format = ReportFormat::detect(&mut self.device)?;
            tracing::debug!("Detected HID report format {:?}", format);
            self.format = Some(format);
        }
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.opened {
            self.device.close();
            self.opened = false;
        }
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        if chunk.len() != CHUNK_SIZE {
            return Err(WireError::Length(format!(
                "unexpected data length: {}",
                chunk.len()
            )));
        }
        let format = self
            .format
            .ok_or_else(|| WireError::ProtocolState("report transport is not open".into()))?;

        let report = format.frame(chunk);
        let written = self.device.write_report(&report)?;
        if written != report.len() {
            return Err(WireError::Length(format!(
                "device accepted {} of {} report bytes",
                written,
                report.len()
            )));
        }
        Ok(())
    }

    fn try_read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let data = self.device.read_report()?;
        if data.is_empty() {
            return Ok(None);
        }
        Ok(Some(data))
    }

    fn is_connected(&self) -> bool {
        self.device.is_present()
    }
}
