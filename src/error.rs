//! Error types for hidwire
//!
//! Every failure is terminal for the message exchange in progress. Nothing
//! here is retried by the library; callers decide whether to redo the
//! exchange, reopen a session or give up.

use thiserror::Error;

/// Result type alias using WireError
pub type Result<T> = std::result::Result<T, WireError>;

/// Unified error type for hidwire operations
#[derive(Debug, Error)]
pub enum WireError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport went away while we were waiting on it. The coordinator
    /// that saw this must be recreated.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    // -------------------------------------------------------------------------
    // Framing Errors
    // -------------------------------------------------------------------------
    #[error("Unexpected marker: expected {expected}, got 0x{found:02x}")]
    Framing { expected: &'static str, found: u8 },

    #[error("Cannot parse header: {0}")]
    HeaderParse(String),

    #[error("Length error: {0}")]
    Length(String),

    #[error("Message checksum mismatch: trailer 0x{expected:08x}, computed 0x{computed:08x}")]
    Checksum { expected: u32, computed: u32 },

    // -------------------------------------------------------------------------
    // Session Errors
    // -------------------------------------------------------------------------
    #[error("Session ID mismatch: have {expected:?}, got {found:?}")]
    SessionMismatch {
        expected: Option<u32>,
        found: Option<u32>,
    },

    #[error("Protocol state error: {0}")]
    ProtocolState(String),

    // -------------------------------------------------------------------------
    // Message Errors
    // -------------------------------------------------------------------------
    #[error("Message type {0} does not fit the frame header")]
    InvalidMessageType(u32),

    #[error("Unknown message type: {0}")]
    UnknownMessageType(u32),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Device Errors
    // -------------------------------------------------------------------------
    #[error("Unknown device {vendor_id:04x}:{product_id:04x}")]
    UnknownDevice { vendor_id: u16, product_id: u16 },

    #[error("Capture error: {0}")]
    Capture(String),
}
