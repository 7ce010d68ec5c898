//! # hidwire
//!
//! Message framing for devices that talk in fixed 64-byte reports:
//! - Two incompatible wire formats behind one coordinator (legacy V1,
//!   session-aware V2 with CRC-32 trailer)
//! - Reassembly of frames spanning any number of chunks
//! - Re-entrant session lock driving the V2 open/close handshake
//! - Pluggable chunk transports and message registries
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Caller                              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ typed messages
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Protocol Coordinator                        │
//! │        (session lock, session check, registry)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ (type id, bytes)
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Codec V1   │          │  Codec V2   │
//!   │  ('?##')    │          │ (H/D/O/C)   │
//!   └──────┬──────┘          └──────┬──────┘
//!          └────────────┬───────────┘
//!                       ▼ 64-byte chunks
//!               ┌──────────────┐
//!               │  Chunk Link  │
//!               │ (transport)  │
//!               └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod transport;
pub mod registry;
pub mod coordinator;
pub mod device;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{WireError, Result};
pub use config::Config;
pub use coordinator::ProtocolCoordinator;
pub use protocol::{Chunk, ProtocolVersion, WireCodec};
pub use registry::{MessageRegistry, OpaqueRegistry, RawMessage};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of hidwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
