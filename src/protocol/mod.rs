//! Protocol Module
//!
//! Framing of typed messages into 64-byte chunks and back.
//!
//! ## Formats
//!
//! | Format | Chunk layout                          | Markers                      | Checksum |
//! |--------|---------------------------------------|------------------------------|----------|
//! | V1     | marker (1) + data (63)                | `?` on every chunk           | none     |
//! | V2     | marker (1) + session (4) + data (59)  | `H` / `D`, `O` / `C` control | CRC-32   |
//!
//! Headers are big-endian. Padding after the declared length is never data.

mod chunk;
mod codec;
pub mod v1;
pub mod v2;

pub use chunk::{read_u16_be, read_u32_be, Chunk, CHUNK_BODY_SIZE, CHUNK_SIZE};
pub use codec::{ProtocolVersion, RawFrame, ReadMode, WireCodec};
pub use v1::CodecV1;
pub use v2::CodecV2;
