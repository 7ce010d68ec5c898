//! Message Catalog Tests
//!
//! Tests for typed message registration and the catalog driving a
//! coordinator.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use hidwire::protocol::v2;
use hidwire::registry::{encode_bincode, CatalogMessage, MessageCatalog};
use hidwire::transport::MemoryTransport;
use hidwire::{Config, MessageRegistry, ProtocolCoordinator, ProtocolVersion, RawMessage, Result, WireError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Ping {
    nonce: u64,
    note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Features {
    label: String,
    major: u32,
}

#[derive(Debug, Clone, PartialEq)]
enum AppMessage {
    Ping(Ping),
    Features(Features),
    Other(RawMessage),
}

const PING: u32 = 1;
const FEATURES: u32 = 17;
const FIRMWARE_CHUNK: u32 = 99;

impl From<Ping> for AppMessage {
    fn from(p: Ping) -> Self {
        AppMessage::Ping(p)
    }
}

impl From<Features> for AppMessage {
    fn from(f: Features) -> Self {
        AppMessage::Features(f)
    }
}

impl From<RawMessage> for AppMessage {
    fn from(m: RawMessage) -> Self {
        AppMessage::Other(m)
    }
}

impl CatalogMessage for AppMessage {
    fn message_type(&self) -> u32 {
        match self {
            AppMessage::Ping(_) => PING,
            AppMessage::Features(_) => FEATURES,
            AppMessage::Other(m) => m.message_type,
        }
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            AppMessage::Ping(p) => encode_bincode(p),
            AppMessage::Features(f) => encode_bincode(f),
            AppMessage::Other(m) => Ok(m.payload.to_vec()),
        }
    }
}

fn catalog() -> MessageCatalog<AppMessage> {
    let mut catalog = MessageCatalog::new();
    catalog
        .register_bincode::<Ping>(PING)
        .register_bincode::<Features>(FEATURES)
        .register_opaque(FIRMWARE_CHUNK);
    catalog
}

fn ping() -> AppMessage {
    AppMessage::Ping(Ping {
        nonce: 0xDEAD,
        note: "hello".to_string(),
    })
}

// =============================================================================
// Registry Tests
// =============================================================================

#[test]
fn test_catalog_registration() {
    let catalog = catalog();
    assert_eq!(catalog.len(), 3);
    assert!(catalog.contains(FEATURES));
    assert!(!catalog.contains(2));
    assert!(!catalog.is_empty());
    assert!(MessageCatalog::<AppMessage>::default().is_empty());
}

#[test]
fn test_typed_roundtrip() {
    let catalog = catalog();
    let message = ping();

    let message_type = catalog.type_of(&message).unwrap();
    let payload = catalog.serialize(&message).unwrap();
    let decoded = catalog.deserialize(message_type, Bytes::from(payload)).unwrap();

    assert_eq!(decoded, message);
}

#[test]
fn test_opaque_entry_keeps_payload() {
    let catalog = catalog();
    let decoded = catalog
        .deserialize(FIRMWARE_CHUNK, Bytes::from_static(b"\x01\x02"))
        .unwrap();
    assert_eq!(decoded, AppMessage::Other(RawMessage::new(FIRMWARE_CHUNK, &b"\x01\x02"[..])));
}

#[test]
fn test_unknown_type() {
    let catalog = catalog();
    let result = catalog.deserialize(1234, Bytes::new());
    assert!(matches!(result, Err(WireError::UnknownMessageType(1234))));
}

#[test]
fn test_garbage_payload() {
    let catalog = catalog();
    let result = catalog.deserialize(FEATURES, Bytes::from_static(&[0xFF]));
    assert!(matches!(result, Err(WireError::Serialization(_))));
}

#[test]
fn test_custom_constructor_replaces_entry() {
    let mut catalog = catalog();
    catalog.register(PING, |payload| {
        Ok(AppMessage::Other(RawMessage::new(PING, payload)))
    });

    assert_eq!(catalog.len(), 3);
    let decoded = catalog.deserialize(PING, Bytes::from_static(b"x")).unwrap();
    assert_eq!(decoded, AppMessage::Other(RawMessage::new(PING, &b"x"[..])));
}

#[test]
fn test_debug_lists_types() {
    let printed = format!("{:?}", catalog());
    assert_eq!(printed, "MessageCatalog { types: [1, 17, 99] }");
}

// =============================================================================
// Coordinator Integration Tests
// =============================================================================

#[test]
fn test_catalog_over_v2_session() {
    let (host, device) = MemoryTransport::pair();
    let mut coordinator =
        ProtocolCoordinator::with_version(host, ProtocolVersion::V2, catalog(), &Config::default())
            .unwrap();

    device.send(&hidwire::Chunk::build(b'O', &[&7u32.to_be_bytes()[..]]).unwrap());
    coordinator.session_begin().unwrap();
    device.drain();

    let features = Features {
        label: "bench unit".to_string(),
        major: 2,
    };
    let payload = bincode::serialize(&features).unwrap();
    device.send_all(&v2::encode_frame(7, FEATURES, &payload).unwrap());

    let reply = coordinator.call(&ping()).unwrap();
    assert_eq!(reply, AppMessage::Features(features));

    let sent = device.drain();
    let mut rest = sent[1..].iter().copied();
    let frame = v2::decode_frame(&sent[0], || Ok(rest.next().unwrap()), 1024).unwrap();
    assert_eq!(frame.message_type, PING);
    assert_eq!(&frame.payload[..], &ping().to_bytes().unwrap()[..]);
}
