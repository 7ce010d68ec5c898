//! Device Tests
//!
//! Tests for the known-device table, interface pairing and the two-link
//! device wrapper.

use hidwire::device::{
    lookup, pair_interfaces, protocol_for, Device, DevicePaths, InterfaceInfo, LinkKind,
    DEBUG_USAGE_PAGE, MAIN_USAGE_PAGE,
};
use hidwire::protocol::{v2, Chunk};
use hidwire::transport::{MemoryDevice, MemoryTransport};
use hidwire::{Config, OpaqueRegistry, ProtocolVersion, RawMessage, WireError};

fn interface(serial: &str, path: &str, product_id: u16, interface_number: i32, usage_page: u16) -> InterfaceInfo {
    InterfaceInfo {
        path: path.to_string(),
        vendor_id: 0x1209,
        product_id,
        serial_number: serial.to_string(),
        interface_number,
        usage_page,
    }
}

fn open_device(
    with_debug: bool,
) -> (
    Device<OpaqueRegistry, OpaqueRegistry>,
    MemoryDevice,
    Option<MemoryDevice>,
) {
    let (main_host, main_dev) = MemoryTransport::pair();
    let (debug_host, debug_dev) = MemoryTransport::pair();
    let debug = with_debug.then_some((debug_host, OpaqueRegistry));

    let device = Device::open(
        ProtocolVersion::V2,
        (main_host, OpaqueRegistry),
        debug,
        &Config::default(),
    )
    .unwrap();
    (device, main_dev, with_debug.then_some(debug_dev))
}

fn control(marker: u8, session_id: u32) -> Chunk {
    Chunk::build(marker, &[&session_id.to_be_bytes()[..]]).unwrap()
}

// =============================================================================
// Device Table Tests
// =============================================================================

#[test]
fn test_protocol_for_known_devices() {
    assert_eq!(protocol_for(0x534c, 0x0001).unwrap(), ProtocolVersion::V1);
    assert_eq!(protocol_for(0x1209, 0x53c0).unwrap(), ProtocolVersion::V2);
    assert_eq!(protocol_for(0x1209, 0x53c1).unwrap(), ProtocolVersion::V2);
    assert_eq!(lookup(0x1209, 0x53c1).unwrap().name, "TREZORv2");
}

#[test]
fn test_protocol_for_unknown_device() {
    match protocol_for(0x046d, 0xc52b) {
        Err(WireError::UnknownDevice {
            vendor_id,
            product_id,
        }) => {
            assert_eq!(vendor_id, 0x046d);
            assert_eq!(product_id, 0xc52b);
        }
        other => panic!("Expected unknown device, got {:?}", other),
    }
}

// =============================================================================
// Interface Pairing Tests
// =============================================================================

#[test]
fn test_link_kind() {
    assert_eq!(interface("a", "p", 0x53c1, 5, MAIN_USAGE_PAGE).link_kind(), Some(LinkKind::Main));
    assert_eq!(interface("a", "p", 0x53c1, 5, DEBUG_USAGE_PAGE).link_kind(), Some(LinkKind::Debug));
    assert_eq!(interface("a", "p", 0x53c1, 0, 0).link_kind(), Some(LinkKind::Main));
    assert_eq!(interface("a", "p", 0x53c1, 1, 0).link_kind(), Some(LinkKind::Debug));
    assert_eq!(interface("a", "p", 0x53c1, 2, 0).link_kind(), None);
}

#[test]
fn test_pair_interfaces_by_serial() {
    let paired = pair_interfaces(vec![
        interface("B", "/dev/hid2", 0x53c1, 0, MAIN_USAGE_PAGE),
        interface("A", "/dev/hid1", 0x53c1, 1, DEBUG_USAGE_PAGE),
        interface("A", "/dev/hid0", 0x53c1, 0, MAIN_USAGE_PAGE),
        interface("C", "/dev/hid9", 0xFFFF, 0, MAIN_USAGE_PAGE),
    ]);

    assert_eq!(
        paired,
        vec![
            DevicePaths {
                main: Some("/dev/hid0".to_string()),
                debug: Some("/dev/hid1".to_string()),
            },
            DevicePaths {
                main: Some("/dev/hid2".to_string()),
                debug: None,
            },
        ]
    );
}

#[test]
fn test_pair_interfaces_empty() {
    assert!(pair_interfaces(Vec::new()).is_empty());
}

// =============================================================================
// Two-link Device Tests
// =============================================================================

#[test]
fn test_links_have_independent_sessions() {
    let (mut device, main_dev, debug_dev) = open_device(true);
    let debug_dev = debug_dev.unwrap();
    assert!(device.has_debug_link());

    main_dev.send(&control(b'O', 1));
    device.main().session_begin().unwrap();
    debug_dev.send(&control(b'O', 2));
    device.debug().unwrap().session_begin().unwrap();

    assert_eq!(device.main().session_id(), Some(1));
    assert_eq!(device.debug().unwrap().session_id(), Some(2));

    main_dev.drain();
    debug_dev.drain();

    device.write(&RawMessage::new(10, &b"main"[..])).unwrap();
    device.write_debug(&RawMessage::new(20, &b"debug"[..])).unwrap();
    assert_eq!(main_dev.drain(), v2::encode_frame(1, 10, b"main").unwrap());
    assert_eq!(debug_dev.drain(), v2::encode_frame(2, 20, b"debug").unwrap());

    debug_dev.send_all(&v2::encode_frame(2, 21, b"state").unwrap());
    assert!(device.read().unwrap().is_none());
    assert_eq!(
        device.read_debug().unwrap(),
        Some(RawMessage::new(21, &b"state"[..]))
    );
}

#[test]
fn test_missing_debug_link() {
    let (mut device, _main_dev, _) = open_device(false);
    assert!(!device.has_debug_link());

    let result = device.write_debug(&RawMessage::new(1, &b""[..]));
    assert!(matches!(result, Err(WireError::ProtocolState(_))));
    assert!(matches!(device.read_debug(), Err(WireError::ProtocolState(_))));
}

#[test]
fn test_close_closes_both_links() {
    let (mut device, main_dev, debug_dev) = open_device(true);
    let debug_dev = debug_dev.unwrap();
    assert!(main_dev.is_open());
    assert!(debug_dev.is_open());

    device.close().unwrap();
    assert!(!main_dev.is_open());
    assert!(!debug_dev.is_open());
}
