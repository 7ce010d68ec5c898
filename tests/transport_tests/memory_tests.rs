//! Memory Transport Tests
//!
//! Tests for the in-memory host/device pair.

use std::time::Duration;

use hidwire::protocol::Chunk;
use hidwire::transport::{ChunkTransport, MemoryTransport};
use hidwire::WireError;

fn chunk(marker: u8) -> Chunk {
    Chunk::build(marker, &[&b"data"[..]]).unwrap()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_host_write_reaches_device() {
    let (mut host, device) = MemoryTransport::pair();

    host.write_chunk(chunk(b'?').as_bytes()).unwrap();
    host.write_chunk(chunk(b'D').as_bytes()).unwrap();

    assert_eq!(device.drain(), vec![chunk(b'?'), chunk(b'D')]);
    assert!(device.recv().is_none());
}

#[test]
fn test_device_send_reaches_host_in_order() {
    let (mut host, device) = MemoryTransport::pair();
    device.send_all(&[chunk(b'H'), chunk(b'D')]);

    assert_eq!(host.try_read_chunk().unwrap().unwrap()[0], b'H');
    assert_eq!(host.try_read_chunk().unwrap().unwrap()[0], b'D');
    assert!(host.try_read_chunk().unwrap().is_none());
}

#[test]
fn test_write_rejects_wrong_size() {
    let (mut host, device) = MemoryTransport::pair();

    for len in [0, 63, 65] {
        let result = host.write_chunk(&vec![0u8; len]);
        assert!(matches!(result, Err(WireError::Length(_))), "len {}", len);
    }
    assert!(device.drain().is_empty());
}

#[test]
fn test_open_is_idempotent() {
    let (mut host, device) = MemoryTransport::pair();

    host.open().unwrap();
    host.open().unwrap();
    assert!(device.is_open());
    assert_eq!(device.open_count(), 1);

    host.close().unwrap();
    host.close().unwrap();
    assert!(!device.is_open());

    host.open().unwrap();
    assert_eq!(device.open_count(), 2);
}

#[test]
fn test_wait_chunk_times_out_empty() {
    let (mut host, _device) = MemoryTransport::pair();
    let result = host.wait_chunk(Duration::from_millis(5)).unwrap();
    assert!(result.is_none());
}

// =============================================================================
// Disconnect Tests
// =============================================================================

#[test]
fn test_disconnect_flips_liveness() {
    let (mut host, device) = MemoryTransport::pair();
    assert!(host.is_connected());

    device.disconnect();
    assert!(!host.is_connected());

    let result = host.write_chunk(chunk(b'?').as_bytes());
    assert!(matches!(result, Err(WireError::ConnectionLost(_))));
}

#[test]
fn test_dropped_device_delivers_queued_then_fails() {
    let (mut host, device) = MemoryTransport::pair();
    device.send(&chunk(b'?'));
    drop(device);

    assert!(!host.is_connected());
    assert!(host.try_read_chunk().unwrap().is_some());
    assert!(matches!(
        host.try_read_chunk(),
        Err(WireError::ConnectionLost(_))
    ));
    assert!(matches!(
        host.wait_chunk(Duration::from_millis(1)),
        Err(WireError::ConnectionLost(_))
    ));
}
