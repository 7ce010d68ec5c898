//! Chunk Link Tests
//!
//! Tests for chunk validation and the blocking read loop.

use std::thread;
use std::time::{Duration, Instant};

use hidwire::protocol::{Chunk, ReadMode};
use hidwire::transport::{ChunkLink, MemoryDevice, MemoryTransport};
use hidwire::{Config, WireError};

fn link_with(poll_ms: u64, liveness_ms: u64) -> (ChunkLink, MemoryDevice) {
    let config = Config::builder()
        .poll_interval_ms(poll_ms)
        .liveness_timeout_ms(liveness_ms)
        .build();
    let (host, device) = MemoryTransport::pair();
    (ChunkLink::new(Box::new(host), &config), device)
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_try_read_empty() {
    let (mut link, _device) = link_with(1, 100);
    assert!(link.try_read_chunk().unwrap().is_none());
    assert!(link.next_chunk(ReadMode::Poll).unwrap().is_none());
}

#[test]
fn test_read_chunk_returns_pending_chunk() {
    let (mut link, device) = link_with(1, 100);
    let chunk = Chunk::build(b'?', &[&b"##"[..]]).unwrap();
    device.send(&chunk);

    assert_eq!(link.read_chunk().unwrap(), chunk);
}

#[test]
fn test_short_report_rejected() {
    let (mut link, device) = link_with(1, 100);
    device.send_raw(vec![0u8; 32]);
    assert!(matches!(link.try_read_chunk(), Err(WireError::Length(_))));
}

#[test]
fn test_long_report_rejected() {
    let (mut link, device) = link_with(1, 100);
    device.send_raw(vec![0u8; 65]);
    assert!(matches!(link.read_chunk(), Err(WireError::Length(_))));
}

#[test]
fn test_write_chunk_passes_through() {
    let (mut link, device) = link_with(1, 100);
    let chunk = Chunk::build(b'O', &[]).unwrap();

    link.write_chunk(&chunk).unwrap();
    assert_eq!(device.recv(), Some(chunk));
}

// =============================================================================
// Liveness Tests
// =============================================================================

#[test]
fn test_live_transport_keeps_waiting() {
    // Liveness expires several times before the device answers
    let (mut link, device) = link_with(1, 10);
    let chunk = Chunk::build(b'H', &[&b"late"[..]]).unwrap();

    let sender = thread::spawn(move || {
        thread::sleep(Duration::from_millis(60));
        device.send(&chunk);
        device
    });

    let received = link.read_chunk().unwrap();
    assert_eq!(received, chunk);
    sender.join().unwrap();
}

#[test]
fn test_dead_transport_fails_after_liveness_timeout() {
    let (mut link, device) = link_with(1, 30);
    device.disconnect();

    let started = Instant::now();
    let result = link.read_chunk();

    match result {
        Err(WireError::ConnectionLost(msg)) => assert_eq!(msg, "connection failed"),
        other => panic!("Expected connection lost, got {:?}", other),
    }
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[test]
fn test_liveness_reported_by_link() {
    let (link, device) = link_with(1, 30);
    assert!(link.is_connected());
    device.disconnect();
    assert!(!link.is_connected());
}
