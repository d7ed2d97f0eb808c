//! Unit tests for the frame checksum and the hand-built persist frame.

use h103_rs::protocol::cmd::build_save_flash_cmd;
use h103_rs::protocol::crc::crc16;

/// The checksum must reproduce the device-verified value for the persist
/// frame header.
#[test]
fn test_persist_header_reference_vector() {
    let header = [0xCF, 0xFF, 0x00, 0x79, 0x00];
    assert_eq!(crc16(&header, 5), 0xF30D);
}

/// The persist frame is the header plus the checksum, high byte first.
#[test]
fn test_persist_frame_layout() {
    let frame = build_save_flash_cmd();
    assert_eq!(frame.len(), 7);
    assert_eq!(&frame[..5], &[0xCF, 0xFF, 0x00, 0x79, 0x00]);
    assert_eq!(frame[5], 0xF3);
    assert_eq!(frame[6], 0x0D);
}

/// The algorithm is the reflected X.25 polynomial without the final
/// complement: complementing the classic check value recovers it.
#[test]
fn test_x25_check_value_relationship() {
    assert_eq!(crc16(b"123456789", 9), 0x906E ^ 0xFFFF);
}

/// Deterministic: same input, same value, every time.
#[test]
fn test_determinism() {
    let data = [0x01, 0x02, 0x03, 0xFF, 0xFE];
    let first = crc16(&data, data.len());
    for _ in 0..10 {
        assert_eq!(crc16(&data, data.len()), first);
    }
}

#[test]
fn test_prefix_lengths_differ() {
    let data = [0xCF, 0xFF, 0x00, 0x79, 0x00];
    // Each additional byte must change the running value
    let mut seen = std::collections::HashSet::new();
    for len in 0..=data.len() {
        assert!(seen.insert(crc16(&data, len)));
    }
}
