//! # Utility Modules
//!
//! Small helpers shared across the crate: hex formatting for EPC strings and
//! a millisecond timestamp for tag observations.

pub mod hex;

pub use hex::{decode_hex, encode_hex_upper};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as milliseconds since the Unix epoch.
///
/// Tag observations and single-read results are stamped with this value, the
/// same shape the reader's companion apps expect.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
