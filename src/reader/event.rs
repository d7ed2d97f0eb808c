//! # Outward Event Surface
//!
//! Fire-and-forget events the engine emits alongside the call surface.
//! None of them correlate to a specific request; embedding applications
//! consume them from the receiver returned by
//! [`ReaderHandle::new`](crate::reader::ReaderHandle::new).

use serde::Serialize;

/// An event emitted by the session engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReaderEvent {
    /// A device was seen during scanning (de-duplicated by address).
    DeviceDiscovered {
        name: String,
        address: String,
        rssi: i32,
    },
    /// Scanning failed at the radio level.
    ScanError { message: String },
    /// The link is gone, whether by request or loss.
    Disconnected,
    /// Battery capacity reported by the reader, in percent.
    BatteryLevel { level: u8 },
    /// No battery response arrived within the deadline.
    BatteryTimeout,
    /// One observation from the continuous inventory stream.
    TagObserved {
        epc: String,
        rssi: i32,
        antenna: u8,
        timestamp: u64,
    },
    /// An observation of the tracked tag, diverted from the tag stream.
    ProximitySignal { epc: String, rssi: i32 },
    /// Result of a single-tag read.
    SingleReadResult {
        epc: String,
        data: String,
        status: u8,
        timestamp: u64,
    },
    /// A notification could not be decoded or routed.
    ReadError { message: String },
}
