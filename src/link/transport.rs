//! # Transport Trait
//!
//! Contract for BLE transport backends. The backend owns device discovery,
//! the GATT connection and the notification characteristic; the session
//! engine owns everything above that. Notification traffic — raw status
//! frames, SDK-decoded records, link loss — is delivered through a single
//! event channel the engine takes ownership of at connect time.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ReaderError;
use crate::protocol::record::DeviceRecord;

/// Asynchronous traffic from the link, delivered out-of-band.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// A device seen while scanning.
    DeviceDiscovered {
        name: String,
        address: String,
        rssi: i32,
    },
    /// Scanning failed at the radio level.
    ScanFailed { code: i32 },
    /// A raw notification frame (status acknowledgements arrive this way).
    Raw(Vec<u8>),
    /// A notification already decoded into a typed record.
    Record(DeviceRecord),
    /// The connection dropped, whether requested or not.
    Disconnected,
}

/// A BLE transport backend.
///
/// `write` is a single best-effort attempt; retries and backoff live in the
/// engine. Implementations must keep delivering events on the channel from
/// [`take_events`](BleLink::take_events) until they emit `Disconnected`.
#[async_trait]
pub trait BleLink: Send + 'static {
    /// Begin scanning for devices; discoveries arrive as events.
    async fn start_scan(&mut self) -> Result<(), ReaderError>;

    /// Stop an in-progress scan.
    async fn stop_scan(&mut self) -> Result<(), ReaderError>;

    /// Connect to a previously discovered device.
    async fn connect(&mut self, address: &str) -> Result<(), ReaderError>;

    /// Enable notification delivery on the response characteristic.
    async fn enable_notifications(&mut self) -> Result<(), ReaderError>;

    /// One write attempt to the command characteristic.
    async fn write(&mut self, payload: &[u8]) -> Result<(), ReaderError>;

    /// Tear the connection down. Must be safe to call when not connected.
    async fn disconnect(&mut self) -> Result<(), ReaderError>;

    /// Whether the transport currently holds a connection.
    fn is_connected(&self) -> bool;

    /// Hand the event channel to the engine, which binds to it once at
    /// construction. Yields `None` once taken.
    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<LinkEvent>>;
}
