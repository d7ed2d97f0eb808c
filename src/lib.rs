//! # h103-rs - A Rust Crate for Chafon H103 UHF RFID Readers over BLE
//!
//! The h103-rs crate drives a battery-powered handheld UHF RFID reader over a
//! low-bandwidth BLE link that delivers commands one-way and responses
//! asynchronously as unsolicited notification frames, with no delivery
//! guarantee and no built-in request/response matching. The crate is the
//! session and protocol-correlation engine that turns that channel into safe,
//! sequenced, result-producing operations.
//!
//! ## Features
//!
//! - Readiness handshake gating all traffic (connect, enable notifications,
//!   settle) with fail-fast `NotReady` errors and a bounded poll-wait
//! - Single-flight serialization of the mutually-exclusive parameter and
//!   inventory operations, with guaranteed lock release on every exit path
//! - Correlation of fire-and-forget commands with the notifications that
//!   answer them, racing per-category deadline timers
//! - A cached parameter snapshot kept consistent with what was actually
//!   written: power clamped to 5–33 dBm, region-derived frequency tables
//! - Continuous tag inventory with optimistic state confirmed or revoked by
//!   asynchronous status acknowledgements
//! - Proximity ("radar") tracking that diverts one tag's observations to a
//!   dedicated stream
//! - Single-tag reads by memory bank, battery queries, flash persistence
//!
//! ## Usage
//!
//! ```rust,no_run
//! use h103_rs::{MockLink, ReaderHandle};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), h103_rs::ReaderError> {
//!     let link = MockLink::new();
//!     let (reader, mut events) = ReaderHandle::new(link);
//!
//!     reader.start_scan().await?;
//!     // ... wait for a DeviceDiscovered event ...
//!     reader.connect("AA:BB:CC:DD:EE:FF").await?;
//!
//!     reader.start_inventory().await?;
//!     while let Some(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod constants;
pub mod error;
pub mod link;
pub mod logging;
pub mod protocol;
pub mod reader;
pub mod util;

pub use crate::error::ReaderError;
pub use crate::logging::{init_logger, log_info};

// Core session engine
pub use reader::event::ReaderEvent;
pub use reader::inventory::InventoryState;
pub use reader::session::LinkState;
pub use reader::{CommandAck, ReaderHandle, SetAllParams};

// Wire protocol
pub use protocol::cmd::build_save_flash_cmd;
pub use protocol::crc::crc16;
pub use protocol::frame::{classify_status_frame, StatusFrame};
pub use protocol::params::{clamp_power, DeviceConfig, FrequencyTable, ParameterSnapshot, Region};
pub use protocol::record::{AllParamRecord, DeviceRecord, TagObservation, TagOperation};

// Transport boundary
pub use link::mock::{MockLink, MockLinkHandle};
pub use link::transport::{BleLink, LinkEvent};
