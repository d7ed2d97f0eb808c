//! # H103 Wire Protocol
//!
//! Everything that touches bytes: the frame checksum, command frame builders,
//! the raw status-frame classifier, the device parameter model and the rich
//! decoded notification records.

pub mod cmd;
pub mod crc;
pub mod frame;
pub mod params;
pub mod record;

pub use frame::{classify_status_frame, StatusFrame};
pub use params::{DeviceConfig, FrequencyTable, ParameterSnapshot, Region};
pub use record::DeviceRecord;
