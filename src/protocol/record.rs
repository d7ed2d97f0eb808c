//! # Decoded Notification Records
//!
//! The transport collaborator decodes most notification payloads into typed
//! records before they reach this crate; only status acknowledgements arrive
//! raw (see [`crate::protocol::frame`]). This module defines those record
//! shapes as the routing layer consumes them.

use serde::{Deserialize, Serialize};

use crate::protocol::params::FrequencyTable;

/// One tag observation from the continuous inventory stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagObservation {
    /// Raw EPC bytes; empty observations are discarded by the router.
    pub epc: Vec<u8>,
    /// Received signal strength as the firmware reports it.
    pub rssi: i32,
    /// Antenna index the observation came from.
    pub antenna: u8,
}

/// Result of a single-tag read operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOperation {
    pub epc: Vec<u8>,
    pub data: Vec<u8>,
    /// Firmware status code for the operation (0 = success).
    pub status: u8,
}

/// Full parameter block as reported by the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllParamRecord {
    pub power: u8,
    pub q_value: u8,
    pub session: u8,
    pub freq: FrequencyTable,
}

/// A decoded notification record with its category tag.
///
/// `Unrecognized` covers firmware variants that deliver tag observations
/// under unexpected category codes: if the payload still decodes to a tag
/// shape it is carried along and routed as a tag observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceRecord {
    Battery { level: u8 },
    AllParams(AllParamRecord),
    Tag(TagObservation),
    TagOp(TagOperation),
    Unrecognized {
        category: u8,
        tag: Option<TagObservation>,
    },
}
