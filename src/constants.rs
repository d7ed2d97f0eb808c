//! H103 Protocol Constants
//!
//! This module defines constants used by the H103 BLE protocol implementation:
//! frame sync bytes, command codes, timing values and the accepted power range.

use std::time::Duration;

// ----------------------------------------------------------------------------
// Frame layout
// ----------------------------------------------------------------------------

/// First sync byte of every command/notification frame
pub const FRAME_SYNC0: u8 = 0xCF;

/// Second sync byte of every command/notification frame
pub const FRAME_SYNC1: u8 = 0xFF;

/// Reader address byte (single-reader links always use 0x00)
pub const FRAME_ADDRESS: u8 = 0x00;

/// Offset of the command code within a notification frame
pub const FRAME_CMD_OFFSET: usize = 3;

/// Offset of the payload length within a notification frame
pub const FRAME_LEN_OFFSET: usize = 4;

/// Offset of the first payload/status byte within a notification frame
pub const FRAME_STATUS_OFFSET: usize = 5;

/// Shortest notification this protocol classifies (sync..len)
pub const FRAME_MIN_LEN: usize = 5;

// ----------------------------------------------------------------------------
// Command codes
// ----------------------------------------------------------------------------

/// Start continuous ISO inventory; also the code on inventory-start acks
pub const CMD_INVENTORY_CONTINUE: u8 = 0x01;

/// Stop continuous inventory; also the code on inventory-stop acks
pub const CMD_INVENTORY_STOP: u8 = 0x02;

/// Read all device parameters from RAM
pub const CMD_GET_ALL_PARAM: u8 = 0x70;

/// Write all device parameters to RAM
pub const CMD_SET_ALL_PARAM: u8 = 0x71;

/// Persist the RAM parameter block to non-volatile storage; also the ack code
pub const CMD_SAVE_FLASH: u8 = 0x79;

/// Read a single tag by memory bank
pub const CMD_READ_TAG: u8 = 0x85;

/// Query the battery capacity
pub const CMD_GET_BATTERY: u8 = 0x90;

// ----------------------------------------------------------------------------
// Timing
// ----------------------------------------------------------------------------

/// Settle delay after enabling notifications before the link is trusted
pub const NOTIFY_SETTLE: Duration = Duration::from_millis(200);

/// Bounded wait for readiness before an operation gives up
pub const READY_WAIT: Duration = Duration::from_millis(1000);

/// Polling interval used inside the readiness wait
pub const READY_POLL: Duration = Duration::from_millis(50);

/// Settle delay between the defensive stop and the start command
pub const INVENTORY_START_SETTLE: Duration = Duration::from_millis(120);

/// Settle delay after stopping inventory before a parameter write
pub const PARAM_WRITE_SETTLE: Duration = Duration::from_millis(150);

/// Deadline for the battery-capacity notification
pub const BATTERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for the flash-persist acknowledgement
pub const FLASH_TIMEOUT: Duration = Duration::from_secs(2);

/// Number of transport write attempts before giving up
pub const WRITE_ATTEMPTS: u32 = 3;

/// Base backoff between write attempts (multiplied by the attempt number)
pub const WRITE_BACKOFF: Duration = Duration::from_millis(120);

// ----------------------------------------------------------------------------
// Parameter ranges and defaults
// ----------------------------------------------------------------------------

/// Minimum accepted output power (dBm)
pub const POWER_MIN: u8 = 5;

/// Maximum accepted output power (dBm)
pub const POWER_MAX: u8 = 33;

/// Default output power when no parameter snapshot exists
pub const DEFAULT_POWER: u8 = 17;

/// Default Q value when no parameter snapshot exists
pub const DEFAULT_Q_VALUE: u8 = 4;

/// Default anti-collision session when no parameter snapshot exists
pub const DEFAULT_SESSION: u8 = 0;

/// Fixed word count for single-tag reads
pub const READ_TAG_WORD_COUNT: u8 = 6;
