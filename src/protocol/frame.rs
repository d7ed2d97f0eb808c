//! # Raw Status-Frame Classification
//!
//! Command acknowledgements arrive as short raw notification frames rather
//! than decoded records: flash-persist acks and the start/stop inventory
//! acks. This module classifies a raw byte sequence positionally — command
//! code at byte 3, payload length at byte 4, status at byte 5 — and leaves
//! everything else to the rich-record path.

use crate::constants::{
    CMD_INVENTORY_CONTINUE, CMD_INVENTORY_STOP, CMD_SAVE_FLASH, FRAME_CMD_OFFSET,
    FRAME_LEN_OFFSET, FRAME_MIN_LEN, FRAME_STATUS_OFFSET,
};

/// A raw notification recognized as a command acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFrame {
    /// The parameter block was persisted to non-volatile storage.
    FlashAck,
    /// Start-inventory acknowledgement; `ok` is true for status 0x00.
    InventoryStartAck { ok: bool },
    /// Stop-inventory acknowledgement; the status byte is reported but
    /// never changes the outcome.
    InventoryStopAck { status: u8 },
}

/// Classify a raw notification frame.
///
/// Returns `None` for anything that is not a status acknowledgement —
/// shorter than the minimum frame, an unknown command code, or an
/// inventory ack whose length field does not mark a single status byte.
/// Those frames belong to the decoded-record path, if anywhere.
pub fn classify_status_frame(bytes: &[u8]) -> Option<StatusFrame> {
    if bytes.len() < FRAME_MIN_LEN {
        return None;
    }

    let cmd = bytes[FRAME_CMD_OFFSET];
    let len = bytes[FRAME_LEN_OFFSET];

    if cmd == CMD_SAVE_FLASH {
        // Flash acks are recognized by command code alone; the payload
        // (if any) carries nothing this crate needs.
        return Some(StatusFrame::FlashAck);
    }

    if cmd == CMD_INVENTORY_CONTINUE && len == 0x01 && bytes.len() > FRAME_STATUS_OFFSET {
        return Some(StatusFrame::InventoryStartAck {
            ok: bytes[FRAME_STATUS_OFFSET] == 0x00,
        });
    }

    if cmd == CMD_INVENTORY_STOP && len == 0x01 && bytes.len() > FRAME_STATUS_OFFSET {
        return Some(StatusFrame::InventoryStopAck {
            status: bytes[FRAME_STATUS_OFFSET],
        });
    }

    None
}
