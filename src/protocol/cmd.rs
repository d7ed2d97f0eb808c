//! # Command Frame Builders
//!
//! Pure functions producing the outgoing command frames. Every frame shares
//! one layout: `[sync0, sync1, address, cmd, len, payload.., crc_hi, crc_lo]`
//! with the checksum computed over everything before it. The builders return
//! plain byte vectors the transport writes as-is.

use bytes::{BufMut, BytesMut};

use crate::constants::{
    CMD_GET_ALL_PARAM, CMD_GET_BATTERY, CMD_INVENTORY_CONTINUE, CMD_INVENTORY_STOP,
    CMD_READ_TAG, CMD_SAVE_FLASH, FRAME_ADDRESS, FRAME_SYNC0, FRAME_SYNC1,
    CMD_SET_ALL_PARAM, READ_TAG_WORD_COUNT,
};
use crate::protocol::crc::crc16;
use crate::protocol::params::ParameterSnapshot;

/// Assemble a command frame around `payload` and append the checksum.
fn pack_command(cmd: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = BytesMut::with_capacity(7 + payload.len());
    frame.put_u8(FRAME_SYNC0);
    frame.put_u8(FRAME_SYNC1);
    frame.put_u8(FRAME_ADDRESS);
    frame.put_u8(cmd);
    frame.put_u8(payload.len() as u8);
    frame.put_slice(payload);
    let crc = crc16(&frame, frame.len());
    frame.put_u16(crc);
    frame.to_vec()
}

/// Query the battery capacity.
pub fn build_get_battery_cmd() -> Vec<u8> {
    pack_command(CMD_GET_BATTERY, &[])
}

/// Read the full parameter block from reader RAM.
pub fn build_get_all_param_cmd() -> Vec<u8> {
    pack_command(CMD_GET_ALL_PARAM, &[])
}

/// Write the full parameter block to reader RAM.
///
/// Payload layout: power, Q, session, then the frequency table as
/// region id, start-frequency integer/decimal parts, step frequency
/// (all big-endian byte pairs) and channel count.
pub fn build_set_all_param_cmd(params: &ParameterSnapshot) -> Vec<u8> {
    let f = &params.freq;
    let payload = [
        params.power,
        params.q_value,
        params.session,
        f.region_id,
        (f.start_freq_int >> 8) as u8,
        (f.start_freq_int & 0xFF) as u8,
        (f.start_freq_dec >> 8) as u8,
        (f.start_freq_dec & 0xFF) as u8,
        (f.step_freq >> 8) as u8,
        (f.step_freq & 0xFF) as u8,
        f.channel_count,
    ];
    pack_command(CMD_SET_ALL_PARAM, &payload)
}

/// Persist the RAM parameter block to non-volatile storage.
///
/// This is the one frame assembled byte-for-byte rather than through
/// `pack_command`: the firmware expects exactly
/// `[0xCF, 0xFF, 0x00, 0x79, 0x00, crc_hi, crc_lo]` with the checksum
/// over the first five bytes.
pub fn build_save_flash_cmd() -> Vec<u8> {
    let mut frame = vec![FRAME_SYNC0, FRAME_SYNC1, 0x00, CMD_SAVE_FLASH, 0x00];
    let crc = crc16(&frame, 5);
    frame.push((crc >> 8) as u8);
    frame.push((crc & 0xFF) as u8);
    frame
}

/// Start continuous ISO inventory (time-unbounded).
pub fn build_inventory_continue_cmd() -> Vec<u8> {
    // Inventory type 0x00, parameter 0 = run until stopped
    pack_command(CMD_INVENTORY_CONTINUE, &[0x00, 0x00, 0x00])
}

/// Stop continuous inventory.
pub fn build_stop_inventory_cmd() -> Vec<u8> {
    pack_command(CMD_INVENTORY_STOP, &[])
}

/// Read one tag from the given memory bank.
///
/// Uses the default (zero) access password. Bank 1 is the EPC bank and
/// starts at word 2 to skip CRC and PC words; every other bank reads from
/// word 0. Word count is fixed at 6.
pub fn build_read_tag_cmd(memory_bank: u8) -> Vec<u8> {
    let word_ptr: [u8; 2] = if memory_bank == 0x01 {
        [0x00, 0x02]
    } else {
        [0x00, 0x00]
    };

    let mut payload = BytesMut::with_capacity(8);
    payload.put_slice(&[0x00, 0x00, 0x00, 0x00]);
    payload.put_u8(memory_bank);
    payload.put_slice(&word_ptr);
    payload.put_u8(READ_TAG_WORD_COUNT);
    pack_command(CMD_READ_TAG, &payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::params::Region;

    #[test]
    fn test_save_flash_frame_exact_bytes() {
        assert_eq!(
            build_save_flash_cmd(),
            vec![0xCF, 0xFF, 0x00, 0x79, 0x00, 0xF3, 0x0D]
        );
    }

    #[test]
    fn test_frame_layout_and_checksum() {
        let frame = build_stop_inventory_cmd();
        assert_eq!(&frame[..5], &[0xCF, 0xFF, 0x00, 0x02, 0x00]);
        let crc = crc16(&frame[..5], 5);
        assert_eq!(frame[5], (crc >> 8) as u8);
        assert_eq!(frame[6], (crc & 0xFF) as u8);
    }

    #[test]
    fn test_read_tag_word_pointer_by_bank() {
        // EPC bank points at word 2, everything else at word 0
        let epc = build_read_tag_cmd(0x01);
        assert_eq!(&epc[10..13], &[0x00, 0x02, 6]);

        let tid = build_read_tag_cmd(0x02);
        assert_eq!(&tid[10..13], &[0x00, 0x00, 6]);

        let user = build_read_tag_cmd(0x03);
        assert_eq!(&user[10..13], &[0x00, 0x00, 6]);
    }

    #[test]
    fn test_read_tag_password_and_bank() {
        let frame = build_read_tag_cmd(0x02);
        assert_eq!(frame[3], 0x85);
        assert_eq!(frame[4], 8);
        assert_eq!(&frame[5..9], &[0x00, 0x00, 0x00, 0x00]);
        assert_eq!(frame[9], 0x02); // memory bank
    }

    #[test]
    fn test_set_all_param_payload() {
        let mut params = ParameterSnapshot::default();
        params.set_power(20);
        params.freq = Region::Fcc.frequency_table();
        let frame = build_set_all_param_cmd(&params);

        assert_eq!(frame[3], 0x71);
        assert_eq!(frame[4], 11);
        assert_eq!(frame[5], 20); // power
        assert_eq!(frame[6], 4); // q
        assert_eq!(frame[7], 0); // session
        assert_eq!(frame[8], 0x01); // FCC region id
        assert_eq!(&frame[9..11], &[0x03, 0x86]);
        assert_eq!(&frame[11..13], &[0x02, 0xEE]);
        assert_eq!(&frame[13..15], &[0x01, 0xF4]);
        assert_eq!(frame[15], 0x32);
    }
}
