//! # Device Parameter Model
//!
//! The reader's configuration as this crate tracks it: output power, the
//! regulatory region with its frequency table, the Q value and the
//! anti-collision session. The cached [`ParameterSnapshot`] is the sole
//! source of truth for fields a partial update leaves unspecified.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_POWER, DEFAULT_Q_VALUE, DEFAULT_SESSION, POWER_MAX, POWER_MIN,
};

/// Clamp a requested output power into the accepted range.
///
/// Applied before every cache update and every wire write; out-of-range
/// requests are corrected, never rejected.
pub fn clamp_power(power: i32) -> u8 {
    power.clamp(i32::from(POWER_MIN), i32::from(POWER_MAX)) as u8
}

/// Regulatory region selected on the call surface.
///
/// The public API takes small integer selectors (1 selects FCC, anything
/// else ETSI); the wire uses the region ids carried in [`FrequencyTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Fcc,
    Etsi,
}

impl Region {
    /// Map a region selector to a region. Total: unrecognized selectors
    /// fall back to ETSI.
    pub fn from_selector(selector: i32) -> Self {
        match selector {
            1 => Region::Fcc,
            _ => Region::Etsi,
        }
    }

    /// The frequency table the firmware expects for this region.
    pub fn frequency_table(self) -> FrequencyTable {
        match self {
            Region::Fcc => FrequencyTable {
                region_id: 0x01,
                start_freq_int: 0x0386,
                start_freq_dec: 0x02EE,
                step_freq: 0x01F4,
                channel_count: 0x32,
            },
            Region::Etsi => FrequencyTable {
                region_id: 0x03,
                start_freq_int: 0x0361,
                start_freq_dec: 0x0064,
                step_freq: 0x00C8,
                channel_count: 0x0F,
            },
        }
    }
}

/// Region-derived frequency plan, stored and written as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyTable {
    pub region_id: u8,
    pub start_freq_int: u16,
    pub start_freq_dec: u16,
    pub step_freq: u16,
    pub channel_count: u8,
}

impl FrequencyTable {
    /// Frequency table for a raw region selector (total mapping).
    pub fn for_selector(selector: i32) -> Self {
        Region::from_selector(selector).frequency_table()
    }
}

/// The reader's believed-current configuration.
///
/// Refreshed wholesale by a full-parameter-read response and updated in
/// place by every successful write; power is clamped before it ever lands
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub power: u8,
    pub q_value: u8,
    pub session: u8,
    pub freq: FrequencyTable,
}

impl ParameterSnapshot {
    /// Build a snapshot from factory-style defaults with the caller's
    /// overrides applied. Used when a write arrives before any read has
    /// populated the cache.
    pub fn from_defaults(power: i32, region_selector: i32, q_value: u8, session: u8) -> Self {
        ParameterSnapshot {
            power: clamp_power(power),
            q_value,
            session,
            freq: FrequencyTable::for_selector(region_selector),
        }
    }

    /// Update the output power in place, clamped.
    pub fn set_power(&mut self, power: i32) {
        self.power = clamp_power(power);
    }

    /// Replace the frequency table from a region selector.
    pub fn set_region(&mut self, region_selector: i32) {
        self.freq = FrequencyTable::for_selector(region_selector);
    }

    /// The fields surfaced to callers of a full parameter read.
    pub fn config(&self) -> DeviceConfig {
        DeviceConfig {
            power: self.power,
            region: self.freq.region_id,
            q_value: self.q_value,
            session: self.session,
        }
    }
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        ParameterSnapshot {
            power: DEFAULT_POWER,
            q_value: DEFAULT_Q_VALUE,
            session: DEFAULT_SESSION,
            freq: Region::Etsi.frequency_table(),
        }
    }
}

/// What a full parameter read resolves with: the user-visible subset of the
/// snapshot, region as the wire id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub power: u8,
    pub region: u8,
    pub q_value: u8,
    pub session: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_bounds() {
        assert_eq!(clamp_power(4), 5);
        assert_eq!(clamp_power(-100), 5);
        assert_eq!(clamp_power(5), 5);
        assert_eq!(clamp_power(20), 20);
        assert_eq!(clamp_power(33), 33);
        assert_eq!(clamp_power(34), 33);
        assert_eq!(clamp_power(1000), 33);
    }

    #[test]
    fn test_region_lookup_is_total() {
        assert_eq!(Region::from_selector(1), Region::Fcc);
        assert_eq!(Region::from_selector(2), Region::Etsi);
        assert_eq!(Region::from_selector(0), Region::Etsi);
        assert_eq!(Region::from_selector(-1), Region::Etsi);
        assert_eq!(Region::from_selector(0x7FFF), Region::Etsi);
    }

    #[test]
    fn test_fcc_table() {
        let t = Region::Fcc.frequency_table();
        assert_eq!(t.region_id, 0x01);
        assert_eq!(t.start_freq_int, 0x0386);
        assert_eq!(t.start_freq_dec, 0x02EE);
        assert_eq!(t.step_freq, 0x01F4);
        assert_eq!(t.channel_count, 0x32);
    }

    #[test]
    fn test_etsi_table() {
        let t = Region::Etsi.frequency_table();
        assert_eq!(t.region_id, 0x03);
        assert_eq!(t.start_freq_int, 0x0361);
        assert_eq!(t.start_freq_dec, 0x0064);
        assert_eq!(t.step_freq, 0x00C8);
        assert_eq!(t.channel_count, 0x0F);
    }

    #[test]
    fn test_defaults_with_overrides() {
        let snap = ParameterSnapshot::from_defaults(40, 1, 6, 2);
        assert_eq!(snap.power, 33);
        assert_eq!(snap.q_value, 6);
        assert_eq!(snap.session, 2);
        assert_eq!(snap.freq.region_id, 0x01);
    }

    #[test]
    fn test_config_projection() {
        let snap = ParameterSnapshot::default();
        let cfg = snap.config();
        assert_eq!(cfg.power, 17);
        assert_eq!(cfg.region, 0x03);
        assert_eq!(cfg.q_value, 4);
        assert_eq!(cfg.session, 0);
    }
}
