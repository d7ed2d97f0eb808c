//! # Inventory and Radar State
//!
//! Continuous inventory is driven optimistically: state moves on
//! transport-accepted sends and is later confirmed or revoked by the
//! asynchronous status acks. Readers of [`InventoryState`] must treat it
//! as eventually consistent, not transactional.
//!
//! The radar filter is an overlay on the running inventory: while active,
//! observations of one tracked tag are diverted from the general tag
//! stream to the proximity stream.

use log::warn;
use serde::Serialize;

use crate::reader::session::SessionInner;

/// Lifecycle of the continuous inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InventoryState {
    Stopped,
    /// Start command issued, send not yet accepted.
    Starting,
    /// Optimistically running; a start ack may still revoke this.
    Running,
    /// Stop command issued, send not yet accepted.
    Stopping,
}

/// The tracked tag while radar mode is active.
#[derive(Debug, Clone)]
pub(crate) struct RadarFilter {
    pub epc: String,
    pub active: bool,
}

impl RadarFilter {
    /// Whether an observed EPC is the tracked one (hex, case-insensitive).
    pub fn matches(&self, epc: &str) -> bool {
        self.active && self.epc.eq_ignore_ascii_case(epc)
    }
}

impl SessionInner {
    pub fn inventory_state(&self) -> InventoryState {
        *self.inventory.lock().unwrap()
    }

    pub fn set_inventory_state(&self, state: InventoryState) {
        *self.inventory.lock().unwrap() = state;
    }

    /// Apply a start-inventory acknowledgement: status 0 confirms the
    /// optimistic `Running`, anything else revokes it. The revocation is
    /// silent towards the original caller; the state simply corrects.
    pub fn apply_start_ack(&self, ok: bool) {
        if ok {
            self.set_inventory_state(InventoryState::Running);
        } else {
            warn!("inventory start rejected by reader, reverting to stopped");
            self.set_inventory_state(InventoryState::Stopped);
        }
    }

    /// Apply a stop acknowledgement: stop wins regardless of status.
    pub fn apply_stop_ack(&self) {
        self.set_inventory_state(InventoryState::Stopped);
    }

    // ---- radar overlay ----------------------------------------------------

    pub fn set_radar_target(&self, epc: &str) {
        *self.radar.lock().unwrap() = Some(RadarFilter {
            epc: epc.to_string(),
            active: true,
        });
    }

    pub fn clear_radar_target(&self) {
        *self.radar.lock().unwrap() = None;
    }

    /// The proximity target an observed EPC matches, if radar is active.
    pub fn radar_matches(&self, epc: &str) -> bool {
        self.radar
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|filter| filter.matches(epc))
    }
}
