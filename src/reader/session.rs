//! # Session State
//!
//! One session per connected reader: the readiness state machine gating all
//! traffic, plus the state every other component shares — the cached
//! parameter snapshot, the inventory state, the radar filter, the pending
//! request slots and the outward event channel. All of it is owned here and
//! reached only through [`SessionInner`], never as loose flags.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use log::{debug, info};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::constants::{READY_POLL, READY_WAIT};
use crate::error::ReaderError;
use crate::protocol::params::ParameterSnapshot;
use crate::reader::event::ReaderEvent;
use crate::reader::inventory::{InventoryState, RadarFilter};
use crate::reader::oplock::OpLock;
use crate::reader::pending::Correlator;

/// Readiness of the notification link.
///
/// Only `Ready` lets operations through. `ReadySettling` covers the fixed
/// delay after enabling notifications: the enable write needs time to
/// propagate on the device side before any command can be trusted to be
/// answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Connecting,
    EnablingNotify,
    ReadySettling,
    Ready,
}

/// Shared session state, one instance per [`ReaderHandle`](crate::reader::ReaderHandle).
pub(crate) struct SessionInner {
    state: Mutex<LinkState>,
    pub op_lock: OpLock,
    pub(crate) inventory: Mutex<InventoryState>,
    pub snapshot: Mutex<Option<ParameterSnapshot>>,
    pub(crate) radar: Mutex<Option<RadarFilter>>,
    pub pending: Correlator,
    events_tx: mpsc::UnboundedSender<ReaderEvent>,
    /// Devices seen while scanning, keyed by address
    discovered: Mutex<HashMap<String, String>>,
    scanning: AtomicBool,
}

impl SessionInner {
    pub fn new(events_tx: mpsc::UnboundedSender<ReaderEvent>) -> Self {
        SessionInner {
            state: Mutex::new(LinkState::Idle),
            op_lock: OpLock::default(),
            inventory: Mutex::new(InventoryState::Stopped),
            snapshot: Mutex::new(None),
            radar: Mutex::new(None),
            pending: Correlator::new(),
            events_tx,
            discovered: Mutex::new(HashMap::new()),
            scanning: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> LinkState {
        *self.state.lock().unwrap()
    }

    pub fn set_state(&self, state: LinkState) {
        debug!("link state -> {state:?}");
        *self.state.lock().unwrap() = state;
    }

    pub fn is_ready(&self) -> bool {
        self.state() == LinkState::Ready
    }

    /// Bounded poll for readiness, absorbing the settle window. Returns
    /// false if the link still is not ready after the full wait.
    pub async fn wait_ready(&self) -> bool {
        let deadline = Instant::now() + READY_WAIT;
        loop {
            if self.is_ready() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    /// Emit an outward event. Send failures mean the embedder dropped the
    /// receiver, which is not this crate's problem.
    pub fn emit(&self, event: ReaderEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Collapse to `Idle`, clearing everything a connection carried:
    /// the parameter snapshot, the inventory state and every pending
    /// request (each failed with `reason`). Safe to call repeatedly.
    pub fn teardown(&self, reason: ReaderError) {
        info!("session teardown: {reason}");
        self.set_state(LinkState::Idle);
        *self.snapshot.lock().unwrap() = None;
        *self.inventory.lock().unwrap() = InventoryState::Stopped;
        self.pending.fail_all(&reason);
    }

    // ---- scan bookkeeping -------------------------------------------------

    pub fn set_scanning(&self, scanning: bool) {
        self.scanning.store(scanning, Ordering::SeqCst);
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// Record a scan discovery; returns false for an address already seen
    /// (duplicates are not re-announced).
    pub fn record_discovery(&self, address: &str, name: &str) -> bool {
        self.discovered
            .lock()
            .unwrap()
            .insert(address.to_string(), name.to_string())
            .is_none()
    }

    pub fn was_discovered(&self, address: &str) -> bool {
        self.discovered.lock().unwrap().contains_key(address)
    }
}
