//! # Reader Session Engine
//!
//! This module provides the [`ReaderHandle`] struct, the main entry point
//! for driving an H103 reader over a notification-based BLE link. It gates
//! every operation behind the readiness handshake, serializes the
//! mutually-exclusive parameter operations, correlates fire-and-forget
//! writes with the notifications that answer them, and keeps the cached
//! parameter snapshot consistent with what was actually written.
//!
//! Construction yields the handle plus the event receiver carrying the
//! outward streams (discoveries, tag observations, proximity signals,
//! battery reports, errors).

pub mod event;
pub mod inventory;
pub(crate) mod oplock;
pub(crate) mod pending;
pub(crate) mod router;
pub mod session;

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;

use crate::constants::{
    BATTERY_TIMEOUT, DEFAULT_Q_VALUE, DEFAULT_SESSION, FLASH_TIMEOUT,
    INVENTORY_START_SETTLE, NOTIFY_SETTLE, PARAM_WRITE_SETTLE, WRITE_ATTEMPTS,
    WRITE_BACKOFF,
};
use crate::error::ReaderError;
use crate::link::transport::BleLink;
use crate::protocol::cmd;
use crate::protocol::params::{DeviceConfig, ParameterSnapshot};
use crate::reader::event::ReaderEvent;
use crate::reader::inventory::InventoryState;
use crate::reader::pending::await_response;
use crate::reader::session::{LinkState, SessionInner};

/// Acknowledgement token an operation resolves with when it succeeds.
///
/// `Sent` acknowledges transport acceptance only; whether the device acted
/// is established by a later notification (or not at all, for best-effort
/// commands).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandAck {
    /// Command handed to the transport; outcome arrives as an event.
    Sent,
    /// Parameters written to reader RAM, not persisted.
    Written,
    /// Parameter block persisted to non-volatile storage.
    FlashSaved,
    InventoryStarted,
    InventoryStopped,
    RadarStarted,
    RadarStopped,
}

/// Parameters for a full write-and-persist, with the reader's factory-style
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetAllParams {
    pub power: i32,
    /// Region selector: 1 = FCC, anything else ETSI.
    pub region: i32,
    pub q_value: u8,
    pub session: u8,
}

impl Default for SetAllParams {
    fn default() -> Self {
        SetAllParams {
            power: 17,
            region: 2,
            q_value: 4,
            session: 0,
        }
    }
}

/// Handle to one reader session over a BLE transport backend.
pub struct ReaderHandle<L: BleLink> {
    link: Arc<Mutex<L>>,
    session: Arc<SessionInner>,
}

impl<L: BleLink> ReaderHandle<L> {
    /// Wrap a transport backend. Returns the handle and the receiver for
    /// the outward event streams.
    ///
    /// The dispatch task binds to the link's event channel here, so scan
    /// discoveries are tracked before any connection exists.
    pub fn new(mut link: L) -> (Self, mpsc::UnboundedReceiver<ReaderEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = Arc::new(SessionInner::new(events_tx));
        if let Some(events) = link.take_events() {
            router::spawn_dispatch(Arc::clone(&session), events);
        }
        let handle = ReaderHandle {
            link: Arc::new(Mutex::new(link)),
            session,
        };
        (handle, events_rx)
    }

    // ---- discovery --------------------------------------------------------

    /// Begin scanning; discoveries arrive as `DeviceDiscovered` events,
    /// de-duplicated by address. Calling while already scanning is a no-op.
    pub async fn start_scan(&self) -> Result<(), ReaderError> {
        if self.session.is_scanning() {
            debug!("scan already running");
            return Ok(());
        }
        self.link
            .lock()
            .await
            .start_scan()
            .await
            .map_err(|e| ReaderError::Unexpected(format!("scan not started: {e}")))?;
        self.session.set_scanning(true);
        Ok(())
    }

    /// Stop scanning. A no-op when no scan is running.
    pub async fn stop_scan(&self) -> Result<(), ReaderError> {
        if !self.session.is_scanning() {
            return Ok(());
        }
        self.link
            .lock()
            .await
            .stop_scan()
            .await
            .map_err(|e| ReaderError::Unexpected(format!("scan not stopped: {e}")))?;
        self.session.set_scanning(false);
        Ok(())
    }

    // ---- connection lifecycle ---------------------------------------------

    /// Connect to a previously discovered device and walk the readiness
    /// handshake: connect, enable notifications, settle, ready. Any failure
    /// along the way collapses back to `Idle`.
    pub async fn connect(&self, address: &str) -> Result<(), ReaderError> {
        if self.session.is_scanning() {
            let _ = self.stop_scan().await;
        }
        if !self.session.was_discovered(address) {
            return Err(ReaderError::DeviceNotFound(address.to_string()));
        }

        self.session.set_state(LinkState::Connecting);
        if let Err(error) = self.link.lock().await.connect(address).await {
            self.session.set_state(LinkState::Idle);
            return Err(error);
        }

        self.session.set_state(LinkState::EnablingNotify);
        if let Err(error) = self.link.lock().await.enable_notifications().await {
            self.session.set_state(LinkState::Idle);
            return Err(error);
        }

        // Give the enable-notification write time to propagate device-side
        // before trusting any command to be answered.
        self.session.set_state(LinkState::ReadySettling);
        sleep(NOTIFY_SETTLE).await;
        self.session.set_state(LinkState::Ready);
        info!("link ready: {address}");
        Ok(())
    }

    /// Tear the connection down, failing every pending request and emitting
    /// the disconnected event.
    pub async fn disconnect(&self) -> Result<(), ReaderError> {
        self.link
            .lock()
            .await
            .disconnect()
            .await
            .map_err(|e| ReaderError::Unexpected(format!("disconnect failed: {e}")))?;
        self.session.teardown(ReaderError::Disconnected);
        self.session.emit(ReaderEvent::Disconnected);
        Ok(())
    }

    /// Whether the transport currently holds a connection.
    pub async fn is_connected(&self) -> bool {
        self.link.lock().await.is_connected()
    }

    /// Current readiness state of the session.
    pub fn link_state(&self) -> LinkState {
        self.session.state()
    }

    /// Current inventory state. Eventually consistent: asynchronous acks
    /// may still correct an optimistic transition.
    pub fn inventory_state(&self) -> InventoryState {
        self.session.inventory_state()
    }

    /// The cached parameter snapshot, if a read or write has populated it.
    pub fn cached_parameters(&self) -> Option<ParameterSnapshot> {
        self.session.snapshot.lock().unwrap().clone()
    }

    // ---- battery ----------------------------------------------------------

    /// Request the battery level. Resolves with `Sent` once the command is
    /// on the air; the level itself arrives as a `BatteryLevel` event, or
    /// `BatteryTimeout` if the reader stays silent for 5 s.
    pub async fn get_battery(&self) -> Result<CommandAck, ReaderError> {
        if !self.session.wait_ready().await {
            return Err(ReaderError::NotReady);
        }

        let (rx, _) = self.session.pending.battery.arm_replacing(Some(BATTERY_TIMEOUT));
        if !self.send_with_retry(&cmd::build_get_battery_cmd()).await {
            self.session.pending.battery.disarm();
            return Err(ReaderError::WriteFailed("battery command not sent".into()));
        }

        let session = Arc::clone(&self.session);
        tokio::spawn(async move {
            match await_response(rx).await {
                Ok(level) => session.emit(ReaderEvent::BatteryLevel { level }),
                Err(ReaderError::Timeout(_)) => session.emit(ReaderEvent::BatteryTimeout),
                Err(error) => debug!("battery request abandoned: {error}"),
            }
        });
        Ok(CommandAck::Sent)
    }

    // ---- parameters -------------------------------------------------------

    /// Read the full parameter block. Refreshes the cached snapshot
    /// wholesale and resolves with the user-visible fields.
    ///
    /// No deadline is armed internally; wrap the call in
    /// `tokio::time::timeout` for a bound. A disconnect fails the call
    /// rather than leaving it to hang.
    pub async fn get_all_parameters(&self) -> Result<DeviceConfig, ReaderError> {
        if !self.session.wait_ready().await {
            return Err(ReaderError::NotReady);
        }

        let (rx, _) = self.session.pending.all_params.arm_replacing(None);
        if !self.send_with_retry(&cmd::build_get_all_param_cmd()).await {
            self.session.pending.all_params.disarm();
            return Err(ReaderError::WriteFailed("parameter read not sent".into()));
        }
        await_response(rx).await
    }

    /// Write the full parameter set to RAM and persist it, resuming a
    /// running inventory afterwards regardless of outcome.
    pub async fn set_all_parameters(&self, params: SetAllParams) -> Result<CommandAck, ReaderError> {
        let _guard = self.session.op_lock.try_acquire().ok_or(ReaderError::Busy)?;
        let was_running = self.session.inventory_state() == InventoryState::Running;

        if !self.session.wait_ready().await {
            return Err(ReaderError::NotReady);
        }

        if was_running {
            self.internal_stop_inventory().await;
            sleep(PARAM_WRITE_SETTLE).await;
        }

        let snapshot = {
            let mut cache = self.session.snapshot.lock().unwrap();
            let snapshot = match cache.take() {
                None => ParameterSnapshot::from_defaults(
                    params.power,
                    params.region,
                    params.q_value,
                    params.session,
                ),
                Some(mut existing) => {
                    existing.set_power(params.power);
                    existing.q_value = params.q_value;
                    existing.session = params.session;
                    existing.set_region(params.region);
                    existing
                }
            };
            *cache = Some(snapshot.clone());
            snapshot
        };

        if !self.send_with_retry(&cmd::build_set_all_param_cmd(&snapshot)).await {
            self.resume_inventory_if(was_running).await;
            return Err(ReaderError::WriteFailed("parameters not written to RAM".into()));
        }

        let outcome = self.persist_to_flash().await;
        self.resume_inventory_if(was_running).await;
        outcome
    }

    /// Write only the output power (and optionally the region), with
    /// explicit control over persistence and inventory resumption.
    ///
    /// `region` of -1 leaves the cached region untouched. Unspecified
    /// fields come from the cached snapshot, or from the reader defaults
    /// when nothing is cached yet.
    pub async fn set_output_power(
        &self,
        power: i32,
        save_to_flash: bool,
        resume_inventory: bool,
        region: i32,
    ) -> Result<CommandAck, ReaderError> {
        debug!(
            "set_output_power(power={power}, save={save_to_flash}, \
             resume={resume_inventory}, region={region})"
        );
        let _guard = self.session.op_lock.try_acquire().ok_or(ReaderError::Busy)?;
        let was_running = self.session.inventory_state() == InventoryState::Running;
        let resume = resume_inventory && was_running;

        if !self.session.wait_ready().await {
            return Err(ReaderError::NotReady);
        }

        if was_running {
            self.internal_stop_inventory().await;
            sleep(PARAM_WRITE_SETTLE).await;
        }

        let snapshot = {
            let mut cache = self.session.snapshot.lock().unwrap();
            let snapshot = match cache.take() {
                None => {
                    // No snapshot yet: -1 means "leave region alone", which
                    // without a cache falls back to the ETSI default.
                    let effective_region = if region == -1 { 2 } else { region };
                    ParameterSnapshot::from_defaults(
                        power,
                        effective_region,
                        DEFAULT_Q_VALUE,
                        DEFAULT_SESSION,
                    )
                }
                Some(mut existing) => {
                    existing.set_power(power);
                    if region != -1 {
                        existing.set_region(region);
                    }
                    existing
                }
            };
            *cache = Some(snapshot.clone());
            snapshot
        };

        if !self.send_with_retry(&cmd::build_set_all_param_cmd(&snapshot)).await {
            self.resume_inventory_if(resume).await;
            return Err(ReaderError::WriteFailed("parameters not written to RAM".into()));
        }

        let outcome = if save_to_flash {
            self.persist_to_flash().await
        } else {
            Ok(CommandAck::Written)
        };
        self.resume_inventory_if(resume).await;
        outcome
    }

    /// Send the hand-built persist frame and wait for the flash ack.
    async fn persist_to_flash(&self) -> Result<CommandAck, ReaderError> {
        debug!("sending flash persist command");
        let (rx, _) = self.session.pending.flash.arm_replacing(Some(FLASH_TIMEOUT));
        if !self.send_with_retry(&cmd::build_save_flash_cmd()).await {
            self.session.pending.flash.disarm();
            return Err(ReaderError::WriteFailed("flash command not sent".into()));
        }
        await_response(rx).await.map(|()| CommandAck::FlashSaved)
    }

    // ---- inventory --------------------------------------------------------

    /// Start continuous inventory. A defensive stop goes out first — the
    /// device may still be mid-inventory from a prior session — then the
    /// start command; `Running` is set optimistically on transport accept
    /// and later confirmed or revoked by the start ack.
    pub async fn start_inventory(&self) -> Result<CommandAck, ReaderError> {
        if !self.session.wait_ready().await {
            return Err(ReaderError::NotReady);
        }
        let _guard = self.session.op_lock.try_acquire().ok_or(ReaderError::Busy)?;

        let _ = self.send_with_retry(&cmd::build_stop_inventory_cmd()).await;
        sleep(INVENTORY_START_SETTLE).await;

        self.session.set_inventory_state(InventoryState::Starting);
        if self.send_with_retry(&cmd::build_inventory_continue_cmd()).await {
            self.session.set_inventory_state(InventoryState::Running);
            Ok(CommandAck::InventoryStarted)
        } else {
            self.session.set_inventory_state(InventoryState::Stopped);
            Err(ReaderError::WriteFailed("inventory start not sent".into()))
        }
    }

    /// Stop continuous inventory. Best-effort: the state is set to
    /// `Stopped` on transport accept without waiting for the ack.
    pub async fn stop_inventory(&self) -> Result<CommandAck, ReaderError> {
        if !self.session.wait_ready().await {
            return Err(ReaderError::NotReady);
        }

        let previous = self.session.inventory_state();
        self.session.set_inventory_state(InventoryState::Stopping);
        if self.send_with_retry(&cmd::build_stop_inventory_cmd()).await {
            self.session.set_inventory_state(InventoryState::Stopped);
            Ok(CommandAck::InventoryStopped)
        } else {
            self.session.set_inventory_state(previous);
            Err(ReaderError::WriteFailed("inventory stop not sent".into()))
        }
    }

    // ---- radar ------------------------------------------------------------

    /// Track one tag: matching observations divert to the proximity
    /// stream. Starts inventory if it is not already running.
    pub async fn track_tag(&self, epc: &str) -> Result<CommandAck, ReaderError> {
        if epc.trim().is_empty() {
            return Err(ReaderError::InvalidArgument("EPC cannot be empty".into()));
        }
        if !self.session.wait_ready().await {
            return Err(ReaderError::NotReady);
        }

        self.session.set_radar_target(epc);

        if self.session.inventory_state() != InventoryState::Running {
            self.session.set_inventory_state(InventoryState::Starting);
            if self.send_with_retry(&cmd::build_inventory_continue_cmd()).await {
                self.session.set_inventory_state(InventoryState::Running);
            } else {
                self.session.set_inventory_state(InventoryState::Stopped);
                return Err(ReaderError::WriteFailed("radar start not sent".into()));
            }
        }
        Ok(CommandAck::RadarStarted)
    }

    /// Stop tracking and stop inventory (best-effort).
    pub async fn untrack_tag(&self) -> Result<CommandAck, ReaderError> {
        if !self.session.wait_ready().await {
            return Err(ReaderError::NotReady);
        }

        self.session.clear_radar_target();
        let _ = self.send_with_retry(&cmd::build_stop_inventory_cmd()).await;
        self.session.set_inventory_state(InventoryState::Stopped);
        Ok(CommandAck::RadarStopped)
    }

    // ---- single-tag read --------------------------------------------------

    /// Read one tag from the given memory bank. Resolves with `Sent`; the
    /// result arrives as a `SingleReadResult` event.
    pub async fn read_single_tag(&self, memory_bank: u8) -> Result<CommandAck, ReaderError> {
        if !self.session.wait_ready().await {
            return Err(ReaderError::NotReady);
        }
        if self.send_with_retry(&cmd::build_read_tag_cmd(memory_bank)).await {
            Ok(CommandAck::Sent)
        } else {
            Err(ReaderError::WriteFailed("read-tag command not sent".into()))
        }
    }

    // ---- internals --------------------------------------------------------

    /// Best-effort delivery: up to three transport writes with a growing
    /// backoff. True means the transport accepted the bytes, nothing more.
    async fn send_with_retry(&self, payload: &[u8]) -> bool {
        for attempt in 1..=WRITE_ATTEMPTS {
            match self.link.lock().await.write(payload).await {
                Ok(()) => return true,
                Err(error) => {
                    warn!("write attempt {attempt}/{WRITE_ATTEMPTS} failed: {error}");
                    sleep(WRITE_BACKOFF * attempt).await;
                }
            }
        }
        false
    }

    /// Resume after a parameter write when the caller asked for it and
    /// inventory was running before. No defensive stop, no settle: the
    /// radio was stopped by this very operation.
    async fn resume_inventory_if(&self, resume: bool) {
        if resume {
            self.internal_start_inventory().await;
        }
    }

    async fn internal_start_inventory(&self) {
        if self.send_with_retry(&cmd::build_inventory_continue_cmd()).await {
            self.session.set_inventory_state(InventoryState::Running);
        }
    }

    async fn internal_stop_inventory(&self) {
        if self.send_with_retry(&cmd::build_stop_inventory_cmd()).await {
            self.session.set_inventory_state(InventoryState::Stopped);
        }
    }
}
