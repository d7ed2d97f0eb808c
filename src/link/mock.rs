//! Mock BLE link implementation for testing
//!
//! This module provides a mock transport that can be scripted to test the
//! session engine without requiring actual hardware: writes are captured,
//! notifications and link events are injected through a cloneable handle.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ReaderError;
use crate::link::transport::{BleLink, LinkEvent};
use crate::protocol::record::DeviceRecord;

#[derive(Default)]
struct Shared {
    /// Frames written to the command characteristic, in order
    written: Mutex<Vec<Vec<u8>>>,
    /// Addresses the mock will accept connections to
    known_devices: Mutex<HashSet<String>>,
    connected: AtomicBool,
    scanning: AtomicBool,
    /// Remaining write attempts to fail before succeeding again
    failing_writes: AtomicU32,
    /// Command codes (frame byte 3) whose writes always fail
    failing_commands: Mutex<HashSet<u8>>,
    fail_connect: AtomicBool,
    fail_notify_enable: AtomicBool,
}

/// Mock BLE link that simulates the reader side of the notification channel.
pub struct MockLink {
    shared: Arc<Shared>,
    events_tx: mpsc::UnboundedSender<LinkEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<LinkEvent>>,
}

/// Cloneable test handle: injects notifications and inspects written frames.
#[derive(Clone)]
pub struct MockLinkHandle {
    shared: Arc<Shared>,
    events_tx: mpsc::UnboundedSender<LinkEvent>,
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLink {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        MockLink {
            shared: Arc::new(Shared::default()),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Handle for scripting this link from a test.
    pub fn handle(&self) -> MockLinkHandle {
        MockLinkHandle {
            shared: Arc::clone(&self.shared),
            events_tx: self.events_tx.clone(),
        }
    }
}

impl MockLinkHandle {
    /// Make an address connectable.
    pub fn add_known_device(&self, address: &str) {
        self.shared
            .known_devices
            .lock()
            .unwrap()
            .insert(address.to_string());
    }

    /// Deliver a raw notification frame.
    pub fn push_raw(&self, bytes: &[u8]) {
        let _ = self.events_tx.send(LinkEvent::Raw(bytes.to_vec()));
    }

    /// Deliver a decoded notification record.
    pub fn push_record(&self, record: DeviceRecord) {
        let _ = self.events_tx.send(LinkEvent::Record(record));
    }

    /// Simulate a scan discovery.
    pub fn push_discovered(&self, name: &str, address: &str, rssi: i32) {
        let _ = self.events_tx.send(LinkEvent::DeviceDiscovered {
            name: name.to_string(),
            address: address.to_string(),
            rssi,
        });
    }

    /// Simulate a radio-level scan failure.
    pub fn push_scan_failure(&self, code: i32) {
        let _ = self.events_tx.send(LinkEvent::ScanFailed { code });
    }

    /// Drop the connection out from under the engine.
    pub fn drop_link(&self) {
        self.shared.connected.store(false, Ordering::SeqCst);
        let _ = self.events_tx.send(LinkEvent::Disconnected);
    }

    /// All frames written so far.
    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        self.shared.written.lock().unwrap().clone()
    }

    /// Command codes (byte 3) of all frames written so far.
    pub fn written_commands(&self) -> Vec<u8> {
        self.written_frames()
            .iter()
            .filter_map(|f| f.get(3).copied())
            .collect()
    }

    /// Clear the captured writes.
    pub fn clear_written(&self) {
        self.shared.written.lock().unwrap().clear();
    }

    /// Fail the next `n` write attempts.
    pub fn fail_next_writes(&self, n: u32) {
        self.shared.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Fail every write of one command code until cleared.
    pub fn fail_command(&self, cmd: u8) {
        self.shared.failing_commands.lock().unwrap().insert(cmd);
    }

    /// Let all command codes through again.
    pub fn clear_failing_commands(&self) {
        self.shared.failing_commands.lock().unwrap().clear();
    }

    /// Make the next connect attempt fail.
    pub fn fail_connect(&self, fail: bool) {
        self.shared.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Make enabling notifications fail.
    pub fn fail_notify_enable(&self, fail: bool) {
        self.shared.fail_notify_enable.store(fail, Ordering::SeqCst);
    }

    pub fn is_scanning(&self) -> bool {
        self.shared.scanning.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BleLink for MockLink {
    async fn start_scan(&mut self) -> Result<(), ReaderError> {
        self.shared.scanning.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_scan(&mut self) -> Result<(), ReaderError> {
        self.shared.scanning.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn connect(&mut self, address: &str) -> Result<(), ReaderError> {
        if self.shared.fail_connect.load(Ordering::SeqCst) {
            return Err(ReaderError::ConnectionFailed("mock refused".into()));
        }
        let known = self.shared.known_devices.lock().unwrap();
        if !known.is_empty() && !known.contains(address) {
            return Err(ReaderError::ConnectionFailed(format!(
                "no such device: {address}"
            )));
        }
        drop(known);
        self.shared.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn enable_notifications(&mut self) -> Result<(), ReaderError> {
        if self.shared.fail_notify_enable.load(Ordering::SeqCst) {
            return Err(ReaderError::NotifyEnableFailed("mock refused".into()));
        }
        Ok(())
    }

    async fn write(&mut self, payload: &[u8]) -> Result<(), ReaderError> {
        if !self.shared.connected.load(Ordering::SeqCst) {
            return Err(ReaderError::WriteFailed("not connected".into()));
        }
        let failing = self.shared.failing_writes.load(Ordering::SeqCst);
        if failing > 0 {
            self.shared
                .failing_writes
                .store(failing - 1, Ordering::SeqCst);
            return Err(ReaderError::WriteFailed("mock write failure".into()));
        }
        if let Some(cmd) = payload.get(3) {
            if self.shared.failing_commands.lock().unwrap().contains(cmd) {
                return Err(ReaderError::WriteFailed(format!(
                    "mock write failure for command 0x{cmd:02X}"
                )));
            }
        }
        self.shared.written.lock().unwrap().push(payload.to_vec());
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ReaderError> {
        self.shared.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<LinkEvent>> {
        self.events_rx.take()
    }
}
