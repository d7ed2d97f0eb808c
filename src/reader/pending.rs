//! # Pending-Response Correlator
//!
//! Commands are fire-and-forget; their outcomes arrive later as unrelated
//! notifications. This module holds at most one outstanding request per
//! response category and resolves it on the first of two terminal events:
//! the matching notification, or the category's deadline. The loser finds
//! the slot empty and becomes a no-op, so every request resolves exactly
//! once.
//!
//! Re-arming a category that is still outstanding replaces the previous
//! request: its sink is dropped without ever being invoked with a value
//! (the orphaned awaiter observes a closed channel). `arm_replacing` makes
//! that replacement explicit and reports it to the call site.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::ReaderError;
use crate::protocol::params::DeviceConfig;

struct Pending<T> {
    tx: oneshot::Sender<Result<T, ReaderError>>,
    deadline: Option<JoinHandle<()>>,
    generation: u64,
}

/// One response category's single-assignment completion cell.
pub(crate) struct PendingSlot<T> {
    inner: Arc<Mutex<SlotState<T>>>,
    category: &'static str,
}

struct SlotState<T> {
    pending: Option<Pending<T>>,
    next_generation: u64,
}

impl<T: Send + 'static> PendingSlot<T> {
    pub fn new(category: &'static str) -> Self {
        PendingSlot {
            inner: Arc::new(Mutex::new(SlotState {
                pending: None,
                next_generation: 0,
            })),
            category,
        }
    }

    /// Arm the slot, replacing (and orphaning) any outstanding request.
    ///
    /// With a timeout, a deadline task races the response; whichever side
    /// empties the slot first wins. Returns the receiver for the new
    /// request and whether a previous caller was orphaned.
    pub fn arm_replacing(
        &self,
        timeout: Option<Duration>,
    ) -> (oneshot::Receiver<Result<T, ReaderError>>, bool) {
        let (tx, rx) = oneshot::channel();

        let mut state = self.inner.lock().unwrap();
        let generation = state.next_generation;
        state.next_generation += 1;

        let orphaned = state.pending.take().map(|previous| {
            if let Some(deadline) = previous.deadline {
                deadline.abort();
            }
            // previous.tx drops here: the orphaned sink is never invoked
        });

        let deadline = timeout.map(|timeout| {
            let slot = Arc::clone(&self.inner);
            let category = self.category;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                let entry = {
                    let mut state = slot.lock().unwrap();
                    // Only expire the request this timer was armed for; a
                    // re-armed slot belongs to a newer timer.
                    let is_ours = state
                        .pending
                        .as_ref()
                        .is_some_and(|p| p.generation == generation);
                    if is_ours {
                        state.pending.take()
                    } else {
                        None
                    }
                };
                if let Some(pending) = entry {
                    warn!("{category} response not received before deadline");
                    let _ = pending.tx.send(Err(ReaderError::Timeout(category)));
                }
            })
        });

        state.pending = Some(Pending {
            tx,
            deadline,
            generation,
        });

        if orphaned.is_some() {
            warn!("replacing outstanding {} request", self.category);
        }
        (rx, orphaned.is_some())
    }

    /// Resolve the outstanding request with a value.
    ///
    /// Returns false when nothing was pending — a late response after a
    /// timeout or disconnect, which is ignored by design.
    pub fn resolve(&self, value: T) -> bool {
        match self.take() {
            Some(pending) => {
                let _ = pending.tx.send(Ok(value));
                true
            }
            None => {
                debug!("ignoring {} response with no pending request", self.category);
                false
            }
        }
    }

    /// Fail the outstanding request, if any.
    pub fn fail(&self, error: ReaderError) {
        if let Some(pending) = self.take() {
            let _ = pending.tx.send(Err(error));
        }
    }

    /// Drop the outstanding request without invoking its sink. Used when a
    /// command could not even be sent.
    pub fn disarm(&self) {
        self.take();
    }

    fn take(&self) -> Option<Pending<T>> {
        let pending = self.inner.lock().unwrap().pending.take();
        if let Some(pending) = &pending {
            if let Some(deadline) = &pending.deadline {
                deadline.abort();
            }
        }
        pending
    }
}

/// Await a correlated response, mapping an orphaned channel to an error.
pub(crate) async fn await_response<T>(
    rx: oneshot::Receiver<Result<T, ReaderError>>,
) -> Result<T, ReaderError> {
    match rx.await {
        Ok(outcome) => outcome,
        // Sender dropped without resolving: this caller was replaced.
        Err(_) => Err(ReaderError::Unexpected(
            "pending request replaced by a newer one".into(),
        )),
    }
}

/// The three response categories this protocol correlates.
pub(crate) struct Correlator {
    pub battery: PendingSlot<u8>,
    pub all_params: PendingSlot<DeviceConfig>,
    pub flash: PendingSlot<()>,
}

impl Correlator {
    pub fn new() -> Self {
        Correlator {
            battery: PendingSlot::new("battery"),
            all_params: PendingSlot::new("all-parameters"),
            flash: PendingSlot::new("flash-persist"),
        }
    }

    /// Fail every outstanding request with the same reason. Called on
    /// disconnect so nothing is left to hang or time out.
    pub fn fail_all(&self, error: &ReaderError) {
        self.battery.fail(error.clone());
        self.all_params.fail(error.clone());
        self.flash.fail(error.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_response_resolves_once() {
        let slot: PendingSlot<u8> = PendingSlot::new("battery");
        let (rx, orphaned) = slot.arm_replacing(Some(Duration::from_secs(5)));
        assert!(!orphaned);

        assert!(slot.resolve(87));
        assert_eq!(await_response(rx).await.unwrap(), 87);

        // late duplicate is a no-op
        assert!(!slot.resolve(42));
    }

    #[tokio::test]
    async fn test_timeout_resolves_and_late_response_ignored() {
        tokio::time::pause();
        let slot: PendingSlot<u8> = PendingSlot::new("battery");
        let (rx, _) = slot.arm_replacing(Some(Duration::from_millis(100)));

        tokio::time::advance(Duration::from_millis(150)).await;
        assert_eq!(
            await_response(rx).await.unwrap_err(),
            ReaderError::Timeout("battery")
        );
        assert!(!slot.resolve(87));
    }

    #[tokio::test]
    async fn test_rearm_orphans_previous_caller() {
        let slot: PendingSlot<u8> = PendingSlot::new("battery");
        let (first_rx, _) = slot.arm_replacing(None);
        let (second_rx, orphaned) = slot.arm_replacing(None);
        assert!(orphaned);

        slot.resolve(1);
        assert!(matches!(
            await_response(first_rx).await,
            Err(ReaderError::Unexpected(_))
        ));
        assert_eq!(await_response(second_rx).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stale_deadline_cannot_expire_rearmed_slot() {
        tokio::time::pause();
        let slot: PendingSlot<u8> = PendingSlot::new("battery");
        let (_first_rx, _) = slot.arm_replacing(Some(Duration::from_millis(100)));

        // Re-arm with a longer deadline; the first timer must not fire it.
        let (second_rx, _) = slot.arm_replacing(Some(Duration::from_millis(500)));
        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(slot.resolve(9));
        assert_eq!(await_response(second_rx).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_fail_all_on_disconnect() {
        let correlator = Correlator::new();
        let (battery_rx, _) = correlator.battery.arm_replacing(None);
        let (params_rx, _) = correlator.all_params.arm_replacing(None);

        correlator.fail_all(&ReaderError::Disconnected);
        assert_eq!(
            await_response(battery_rx).await.unwrap_err(),
            ReaderError::Disconnected
        );
        assert_eq!(
            await_response(params_rx).await.unwrap_err(),
            ReaderError::Disconnected
        );
    }
}
