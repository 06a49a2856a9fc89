//! Broadcast event
//!
//! A wait/signal object where every `broadcast` retires the current signal
//! slot (waking everyone blocked on it) and installs a fresh one. A waiter
//! therefore always blocks on the *next* broadcast and never observes a stale
//! signal, without any manual reset.
//!
//! `close` removes the slot altogether: waiters are released with
//! [`WaitStatus::Closed`] and later waits return immediately until the event
//! is reopened by `broadcast` or `reopen`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use super::spin::SpinMutex;
use crate::error::SyncError;

/// Lock attempts a broadcast makes before giving up with `LockBusy`
const BROADCAST_ATTEMPTS: u32 = 64;

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// Woken by a broadcast
    Signaled,
    /// The event was closed, before or during the wait
    Closed,
}

/// One generation of the event
#[derive(Debug, Default)]
struct Slot {
    fired: Mutex<Option<WaitStatus>>,
    cond: Condvar,
    waiters: AtomicUsize,
}

impl Slot {
    fn fire(&self, status: WaitStatus) {
        let mut fired = self.fired.lock().unwrap_or_else(PoisonError::into_inner);
        if fired.is_none() {
            *fired = Some(status);
        }
        self.cond.notify_all();
    }

    fn poll(&self) -> Option<WaitStatus> {
        *self.fired.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait(&self) -> WaitStatus {
        self.waiters.fetch_add(1, Ordering::SeqCst);
        let fired = self.fired.lock().unwrap_or_else(PoisonError::into_inner);
        let fired = self
            .cond
            .wait_while(fired, |fired| fired.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        self.waiters.fetch_sub(1, Ordering::SeqCst);
        (*fired).unwrap_or(WaitStatus::Signaled)
    }

    fn wait_timeout(&self, timeout: Duration) -> Option<WaitStatus> {
        self.waiters.fetch_add(1, Ordering::SeqCst);
        let fired = self.fired.lock().unwrap_or_else(PoisonError::into_inner);
        let (fired, _) = self
            .cond
            .wait_timeout_while(fired, timeout, |fired| fired.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        self.waiters.fetch_sub(1, Ordering::SeqCst);
        *fired
    }
}

/// Level-triggered broadcast event
#[derive(Debug)]
pub struct BroadcastEvent {
    slot: SpinMutex<Option<Arc<Slot>>>,
}

impl Default for BroadcastEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastEvent {
    /// Create an open event
    pub fn new() -> Self {
        Self {
            slot: SpinMutex::new(Some(Arc::new(Slot::default()))),
        }
    }

    /// Wake every current waiter and arm a fresh slot
    ///
    /// Best effort: if the internal lock stays contended the broadcast is
    /// abandoned with [`SyncError::LockBusy`] and the caller may retry.
    /// Broadcasting a closed event reopens it.
    pub fn broadcast(&self) -> Result<(), SyncError> {
        let previous = {
            let mut slot = self.slot.try_lock(BROADCAST_ATTEMPTS)?;
            slot.replace(Arc::new(Slot::default()))
        };

        if let Some(previous) = previous {
            previous.fire(WaitStatus::Signaled);
        }
        Ok(())
    }

    /// Close the event, waking every current waiter
    pub fn close(&self) {
        let previous = self.slot.lock().take();
        if let Some(previous) = previous {
            previous.fire(WaitStatus::Closed);
        }
    }

    /// Arm a fresh slot if the event is closed; no-op otherwise
    pub fn reopen(&self) {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            *slot = Some(Arc::new(Slot::default()));
        }
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().is_none()
    }

    /// Number of parties blocked on the live slot
    pub fn waiters(&self) -> usize {
        self.slot
            .lock()
            .as_ref()
            .map_or(0, |slot| slot.waiters.load(Ordering::SeqCst))
    }

    fn current(&self) -> Option<Arc<Slot>> {
        self.slot.lock().clone()
    }

    /// Block until the next broadcast or close
    pub fn wait(&self) -> WaitStatus {
        match self.current() {
            Some(slot) => slot.wait(),
            None => WaitStatus::Closed,
        }
    }

    /// Block until the next broadcast or close, or until `timeout` expires
    ///
    /// A zero timeout only polls.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<WaitStatus, SyncError> {
        let Some(slot) = self.current() else {
            return Ok(WaitStatus::Closed);
        };

        let fired = if timeout.is_zero() {
            slot.poll()
        } else {
            slot.wait_timeout(timeout)
        };
        fired.ok_or(SyncError::WaitTimeout)
    }
}
