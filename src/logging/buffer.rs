//! Double-buffered record queue
//!
//! Producers append to the "incoming" vector under a spin lock. The single
//! consumer owns the "draining" vector and exchanges it with the incoming one
//! in one swap, so a whole batch changes hands without copying and both
//! allocations are reused from cycle to cycle.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::entry::LogEntry;
use crate::error::SyncError;
use crate::sync::SpinMutex;

/// Thread-safe incoming queue of log entries
#[derive(Debug, Default)]
pub struct LogRecordBuffer {
    /// Entries appended since the last swap
    incoming: SpinMutex<Vec<LogEntry>>,
    /// Length of `incoming`, readable without the lock
    pending: AtomicUsize,
}

impl LogRecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry, making at most `max_attempts` lock attempts
    /// (0 = spin until acquired)
    ///
    /// Returns the queue length after the append.
    pub fn push(&self, entry: LogEntry, max_attempts: u32) -> Result<usize, SyncError> {
        let mut incoming = self.incoming.try_lock(max_attempts)?;
        incoming.push(entry);
        let len = incoming.len();
        self.pending.store(len, Ordering::Release);
        Ok(len)
    }

    /// Append several entries under a single lock acquisition
    ///
    /// On `LockBusy` none of the entries are queued.
    pub fn push_batch(
        &self,
        entries: impl IntoIterator<Item = LogEntry>,
        max_attempts: u32,
    ) -> Result<usize, SyncError> {
        let mut incoming = self.incoming.try_lock(max_attempts)?;
        incoming.extend(entries);
        let len = incoming.len();
        self.pending.store(len, Ordering::Release);
        Ok(len)
    }

    /// Hand the queued entries to the consumer
    ///
    /// `draining` must be empty; it becomes the new incoming vector and comes
    /// back holding every entry queued since the previous swap, in insertion
    /// order.
    pub fn swap(&self, draining: &mut Vec<LogEntry>) {
        debug_assert!(draining.is_empty(), "draining buffer was not consumed");
        let mut incoming = self.incoming.lock();
        std::mem::swap(&mut *incoming, draining);
        self.pending.store(incoming.len(), Ordering::Release);
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make room for at least `additional` more entries without reallocating
    pub fn reserve(&self, additional: usize) {
        self.incoming.lock().reserve(additional);
    }

    /// Hold the producer lock, as a slow concurrent producer would
    #[cfg(test)]
    pub(crate) fn hold(&self) -> crate::sync::SpinGuard<'_, Vec<LogEntry>> {
        self.incoming.lock()
    }
}
