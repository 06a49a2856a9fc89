//! Spin lock
//!
//! A compare-and-swap lock that never sleeps. Callers choose how hard to try:
//! a single attempt for the log-emitting hot path (drop on contention), or an
//! unbounded spin for the consumer side where the critical sections guarded
//! by producers are a handful of instructions long.

use std::cell::UnsafeCell;
use std::hint;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::SyncError;

const FREE: u32 = 0;
const HELD: u32 = 1;

/// Bare compare-and-swap lock with no owner tracking
///
/// Not reentrant and not fair. Any thread may release it, which is why the
/// guard-based [`SpinMutex`] is what the rest of the crate uses.
#[derive(Debug, Default)]
pub struct SpinLock {
    state: AtomicU32,
}

impl SpinLock {
    /// Create a free lock
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(FREE),
        }
    }

    /// Try to take the lock
    ///
    /// `max_attempts == 0` spins until the lock is acquired. Any other value
    /// bounds the number of compare-and-swap attempts and returns
    /// [`SyncError::LockBusy`] once they are used up.
    pub fn try_acquire(&self, max_attempts: u32) -> Result<(), SyncError> {
        let mut attempts = 0u32;
        loop {
            if self
                .state
                .compare_exchange(FREE, HELD, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(());
            }

            if max_attempts != 0 {
                attempts += 1;
                if attempts >= max_attempts {
                    return Err(SyncError::LockBusy);
                }
            }

            hint::spin_loop();
        }
    }

    /// Release the lock
    ///
    /// # Panics
    ///
    /// Panics if the lock is not held. That is an unbalanced critical section
    /// and there is nothing sensible left to protect.
    pub fn release(&self) {
        if self
            .state
            .compare_exchange(HELD, FREE, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            panic!("SpinLock::release called on a lock that is not held");
        }
    }

    /// Whether some thread currently holds the lock
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) == HELD
    }
}

/// A value guarded by a [`SpinLock`]
pub struct SpinMutex<T> {
    lock: SpinLock,
    value: UnsafeCell<T>,
}

// SAFETY: access to `value` only happens through a `SpinGuard`, and a guard
// only exists while `lock` is held.
unsafe impl<T: Send> Send for SpinMutex<T> {}
unsafe impl<T: Send> Sync for SpinMutex<T> {}

impl<T> SpinMutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            lock: SpinLock::new(),
            value: UnsafeCell::new(value),
        }
    }

    /// Try to lock with at most `max_attempts` attempts (0 = unbounded)
    pub fn try_lock(&self, max_attempts: u32) -> Result<SpinGuard<'_, T>, SyncError> {
        self.lock.try_acquire(max_attempts)?;
        Ok(SpinGuard { mutex: self })
    }

    /// Spin until the lock is acquired
    pub fn lock(&self) -> SpinGuard<'_, T> {
        while self.lock.try_acquire(1).is_err() {
            hint::spin_loop();
        }
        SpinGuard { mutex: self }
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T> std::fmt::Debug for SpinMutex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinMutex")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

impl<T: Default> Default for SpinMutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// RAII guard for [`SpinMutex`]; releases the lock on drop
pub struct SpinGuard<'a, T> {
    mutex: &'a SpinMutex<T>,
}

impl<T> Deref for SpinGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard proves the lock is held.
        unsafe { &*self.mutex.value.get() }
    }
}

impl<T> DerefMut for SpinGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves the lock is held, and `&mut self` makes
        // this the only live reference.
        unsafe { &mut *self.mutex.value.get() }
    }
}

impl<T> Drop for SpinGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.lock.release();
    }
}
