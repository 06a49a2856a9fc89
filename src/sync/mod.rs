//! Synchronization primitives for the log pipeline
//!
//! Both primitives stay off the kernel on the producer side: the spin lock
//! never sleeps, and the broadcast event only blocks the thread that waits.

mod event;
mod spin;

pub use event::{BroadcastEvent, WaitStatus};
pub use spin::{SpinGuard, SpinLock, SpinMutex};
