//! Error types for the log pipeline
//!
//! Synchronization failures are plain values the caller reacts to (drop the
//! entry, retry later). Dump failures carry the offending path and the
//! underlying IO error so the consumer can report them and fall back.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the non-blocking primitives in [`crate::sync`]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// A bounded lock acquisition ran out of attempts
    #[error("lock busy")]
    LockBusy,
    /// A bounded event wait expired before the event fired
    #[error("event wait timed out")]
    WaitTimeout,
}

/// Failures while writing entries to the dump file
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("failed to open dump file {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write dump file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to rename dump file {from} to {to}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write fallback file {path}")]
    Fallback {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures of the logger lifecycle
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("logger is already running")]
    AlreadyRunning,

    #[error("failed to spawn the log consumer thread")]
    Spawn(#[source] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_error_keeps_source() {
        use std::error::Error as _;

        let err = DumpError::Open {
            path: PathBuf::from("/tmp/x.log"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "failed to open dump file /tmp/x.log");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_sync_error_display() {
        assert_eq!(SyncError::LockBusy.to_string(), "lock busy");
        assert_eq!(SyncError::WaitTimeout.to_string(), "event wait timed out");
    }
}
