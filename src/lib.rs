//! spoollog - in-process asynchronous log pipeline
//!
//! Producers queue entries without touching I/O; one background thread
//! prints them to the console or dumps them to size-rotated files.
//!
//! Failures of the pipeline itself are emitted as `tracing` events. Call
//! [`logging::init_diagnostics`] (or install your own subscriber) to have
//! them printed to standard error.

pub mod config;
pub mod error;
pub mod logging;
pub mod sync;

pub use config::LogConfig;
pub use error::{DumpError, LoggerError, SyncError};
pub use logging::{EmitMode, LogArg, LogLevel, Logger, TaggedLogger};
