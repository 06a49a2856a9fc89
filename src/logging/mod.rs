//! Asynchronous log pipeline
//!
//! Call sites build [`LogEntry`] values and queue them in a
//! [`LogRecordBuffer`]; one consumer thread owned by the [`Logger`] drains
//! the queue to a console sink or to size-rotated dump files.

mod buffer;
mod diagnostics;
mod dump;
mod entry;
mod format;
mod handle;
mod level;
mod logger;
mod macros;
mod retention;
mod sink;

pub use buffer::LogRecordBuffer;
pub use diagnostics::{init_diagnostics, DEFAULT_DIAGNOSTICS_FILTER};
pub use dump::{
    rotated_path, write_fallback, DumpReport, DumpWriter, BATCH_DUMP_COUNT,
    DEFAULT_DUMP_FILE_SIZE, DEFAULT_FALLBACK_FILE,
};
pub use entry::{join_args, Caller, LogArg, LogEntry};
pub use format::{colorize, format_timestamp, render_line, TIMESTAMP_FORMAT};
pub use handle::{global, install_global, TaggedLogger};
pub use level::LogLevel;
pub use logger::{
    EmitMode, Logger, DEFAULT_DEBUG_SWITCH_FILE, DEFAULT_DUMP_INTERVAL_MS,
    DEFAULT_DUMP_THRESHOLD, DUMP_BUFFER_CAPACITY,
};
pub use retention::{cleanup_rotated_dumps, DEFAULT_RETENTION_DAYS};
pub use sink::{ConsoleSink, PrintSink};
