//! Print sinks for console mode

use std::io::{self, Write};

use super::format::colorize;
use super::level::LogLevel;

/// Destination for rendered lines while dumping is off
pub trait PrintSink: Send + Sync {
    /// Print one rendered line (it already ends with a newline)
    fn print(&self, level: LogLevel, line: &str);

    /// Flush buffered output after a drained batch
    fn flush(&self) {}
}

impl<F> PrintSink for F
where
    F: Fn(LogLevel, &str) + Send + Sync,
{
    fn print(&self, level: LogLevel, line: &str) {
        self(level, line)
    }
}

/// Standard output with ANSI colors per level
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl PrintSink for ConsoleSink {
    fn print(&self, level: LogLevel, line: &str) {
        let _ = io::stdout().lock().write_all(colorize(level, line).as_bytes());
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}
