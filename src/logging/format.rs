//! Line rendering
//!
//! `[YY/MM/DD hh:mm:ss] [LEVEL] [tag]  message\n`, or the joined arguments
//! verbatim for pre-rendered entries.

use std::fmt::Write as _;

use chrono::{DateTime, Local};

use super::entry::{join_args, LogEntry};
use super::level::LogLevel;

/// Timestamp layout inside the leading brackets
pub const TIMESTAMP_FORMAT: &str = "%y/%m/%d %H:%M:%S";

const LINE_INIT_CAPACITY: usize = 128;

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_RED: &str = "\x1b[1;40;31m";
const ANSI_YELLOW: &str = "\x1b[1;40;33m";
const ANSI_GREEN: &str = "\x1b[1;40;32m";

/// Render an entry into one output line, trailing newline included
pub fn render_line(entry: &LogEntry) -> String {
    let mut line = String::with_capacity(LINE_INIT_CAPACITY);

    if !entry.preformatted {
        let _ = write!(
            line,
            "[{}] [{}] ",
            format_timestamp(&entry.timestamp),
            entry.level.label()
        );

        if let Some(caller) = &entry.caller {
            let _ = write!(line, "[{}]  ", caller);
        } else if !entry.tag.is_empty() {
            let _ = write!(line, "[{}]  ", entry.tag);
        }
    }

    line.push_str(&join_args(&entry.args));
    line.push('\n');
    line
}

pub fn format_timestamp(timestamp: &DateTime<Local>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Wrap a rendered line in the terminal color for its level
///
/// Info is left uncolored.
pub fn colorize(level: LogLevel, line: &str) -> String {
    let color = match level {
        LogLevel::Error => ANSI_RED,
        LogLevel::Warn => ANSI_YELLOW,
        LogLevel::Debug => ANSI_GREEN,
        LogLevel::Info => return line.to_string(),
    };
    format!("{}{}{}", color, line, ANSI_RESET)
}
