//! Log entries and their arguments
//!
//! An entry is built once at the call site and never mutated afterwards.
//! Arguments are a closed set of primitive kinds so rendering needs no
//! reflection: anything else is formatted by the caller into a string first.

use std::fmt::{self, Write as _};
use std::panic::Location;

use chrono::{DateTime, Local};

use super::level::LogLevel;

/// One formattable argument of a log call
#[derive(Debug, Clone, PartialEq)]
pub enum LogArg {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    /// Pre-rendered text, emitted verbatim
    Block(String),
}

impl LogArg {
    /// Wrap already rendered (possibly multi-line) text
    pub fn block(text: impl Into<String>) -> Self {
        LogArg::Block(text.into())
    }

    /// Text arguments glue to their neighbours without a separating space
    pub fn is_text(&self) -> bool {
        matches!(self, LogArg::Str(_) | LogArg::Block(_))
    }
}

impl fmt::Display for LogArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogArg::Str(s) | LogArg::Block(s) => f.write_str(s),
            LogArg::Int(v) => write!(f, "{}", v),
            LogArg::UInt(v) => write!(f, "{}", v),
            LogArg::Float(v) => write!(f, "{}", v),
            LogArg::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for LogArg {
    fn from(value: &str) -> Self {
        LogArg::Str(value.to_string())
    }
}

impl From<String> for LogArg {
    fn from(value: String) -> Self {
        LogArg::Str(value)
    }
}

impl From<&String> for LogArg {
    fn from(value: &String) -> Self {
        LogArg::Str(value.clone())
    }
}

impl From<bool> for LogArg {
    fn from(value: bool) -> Self {
        LogArg::Bool(value)
    }
}

impl From<char> for LogArg {
    fn from(value: char) -> Self {
        LogArg::Str(value.to_string())
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for LogArg {
            fn from(value: $t) -> Self {
                LogArg::Int(value as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for LogArg {
            fn from(value: $t) -> Self {
                LogArg::UInt(value as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for LogArg {
    fn from(value: f32) -> Self {
        LogArg::Float(value as f64)
    }
}

impl From<f64> for LogArg {
    fn from(value: f64) -> Self {
        LogArg::Float(value)
    }
}

/// Source location of a log call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub file: &'static str,
    pub line: u32,
}

impl Caller {
    /// Location of the nearest caller not marked `#[track_caller]`
    #[track_caller]
    pub fn here() -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.file, self.line)
    }
}

/// A single log record
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Time the entry was emitted
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    /// Empty when the caller is shown instead
    pub tag: String,
    pub args: Vec<LogArg>,
    /// Render `args` verbatim, without timestamp, level or tag
    pub preformatted: bool,
    pub caller: Option<Caller>,
}

impl LogEntry {
    /// Create a regular tagged entry
    pub fn new(level: LogLevel, tag: impl Into<String>, args: Vec<LogArg>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            tag: tag.into(),
            args,
            preformatted: false,
            caller: None,
        }
    }

    /// Create a pre-rendered entry (stack traces, multi-line dumps)
    pub fn preformatted(level: LogLevel, args: Vec<LogArg>) -> Self {
        Self {
            preformatted: true,
            ..Self::new(level, String::new(), args)
        }
    }

    /// Attach the call site; the tag is dropped in favour of it
    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.tag.clear();
        self.caller = Some(caller);
        self
    }

    /// Arguments joined into the message text
    ///
    /// A space separates two neighbours only when neither is text, so
    /// `("count=", 3)` renders as `count=3` and `(1, 2)` as `1 2`.
    pub fn message(&self) -> String {
        join_args(&self.args)
    }
}

/// Join arguments, spacing only between two non-text operands
pub fn join_args(args: &[LogArg]) -> String {
    let mut out = String::new();
    let mut prev_text = true;
    for (i, arg) in args.iter().enumerate() {
        let text = arg.is_text();
        if i > 0 && !text && !prev_text {
            out.push(' ');
        }
        let _ = write!(out, "{}", arg);
        prev_text = text;
    }
    out
}
