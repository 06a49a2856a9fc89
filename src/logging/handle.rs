//! Per-component and process-wide logger handles

use std::sync::OnceLock;

use super::entry::LogArg;
use super::level::LogLevel;
use super::logger::Logger;

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// Install the process-wide logger
///
/// Only the first call succeeds; later calls hand their logger back.
pub fn install_global(logger: Logger) -> Result<(), Logger> {
    GLOBAL.set(logger)
}

/// The process-wide logger, if one was installed
pub fn global() -> Option<&'static Logger> {
    GLOBAL.get()
}

/// A logger bound to one tag, handed to a single component
#[derive(Debug, Clone)]
pub struct TaggedLogger {
    tag: String,
    logger: Logger,
}

impl TaggedLogger {
    pub fn new(logger: Logger, tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            logger,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    #[track_caller]
    pub fn debug(&self, args: Vec<LogArg>) {
        self.logger.debug(&self.tag, args);
    }

    #[track_caller]
    pub fn info(&self, args: Vec<LogArg>) {
        self.logger.info(&self.tag, args);
    }

    #[track_caller]
    pub fn warn(&self, args: Vec<LogArg>) {
        self.logger.warn(&self.tag, args);
    }

    #[track_caller]
    pub fn error(&self, args: Vec<LogArg>) {
        self.logger.error(&self.tag, args);
    }

    #[track_caller]
    pub fn log(&self, level: LogLevel, args: Vec<LogArg>) {
        self.logger.log(level, &self.tag, args);
    }

    pub fn detail(&self, level: LogLevel, blocks: Vec<Vec<LogArg>>) {
        self.logger.detail(level, blocks);
    }

    pub fn ln(&self) {
        self.logger.ln();
    }
}

impl Logger {
    /// Handle that stamps every entry with `tag`
    pub fn tagged(&self, tag: impl Into<String>) -> TaggedLogger {
        TaggedLogger::new(self.clone(), tag)
    }
}
