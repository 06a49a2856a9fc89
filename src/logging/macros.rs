//! Emission macros
//!
//! ```ignore
//! log_info!(logger, "net", "connected to ", addr, " in ", elapsed_ms, "ms");
//! ```

/// Build a `Vec<LogArg>` from mixed values
#[macro_export]
macro_rules! log_args {
    () => {
        ::std::vec::Vec::<$crate::logging::LogArg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::logging::LogArg::from($arg)),+]
    };
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $tag:expr $(, $arg:expr)* $(,)?) => {
        $logger.debug($tag, $crate::log_args![$($arg),*])
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $tag:expr $(, $arg:expr)* $(,)?) => {
        $logger.info($tag, $crate::log_args![$($arg),*])
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $tag:expr $(, $arg:expr)* $(,)?) => {
        $logger.warn($tag, $crate::log_args![$($arg),*])
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $tag:expr $(, $arg:expr)* $(,)?) => {
        $logger.error($tag, $crate::log_args![$($arg),*])
    };
}

#[cfg(test)]
mod tests {
    use crate::logging::{join_args, LogArg, LogLevel, Logger};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_log_args_converts_mixed_values() {
        let name = String::from("db");
        let args = log_args!["pool ", &name, " size ", 8u32, true, 1.5];
        assert_eq!(
            args,
            vec![
                LogArg::Str("pool ".into()),
                LogArg::Str("db".into()),
                LogArg::Str(" size ".into()),
                LogArg::UInt(8),
                LogArg::Bool(true),
                LogArg::Float(1.5),
            ]
        );
        assert_eq!(join_args(&args), "pool db size 8 true 1.5");
        assert!(log_args![].is_empty());
    }

    #[test]
    fn test_level_macros_reach_logger() {
        let logger = Logger::new();
        logger.set_debug_switch_file(None);
        logger.set_level(LogLevel::Info);
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let lines = Arc::clone(&lines);
            move |level: LogLevel, _: &str| lines.lock().unwrap().push(level)
        };
        logger.set_print_sink(sink);

        logger.start().unwrap();
        log_debug!(logger, "m", "skipped");
        log_info!(logger, "m", "a", 1);
        log_warn!(logger, "m");
        logger.stop();

        assert_eq!(*lines.lock().unwrap(), [LogLevel::Info, LogLevel::Warn]);
    }
}
