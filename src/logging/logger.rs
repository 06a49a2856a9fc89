//! Logger core
//!
//! [`Logger`] is a cheap, cloneable handle to one pipeline: level filtering
//! and record construction happen on the caller's thread, the entry is
//! appended to the shared [`LogRecordBuffer`], and a single consumer thread
//! drains the buffer either to a [`PrintSink`] or to the dump file.
//!
//! Emitting never waits on I/O. In [`EmitMode::BestEffort`] it does not even
//! wait for the buffer lock: a contended append drops the entry and bumps
//! [`Logger::dropped_count`].
//!
//! The pipeline's own failures (unwritable dump file, failed rotation,
//! consumer panic) are reported as `tracing` events. Install a subscriber,
//! for example with [`init_diagnostics`](super::init_diagnostics), to see
//! them on standard error; without one they are discarded.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::buffer::LogRecordBuffer;
use super::dump::{DumpWriter, DEFAULT_DUMP_FILE_SIZE};
use super::entry::{Caller, LogArg, LogEntry};
use super::format::render_line;
use super::level::LogLevel;
use super::sink::{ConsoleSink, PrintSink};
use crate::config::LogConfig;
use crate::error::LoggerError;
use crate::sync::BroadcastEvent;

/// Default queue length that triggers an early dump
pub const DEFAULT_DUMP_THRESHOLD: usize = 32 * 1024;

/// Default time between dumps
pub const DEFAULT_DUMP_INTERVAL_MS: u64 = 100;

/// Entries reserved in the queue when dumping starts
pub const DUMP_BUFFER_CAPACITY: usize = 64 * 1024;

/// While this file exists, debug entries pass the level filter in dump mode
pub const DEFAULT_DEBUG_SWITCH_FILE: &str = "debug.sf";

/// Console-mode pause when there is nothing to print
const CONSOLE_IDLE: Duration = Duration::from_millis(10);

/// How hard an emit call tries to get the buffer lock
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitMode {
    /// One attempt; drop the entry on contention
    #[default]
    BestEffort,
    /// Spin until the entry is queued
    Guaranteed,
}

impl EmitMode {
    fn lock_attempts(self) -> u32 {
        match self {
            EmitMode::BestEffort => 1,
            EmitMode::Guaranteed => 0,
        }
    }
}

/// State shared between the handles and the consumer thread
struct Shared {
    level: AtomicU8,
    show_caller: AtomicBool,
    guaranteed: AtomicBool,
    debug_switch_on: AtomicBool,
    dump_enabled: AtomicBool,
    dump_threshold: AtomicUsize,
    dump_interval_ms: AtomicU64,
    dropped: AtomicU64,

    buffer: LogRecordBuffer,
    dump_event: BroadcastEvent,
    stop_event: BroadcastEvent,
    stop_done: BroadcastEvent,

    dump: Mutex<DumpWriter>,
    debug_switch_file: RwLock<Option<PathBuf>>,
    sink: RwLock<Arc<dyn PrintSink>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    /// Serializes `start` and `stop`
    lifecycle: Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a log pipeline
///
/// Lifecycle: construct, configure, [`start`](Logger::start), emit,
/// [`stop`](Logger::stop). Clones share the same pipeline.
///
/// Dump and rotation failures are reported through `tracing`; see
/// [`init_diagnostics`](super::init_diagnostics).
#[derive(Clone)]
pub struct Logger {
    shared: Arc<Shared>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("show_caller", &self.show_caller())
            .field("emit_mode", &self.emit_mode())
            .field("dumping", &self.is_dumping())
            .field("running", &self.is_running())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Logger {
    /// Create a stopped logger printing everything to the console
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                level: AtomicU8::new(LogLevel::Debug.as_u8()),
                show_caller: AtomicBool::new(false),
                guaranteed: AtomicBool::new(false),
                debug_switch_on: AtomicBool::new(false),
                dump_enabled: AtomicBool::new(false),
                dump_threshold: AtomicUsize::new(DEFAULT_DUMP_THRESHOLD),
                dump_interval_ms: AtomicU64::new(DEFAULT_DUMP_INTERVAL_MS),
                dropped: AtomicU64::new(0),
                buffer: LogRecordBuffer::new(),
                dump_event: BroadcastEvent::new(),
                stop_event: BroadcastEvent::new(),
                stop_done: BroadcastEvent::new(),
                dump: Mutex::new(DumpWriter::new(PathBuf::new(), DEFAULT_DUMP_FILE_SIZE)),
                debug_switch_file: RwLock::new(Some(PathBuf::from(DEFAULT_DEBUG_SWITCH_FILE))),
                sink: RwLock::new(Arc::new(ConsoleSink)),
                worker: Mutex::new(None),
                lifecycle: Mutex::new(()),
            }),
        }
    }

    /// Create a stopped logger configured from `config`
    pub fn from_config(config: &LogConfig) -> Self {
        let logger = Self::new();
        config.apply(&logger);
        logger
    }

    #[track_caller]
    pub fn debug(&self, tag: &str, args: Vec<LogArg>) {
        if self.debug_enabled() {
            self.emit(LogLevel::Debug, tag, args);
        }
    }

    #[track_caller]
    pub fn info(&self, tag: &str, args: Vec<LogArg>) {
        if self.enabled(LogLevel::Info) {
            self.emit(LogLevel::Info, tag, args);
        }
    }

    #[track_caller]
    pub fn warn(&self, tag: &str, args: Vec<LogArg>) {
        if self.enabled(LogLevel::Warn) {
            self.emit(LogLevel::Warn, tag, args);
        }
    }

    #[track_caller]
    pub fn error(&self, tag: &str, args: Vec<LogArg>) {
        if self.enabled(LogLevel::Error) {
            self.emit(LogLevel::Error, tag, args);
        }
    }

    /// Emit at `level`, routing debug through the debug switch
    #[track_caller]
    pub fn log(&self, level: LogLevel, tag: &str, args: Vec<LogArg>) {
        match level {
            LogLevel::Debug => self.debug(tag, args),
            _ if self.enabled(level) => self.emit(level, tag, args),
            _ => {}
        }
    }

    /// Queue pre-rendered blocks, each as its own verbatim line
    ///
    /// All blocks are queued under one lock acquisition, so they stay
    /// contiguous in the output.
    pub fn detail(&self, level: LogLevel, blocks: Vec<Vec<LogArg>>) {
        if !self.enabled(level) || blocks.is_empty() {
            return;
        }

        let count = blocks.len();
        let entries = blocks
            .into_iter()
            .map(|block| LogEntry::preformatted(level, block));
        match self.shared.buffer.push_batch(entries, self.lock_attempts()) {
            Ok(queued) => self.signal_dump(queued),
            Err(_) => {
                self.shared.dropped.fetch_add(count as u64, Ordering::Relaxed);
            }
        }
    }

    /// Queue an empty line
    pub fn ln(&self) {
        self.enqueue(LogEntry::preformatted(LogLevel::Info, Vec::new()));
    }

    #[track_caller]
    fn emit(&self, level: LogLevel, tag: &str, args: Vec<LogArg>) {
        let mut entry = LogEntry::new(level, tag, args);
        if self.show_caller() {
            entry = entry.with_caller(Caller::here());
        }
        self.enqueue(entry);
    }

    fn enqueue(&self, entry: LogEntry) {
        match self.shared.buffer.push(entry, self.lock_attempts()) {
            Ok(queued) => self.signal_dump(queued),
            Err(_) => {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Wake the consumer early once enough entries are queued
    fn signal_dump(&self, queued: usize) {
        if self.shared.dump_enabled.load(Ordering::Acquire)
            && queued >= self.shared.dump_threshold.load(Ordering::Relaxed)
        {
            // Best effort: the interval timer picks the batch up otherwise.
            let _ = self.shared.dump_event.broadcast();
        }
    }

    fn lock_attempts(&self) -> u32 {
        self.emit_mode().lock_attempts()
    }

    fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level()
    }

    fn debug_enabled(&self) -> bool {
        self.shared.debug_switch_on.load(Ordering::Relaxed) || self.enabled(LogLevel::Debug)
    }

    pub fn set_level(&self, level: LogLevel) {
        self.shared.level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.shared.level.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Prefix entries with `[file line]` instead of their tag
    pub fn set_show_caller(&self, show_caller: bool) {
        self.shared.show_caller.store(show_caller, Ordering::Relaxed);
    }

    pub fn show_caller(&self) -> bool {
        self.shared.show_caller.load(Ordering::Relaxed)
    }

    pub fn set_emit_mode(&self, mode: EmitMode) {
        self.shared
            .guaranteed
            .store(mode == EmitMode::Guaranteed, Ordering::Relaxed);
    }

    pub fn emit_mode(&self) -> EmitMode {
        if self.shared.guaranteed.load(Ordering::Relaxed) {
            EmitMode::Guaranteed
        } else {
            EmitMode::BestEffort
        }
    }

    /// Replace the console output with a custom sink (no ANSI colors)
    pub fn set_print_sink(&self, sink: impl PrintSink + 'static) {
        *self
            .shared
            .sink
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(sink);
    }

    /// Go back to colored standard output
    pub fn clear_print_sink(&self) {
        self.set_print_sink(ConsoleSink);
    }

    /// File whose presence enables debug entries while dumping (None = off)
    pub fn set_debug_switch_file(&self, path: Option<PathBuf>) {
        *self
            .shared
            .debug_switch_file
            .write()
            .unwrap_or_else(PoisonError::into_inner) = path;
        self.shared.debug_switch_on.store(false, Ordering::Relaxed);
    }

    pub fn debug_switch_on(&self) -> bool {
        self.shared.debug_switch_on.load(Ordering::Relaxed)
    }

    /// Switch the consumer to dumping into `path`
    ///
    /// The file is rotated once it reaches `max_file_size` bytes. The
    /// consumer wakes every `interval_ms`, or as soon as `threshold` entries
    /// are queued.
    pub fn start_dump(
        &self,
        path: impl Into<PathBuf>,
        max_file_size: u64,
        threshold: usize,
        interval_ms: u64,
    ) {
        lock(&self.shared.dump).set_target(path, max_file_size);
        self.shared.dump_threshold.store(threshold, Ordering::Relaxed);
        self.shared
            .dump_interval_ms
            .store(interval_ms, Ordering::Relaxed);
        self.shared.buffer.reserve(DUMP_BUFFER_CAPACITY);
        self.shared.dump_enabled.store(true, Ordering::Release);
    }

    /// [`start_dump`](Logger::start_dump) with the default size, threshold
    /// and interval
    pub fn start_dump_default(&self, path: impl Into<PathBuf>) {
        self.start_dump(
            path,
            DEFAULT_DUMP_FILE_SIZE,
            DEFAULT_DUMP_THRESHOLD,
            DEFAULT_DUMP_INTERVAL_MS,
        );
    }

    /// Go back to console output
    ///
    /// Entries emitted after this returns are printed, never dumped. Entries
    /// the consumer drained before the switch are still written to the file.
    pub fn stop_dump(&self) {
        self.shared.dump_enabled.store(false, Ordering::Release);
        let _ = self.shared.dump_event.broadcast();
    }

    pub fn is_dumping(&self) -> bool {
        self.shared.dump_enabled.load(Ordering::Acquire)
    }

    /// Where entries go when the dump file cannot be written
    pub fn set_dump_fallback_path(&self, path: impl Into<PathBuf>) {
        lock(&self.shared.dump).set_fallback_path(path);
    }

    /// Delete rotated dump files older than `days` (None = keep forever)
    pub fn set_dump_retention_days(&self, days: Option<u64>) {
        lock(&self.shared.dump).set_retention_days(days);
    }

    pub fn dump_path(&self) -> PathBuf {
        lock(&self.shared.dump).path().to_path_buf()
    }

    /// Launch the consumer thread
    pub fn start(&self) -> Result<(), LoggerError> {
        let _lifecycle = lock(&self.shared.lifecycle);
        let mut worker = lock(&self.shared.worker);
        if worker.is_some() {
            return Err(LoggerError::AlreadyRunning);
        }

        // Re-arm after a previous stop.
        self.shared.stop_event.reopen();
        self.shared.dump_event.reopen();
        self.shared.stop_done.reopen();

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("spoollog-consumer".to_string())
            .spawn(move || shared.run())
            .map_err(LoggerError::Spawn)?;

        *worker = Some(handle);
        debug!("Log consumer started");
        Ok(())
    }

    /// Stop the consumer after a final flush
    ///
    /// Blocks until every entry queued before the call has been printed or
    /// dumped. Does nothing if the logger is not running. Must not be called
    /// from a print sink.
    pub fn stop(&self) {
        let _lifecycle = lock(&self.shared.lifecycle);
        // Released before waiting so sinks may still query the logger.
        let Some(handle) = lock(&self.shared.worker).take() else {
            return;
        };

        self.shared.stop_event.close();
        self.shared.dump_event.close();
        self.shared.stop_done.wait();

        if handle.join().is_err() {
            error!("Log consumer thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.shared.worker).is_some()
    }

    /// Entries dropped: emits that lost the buffer lock in best-effort mode
    /// plus dumped entries neither the dump nor the fallback file took
    pub fn dropped_count(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Entries queued and not yet drained
    pub fn pending(&self) -> usize {
        self.shared.buffer.len()
    }
}

/// Closes the stop-completed event however the consumer exits
struct StopDone<'a>(&'a BroadcastEvent);

impl Drop for StopDone<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

impl Shared {
    /// Consumer loop; returns once a stop has been observed and flushed
    fn run(&self) {
        let _done = StopDone(&self.stop_done);
        let mut draining = Vec::new();

        loop {
            let was_dumping = self.dump_enabled.load(Ordering::Acquire);
            if was_dumping {
                self.refresh_debug_switch();
                let interval = self.dump_interval_ms.load(Ordering::Relaxed).max(1);
                let _ = self.dump_event.wait_timeout(Duration::from_millis(interval));
            }

            // Read the flag before draining so the last drain is the final flush.
            let stopping = self.stop_event.is_closed();
            self.buffer.swap(&mut draining);
            let drained = draining.len();

            // Mode is read after the swap: an entry queued after stop_dump()
            // returned is only in this batch if the switch is visible here.
            if self.dump_enabled.load(Ordering::Acquire) {
                self.dump(&mut draining);
            } else {
                self.print(&mut draining);
            }

            if stopping {
                break;
            }
            if !was_dumping && drained == 0 {
                let _ = self.stop_event.wait_timeout(CONSOLE_IDLE);
            }
        }

        debug!("Log consumer stopped");
    }

    fn print(&self, draining: &mut Vec<LogEntry>) {
        if draining.is_empty() {
            return;
        }

        let sink = Arc::clone(&self.sink.read().unwrap_or_else(PoisonError::into_inner));
        for entry in draining.iter() {
            sink.print(entry.level, &render_line(entry));
        }
        sink.flush();
        draining.clear();
    }

    fn dump(&self, draining: &mut Vec<LogEntry>) {
        if draining.is_empty() {
            return;
        }

        let report = lock(&self.dump).dump(draining);
        if report.lost > 0 {
            self.dropped.fetch_add(report.lost as u64, Ordering::Relaxed);
        }
        draining.clear();
    }

    fn refresh_debug_switch(&self) {
        let on = self
            .debug_switch_file
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            .is_some_and(|path| path.exists());
        self.debug_switch_on.store(on, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::format::TIMESTAMP_FORMAT;
    use std::fs;
    use std::path::Path;
    use std::time::Instant;
    use tempfile::TempDir;

    type Captured = Arc<Mutex<Vec<(LogLevel, String)>>>;

    fn capturing_logger() -> (Logger, Captured) {
        let logger = Logger::new();
        logger.set_debug_switch_file(None);
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let captured = Arc::clone(&captured);
            move |level: LogLevel, line: &str| {
                captured.lock().unwrap().push((level, line.to_string()));
            }
        };
        logger.set_print_sink(sink);
        (logger, captured)
    }

    fn dump_logger(dir: &TempDir) -> Logger {
        let logger = Logger::new();
        logger.set_debug_switch_file(None);
        logger.set_dump_fallback_path(dir.path().join("dump.log.bak"));
        logger
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_entries_below_level_never_reach_sink() {
        let (logger, captured) = capturing_logger();
        logger.set_level(LogLevel::Info);
        logger.start().unwrap();

        for i in 0..20 {
            logger.debug("t", vec!["debug ".into(), i.into()]);
            logger.info("t", vec!["info ".into(), i.into()]);
            logger.log(LogLevel::Debug, "t", vec!["routed debug".into()]);
        }
        logger.warn("t", vec!["warn".into()]);
        logger.error("t", vec!["error".into()]);
        logger.stop();

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 22);
        assert!(captured.iter().all(|(level, _)| *level >= LogLevel::Info));
        assert!(captured.iter().all(|(_, line)| !line.contains("debug")));
        assert!(captured[0].1.ends_with("[INFO ] [t]  info 0\n"));
    }

    #[test]
    fn test_detail_blocks_are_verbatim_and_filtered() {
        let (logger, captured) = capturing_logger();
        logger.set_level(LogLevel::Warn);
        logger.start().unwrap();

        logger.detail(LogLevel::Info, vec![vec!["hidden".into()]]);
        logger.detail(
            LogLevel::Error,
            vec![
                vec![LogArg::block("panic: boom")],
                vec!["  at ".into(), "main.rs:".into(), 3.into()],
            ],
        );
        logger.ln();
        logger.stop();

        let lines: Vec<_> = captured.lock().unwrap().iter().map(|(_, l)| l.clone()).collect();
        assert_eq!(lines, ["panic: boom\n", "  at main.rs:3\n", "\n"]);
    }

    #[test]
    fn test_show_caller_replaces_tag() {
        let (logger, captured) = capturing_logger();
        logger.set_show_caller(true);
        logger.start().unwrap();
        logger.info("tag", vec!["where".into()]);
        logger.stop();

        let captured = captured.lock().unwrap();
        let line = &captured[0].1;
        assert!(line.contains("logger.rs "), "{}", line);
        assert!(!line.contains("[tag]"));
        assert!(line.ends_with("]  where\n"));
    }

    #[test]
    fn test_concurrent_producers_deliver_every_entry() {
        let (logger, captured) = capturing_logger();
        logger.set_emit_mode(EmitMode::Guaranteed);
        logger.start().unwrap();

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let logger = logger.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        logger.info("p", vec![p.into(), i.into()]);
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        logger.stop();

        assert_eq!(captured.lock().unwrap().len(), 1_000);
        assert_eq!(logger.dropped_count(), 0);
    }

    #[test]
    fn test_contended_best_effort_emit_is_dropped_and_counted() {
        let (logger, captured) = capturing_logger();
        {
            let _held = logger.shared.buffer.hold();
            logger.error("t", vec!["lost".into()]);
            logger.detail(LogLevel::Error, vec![vec!["a".into()], vec!["b".into()]]);
        }
        assert_eq!(logger.dropped_count(), 3);

        logger.start().unwrap();
        logger.error("t", vec!["kept".into()]);
        logger.stop();
        assert_eq!(captured.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_threshold_dump_writes_formatted_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let logger = dump_logger(&temp_dir);
        logger.start_dump(&path, DEFAULT_DUMP_FILE_SIZE, 1, 500);
        logger.start().unwrap();

        logger.error("T", vec!["hello".into()]);
        let written = wait_until(Duration::from_millis(1_500), || !read_lines(&path).is_empty());
        logger.stop();
        assert!(written);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert!(line.starts_with('['));
        assert!(chrono::NaiveDateTime::parse_from_str(&line[1..18], TIMESTAMP_FORMAT).is_ok());
        assert_eq!(&line[18..], "] [ERROR] [T]  hello");
    }

    #[test]
    fn test_stop_flushes_everything_queued() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let logger = dump_logger(&temp_dir);
        logger.start_dump(&path, DEFAULT_DUMP_FILE_SIZE, 1_000, 60_000);
        logger.start().unwrap();

        for i in 0..50 {
            logger.info("flush", vec!["entry ".into(), i.into()]);
        }
        logger.stop();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 50);
        assert!(lines[49].ends_with("[flush]  entry 49"));
        assert!(!logger.is_running());
    }

    #[test]
    fn test_dump_rotates_under_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let logger = dump_logger(&temp_dir);
        logger.set_emit_mode(EmitMode::Guaranteed);
        logger.start_dump(&path, 2_000, 100, 20);
        logger.start().unwrap();

        for i in 0..500 {
            logger.info("r", vec!["rotating entry ".into(), i.into()]);
        }
        logger.stop();

        let files: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert!(files.len() >= 2, "expected rotated files, got {:?}", files);
        let total: usize = files.iter().map(|f| read_lines(f).len()).sum();
        assert_eq!(total, 500);
    }

    #[test]
    fn test_stop_dump_returns_to_console() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let (logger, captured) = capturing_logger();
        logger.set_dump_fallback_path(temp_dir.path().join("dump.log.bak"));
        logger.start_dump(&path, DEFAULT_DUMP_FILE_SIZE, 1, 50);
        logger.start().unwrap();

        logger.info("d", vec!["to file".into()]);
        assert!(wait_until(Duration::from_secs(2), || read_lines(&path).len() == 1));

        logger.stop_dump();
        assert!(!logger.is_dumping());
        logger.info("d", vec!["to console".into()]);
        logger.stop();

        assert_eq!(read_lines(&path).len(), 1);
        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert!(captured[0].1.ends_with("to console\n"));
    }

    #[test]
    fn test_entries_after_stop_dump_never_reach_file() {
        for round in 0..20 {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("app.log");
            let (logger, captured) = capturing_logger();
            logger.set_dump_fallback_path(temp_dir.path().join("dump.log.bak"));
            logger.start_dump(&path, DEFAULT_DUMP_FILE_SIZE, DEFAULT_DUMP_THRESHOLD, 50);
            logger.start().unwrap();
            thread::sleep(Duration::from_millis(5));

            logger.stop_dump();
            logger.info("d", vec!["after stop_dump".into()]);
            logger.stop();

            assert!(read_lines(&path).is_empty(), "round {} dumped the entry", round);
            assert_eq!(captured.lock().unwrap().len(), 1, "round {}", round);
        }
    }

    #[test]
    fn test_sink_may_query_logger_during_stop() {
        let logger = Logger::new();
        logger.set_debug_switch_file(None);
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let logger = logger.clone();
            let observed = Arc::clone(&observed);
            move |_: LogLevel, _: &str| {
                observed.lock().unwrap().push(format!("{:?}", logger));
                // Give stop() time to start waiting on the consumer.
                thread::sleep(Duration::from_millis(20));
            }
        };
        logger.set_print_sink(sink);
        logger.start().unwrap();
        for i in 0..3 {
            logger.info("q", vec![i.into()]);
        }

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let stopper = {
            let logger = logger.clone();
            thread::spawn(move || {
                logger.stop();
                done_tx.send(()).unwrap();
            })
        };
        assert!(
            done_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
            "stop() deadlocked against the sink"
        );
        stopper.join().unwrap();

        assert_eq!(observed.lock().unwrap().len(), 3);
        assert!(!logger.is_running());
        // The sink holds a clone of the logger; break the cycle.
        logger.clear_print_sink();
    }

    #[test]
    fn test_debug_switch_file_enables_debug_while_dumping() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let switch = temp_dir.path().join("debug.sf");
        fs::write(&switch, "").unwrap();

        let logger = dump_logger(&temp_dir);
        logger.set_level(LogLevel::Info);
        logger.set_debug_switch_file(Some(switch.clone()));
        logger.start_dump(&path, DEFAULT_DUMP_FILE_SIZE, 1_000, 10);
        logger.start().unwrap();

        assert!(wait_until(Duration::from_secs(2), || logger.debug_switch_on()));
        logger.debug("dbg", vec!["visible".into()]);

        fs::remove_file(&switch).unwrap();
        assert!(wait_until(Duration::from_secs(2), || !logger.debug_switch_on()));
        logger.debug("dbg", vec!["hidden".into()]);
        logger.stop();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[DEBUG] [dbg]  visible"));
    }

    #[test]
    fn test_restart_and_double_start() {
        let (logger, captured) = capturing_logger();
        logger.stop();

        logger.start().unwrap();
        assert!(matches!(logger.start(), Err(LoggerError::AlreadyRunning)));
        logger.info("r", vec!["first".into()]);
        logger.stop();

        logger.start().unwrap();
        logger.info("r", vec!["second".into()]);
        logger.stop();

        assert_eq!(captured.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_sink_panic_does_not_hang_stop() {
        let logger = Logger::new();
        logger.set_print_sink(|_: LogLevel, _: &str| panic!("sink failure"));
        logger.start().unwrap();
        logger.info("p", vec!["boom".into()]);

        assert!(wait_until(Duration::from_secs(2), || logger.pending() == 0));
        logger.stop();
        assert!(!logger.is_running());
    }
}
