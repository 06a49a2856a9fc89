use std::future::Future;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use spoollog::config::LogConfig;
use spoollog::logging::{self, LogLevel, Logger, TaggedLogger};

/// Lines buffered between the stdin reader and the forwarder
const STDIN_CHANNEL_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics first so config and startup problems are reported
    logging::init_diagnostics()?;

    let config = match std::env::args_os().nth(1) {
        Some(path) => LogConfig::load(&PathBuf::from(path))?,
        None => LogConfig::load_default()?,
    };

    let logger = Logger::from_config(&config);
    logger.start()?;
    tracing::debug!(dump = config.is_dump, "Forwarding standard input");

    let input = logger.tagged("stdin");
    let lines = spawn_stdin_reader().context("Failed to start stdin reader")?;
    let forwarded = forward_lines(lines, &input, interrupted()).await;

    // stop() blocks until the final flush is done
    let stopping = logger.clone();
    tokio::task::spawn_blocking(move || stopping.stop())
        .await
        .context("Logger shutdown task failed")?;

    let forwarded = forwarded?;
    let dropped = logger.dropped_count();
    if dropped > 0 {
        tracing::warn!(forwarded, dropped, "Some lines were dropped");
    }
    Ok(())
}

/// Read stdin on a plain thread
///
/// A blocking stdin read cannot be cancelled, so it stays off the runtime;
/// the thread is left behind when the process exits on Ctrl-C.
fn spawn_stdin_reader() -> io::Result<mpsc::Receiver<io::Result<String>>> {
    let (tx, rx) = mpsc::channel(STDIN_CHANNEL_CAPACITY);
    thread::Builder::new()
        .name("spoollog-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Log every received line until the sender closes or `interrupt` resolves,
/// returning the number of lines forwarded
async fn forward_lines(
    mut lines: mpsc::Receiver<io::Result<String>>,
    input: &TaggedLogger,
    interrupt: impl Future<Output = ()>,
) -> Result<usize> {
    tokio::pin!(interrupt);
    let mut count = 0;
    loop {
        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => {
                    let line = line.context("Failed to read standard input")?;
                    input.log(guess_level(&line), vec![line.into()]);
                    count += 1;
                }
                None => break,
            },
            _ = &mut interrupt => {
                tracing::info!("Interrupted, flushing log");
                break;
            }
        }
    }
    Ok(count)
}

/// Level of a raw line, from the first severity marker it contains
fn guess_level(line: &str) -> LogLevel {
    if line.contains("ERROR") {
        LogLevel::Error
    } else if line.contains("WARN") {
        LogLevel::Warn
    } else if line.contains("DEBUG") {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Seen = Arc<Mutex<Vec<(LogLevel, String)>>>;

    fn capturing_logger() -> (Logger, Seen) {
        let logger = Logger::new();
        logger.set_debug_switch_file(None);
        logger.set_level(LogLevel::Info);
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |level: LogLevel, line: &str| seen.lock().unwrap().push((level, line.to_string()))
        };
        logger.set_print_sink(sink);
        (logger, seen)
    }

    #[test]
    fn test_guess_level() {
        assert_eq!(guess_level("2024 ERROR disk full"), LogLevel::Error);
        assert_eq!(guess_level("WARNING: low memory"), LogLevel::Warn);
        assert_eq!(guess_level("[DEBUG] tick"), LogLevel::Debug);
        assert_eq!(guess_level("plain line"), LogLevel::Info);
        assert_eq!(guess_level("error in lowercase"), LogLevel::Info);
    }

    #[tokio::test]
    async fn test_forward_lines_logs_each_line_until_eof() {
        let (logger, seen) = capturing_logger();
        logger.start().unwrap();

        let (tx, rx) = mpsc::channel(8);
        for line in ["first", "WARN second", "DEBUG hidden"] {
            tx.send(Ok(line.to_string())).await.unwrap();
        }
        drop(tx);

        let count = forward_lines(rx, &logger.tagged("stdin"), std::future::pending::<()>())
            .await
            .unwrap();
        logger.stop();

        assert_eq!(count, 3);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].1.ends_with("[INFO ] [stdin]  first\n"));
        assert_eq!(seen[1].0, LogLevel::Warn);
    }

    #[tokio::test]
    async fn test_interrupt_ends_forwarding_while_input_is_open() {
        let (logger, _seen) = capturing_logger();
        logger.start().unwrap();

        // The sender stays alive: no EOF ever arrives.
        let (_tx, rx) = mpsc::channel::<io::Result<String>>(8);
        let forwarded = tokio::time::timeout(
            Duration::from_secs(2),
            forward_lines(rx, &logger.tagged("stdin"), async {}),
        )
        .await;
        logger.stop();

        assert_eq!(forwarded.expect("forwarding ignored the interrupt").unwrap(), 0);
        assert!(!logger.is_running());
    }

    #[tokio::test]
    async fn test_read_error_is_reported() {
        let (logger, _seen) = capturing_logger();
        let (tx, rx) = mpsc::channel(1);
        tx.send(Err(io::Error::new(io::ErrorKind::InvalidData, "not utf-8")))
            .await
            .unwrap();

        let result = forward_lines(rx, &logger.tagged("stdin"), std::future::pending::<()>()).await;
        assert!(result.is_err());
    }
}
