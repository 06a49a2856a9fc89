//! File dumping with size-based rotation
//!
//! Entries are rendered and appended to the dump file in batches. Once the
//! file reaches its size cap it is renamed to
//! `<stem>_<YYMMDD>_<hhmmss>_<NNNNN><ext>` next to the original, and writing
//! resumes in a fresh file under the original name. Whatever cannot be
//! written to the dump file goes to the fallback file instead.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, error, warn};

use super::entry::LogEntry;
use super::format::render_line;
use super::retention::cleanup_rotated_dumps;
use crate::error::DumpError;

/// Entries written per buffered write
pub const BATCH_DUMP_COUNT: usize = 100;

/// Default size cap of a dump file (32 MiB)
pub const DEFAULT_DUMP_FILE_SIZE: u64 = 32 * 1024 * 1024;

/// Fallback file for entries the dump file could not take
pub const DEFAULT_FALLBACK_FILE: &str = "dump.log.bak";

/// Rotated file sequence numbers run 1..=MAX_SEQUENCE and then wrap
const MAX_SEQUENCE: u32 = 99_999;

/// Outcome of one dump cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DumpReport {
    /// Entries appended to the dump file
    pub written: usize,
    /// Entries routed to the fallback file
    pub spilled: usize,
    /// Entries neither file could take
    pub lost: usize,
    /// Files rotated during the cycle
    pub rotations: usize,
}

/// Writes drained entries to the dump file
#[derive(Debug, Clone)]
pub struct DumpWriter {
    path: PathBuf,
    max_file_size: u64,
    fallback_path: PathBuf,
    retention_days: Option<u64>,
    sequence: u32,
}

impl DumpWriter {
    pub fn new(path: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            path: path.into(),
            max_file_size,
            fallback_path: PathBuf::from(DEFAULT_FALLBACK_FILE),
            retention_days: None,
            sequence: 0,
        }
    }

    pub fn with_fallback_path(mut self, fallback_path: impl Into<PathBuf>) -> Self {
        self.fallback_path = fallback_path.into();
        self
    }

    /// Delete rotated files older than `days` after each rotation
    pub fn with_retention_days(mut self, days: Option<u64>) -> Self {
        self.retention_days = days;
        self
    }

    /// Point the writer at another file; the rotation sequence carries on
    pub fn set_target(&mut self, path: impl Into<PathBuf>, max_file_size: u64) {
        self.path = path.into();
        self.max_file_size = max_file_size;
    }

    pub fn set_fallback_path(&mut self, fallback_path: impl Into<PathBuf>) {
        self.fallback_path = fallback_path.into();
    }

    pub fn set_retention_days(&mut self, days: Option<u64>) {
        self.retention_days = days;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `entries` to the dump file, spilling the unwritten tail to the
    /// fallback file if the dump file fails
    pub fn dump(&mut self, entries: &[LogEntry]) -> DumpReport {
        let mut report = DumpReport::default();
        if entries.is_empty() {
            return report;
        }

        if let Err(err) = self.write_entries(entries, &mut report) {
            let tail = &entries[report.written..];
            warn!(
                error = %err,
                pending = tail.len(),
                fallback = %self.fallback_path.display(),
                "Dump failed, writing remaining entries to fallback file"
            );

            match write_fallback(&self.fallback_path, tail) {
                Ok(()) => report.spilled = tail.len(),
                Err(err) => {
                    error!(error = %err, lost = tail.len(), "Fallback write failed, entries lost");
                    report.lost = tail.len();
                }
            }
        }

        report
    }

    fn write_entries(
        &mut self,
        entries: &[LogEntry],
        report: &mut DumpReport,
    ) -> Result<(), DumpError> {
        while report.written < entries.len() {
            let needs_rotation = self.write_one_file(entries, &mut report.written)?;
            if needs_rotation {
                match self.rotate() {
                    Ok(rotated) => {
                        report.rotations += 1;
                        debug!(rotated = %rotated.display(), "Rotated dump file");
                        self.apply_retention();
                    }
                    Err(err) => warn!(error = %err, "Failed to rotate dump file"),
                }
            }
        }
        Ok(())
    }

    /// Append batches until the file hits its cap or the entries run out
    ///
    /// Returns whether the file needs rotating. `written` advances by whole
    /// batches only, so a failed batch is retried in full by the fallback.
    fn write_one_file(&self, entries: &[LogEntry], written: &mut usize) -> Result<bool, DumpError> {
        let mut file = open_append(&self.path).map_err(|source| DumpError::Open {
            path: self.path.clone(),
            source,
        })?;

        for batch in entries[*written..].chunks(BATCH_DUMP_COUNT) {
            write_batch(&mut file, batch).map_err(|source| DumpError::Write {
                path: self.path.clone(),
                source,
            })?;
            *written += batch.len();

            match file.metadata() {
                Ok(meta) if meta.len() >= self.max_file_size => return Ok(true),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "Failed to read dump file size"),
            }
        }

        Ok(false)
    }

    /// Rename the current dump file to its next archive name
    pub fn rotate(&mut self) -> Result<PathBuf, DumpError> {
        self.sequence = if self.sequence >= MAX_SEQUENCE {
            1
        } else {
            self.sequence + 1
        };

        let rotated = rotated_path(&self.path, &Local::now(), self.sequence);
        fs::rename(&self.path, &rotated).map_err(|source| DumpError::Rename {
            from: self.path.clone(),
            to: rotated.clone(),
            source,
        })?;
        Ok(rotated)
    }

    fn apply_retention(&self) {
        let Some(days) = self.retention_days else {
            return;
        };
        match cleanup_rotated_dumps(&self.path, days) {
            Ok(0) => {}
            Ok(count) => debug!(count, "Removed expired rotated dump files"),
            Err(err) => warn!(error = %err, "Failed to clean up rotated dump files"),
        }
    }
}

/// Archive name for `path` rotated at `now` with sequence number `sequence`
pub fn rotated_path(path: &Path, now: &DateTime<Local>, sequence: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let name = format!(
        "{}_{}_{:05}{}",
        stem,
        now.format("%y%m%d_%H%M%S"),
        sequence,
        ext
    );
    path.with_file_name(name)
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn write_batch(file: &mut File, batch: &[LogEntry]) -> io::Result<()> {
    let mut writer = BufWriter::new(file);
    for entry in batch {
        writer.write_all(render_line(entry).as_bytes())?;
    }
    writer.flush()
}

/// Append entries to the fallback file, no retries
pub fn write_fallback(path: &Path, entries: &[LogEntry]) -> Result<(), DumpError> {
    let to_error = |source| DumpError::Fallback {
        path: path.to_path_buf(),
        source,
    };
    let mut file = open_append(path).map_err(to_error)?;
    write_batch(&mut file, entries).map_err(to_error)
}
