//! Rotated dump file retention
//!
//! Handles cleanup of rotated dump files based on age.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::Result;

/// Default retention period in days
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Clean up files rotated from `dump_path` that are older than the
/// retention period
///
/// Only names produced by rotation (`<stem>_YYMMDD_hhmmss_NNNNN<ext>`) in the
/// dump file's directory are considered. Returns the number of files deleted.
pub fn cleanup_rotated_dumps(dump_path: &Path, retention_days: u64) -> Result<usize> {
    let logs_dir = match dump_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    if !logs_dir.exists() {
        return Ok(0);
    }

    let stem = dump_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = dump_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let retention_duration = Duration::from_secs(retention_days.saturating_mul(SECS_PER_DAY));
    let cutoff = SystemTime::now()
        .checked_sub(retention_duration)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut deleted_count = 0;

    for entry in fs::read_dir(logs_dir)? {
        let entry = entry?;
        let path = entry.path();

        // Only process archives of this dump file
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if is_rotated_name(name, &stem, &ext) => {}
            _ => continue,
        }

        // Check file modification time
        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                if modified < cutoff && fs::remove_file(&path).is_ok() {
                    deleted_count += 1;
                }
            }
        }
    }

    Ok(deleted_count)
}

/// Whether `name` is `<stem>_YYMMDD_hhmmss_NNNNN<ext>`
fn is_rotated_name(name: &str, stem: &str, ext: &str) -> bool {
    let Some(rest) = name
        .strip_prefix(stem)
        .and_then(|r| r.strip_prefix('_'))
        .and_then(|r| r.strip_suffix(ext))
    else {
        return false;
    };

    let parts: Vec<&str> = rest.split('_').collect();
    parts.len() == 3
        && parts[0].len() == 6
        && parts[1].len() == 6
        && parts[2].len() >= 5
        && parts
            .iter()
            .all(|p| p.bytes().all(|b| b.is_ascii_digit()))
}
