//! Configuration management for spoollog

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logging::{
    EmitMode, LogLevel, Logger, DEFAULT_DEBUG_SWITCH_FILE, DEFAULT_DUMP_FILE_SIZE,
    DEFAULT_DUMP_INTERVAL_MS, DEFAULT_DUMP_THRESHOLD, DEFAULT_FALLBACK_FILE,
};

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum level that is emitted: "debug", "info", "warn" or "error"
    #[serde(default)]
    pub level: LogLevel,

    /// Show `[file line]` of the call site instead of the tag
    #[serde(default)]
    pub is_show_caller: bool,

    /// Dump to files instead of printing to the console
    #[serde(default)]
    pub is_dump: bool,

    /// Dump file; rotated archives are created next to it
    #[serde(default = "default_dump_path")]
    pub dump_path: PathBuf,

    /// Size in bytes at which the dump file is rotated (default: 32 MiB)
    #[serde(default = "default_dump_file_size")]
    pub dump_file_size: u64,

    /// Queue length that triggers an early dump (default: 32768)
    #[serde(default = "default_dump_threshold")]
    pub dump_threshold: usize,

    /// Milliseconds between dumps (default: 100)
    #[serde(default = "default_dump_interval_ms", alias = "dump_interval")]
    pub dump_interval_ms: u64,

    /// "best_effort" drops entries on contention, "guaranteed" never drops
    #[serde(default)]
    pub emit_mode: EmitMode,

    /// While this file exists, debug entries are dumped regardless of level
    #[serde(default = "default_debug_switch_file")]
    pub debug_switch_file: Option<PathBuf>,

    /// Receives entries the dump file could not take
    #[serde(default = "default_fallback_path")]
    pub fallback_path: PathBuf,

    /// Delete rotated dump files older than this many days
    #[serde(default)]
    pub retention_days: Option<u64>,
}

fn default_dump_path() -> PathBuf {
    PathBuf::from("spoollog.log")
}

fn default_dump_file_size() -> u64 {
    DEFAULT_DUMP_FILE_SIZE
}

fn default_dump_threshold() -> usize {
    DEFAULT_DUMP_THRESHOLD
}

fn default_dump_interval_ms() -> u64 {
    DEFAULT_DUMP_INTERVAL_MS
}

fn default_debug_switch_file() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_DEBUG_SWITCH_FILE))
}

fn default_fallback_path() -> PathBuf {
    PathBuf::from(DEFAULT_FALLBACK_FILE)
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            is_show_caller: false,
            is_dump: false,
            dump_path: default_dump_path(),
            dump_file_size: default_dump_file_size(),
            dump_threshold: default_dump_threshold(),
            dump_interval_ms: default_dump_interval_ms(),
            emit_mode: EmitMode::default(),
            debug_switch_file: default_debug_switch_file(),
            fallback_path: default_fallback_path(),
            retention_days: None,
        }
    }
}

/// Whether `path` should be read and written as JSON rather than TOML
fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Expand a leading `~` to the home directory
fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => PathBuf::from(shellexpand::tilde(raw).into_owned()),
        None => path.to_path_buf(),
    }
}

impl LogConfig {
    /// Load configuration from `path` (JSON for `.json`, TOML otherwise)
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = if is_json(path) {
            serde_json::from_str(&content).context("Failed to parse JSON config file")?
        } else {
            toml::from_str(&content).context("Failed to parse config file")?
        };
        Ok(config.expanded())
    }

    /// Load `~/.spoollog/config.toml`, or return default if not found
    pub fn load_default() -> Result<Self> {
        let path = config_file_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path` in the format its extension names
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = if is_json(path) {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        } else {
            toml::to_string_pretty(self).context("Failed to serialize config")?
        };
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Configure `logger`, starting dump mode if enabled
    pub fn apply(&self, logger: &Logger) {
        logger.set_level(self.level);
        logger.set_show_caller(self.is_show_caller);
        logger.set_emit_mode(self.emit_mode);
        logger.set_debug_switch_file(self.debug_switch_file.clone());
        logger.set_dump_fallback_path(&self.fallback_path);
        logger.set_dump_retention_days(self.retention_days);

        if self.is_dump {
            logger.start_dump(
                &self.dump_path,
                self.dump_file_size,
                self.dump_threshold,
                self.dump_interval_ms,
            );
        }
    }

    fn expanded(mut self) -> Self {
        self.dump_path = expand_path(&self.dump_path);
        self.fallback_path = expand_path(&self.fallback_path);
        self.debug_switch_file = self.debug_switch_file.as_deref().map(expand_path);
        self
    }
}

/// Get the base configuration directory (~/.spoollog)
/// Falls back to ./.spoollog if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".spoollog")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".spoollog"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
