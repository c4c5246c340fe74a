//! Configuration for ShelfDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};

/// Main configuration for a ShelfDB instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding one file per table
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── {table}                          (JSON snapshot)
    ///     └── {table}.tmp.{millis}.{suffix}    (in-flight write, never left behind)
    pub data_dir: PathBuf,

    /// Whether writes are forced to physical storage before returning
    pub sync_mode: SyncMode,

    // -------------------------------------------------------------------------
    // Validation Limits
    // -------------------------------------------------------------------------
    /// Maximum table name length (in bytes)
    pub max_table_name_len: usize,

    /// Maximum key length (in bytes)
    pub max_key_len: usize,

    // -------------------------------------------------------------------------
    // Time
    // -------------------------------------------------------------------------
    /// Time source for `written_at` stamps and expiry checks
    pub clock: Arc<dyn Clock>,
}

/// Durability of a table write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Atomic rename only. Crash safe, but the OS page cache may lose the
    /// most recent writes on power loss.
    #[default]
    Fast,

    /// fsync the temp file before rename and the directory after it
    Durable,
}

impl SyncMode {
    pub fn is_durable(self) -> bool {
        matches!(self, SyncMode::Durable)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./shelfdb_data"),
            sync_mode: SyncMode::Fast,
            max_table_name_len: 255,
            max_key_len: 1024,
            clock: Arc::new(SystemClock),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (one file per table lives here)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the durability mode
    pub fn sync_mode(mut self, mode: SyncMode) -> Self {
        self.config.sync_mode = mode;
        self
    }

    /// Shorthand for `sync_mode(SyncMode::Durable)` when `true`
    pub fn durable(self, durable: bool) -> Self {
        self.sync_mode(if durable { SyncMode::Durable } else { SyncMode::Fast })
    }

    /// Set the maximum table name length (in bytes)
    pub fn max_table_name_len(mut self, len: usize) -> Self {
        self.config.max_table_name_len = len;
        self
    }

    /// Set the maximum key length (in bytes)
    pub fn max_key_len(mut self, len: usize) -> Self {
        self.config.max_key_len = len;
        self
    }

    /// Replace the time source
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.config.clock = clock;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
