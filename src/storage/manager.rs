//! Storage Manager
//!
//! Maps table names to files in the data directory and moves whole tables
//! between memory and disk.
//!
//! ## Responsibilities
//! - Create the data directory and sweep temp files left by a crash
//! - Load a table (missing, empty, or unparseable file ⇒ empty table)
//! - Persist a table through the atomic write protocol
//! - Discover and remove table files

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::SyncMode;
use crate::dictionary::DictionaryRegistry;
use crate::error::{Result, ShelfError};
use crate::memtable::Table;

use super::serializer::{decode_table, encode_table, Decoded};
use super::table_file::{is_temp_file_name, TableFile};

/// Owns the data directory.
///
/// Stateless apart from its configuration; all methods take `&self` and the
/// caller serializes access per table.
#[derive(Debug)]
pub struct StorageManager {
    /// Directory holding one file per table
    data_dir: PathBuf,

    /// Durability of every persist
    sync_mode: SyncMode,
}

impl StorageManager {
    /// Open or create storage in the given directory
    ///
    /// On startup:
    /// 1. Create directory (and parents) if it doesn't exist
    /// 2. Delete `<table>.tmp.*` files an interrupted writer left behind
    pub fn open(path: &Path, sync_mode: SyncMode) -> Result<Self> {
        fs::create_dir_all(path)?;

        let manager = Self {
            data_dir: path.to_path_buf(),
            sync_mode,
        };

        let swept = manager.sweep_temp_files()?;
        if swept > 0 {
            warn!(dir = %path.display(), count = swept, "removed stale temp files");
        }

        Ok(manager)
    }

    /// Load a table from disk
    ///
    /// Returns:
    /// - `Ok(table)`: parsed snapshot, or an empty table when the file is
    ///   missing, zero-length, or not a valid snapshot
    /// - `Err(Persistence)`: the file exists but could not be read
    pub fn load(&self, name: &str, dictionaries: &DictionaryRegistry) -> Result<Table> {
        let file = self.table_file(name);

        let Some(bytes) = file.read().map_err(|e| ShelfError::persistence(name, e))? else {
            debug!(table = name, "no table file, starting empty");
            return Ok(Table::new());
        };

        match decode_table(&bytes, dictionaries) {
            Decoded::Table(table) => {
                debug!(table = name, entries = table.len(), bytes = bytes.len(), "loaded table");
                Ok(table)
            }
            Decoded::Empty => {
                warn!(table = name, "table file is empty, treating table as empty");
                Ok(Table::new())
            }
            Decoded::Corrupt(reason) => {
                warn!(table = name, %reason, "table file unreadable, treating table as empty");
                Ok(Table::new())
            }
        }
    }

    /// Write the whole table, replacing its file atomically
    pub fn persist(&self, name: &str, table: &Table, dictionaries: &DictionaryRegistry) -> Result<()> {
        let bytes = encode_table(table, dictionaries)?;

        self.table_file(name)
            .write_atomic(&bytes, self.sync_mode)
            .map_err(|e| ShelfError::persistence(name, e))?;

        debug!(
            table = name,
            entries = table.len(),
            bytes = bytes.len(),
            mode = ?self.sync_mode,
            "persisted table"
        );
        Ok(())
    }

    /// Delete a table's file. Returns whether it existed.
    pub fn remove(&self, name: &str) -> Result<bool> {
        self.table_file(name)
            .remove()
            .map_err(|e| ShelfError::persistence(name, e))
    }

    /// Whether a table file is present on disk
    pub fn contains(&self, name: &str) -> bool {
        self.table_file(name).exists()
    }

    /// Names of all table files in the directory, sorted
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') || is_temp_file_name(&name) {
                continue;
            }
            names.push(name);
        }

        names.sort();
        Ok(names)
    }

    /// The file backing `name`
    pub fn table_file(&self, name: &str) -> TableFile {
        TableFile::new(self.data_dir.join(name))
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn sweep_temp_files(&self) -> Result<usize> {
        let mut removed = 0;

        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            let is_temp = entry
                .file_name()
                .to_str()
                .map(is_temp_file_name)
                .unwrap_or(false);

            if is_temp && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}
