//! Engine Module
//!
//! The table cache: the only entry point callers use.
//!
//! ## Responsibilities
//! - Validate input before touching any state
//! - Lazily load tables from disk on first reference
//! - Assign versions, apply expiry, evict expired records on access
//! - Persist the whole table after every mutation
//! - Hold the dictionary registry
//!
//! ## Failure policy
//! - Bad input (`Validation`, `Config`) is always returned as `Err`
//! - Storage faults during `write`/`get`/`delete`/`size`/`cleanup_*` are logged
//!   and turned into a safe default (`false`, `None`, empty, `0`)
//! - Storage faults during `open`/`flush`/`close`/`delete_table` propagate

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dictionary::{DictionaryRegistry, DictionarySpec};
use crate::error::{Result, ShelfError};
use crate::memtable::Table;
use crate::record::Record;
use crate::storage::StorageManager;
use crate::validation::{DefaultValidator, Validator};

/// When a written record stops being visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiry {
    #[default]
    Never,
    /// Absolute unix millis
    At(u64),
    /// Relative to the write
    In(Duration),
}

/// Per-write options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub expiry: Expiry,
    pub dictionary: Option<String>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire at an absolute unix-millis instant
    pub fn expires_at(mut self, ms: u64) -> Self {
        self.expiry = Expiry::At(ms);
        self
    }

    /// Expire `ttl` after the write
    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.expiry = Expiry::In(ttl);
        self
    }

    /// Compress the value's keys with a registered dictionary
    pub fn dictionary(mut self, name: impl Into<String>) -> Self {
        self.dictionary = Some(name.into());
        self
    }
}

/// A table's lock-protected state
#[derive(Debug, Default)]
struct TableSlot {
    /// `None` until first loaded from disk
    table: Option<Table>,

    /// Set by `delete_table`; holders of a stale slot must look it up again
    dropped: bool,
}

impl TableSlot {
    /// Reading a missing table loads it empty; that alone does not create it.
    fn has_records(&self) -> bool {
        self.table.as_ref().map_or(false, |t| !t.is_empty())
    }
}

/// The embedded database
///
/// ## Concurrency Model: one mutex per table
///
/// - `tables`: RwLock over the name → slot map, held only to find, create or
///   release a slot (and by `delete_table` until the file is unlinked)
/// - A slot left with no records and no file is released after the
///   operation, so reads of missing tables leave nothing behind
/// - Each slot's Mutex is held from "read current state" through "persist",
///   so two writers on one table never interleave and every snapshot on disk
///   matches some in-memory state
/// - Distinct tables proceed in parallel
/// - `dictionaries` is read while persisting/loading, written only by
///   `add_dictionary`/`remove_dictionary`
pub struct Database {
    /// Database configuration
    config: Config,

    /// File-per-table storage
    storage: StorageManager,

    /// Pre-check for table names, keys, and values
    validator: Box<dyn Validator>,

    /// Loaded (or loading) tables
    tables: RwLock<HashMap<String, Arc<Mutex<TableSlot>>>>,

    /// Named key-compression dictionaries
    dictionaries: RwLock<DictionaryRegistry>,
}

impl Database {
    /// Open or create a database with the given config
    ///
    /// On startup:
    /// 1. Create data directory (recursively) if needed
    /// 2. Remove temp files from interrupted writes
    ///
    /// Tables are loaded lazily on first access.
    pub fn open(config: Config) -> Result<Self> {
        let validator = DefaultValidator::new(config.max_table_name_len, config.max_key_len);
        Self::open_with_validator(config, Box::new(validator))
    }

    /// Open with a custom input validator
    pub fn open_with_validator(config: Config, validator: Box<dyn Validator>) -> Result<Self> {
        let storage = StorageManager::open(&config.data_dir, config.sync_mode)?;

        info!(
            dir = %config.data_dir.display(),
            mode = ?config.sync_mode,
            "database opened"
        );

        Ok(Self {
            config,
            storage,
            validator,
            tables: RwLock::new(HashMap::new()),
            dictionaries: RwLock::new(DictionaryRegistry::new()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Write a value that never expires
    pub fn write<T: Serialize + ?Sized>(&self, table: &str, key: &str, value: &T) -> Result<bool> {
        self.write_with(table, key, value, WriteOptions::default())
    }

    /// Write a value, bumping the key's version
    ///
    /// Returns `Ok(false)` when the table could not be loaded or persisted;
    /// memory is left as it was before the call in that case.
    pub fn write_with<T: Serialize + ?Sized>(
        &self,
        table: &str,
        key: &str,
        value: &T,
        options: WriteOptions,
    ) -> Result<bool> {
        self.validator.validate_table_name(table)?;
        self.validator.validate_key(key)?;
        let value = serde_json::to_value(value)
            .map_err(|e| ShelfError::Validation(format!("value is not representable: {}", e)))?;
        self.validator.validate_value(&value)?;

        if let Some(name) = &options.dictionary {
            if !self.dictionaries.read().contains(name) {
                return Err(ShelfError::Config(format!("unknown dictionary '{}'", name)));
            }
        }

        let result = self.with_table(table, |t| {
            let now = self.now();
            let expires_at = match options.expiry {
                Expiry::Never => None,
                Expiry::At(ms) => Some(ms),
                Expiry::In(ttl) => Some(now.saturating_add(ttl.as_millis() as u64)),
            };

            let previous = t.get(key).cloned();
            t.upsert(key, value, now, expires_at, options.dictionary);

            match self.persist(table, t) {
                Ok(()) => true,
                Err(e) => {
                    match previous {
                        Some(record) => t.insert(key.to_string(), record),
                        None => t.remove(key),
                    };
                    warn!(table, key, error = %e, "write not persisted");
                    false
                }
            }
        });

        Ok(self.absorb("write", table, result, false))
    }

    /// Get a live value
    ///
    /// An expired record is evicted (and the table re-persisted) on the way.
    pub fn get(&self, table: &str, key: &str) -> Result<Option<Value>> {
        Ok(self.get_record(table, key)?.map(|record| record.value))
    }

    /// Get a live value converted to `T`
    pub fn get_as<T: DeserializeOwned>(&self, table: &str, key: &str) -> Result<Option<T>> {
        match self.get(table, key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Get a live record with its metadata
    pub fn get_record(&self, table: &str, key: &str) -> Result<Option<Record>> {
        self.validator.validate_table_name(table)?;
        self.validator.validate_key(key)?;

        let result = self.with_table(table, |t| {
            let (record, evicted) = t.get_live(key, self.now());
            let record = record.cloned();
            if evicted {
                self.persist_or_warn(table, t);
            }
            record
        });

        Ok(self.absorb("get", table, result, None))
    }

    /// All live `(key, value)` pairs in key order
    pub fn get_all(&self, table: &str) -> Result<Vec<(String, Value)>> {
        self.validator.validate_table_name(table)?;

        let result = self.with_table(table, |t| {
            self.evict_and_persist(table, t);
            t.iter()
                .map(|(key, record)| (key.clone(), record.value.clone()))
                .collect()
        });

        Ok(self.absorb("get_all", table, result, Vec::new()))
    }

    /// Whether `key` is live
    pub fn has(&self, table: &str, key: &str) -> Result<bool> {
        Ok(self.get_record(table, key)?.is_some())
    }

    /// Live keys in order
    pub fn keys(&self, table: &str) -> Result<Vec<String>> {
        self.validator.validate_table_name(table)?;

        let result = self.with_table(table, |t| {
            self.evict_and_persist(table, t);
            t.keys().cloned().collect()
        });

        Ok(self.absorb("keys", table, result, Vec::new()))
    }

    /// Delete a key
    ///
    /// Returns `true` only if a live record was removed. An expired record is
    /// purged too, but reported as not found.
    pub fn delete(&self, table: &str, key: &str) -> Result<bool> {
        self.validator.validate_table_name(table)?;
        self.validator.validate_key(key)?;

        let result = self.with_table(table, |t| {
            let Some(removed) = t.remove(key) else {
                return false;
            };

            if removed.is_expired_at(self.now()) {
                self.persist_or_warn(table, t);
                return false;
            }

            match self.persist(table, t) {
                Ok(()) => true,
                Err(e) => {
                    t.insert(key.to_string(), removed);
                    warn!(table, key, error = %e, "delete not persisted");
                    false
                }
            }
        });

        Ok(self.absorb("delete", table, result, false))
    }

    /// Count of live records
    pub fn size(&self, table: &str) -> Result<usize> {
        self.validator.validate_table_name(table)?;

        let result = self.with_table(table, |t| {
            self.evict_and_persist(table, t);
            t.len()
        });

        Ok(self.absorb("size", table, result, 0))
    }

    /// Evict every expired record in `table`. Returns how many were removed.
    pub fn cleanup_expired(&self, table: &str) -> Result<usize> {
        self.validator.validate_table_name(table)?;

        let result = self.with_table(table, |t| self.evict_and_persist(table, t));

        Ok(self.absorb("cleanup_expired", table, result, 0))
    }

    /// Evict expired records from every known table
    pub fn cleanup_all_expired(&self) -> Result<usize> {
        let names = match self.list_tables() {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "cleanup_all_expired could not list tables");
                return Ok(0);
            }
        };

        let mut removed = 0;
        for name in names {
            match self.cleanup_expired(&name) {
                Ok(n) => removed += n,
                Err(e) => warn!(table = %name, error = %e, "cleanup skipped table"),
            }
        }
        Ok(removed)
    }

    // =========================================================================
    // Table Operations
    // =========================================================================

    /// Names of all tables with a file or records in memory, sorted
    ///
    /// Files whose names are not valid table names are not tables and are
    /// left out.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut names: BTreeSet<String> = BTreeSet::new();
        for name in self.storage.table_names()? {
            match self.validator.validate_table_name(&name) {
                Ok(()) => {
                    names.insert(name);
                }
                Err(e) => debug!(file = %name, error = %e, "ignoring non-table file"),
            }
        }

        for (name, slot) in self.tables.read().iter() {
            if slot.lock().has_records() {
                names.insert(name.clone());
            }
        }

        Ok(names.into_iter().collect())
    }

    /// Whether a table has a file or records in memory
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        self.validator.validate_table_name(table)?;

        let loaded = self
            .tables
            .read()
            .get(table)
            .map(|slot| slot.lock().has_records())
            .unwrap_or(false);

        Ok(loaded || self.storage.contains(table))
    }

    /// Drop a table from memory and delete its file
    ///
    /// Returns whether the table existed in either place.
    pub fn delete_table(&self, table: &str) -> Result<bool> {
        self.validator.validate_table_name(table)?;

        // The map stays write-locked until the file is gone so no other
        // thread can load the old snapshot into a fresh slot meanwhile.
        let mut tables = self.tables.write();
        let slot = tables.remove(table);

        let mut guard = slot.as_ref().map(|s| s.lock());
        let was_loaded = match guard.as_deref_mut() {
            Some(state) => {
                state.dropped = true;
                state.table.take().map_or(false, |t| !t.is_empty())
            }
            None => false,
        };

        let removed_file = self.storage.remove(table)?;
        drop(guard);
        drop(tables);

        if was_loaded || removed_file {
            info!(table, "table deleted");
        }
        Ok(was_loaded || removed_file)
    }

    // =========================================================================
    // Dictionary Operations
    // =========================================================================

    /// Register (or replace) a named dictionary. Memory only.
    ///
    /// Records already loaded while `name` was unknown still hold their
    /// compressed payload; they are inflated here so reads see the original
    /// keys without a reopen.
    pub fn add_dictionary(&self, name: impl Into<String>, spec: DictionarySpec) -> Result<()> {
        let name = name.into();
        let dictionary = {
            let mut dictionaries = self.dictionaries.write();
            dictionaries.add(name.clone(), spec)?;
            dictionaries.get(&name)
        };
        let Some(dictionary) = dictionary else {
            return Ok(());
        };

        let slots: Vec<(String, Arc<Mutex<TableSlot>>)> = self
            .tables
            .read()
            .iter()
            .map(|(table, slot)| (table.clone(), Arc::clone(slot)))
            .collect();

        for (table, slot) in slots {
            let mut state = slot.lock();
            if let Some(t) = state.table.as_mut() {
                let restored = t.restore_compressed(&name, &dictionary);
                if restored > 0 {
                    debug!(table = %table, dictionary = %name, restored, "inflated pending records");
                }
            }
        }
        Ok(())
    }

    /// Returns whether a dictionary was registered under `name`
    pub fn remove_dictionary(&self, name: &str) -> bool {
        self.dictionaries.write().remove(name)
    }

    /// Registered dictionary names, sorted
    pub fn list_dictionaries(&self) -> Vec<String> {
        self.dictionaries.read().names()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Re-persist every loaded table
    ///
    /// Fails on the first table that cannot be written.
    pub fn flush(&self) -> Result<()> {
        let slots: Vec<(String, Arc<Mutex<TableSlot>>)> = self
            .tables
            .read()
            .iter()
            .map(|(name, slot)| (name.clone(), Arc::clone(slot)))
            .collect();

        for (name, slot) in slots {
            let state = slot.lock();
            if state.dropped {
                continue;
            }
            if let Some(table) = &state.table {
                self.persist(&name, table)?;
            }
        }
        Ok(())
    }

    /// Flush and release the database
    pub fn close(self) -> Result<()> {
        self.flush()?;
        info!(dir = %self.config.data_dir.display(), "database closed");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of tables currently held in memory
    pub fn loaded_table_count(&self) -> usize {
        self.tables
            .read()
            .values()
            .filter(|slot| slot.lock().table.is_some())
            .count()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn now(&self) -> u64 {
        self.config.clock.now_ms()
    }

    /// Find or create the slot for `name`
    fn slot(&self, name: &str) -> Arc<Mutex<TableSlot>> {
        if let Some(slot) = self.tables.read().get(name) {
            return Arc::clone(slot);
        }

        let mut tables = self.tables.write();
        Arc::clone(tables.entry(name.to_string()).or_default())
    }

    /// Run `f` on the loaded table with its lock held
    fn with_table<R>(&self, name: &str, f: impl FnOnce(&mut Table) -> R) -> Result<R> {
        loop {
            let slot = self.slot(name);
            let mut state = slot.lock();

            // Deleted or released between lookup and lock; a fresh slot now
            // exists or will be created on retry.
            if state.dropped {
                continue;
            }

            let loaded = match state.table.take() {
                Some(table) => Ok(table),
                None => {
                    let dictionaries = self.dictionaries.read();
                    self.storage.load(name, &dictionaries)
                }
            };
            let table = match loaded {
                Ok(table) => state.table.insert(table),
                Err(e) => {
                    drop(state);
                    self.release_if_vacant(name, &slot);
                    return Err(e);
                }
            };

            let result = f(&mut *table);
            let vacant = table.is_empty();
            drop(state);

            if vacant {
                self.release_if_vacant(name, &slot);
            }
            return Ok(result);
        }
    }

    /// Forget a slot that holds no records and has no file behind it
    ///
    /// Lock order is map then slot, matching `delete_table`.
    fn release_if_vacant(&self, name: &str, slot: &Arc<Mutex<TableSlot>>) {
        let mut tables = self.tables.write();
        if !tables.get(name).map_or(false, |s| Arc::ptr_eq(s, slot)) {
            return;
        }

        let mut state = slot.lock();
        if state.has_records() || self.storage.contains(name) {
            return;
        }
        state.dropped = true;
        drop(state);

        tables.remove(name);
    }

    fn persist(&self, name: &str, table: &Table) -> Result<()> {
        self.storage.persist(name, table, &self.dictionaries.read())
    }

    fn persist_or_warn(&self, name: &str, table: &Table) {
        if let Err(e) = self.persist(name, table) {
            warn!(table = name, error = %e, "eviction not persisted");
        }
    }

    /// Evict expired records, persisting if anything changed
    fn evict_and_persist(&self, name: &str, table: &mut Table) -> usize {
        let removed = table.evict_expired(self.now());
        if removed > 0 {
            self.persist_or_warn(name, table);
        }
        removed
    }

    /// Turn a storage fault into the operation's safe default
    fn absorb<T>(&self, op: &str, table: &str, result: Result<T>, default: T) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                warn!(op, table, error = %e, "storage fault, returning default");
                default
            }
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("data_dir", &self.config.data_dir)
            .field("sync_mode", &self.config.sync_mode)
            .field("loaded_tables", &self.loaded_table_count())
            .finish()
    }
}
