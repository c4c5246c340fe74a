//! Table implementation
//!
//! BTreeMap-backed record map. Locking is the engine's job.

use std::collections::btree_map::{self, BTreeMap};

use serde_json::Value;

use crate::dictionary::Dictionary;
use crate::record::Record;

/// One table's records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    entries: BTreeMap<String, Record>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `value` under `key`, returning the stored record.
    ///
    /// Any stored record gets `version + 1`, expired or not; only delete or
    /// eviction forgets a key's version. A missing key starts at version 1.
    pub fn upsert(
        &mut self,
        key: &str,
        value: Value,
        now_ms: u64,
        expires_at: Option<u64>,
        dictionary: Option<String>,
    ) -> &Record {
        let version = match self.entries.get(key) {
            Some(prev) => prev.version + 1,
            None => 1,
        };

        let record = Record::new(value, version, now_ms, expires_at, dictionary);
        match self.entries.entry(key.to_string()) {
            btree_map::Entry::Occupied(mut slot) => {
                slot.insert(record);
                slot.into_mut()
            }
            btree_map::Entry::Vacant(slot) => slot.insert(record),
        }
    }

    /// Raw insert, no version logic
    pub fn insert(&mut self, key: String, record: Record) -> Option<Record> {
        self.entries.insert(key, record)
    }

    /// Raw lookup, expired or not
    pub fn get(&self, key: &str) -> Option<&Record> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Record> {
        self.entries.remove(key)
    }

    /// Look up a live record, evicting it if it has expired.
    ///
    /// Returns the record (if live) and whether an eviction happened.
    pub fn get_live(&mut self, key: &str, now_ms: u64) -> (Option<&Record>, bool) {
        let expired = self
            .entries
            .get(key)
            .map(|r| r.is_expired_at(now_ms))
            .unwrap_or(false);

        if expired {
            self.entries.remove(key);
            return (None, true);
        }
        (self.entries.get(key), false)
    }

    /// Drop every record expired at `now_ms`. Returns how many were removed.
    pub fn evict_expired(&mut self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, record| !record.is_expired_at(now_ms));
        before - self.entries.len()
    }

    /// Inflate records still compressed for want of dictionary `name`.
    /// Returns how many were restored.
    pub fn restore_compressed(&mut self, name: &str, dictionary: &Dictionary) -> usize {
        self.entries
            .values_mut()
            .map(|record| record.restore_with(name, dictionary))
            .filter(|&restored| restored)
            .count()
    }

    /// Number of stored records, including any not yet evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> btree_map::Iter<'_, String, Record> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

impl FromIterator<(String, Record)> for Table {
    fn from_iter<I: IntoIterator<Item = (String, Record)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = (&'a String, &'a Record);
    type IntoIter = btree_map::Iter<'a, String, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
