//! Record Module
//!
//! Versioned, optionally expiring wrapper around a stored value.
//!
//! ## Lifecycle per (table, key)
//! ```text
//!   absent ──write──▶ live(v=1) ──write──▶ live(v=n+1)
//!      ▲                  │
//!      └──delete / now > expires_at (observed on access)
//! ```
//! Deleting or evicting a key forgets its version; the next write starts
//! again at 1. An expired record not yet evicted still counts.

mod compact;

use serde_json::Value;

use crate::dictionary::Dictionary;

pub use compact::CompactRecord;

/// A stored value plus its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The value as the caller wrote it
    pub value: Value,

    /// Starts at 1, bumped on every overwrite of a stored key
    pub version: u64,

    /// Unix millis of the last write
    pub written_at: u64,

    /// Unix millis after which the record is gone; `None` never expires
    pub expires_at: Option<u64>,

    /// Dictionary applied to `value` when persisted
    pub dictionary: Option<String>,

    /// `value` still holds the deflated payload because its dictionary was
    /// not registered when the table was loaded
    pub(crate) compressed: bool,
}

impl Record {
    pub fn new(
        value: Value,
        version: u64,
        written_at: u64,
        expires_at: Option<u64>,
        dictionary: Option<String>,
    ) -> Self {
        Self {
            value,
            version,
            written_at,
            expires_at,
            dictionary,
            compressed: false,
        }
    }

    /// Strict comparison: a record expiring at `T` is still live at `T`.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        matches!(self.expires_at, Some(expires_at) if now_ms > expires_at)
    }

    /// True when the value could not be restored through its dictionary
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }
    /// Inflate a payload left compressed at load time, now that its
    /// dictionary is registered as `name`. Returns whether the value changed.
    pub(crate) fn restore_with(&mut self, name: &str, dictionary: &Dictionary) -> bool {
        if !self.compressed || self.dictionary.as_deref() != Some(name) {
            return false;
        }
        self.value = dictionary.inflate(&self.value);
        self.compressed = false;
        true
    }
}
