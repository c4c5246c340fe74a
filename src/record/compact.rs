//! On-disk record shape
//!
//! Field names are part of the file format and must not change:
//!
//! | field  | meaning                                  |
//! |--------|------------------------------------------|
//! | `v`    | value (deflated if `dict` is present)    |
//! | `ver`  | version                                  |
//! | `ts`   | written at, unix millis                  |
//! | `exp`  | expires at, unix millis, or `null`       |
//! | `dict` | dictionary name, omitted when none       |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::dictionary::DictionaryRegistry;

use super::Record;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactRecord {
    #[serde(rename = "v")]
    pub value: Value,

    #[serde(rename = "ver")]
    pub version: u64,

    #[serde(rename = "ts")]
    pub written_at: u64,

    #[serde(rename = "exp", default)]
    pub expires_at: Option<u64>,

    #[serde(rename = "dict", default, skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<String>,
}

impl CompactRecord {
    /// Build the on-disk form, deflating the payload when the record names a
    /// registered dictionary.
    pub fn from_record(record: &Record, dictionaries: &DictionaryRegistry) -> Self {
        let (value, dictionary) = match (&record.dictionary, record.compressed) {
            (Some(name), true) => (record.value.clone(), Some(name.clone())),
            (Some(name), false) => match dictionaries.get(name) {
                Some(dict) => (dict.deflate(&record.value), Some(name.clone())),
                None => {
                    warn!(dictionary = %name, "dictionary no longer registered, storing value uncompressed");
                    (record.value.clone(), None)
                }
            },
            (None, _) => (record.value.clone(), None),
        };

        Self {
            value,
            version: record.version,
            written_at: record.written_at,
            expires_at: record.expires_at,
            dictionary,
        }
    }

    /// Restore the in-memory form, inflating the payload when possible.
    ///
    /// A payload whose dictionary is unknown is kept as-is and flagged, so it
    /// is written back verbatim rather than deflated twice.
    pub fn into_record(self, dictionaries: &DictionaryRegistry) -> Record {
        let mut compressed = false;
        let value = match &self.dictionary {
            Some(name) => match dictionaries.get(name) {
                Some(dict) => dict.inflate(&self.value),
                None => {
                    warn!(dictionary = %name, "dictionary not registered, value left compressed");
                    compressed = true;
                    self.value
                }
            },
            None => self.value,
        };

        Record {
            value,
            version: self.version,
            written_at: self.written_at,
            expires_at: self.expires_at,
            dictionary: self.dictionary,
            compressed,
        }
    }
}
