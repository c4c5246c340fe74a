//! Table serializer
//!
//! A table file is a UTF-8 JSON array of `[key, compactRecord]` pairs:
//!
//! ```text
//! [["k1",{"v":{"s":"DHT22"},"ver":2,"ts":1700000000000,"exp":null,"dict":"sensors"}],
//!  ["k2",{"v":42,"ver":1,"ts":1700000000500,"exp":1700000060000}]]
//! ```

use crate::dictionary::DictionaryRegistry;
use crate::error::Result;
use crate::record::CompactRecord;
use crate::memtable::Table;

/// Outcome of decoding a table file
#[derive(Debug)]
pub enum Decoded {
    Table(Table),
    /// Zero-length file
    Empty,
    /// Bytes that are not a valid table snapshot
    Corrupt(String),
}

/// Encode every record of `table`, in key order
pub fn encode_table(table: &Table, dictionaries: &DictionaryRegistry) -> Result<Vec<u8>> {
    let pairs: Vec<(&str, CompactRecord)> = table
        .iter()
        .map(|(key, record)| (key.as_str(), CompactRecord::from_record(record, dictionaries)))
        .collect();

    Ok(serde_json::to_vec(&pairs)?)
}

/// Decode a table file's bytes, inflating dictionary-compressed payloads
pub fn decode_table(bytes: &[u8], dictionaries: &DictionaryRegistry) -> Decoded {
    if bytes.is_empty() {
        return Decoded::Empty;
    }

    match serde_json::from_slice::<Vec<(String, CompactRecord)>>(bytes) {
        Ok(pairs) => Decoded::Table(
            pairs
                .into_iter()
                .map(|(key, compact)| (key, compact.into_record(dictionaries)))
                .collect(),
        ),
        Err(e) => Decoded::Corrupt(e.to_string()),
    }
}
