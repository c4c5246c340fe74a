//! Storage Module
//!
//! Persistent storage layer: one JSON file per table.
//!
//! ## Responsibilities
//! - Serialize a whole table to bytes and back
//! - Publish new snapshots with temp-file + rename so readers never observe
//!   a partial file
//! - Optional fsync of file and directory (durable mode)
//! - Recover from missing, empty, or unparseable files as an empty table
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── users                           ← table "users"
//!   ├── sensors                         ← table "sensors"
//!   └── sensors.tmp.1700000000000.9f3a  ← in-flight write (renamed on success)
//! ```

mod manager;
mod serializer;
mod table_file;

pub use manager::StorageManager;
pub use serializer::{decode_table, encode_table, Decoded};
pub use table_file::{is_temp_file_name, StagedWrite, TableFile};
