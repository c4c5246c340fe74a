//! # ShelfDB
//!
//! An embedded key-value store where each table is one JSON file:
//! - Whole-table snapshots published by atomic rename
//! - Optional fsync of file and directory (durable mode)
//! - Per-key versioning and lazy expiration
//! - Dictionary-based key compression of stored values
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Database                             │
//! │        (validation, versioning, expiry, one lock per table)  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  MemTable   │          │ Dictionary  │
//!   │ (per table) │          │  Registry   │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                         │
//!          └────────────┬────────────┘
//!                       ▼
//!               ┌───────────────┐
//!               │    Storage    │
//!               │ (tmp+rename)  │
//!               └───────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use serde_json::json;
//! use shelfdb::{Database, DictionarySpec, WriteOptions};
//!
//! let db = Database::open_path(std::path::Path::new("./data"))?;
//! db.add_dictionary("readings", DictionarySpec::deflate([("sensor", "s")]))?;
//!
//! db.write_with(
//!     "devices",
//!     "kitchen",
//!     &json!({"sensor": "DHT22"}),
//!     WriteOptions::new().dictionary("readings"),
//! )?;
//! assert_eq!(db.get("devices", "kitchen")?, Some(json!({"sensor": "DHT22"})));
//! db.close()?;
//! # Ok::<(), shelfdb::ShelfError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod clock;

pub mod dictionary;
pub mod record;
pub mod validation;
pub mod memtable;
pub mod storage;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ShelfError, Result};
pub use config::{Config, SyncMode};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dictionary::{process_dictionary, transform, Dictionary, DictionarySpec};
pub use record::Record;
pub use engine::{Database, Expiry, WriteOptions};

/// Structured value stored under a key
pub use serde_json::Value;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ShelfDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
