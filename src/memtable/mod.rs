//! MemTable Module
//!
//! In-memory image of one table file.
//!
//! ## Responsibilities
//! - Ordered key → Record map (BTreeMap, so snapshots are byte-stable)
//! - Version assignment on upsert
//! - Expiry checks and eviction against a caller-supplied "now"
//!
//! Nothing here touches disk; the engine persists after every mutation.

mod table;

pub use table::Table;
