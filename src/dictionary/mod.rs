//! Dictionary Module
//!
//! Key compression for stored values.
//!
//! ## Responsibilities
//! - Turn a one-sided caller mapping into a matched deflate/inflate pair
//! - Recursively rename object keys inside a `serde_json::Value`
//! - Keep the set of named dictionaries a database knows about
//!
//! ## Direction
//! ```text
//!   {"sensor": "DHT22"}  ──deflate──▶  {"s": "DHT22"}
//!   {"s": "DHT22"}       ──inflate──▶  {"sensor": "DHT22"}
//! ```
//!
//! Arrays keep their shape and order; only object keys are renamed. Keys
//! absent from the mapping pass through unchanged. No collision detection is
//! performed: if two keys rename to the same target, the later one wins.

mod codec;
mod registry;

use std::collections::HashMap;

pub use codec::transform;
pub use registry::{process_dictionary, Dictionary, DictionaryRegistry, DictionarySpec};

/// Flat key → key renaming table
pub type KeyMap = HashMap<String, String>;
