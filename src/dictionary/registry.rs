//! Dictionary construction and registry

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, ShelfError};

use super::{transform, KeyMap};

/// Caller-supplied dictionary definition.
///
/// Exactly one side must be given; the other is derived by swapping pairs.
/// Pairs are kept in definition order so that, when two long keys share a
/// short key, the one defined last wins the derived entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictionarySpec {
    pub deflate: Option<Vec<(String, String)>>,
    pub inflate: Option<Vec<(String, String)>>,
}

impl DictionarySpec {
    /// Define by the compression side (semantic key → short key)
    pub fn deflate<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            deflate: Some(collect_pairs(pairs)),
            inflate: None,
        }
    }

    /// Define by the decompression side (short key → semantic key)
    pub fn inflate<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            deflate: None,
            inflate: Some(collect_pairs(pairs)),
        }
    }

    /// Parse `{"deflate": {...}}` or `{"inflate": {...}}`.
    ///
    /// Mapping values must be strings.
    pub fn from_json(value: &Value) -> Result<Self> {
        let side = |name: &str| -> Result<Option<Vec<(String, String)>>> {
            let Some(raw) = value.get(name) else {
                return Ok(None);
            };
            let obj = raw.as_object().ok_or_else(|| {
                ShelfError::Config(format!("dictionary '{}' must be an object", name))
            })?;
            obj.iter()
                .map(|(k, v)| match v.as_str() {
                    Some(s) => Ok((k.clone(), s.to_string())),
                    None => Err(ShelfError::Config(format!(
                        "dictionary '{}' entry '{}' must map to a string",
                        name, k
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some)
        };

        Ok(Self {
            deflate: side("deflate")?,
            inflate: side("inflate")?,
        })
    }
}

fn collect_pairs<I, K, V>(pairs: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// A matched pair of inverse key maps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    deflate: KeyMap,
    inflate: KeyMap,
}

impl Dictionary {
    pub fn deflate_map(&self) -> &KeyMap {
        &self.deflate
    }

    pub fn inflate_map(&self) -> &KeyMap {
        &self.inflate
    }

    /// Compress a value's keys
    pub fn deflate(&self, value: &Value) -> Value {
        transform(value, &self.deflate)
    }

    /// Restore a value's keys
    pub fn inflate(&self, value: &Value) -> Value {
        transform(value, &self.inflate)
    }
}

/// Build a `Dictionary` from a one-sided spec.
///
/// Fails with `ShelfError::Config` when both or neither side is supplied.
pub fn process_dictionary(spec: DictionarySpec) -> Result<Dictionary> {
    let (deflate, inflate) = match (spec.deflate, spec.inflate) {
        (Some(_), Some(_)) => {
            return Err(ShelfError::Config(
                "dictionary must supply either deflate or inflate, not both".to_string(),
            ))
        }
        (None, None) => {
            return Err(ShelfError::Config(
                "dictionary must supply deflate or inflate".to_string(),
            ))
        }
        (Some(pairs), None) => {
            let (supplied, derived) = supplied_and_swapped(pairs);
            (supplied, derived)
        }
        (None, Some(pairs)) => {
            let (supplied, derived) = supplied_and_swapped(pairs);
            (derived, supplied)
        }
    };

    Ok(Dictionary { deflate, inflate })
}

/// Collapse repeated source keys (last wins), then invert what is left.
///
/// The inversion walks the pairs in definition order, so a short key shared
/// by two surviving sources maps back to the later one.
fn supplied_and_swapped(pairs: Vec<(String, String)>) -> (KeyMap, KeyMap) {
    let supplied: KeyMap = pairs.iter().cloned().collect();

    let mut derived = KeyMap::with_capacity(supplied.len());
    for (from, to) in pairs {
        if supplied.get(&from) == Some(&to) {
            derived.insert(to, from);
        }
    }

    (supplied, derived)
}

/// Named dictionaries known to a database.
///
/// Purely in-memory; nothing reaches disk until a write references a name.
#[derive(Debug, Default)]
pub struct DictionaryRegistry {
    dictionaries: HashMap<String, Arc<Dictionary>>,
}

impl DictionaryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a dictionary under `name`
    pub fn add(&mut self, name: impl Into<String>, spec: DictionarySpec) -> Result<()> {
        let dictionary = process_dictionary(spec)?;
        self.dictionaries.insert(name.into(), Arc::new(dictionary));
        Ok(())
    }

    /// Returns whether a dictionary was registered under `name`
    pub fn remove(&mut self, name: &str) -> bool {
        self.dictionaries.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Dictionary>> {
        self.dictionaries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dictionaries.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.dictionaries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.dictionaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dictionaries.is_empty()
    }
}
