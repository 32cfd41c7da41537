//! Alternate-key indexes
//!
//! One [`KeyIndex`] per declared alternate key of a table. Entries map the
//! normalized key tuple (see [`ValueKey`]) to the owning record id, so string
//! key values match case-insensitively and lookups are O(1).

use std::collections::BTreeMap;

use memcrm_core::{AlternateKey, CrmError, CrmResult, Record, Value, ValueKey};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use uuid::Uuid;

/// Normalized key tuple; most keys have one or two attributes.
pub type KeyTuple = SmallVec<[ValueKey; 2]>;

/// Unique index over one alternate key.
#[derive(Debug, Clone)]
pub struct KeyIndex {
    key: AlternateKey,
    entries: FxHashMap<KeyTuple, Uuid>,
}

impl KeyIndex {
    /// Create an empty index for a key.
    pub fn new(key: AlternateKey) -> Self {
        Self {
            key,
            entries: FxHashMap::default(),
        }
    }

    /// Key name.
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Key attributes in declaration order.
    pub fn attributes(&self) -> &[String] {
        &self.key.attributes
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the attribute set names exactly this key's attributes.
    pub fn covers<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> bool {
        let names: Vec<&String> = names.into_iter().collect();
        names.len() == self.key.attributes.len()
            && self.key.attributes.iter().all(|a| names.contains(&a))
    }

    /// Key tuple of a record; `None` when any key attribute is missing or null.
    pub fn tuple_for(&self, record: &Record) -> Option<KeyTuple> {
        self.tuple_from(&record.attributes)
    }

    /// Key tuple from an attribute map.
    pub fn tuple_from(&self, values: &BTreeMap<String, Value>) -> Option<KeyTuple> {
        self.key
            .attributes
            .iter()
            .map(|a| values.get(a).filter(|v| !v.is_null()).map(Value::key))
            .collect()
    }

    /// Id owning a key tuple.
    pub fn lookup(&self, tuple: &KeyTuple) -> Option<Uuid> {
        self.entries.get(tuple).copied()
    }

    /// Fail when `record` would duplicate another record's key values.
    pub fn check(&self, record: &Record) -> CrmResult<()> {
        let Some(tuple) = self.tuple_for(record) else {
            return Ok(());
        };
        match self.entries.get(&tuple) {
            Some(owner) if *owner != record.id => {
                let values: Vec<String> = self
                    .key
                    .attributes
                    .iter()
                    .filter_map(|a| record.get(a))
                    .map(|v| v.to_string())
                    .collect();
                Err(CrmError::DuplicateKeyValues {
                    values: values.join(", "),
                    key: self.key.name.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Index a record.
    pub fn insert(&mut self, record: &Record) {
        if let Some(tuple) = self.tuple_for(record) {
            self.entries.insert(tuple, record.id);
        }
    }

    /// Remove a record's entry.
    pub fn remove(&mut self, record: &Record) {
        if let Some(tuple) = self.tuple_for(record) {
            if self.entries.get(&tuple) == Some(&record.id) {
                self.entries.remove(&tuple);
            }
        }
    }
}
