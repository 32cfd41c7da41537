//! Record and result collection types
//!
//! A [`Record`] is the unit of storage: a logical type, an id and a bag of
//! named attribute values. An attribute absent from the bag is distinct from
//! one present with [`Value::Null`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::{EntityReference, OptionSetValue, Value};

/// A typed, identified bag of attribute values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Logical type name (lower case).
    pub logical_name: String,
    /// Record id; nil until assigned by the write path.
    pub id: Uuid,
    /// Attribute values by name.
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    /// Display strings for lookups, options, money and booleans.
    #[serde(default)]
    pub formatted_values: BTreeMap<String, String>,
    /// Alternate-key attributes used in place of the id.
    #[serde(default)]
    pub key_attributes: BTreeMap<String, Value>,
    /// Monotonic version assigned by the store on every write.
    #[serde(default)]
    pub version: u64,
}

impl Record {
    /// Create an empty record with a nil id.
    pub fn new(logical_name: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            ..Default::default()
        }
    }

    /// Create an empty record with the given id.
    pub fn with_id(logical_name: impl Into<String>, id: Uuid) -> Self {
        Self {
            logical_name: logical_name.into(),
            id,
            ..Default::default()
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(attribute, value);
        self
    }

    /// Builder-style alternate-key setter.
    pub fn with_key(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.key_attributes.insert(attribute.into(), value.into());
        self
    }

    /// Set an attribute value.
    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(attribute.into(), value.into());
    }

    /// Remove an attribute entirely.
    pub fn remove(&mut self, attribute: &str) -> Option<Value> {
        self.attributes.remove(attribute)
    }

    /// Attribute value, present or not.
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    /// Attribute value if present and not null.
    pub fn get_non_null(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute).filter(|v| !v.is_null())
    }

    /// True when the attribute is present (possibly null).
    pub fn contains(&self, attribute: &str) -> bool {
        self.attributes.contains_key(attribute)
    }

    /// Text attribute.
    pub fn string(&self, attribute: &str) -> Option<&str> {
        self.get(attribute).and_then(Value::as_str)
    }

    /// Lookup attribute.
    pub fn reference(&self, attribute: &str) -> Option<&EntityReference> {
        self.get(attribute).and_then(Value::as_reference)
    }

    /// Option-set attribute.
    pub fn option(&self, attribute: &str) -> Option<i32> {
        match self.get(attribute)?.unaliased() {
            Value::OptionSet(OptionSetValue(v)) => Some(*v),
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Guid or lookup id attribute.
    pub fn guid(&self, attribute: &str) -> Option<Uuid> {
        self.get(attribute).and_then(Value::as_guid)
    }

    /// Formatted (display) value.
    pub fn formatted(&self, attribute: &str) -> Option<&str> {
        self.formatted_values.get(attribute).map(String::as_str)
    }

    /// Reference to this record.
    pub fn to_reference(&self) -> EntityReference {
        EntityReference::new(self.logical_name.clone(), self.id)
    }

    /// Copy every attribute of `other` onto this record.
    pub fn merge_from(&mut self, other: &Record) {
        for (name, value) in &other.attributes {
            self.attributes.insert(name.clone(), value.clone());
        }
    }

    /// Keep only the named attributes (plus nothing else).
    pub fn project(&mut self, columns: &[String]) {
        self.attributes.retain(|name, _| columns.iter().any(|c| c == name));
        self.formatted_values
            .retain(|name, _| columns.iter().any(|c| c == name));
    }
}

/// Result set of a multi-record query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityCollection {
    /// Logical type of the query root.
    pub entity_name: String,
    /// Result rows in output order.
    pub entities: Vec<Record>,
    /// True when more pages follow the returned one.
    pub more_records: bool,
    /// Opaque cookie naming the returned page.
    pub paging_cookie: Option<String>,
    /// Total number of rows before paging, when requested.
    pub total_record_count: Option<usize>,
}

impl EntityCollection {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when no rows were returned.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl IntoIterator for EntityCollection {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}
