//! Attribute value model
//!
//! This module defines the typed values a record attribute can hold:
//! - Value: tagged union over primitives, references, money and options
//! - EntityReference: lookup to another record (by id or alternate key)
//! - ValueKey: normalized, hashable form used for grouping, joins and indexes
//!
//! String comparisons are case-insensitive throughout, matching the
//! collation of the platform being emulated.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::Record;

// =============================================================================
// Reference and wrapper types
// =============================================================================

/// Reference to a record of some logical type.
///
/// A reference either carries a concrete id or, with a nil id, a set of
/// alternate-key attributes that the write path resolves to an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityReference {
    /// Logical type of the referenced record.
    pub logical_name: String,
    /// Referenced record id (nil when addressed by key).
    pub id: Uuid,
    /// Display name of the referenced record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Alternate-key attributes used in place of the id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub key_attributes: BTreeMap<String, Value>,
}

impl EntityReference {
    /// Create a reference by id.
    pub fn new(logical_name: impl Into<String>, id: Uuid) -> Self {
        Self {
            logical_name: logical_name.into(),
            id,
            name: None,
            key_attributes: BTreeMap::new(),
        }
    }

    /// Create a reference addressed by alternate-key attributes.
    pub fn by_key<K, V>(logical_name: impl Into<String>, key: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            logical_name: logical_name.into(),
            id: Uuid::nil(),
            name: None,
            key_attributes: key
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// True when the reference must be resolved through an alternate key.
    pub fn is_keyed(&self) -> bool {
        self.id.is_nil() && !self.key_attributes.is_empty()
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.logical_name, self.id)
    }
}

/// Single option-set (picklist) value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSetValue(pub i32);

impl OptionSetValue {
    /// Wrap an option value.
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// The raw option value.
    pub fn value(&self) -> i32 {
        self.0
    }
}

/// Currency amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(pub Decimal);

impl Money {
    /// Wrap a decimal amount.
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The decimal amount.
    pub fn amount(&self) -> Decimal {
        self.0
    }
}

impl From<i64> for Money {
    fn from(v: i64) -> Self {
        Money(Decimal::from(v))
    }
}

/// Value projected from a joined alias or produced by an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasedValue {
    /// Logical type the value was read from.
    pub entity_logical_name: String,
    /// Attribute the value was read from.
    pub attribute_logical_name: String,
    /// The underlying value.
    pub value: Value,
}

// =============================================================================
// Value
// =============================================================================

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Attribute present with no value.
    #[default]
    Null,
    /// Two-option attribute.
    Bool(bool),
    /// Whole number.
    Int(i32),
    /// 64-bit whole number.
    BigInt(i64),
    /// Decimal number.
    Decimal(Decimal),
    /// Floating point number.
    Double(f64),
    /// Currency amount.
    Money(Money),
    /// Single or multiple lines of text.
    String(String),
    /// Date and time, always UTC.
    DateTime(DateTime<Utc>),
    /// Unique identifier.
    Guid(Uuid),
    /// Lookup to another record.
    Lookup(EntityReference),
    /// Option-set value.
    OptionSet(OptionSetValue),
    /// Multi-select option-set values.
    OptionSets(Vec<OptionSetValue>),
    /// Collection of records (activity-party lists).
    Entities(Vec<Record>),
    /// Value projected from a join or aggregate.
    Aliased(Box<AliasedValue>),
}

/// Primitive value kinds used for literal coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Boolean
    Bool,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    BigInt,
    /// Decimal
    Decimal,
    /// Float
    Double,
    /// Money
    Money,
    /// Text
    String,
    /// Date/time
    DateTime,
    /// Guid (ids and lookups)
    Guid,
    /// Option-set value
    OptionSet,
}

impl Value {
    /// True for `Null` (looking through aliases).
    pub fn is_null(&self) -> bool {
        matches!(self.unaliased(), Value::Null)
    }

    /// Strip any `Aliased` wrapping.
    pub fn unaliased(&self) -> &Value {
        match self {
            Value::Aliased(a) => a.value.unaliased(),
            other => other,
        }
    }

    /// Human-readable variant name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Int(_) => "Int32",
            Value::BigInt(_) => "Int64",
            Value::Decimal(_) => "Decimal",
            Value::Double(_) => "Double",
            Value::Money(_) => "Money",
            Value::String(_) => "String",
            Value::DateTime(_) => "DateTime",
            Value::Guid(_) => "Guid",
            Value::Lookup(_) => "EntityReference",
            Value::OptionSet(_) => "OptionSetValue",
            Value::OptionSets(_) => "OptionSetValueCollection",
            Value::Entities(_) => "EntityCollection",
            Value::Aliased(_) => "AliasedValue",
        }
    }

    /// The primitive kind of this value, if it has one.
    pub fn value_type(&self) -> Option<ValueType> {
        Some(match self.unaliased() {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::BigInt(_) => ValueType::BigInt,
            Value::Decimal(_) => ValueType::Decimal,
            Value::Double(_) => ValueType::Double,
            Value::Money(_) => ValueType::Money,
            Value::String(_) => ValueType::String,
            Value::DateTime(_) => ValueType::DateTime,
            Value::Guid(_) | Value::Lookup(_) => ValueType::Guid,
            Value::OptionSet(_) | Value::OptionSets(_) => ValueType::OptionSet,
            _ => return None,
        })
    }

    /// Borrow as text.
    pub fn as_str(&self) -> Option<&str> {
        match self.unaliased() {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a reference.
    pub fn as_reference(&self) -> Option<&EntityReference> {
        match self.unaliased() {
            Value::Lookup(r) => Some(r),
            _ => None,
        }
    }

    /// Id carried by a guid or lookup.
    pub fn as_guid(&self) -> Option<Uuid> {
        match self.unaliased() {
            Value::Guid(g) => Some(*g),
            Value::Lookup(r) => Some(r.id),
            Value::String(s) => Uuid::parse_str(s.trim()).ok(),
            _ => None,
        }
    }

    /// Date/time value.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self.unaliased() {
            Value::DateTime(d) => Some(*d),
            _ => None,
        }
    }

    /// Boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self.unaliased() {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral value of ints and option sets.
    pub fn as_i64(&self) -> Option<i64> {
        match self.unaliased() {
            Value::Int(i) => Some(i64::from(*i)),
            Value::BigInt(i) => Some(*i),
            Value::OptionSet(o) => Some(i64::from(o.0)),
            Value::Decimal(d) => d.to_i64(),
            Value::Money(m) => m.0.to_i64(),
            Value::Double(f) => Some(*f as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Numeric value widened to a decimal.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self.unaliased() {
            Value::Int(i) => Some(Decimal::from(*i)),
            Value::BigInt(i) => Some(Decimal::from(*i)),
            Value::Decimal(d) => Some(*d),
            Value::Money(m) => Some(m.0),
            Value::Double(f) => Decimal::from_f64(*f),
            Value::OptionSet(o) => Some(Decimal::from(o.0)),
            _ => None,
        }
    }

    /// True for numeric kinds (not option sets).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.unaliased(),
            Value::Int(_) | Value::BigInt(_) | Value::Decimal(_) | Value::Double(_) | Value::Money(_)
        )
    }

    /// Option values held by a single or multi-select option attribute.
    pub fn as_options(&self) -> Option<Vec<i32>> {
        match self.unaliased() {
            Value::OptionSet(o) => Some(vec![o.0]),
            Value::OptionSets(list) => Some(list.iter().map(|o| o.0).collect()),
            Value::Int(i) => Some(vec![*i]),
            _ => None,
        }
    }

    /// Compare two values with platform semantics.
    ///
    /// Strings compare case-insensitively, numeric kinds compare across
    /// representations, guids compare with lookup ids. Returns `None` when
    /// the values are not comparable (including any null).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        let (a, b) = (self.unaliased(), other.unaliased());
        match (a, b) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::String(x), Value::String(y)) => Some(cmp_ignore_case(x, y)),
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
            (Value::OptionSets(_), _) | (_, Value::OptionSets(_)) => {
                let mut x = a.as_options()?;
                let mut y = b.as_options()?;
                x.sort_unstable();
                x.dedup();
                y.sort_unstable();
                y.dedup();
                Some(x.cmp(&y))
            }
            (Value::Guid(_) | Value::Lookup(_), _) | (_, Value::Guid(_) | Value::Lookup(_)) => {
                Some(a.as_guid()?.cmp(&b.as_guid()?))
            }
            _ => match (a.as_decimal(), b.as_decimal()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => match (a, b) {
                    (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),
                    _ => None,
                },
            },
        }
    }

    /// Equality under `compare` semantics; false when either side is null.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Normalized hashable key for grouping, joining and indexing.
    pub fn key(&self) -> ValueKey {
        match self.unaliased() {
            Value::Null => ValueKey::Null,
            Value::Bool(b) => ValueKey::Bool(*b),
            Value::String(s) => ValueKey::Text(s.to_lowercase()),
            Value::DateTime(d) => ValueKey::Time(*d),
            Value::Guid(g) => ValueKey::Guid(*g),
            Value::Lookup(r) => ValueKey::Guid(r.id),
            Value::OptionSet(o) => ValueKey::Number(Decimal::from(o.0)),
            Value::OptionSets(list) => {
                let mut v: Vec<i32> = list.iter().map(|o| o.0).collect();
                v.sort_unstable();
                v.dedup();
                ValueKey::Options(v)
            }
            Value::Entities(list) => ValueKey::Records(list.iter().map(|r| r.id).collect()),
            Value::Double(f) => match Decimal::from_f64(*f) {
                Some(d) => ValueKey::Number(d.normalize()),
                None => ValueKey::Text(f.to_string()),
            },
            other => match other.as_decimal() {
                Some(d) => ValueKey::Number(d.normalize()),
                None => ValueKey::Null,
            },
        }
    }

    /// Coerce a literal (typically parsed text) into the given kind.
    ///
    /// Values already of a compatible kind pass through unchanged. Returns
    /// `None` when the literal cannot be represented.
    pub fn coerce_to(&self, target: ValueType) -> Option<Value> {
        let v = self.unaliased();
        if v.is_null() {
            return Some(Value::Null);
        }
        match target {
            ValueType::String => match v {
                Value::String(_) => Some(v.clone()),
                other => Some(Value::String(other.to_string())),
            },
            ValueType::Bool => match v {
                Value::Bool(_) => Some(v.clone()),
                Value::String(s) => parse_bool(s).map(Value::Bool),
                Value::Int(i) => Some(Value::Bool(*i != 0)),
                _ => None,
            },
            ValueType::Int => match v {
                Value::Int(_) => Some(v.clone()),
                Value::OptionSet(o) => Some(Value::Int(o.0)),
                other => other.as_i64().and_then(|i| i32::try_from(i).ok()).map(Value::Int),
            },
            ValueType::BigInt => v.as_i64().map(Value::BigInt),
            ValueType::Decimal => match v {
                Value::String(s) => s.trim().parse::<Decimal>().ok().map(Value::Decimal),
                other => other.as_decimal().map(Value::Decimal),
            },
            ValueType::Double => match v {
                Value::Double(_) => Some(v.clone()),
                Value::String(s) => s.trim().parse::<f64>().ok().map(Value::Double),
                other => other.as_decimal().and_then(|d| d.to_f64()).map(Value::Double),
            },
            ValueType::Money => match v {
                Value::Money(_) => Some(v.clone()),
                Value::String(s) => s
                    .trim()
                    .parse::<Decimal>()
                    .ok()
                    .map(|d| Value::Money(Money(d))),
                other => other.as_decimal().map(|d| Value::Money(Money(d))),
            },
            ValueType::DateTime => match v {
                Value::DateTime(_) => Some(v.clone()),
                Value::String(s) => parse_datetime(s).map(Value::DateTime),
                _ => None,
            },
            ValueType::Guid => match v {
                Value::Guid(_) => Some(v.clone()),
                Value::Lookup(r) => Some(Value::Guid(r.id)),
                Value::String(s) => Uuid::parse_str(s.trim()).ok().map(Value::Guid),
                _ => None,
            },
            ValueType::OptionSet => match v {
                Value::OptionSet(_) | Value::OptionSets(_) => Some(v.clone()),
                other => other
                    .as_i64()
                    .and_then(|i| i32::try_from(i).ok())
                    .map(|i| Value::OptionSet(OptionSetValue(i))),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::BigInt(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Double(d) => write!(f, "{}", d),
            Value::Money(m) => write!(f, "{}", m.0),
            Value::String(s) => write!(f, "{}", s),
            Value::DateTime(d) => write!(f, "{}", d.to_rfc3339()),
            Value::Guid(g) => write!(f, "{}", g),
            Value::Lookup(r) => write!(f, "{}", r.id),
            Value::OptionSet(o) => write!(f, "{}", o.0),
            Value::OptionSets(list) => {
                let parts: Vec<String> = list.iter().map(|o| o.0.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
            Value::Entities(list) => write!(f, "[{} records]", list.len()),
            Value::Aliased(a) => write!(f, "{}", a.value),
        }
    }
}

// From implementations for common types
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<Money> for Value {
    fn from(v: Money) -> Self {
        Value::Money(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Guid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<EntityReference> for Value {
    fn from(v: EntityReference) -> Self {
        Value::Lookup(v)
    }
}

impl From<OptionSetValue> for Value {
    fn from(v: OptionSetValue) -> Self {
        Value::OptionSet(v)
    }
}

impl From<Vec<OptionSetValue>> for Value {
    fn from(v: Vec<OptionSetValue>) -> Self {
        Value::OptionSets(v)
    }
}

impl From<Vec<Record>> for Value {
    fn from(v: Vec<Record>) -> Self {
        Value::Entities(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// =============================================================================
// ValueKey
// =============================================================================

/// Normalized, totally ordered form of a value.
///
/// Text is lower-cased, numbers are normalized decimals and lookups collapse
/// to their id, so two values that compare equal under [`Value::compare`]
/// produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueKey {
    /// Null / missing
    Null,
    /// Boolean
    Bool(bool),
    /// Any numeric kind or option value
    Number(Decimal),
    /// Lower-cased text
    Text(String),
    /// Date/time
    Time(DateTime<Utc>),
    /// Guid or lookup id
    Guid(Uuid),
    /// Sorted multi-select values
    Options(Vec<i32>),
    /// Ids of a record collection
    Records(Vec<Uuid>),
}

// =============================================================================
// Parsing helpers
// =============================================================================

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a date/time literal as written in queries.
///
/// Accepts RFC 3339, `yyyy-MM-dd HH:mm:ss`, `yyyy-MM-ddTHH:mm:ss` and bare
/// dates (midnight UTC). Naive forms are interpreted as UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%m/%d/%Y %H:%M:%S"] {
        if let Ok(n) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&n));
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
        }
    }
    None
}
