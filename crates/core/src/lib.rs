//! Core types for the memcrm engine
//!
//! This crate defines the foundational types shared by every other crate:
//! - Value / Record: typed attribute values and records
//! - CrmError: the fault taxonomy with verbatim platform messages
//! - Catalog: per-logical-type schema metadata and relationships

#![warn(missing_docs)]

pub mod error;
pub mod record;
pub mod schema;
pub mod value;

pub use error::{CrmError, CrmResult, FaultKind};
pub use record::{EntityCollection, Record};
pub use schema::{
    AlternateKey, AttributeDef, AttributeKind, CascadePolicy, Catalog, CatalogBuilder, EntityDef,
    ManyToMany, OneToMany, OptionDef, OwnershipType, RelationshipDef, RequiredGroup, StateDef,
};
pub use value::{
    parse_datetime, AliasedValue, EntityReference, Money, OptionSetValue, Value, ValueKey,
    ValueType,
};
