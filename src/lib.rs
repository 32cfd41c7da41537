//! memcrm: an in-memory CRM data engine
//!
//! Stands in for a live CRM server when exercising data-access code. Records
//! are stored per logical type; queries in object, by-attribute or FetchXML
//! form run through one pipeline; the write path applies the platform's
//! business rules.
//!
//! Most callers only need [`Crm`]:
//!
//! ```ignore
//! use memcrm::{ColumnSet, Crm, EntityReference, Record};
//!
//! let crm = Crm::new();
//! let id = crm.create(Record::new("account").with("name", "Contoso"))?;
//! let account = crm.retrieve(&EntityReference::new("account", id), ColumnSet::all())?;
//! ```

// ============================================================================
// Public API types
// ============================================================================

// Service facade and request layer
pub use memcrm_executor::{Command, Crm, Error, Executor, Output, ResponseItem, Result};

// Records and values
pub use memcrm_core::{
    AliasedValue, EntityCollection, EntityReference, Money, OptionSetValue, Record, Value,
};

// Faults
pub use memcrm_core::{CrmError, FaultKind};

// Schema metadata
pub use memcrm_core::{
    AttributeDef, AttributeKind, CascadePolicy, Catalog, CatalogBuilder, EntityDef,
    RelationshipDef,
};

// Queries
pub use memcrm_engine::{
    AggregateFn, AttributeExpression, ColumnSet, Condition, ConditionExpression,
    ConditionOperator, DateGrouping, FilterExpression, FilterNode, JoinOperator,
    LinkEntity, LogicalOperator, OrderExpression, OrderType, PagingInfo, Query, QueryByAttribute,
    QueryExpression,
};

// Engine, configuration and request payloads
pub use memcrm_engine::{
    CallerContext, Database, DatabaseBuilder, EngineConfig, FiscalCalendar, FiscalPeriodTemplate,
    FiscalYearNaming, FixedClock, QualifyLead, QualifyLeadResult, RelativeDayWindow, UpsertResult,
};

// Sharing
pub use memcrm_security::AccessRights;

// Ids
pub use uuid::Uuid;
