//! Query pipeline and business rules for memcrm
//!
//! This crate ties the store and the schema catalog together:
//! - Database: one store, one catalog, one configuration and the seeded
//!   default identity
//! - query: query normalization, filtering, joins, aggregation and paging
//! - rules: the create/update/delete write path and the composite
//!   operations, run inside a [`Transaction`]
//! - config / fiscal: clock, fiscal calendar and behavior switches

#![warn(missing_docs)]

pub mod config;
pub mod database;
pub mod fiscal;
pub mod query;
pub mod rules;

pub use config::{Clock, EngineConfig, FixedClock, RelativeDayWindow, SystemClock};
pub use database::{Database, DatabaseBuilder};
pub use fiscal::{FiscalCalendar, FiscalPeriodTemplate, FiscalYearNaming};
pub use query::{
    AggregateFn, AttributeExpression, ColumnSet, Condition, ConditionExpression,
    ConditionOperator, DateGrouping, FilterExpression, FilterNode, JoinOperator, LinkEntity,
    LogicalOperator, OrderExpression, OrderType, PagingInfo, Query, QueryByAttribute,
    QueryExpression,
};
pub use rules::{CallerContext, QualifyLead, QualifyLeadResult, ReadView, Transaction, UpsertResult};
