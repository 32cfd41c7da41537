//! Query engine
//!
//! Three query forms (object, by-attribute, FetchXML) normalize into one
//! [`QuerySpec`], which the pipeline in [`exec`] runs against the store.

pub mod aggregate;
pub mod dates;
pub mod exec;
pub mod expression;
pub mod fetch;
pub mod filter;
pub mod join;
pub mod normalize;
pub mod spec;

pub use exec::{execute, retrieve_multiple};
pub use expression::{
    AttributeExpression, ColumnSet, Condition, ConditionExpression, ConditionOperator,
    FilterExpression, FilterNode, LinkEntity, LogicalOperator, OrderExpression, OrderType,
    PagingInfo, Query, QueryByAttribute, QueryExpression,
};
pub use filter::{EvalContext, RowSource};
pub use join::Row;
pub use normalize::{normalize, validate_alias};
pub use spec::{
    AggregateFn, ColumnSpec, DateGrouping, JoinOperator, LinkSpec, OrderSpec, Paging, Projection,
    QuerySpec,
};
